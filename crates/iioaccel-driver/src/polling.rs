use std::os::fd::RawFd;

use iioaccel_device::{Multiplexer, Token};
use tracing::debug;

/// Whether a session is registered for readiness events.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "lowercase")]
pub enum PollState {
    #[default]
    Idle,
    Active,
}

/// Tracks one readiness registration and makes start/stop idempotent.
#[derive(Debug, Default)]
pub struct PollingController {
    token: Option<Token>,
}

impl PollingController {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> PollState {
        match self.token {
            Some(_) => PollState::Active,
            None => PollState::Idle,
        }
    }

    /// Registration token while Active.
    pub fn token(&self) -> Option<Token> {
        self.token
    }

    /// Register `fd` for readable events. Returns `false` if already Active.
    pub fn start(&mut self, mux: &mut dyn Multiplexer, fd: RawFd) -> std::io::Result<bool> {
        if self.token.is_some() {
            return Ok(false);
        }
        let token = mux.register(fd)?;
        debug!(fd, token = token.0, "polling started");
        self.token = Some(token);
        Ok(true)
    }

    /// Drop the registration. Returns `false` if already Idle.
    ///
    /// The controller is Idle afterwards even if the multiplexer reports an
    /// error; the token is not reused.
    pub fn stop(&mut self, mux: &mut dyn Multiplexer) -> std::io::Result<bool> {
        let Some(token) = self.token.take() else {
            return Ok(false);
        };
        mux.deregister(token)?;
        debug!(token = token.0, "polling stopped");
        Ok(true)
    }

    /// Move to `active`, starting or stopping as needed.
    pub fn set(&mut self, mux: &mut dyn Multiplexer, fd: RawFd, active: bool) -> std::io::Result<bool> {
        if active {
            self.start(mux, fd)
        } else {
            self.stop(mux)
        }
    }

    /// Forget the registration without telling the multiplexer.
    pub(crate) fn abandon(&mut self) -> Option<Token> {
        self.token.take()
    }
}
