use std::io::{Error, ErrorKind};
use std::os::fd::RawFd;
use std::time::Duration;

use tracing::{debug, trace, warn};

/// Handle identifying one readiness registration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Token(pub usize);

/// Registers interest in "readable" events on file descriptors.
///
/// Implementations are single-threaded: registration and event delivery
/// happen on the same thread that waits for events.
pub trait Multiplexer {
    /// Start reporting readability of `fd`.
    fn register(&mut self, fd: RawFd) -> std::io::Result<Token>;

    /// Stop reporting events for `token`.
    ///
    /// Once this returns, the token is never reported again.
    fn deregister(&mut self, token: Token) -> std::io::Result<()>;
}

/// A poll(2) based readiness loop.
#[derive(Debug, Default)]
pub struct PollLoop {
    slots: Vec<Option<RawFd>>,
}

impl PollLoop {
    /// Create an empty loop.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of live registrations.
    pub fn len(&self) -> usize {
        self.slots.iter().filter(|slot| slot.is_some()).count()
    }

    /// True when nothing is registered.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Whether `token` is currently registered.
    pub fn is_registered(&self, token: Token) -> bool {
        matches!(self.slots.get(token.0), Some(Some(_)))
    }

    /// Block until at least one registered descriptor is readable, or the
    /// timeout expires.
    ///
    /// Hang-up and error conditions are reported as readable so the owner's
    /// next read surfaces them. A registration whose descriptor is no
    /// longer open (`POLLNVAL`) is dropped and never reported. A signal
    /// interrupting the wait yields an empty list.
    pub fn wait(&mut self, timeout: Option<Duration>) -> std::io::Result<Vec<Token>> {
        let mut tokens = Vec::new();
        let mut fds = Vec::new();
        for (index, slot) in self.slots.iter().enumerate() {
            if let Some(fd) = slot {
                tokens.push(Token(index));
                fds.push(libc::pollfd {
                    fd: *fd,
                    events: libc::POLLIN,
                    revents: 0,
                });
            }
        }

        if fds.is_empty() && timeout.is_none() {
            return Err(Error::new(
                ErrorKind::InvalidInput,
                "wait without timeout on an empty poll loop",
            ));
        }

        let timeout_ms = timeout
            .map(|t| t.as_millis().min(libc::c_int::MAX as u128) as libc::c_int)
            .unwrap_or(-1);

        // SAFETY: `fds` is a valid, initialized slice of `pollfd` for its full length.
        let rc = unsafe { libc::poll(fds.as_mut_ptr(), fds.len() as libc::nfds_t, timeout_ms) };
        if rc < 0 {
            let err = Error::last_os_error();
            if err.kind() == ErrorKind::Interrupted {
                trace!("poll interrupted");
                return Ok(Vec::new());
            }
            return Err(err);
        }

        let mut ready = Vec::new();
        for (pfd, token) in fds.iter().zip(tokens) {
            if pfd.revents & libc::POLLNVAL != 0 {
                warn!(fd = pfd.fd, token = token.0, "descriptor closed while registered; dropping");
                self.slots[token.0] = None;
            } else if pfd.revents & (libc::POLLIN | libc::POLLERR | libc::POLLHUP) != 0 {
                ready.push(token);
            }
        }
        trace!(ready = ready.len(), "poll returned");
        Ok(ready)
    }
}

impl Multiplexer for PollLoop {
    fn register(&mut self, fd: RawFd) -> std::io::Result<Token> {
        if fd < 0 {
            return Err(Error::new(ErrorKind::InvalidInput, "negative file descriptor"));
        }
        let index = match self.slots.iter().position(Option::is_none) {
            Some(index) => {
                self.slots[index] = Some(fd);
                index
            }
            None => {
                self.slots.push(Some(fd));
                self.slots.len() - 1
            }
        };
        debug!(fd, token = index, "registered readable interest");
        Ok(Token(index))
    }

    fn deregister(&mut self, token: Token) -> std::io::Result<()> {
        match self.slots.get_mut(token.0) {
            Some(slot) if slot.is_some() => {
                *slot = None;
                debug!(token = token.0, "deregistered readable interest");
                Ok(())
            }
            _ => Err(Error::new(
                ErrorKind::NotFound,
                format!("token {} is not registered", token.0),
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;
    use std::os::fd::AsRawFd;
    use std::os::unix::net::UnixStream;

    use super::*;

    #[test]
    fn reports_readable_descriptor() {
        let (mut left, right) = UnixStream::pair().unwrap();
        let mut mux = PollLoop::new();
        let token = mux.register(right.as_raw_fd()).unwrap();

        left.write_all(b"x").unwrap();
        let ready = mux.wait(Some(Duration::from_secs(1))).unwrap();
        assert_eq!(ready, vec![token]);
    }

    #[test]
    fn idle_descriptor_times_out() {
        let (_left, right) = UnixStream::pair().unwrap();
        let mut mux = PollLoop::new();
        mux.register(right.as_raw_fd()).unwrap();

        let ready = mux.wait(Some(Duration::from_millis(10))).unwrap();
        assert!(ready.is_empty());
    }

    #[test]
    fn deregistered_token_is_not_reported() {
        let (mut left, right) = UnixStream::pair().unwrap();
        let mut mux = PollLoop::new();
        let token = mux.register(right.as_raw_fd()).unwrap();
        assert!(mux.is_registered(token));

        mux.deregister(token).unwrap();
        assert!(!mux.is_registered(token));
        assert!(mux.is_empty());

        left.write_all(b"x").unwrap();
        let ready = mux.wait(Some(Duration::from_millis(10))).unwrap();
        assert!(ready.is_empty());
    }

    #[test]
    fn double_deregister_is_not_found() {
        let (_left, right) = UnixStream::pair().unwrap();
        let mut mux = PollLoop::new();
        let token = mux.register(right.as_raw_fd()).unwrap();

        mux.deregister(token).unwrap();
        let err = mux.deregister(token).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
    }

    #[test]
    fn slots_are_reused() {
        let (_a, b) = UnixStream::pair().unwrap();
        let (_c, d) = UnixStream::pair().unwrap();
        let mut mux = PollLoop::new();

        let first = mux.register(b.as_raw_fd()).unwrap();
        mux.deregister(first).unwrap();
        let second = mux.register(d.as_raw_fd()).unwrap();
        assert_eq!(first, second);
        assert_eq!(mux.len(), 1);
    }

    #[test]
    fn closed_descriptor_is_dropped() {
        let mut mux = PollLoop::new();
        let stale = mux.register(RawFd::MAX).unwrap();

        let ready = mux.wait(Some(Duration::from_millis(10))).unwrap();
        assert!(ready.is_empty());
        assert!(!mux.is_registered(stale));
        assert!(mux.is_empty());

        let err = mux.wait(None).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidInput);
    }

    #[test]
    fn empty_loop_without_timeout_is_rejected() {
        let mut mux = PollLoop::new();
        let err = mux.wait(None).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidInput);
        assert!(mux.register(-1).is_err());
    }
}
