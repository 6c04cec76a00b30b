use std::fmt;
use std::io;

use iioaccel_device::DeviceError;
use iioaccel_driver::{BufferError, DriverError};
use iioaccel_frame::FrameError;

// Exit codes are part of the CLI contract; do not renumber.
pub const SUCCESS: i32 = 0;
pub const FAILURE: i32 = 1;
pub const DEVICE_ERROR: i32 = 3;
pub const PERMISSION_DENIED: i32 = 50;
pub const DATA_INVALID: i32 = 60;
pub const USAGE: i32 = 64;
pub const TIMEOUT: i32 = 124;
pub const INTERNAL: i32 = 125;

pub type CliResult<T> = Result<T, CliError>;

#[derive(Debug)]
pub struct CliError {
    pub code: i32,
    pub message: String,
}

impl CliError {
    pub fn new(code: i32, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for CliError {}

pub fn io_error(context: &str, err: io::Error) -> CliError {
    let code = match err.kind() {
        io::ErrorKind::PermissionDenied => PERMISSION_DENIED,
        io::ErrorKind::TimedOut | io::ErrorKind::WouldBlock => TIMEOUT,
        io::ErrorKind::NotFound => DEVICE_ERROR,
        _ => INTERNAL,
    };
    CliError::new(code, format!("{context}: {err}"))
}

pub fn device_error(context: &str, err: DeviceError) -> CliError {
    match err {
        DeviceError::Enumerate { ref source, .. }
        | DeviceError::Attribute { ref source, .. }
        | DeviceError::Open { ref source, .. }
            if source.kind() == io::ErrorKind::PermissionDenied =>
        {
            CliError::new(PERMISSION_DENIED, format!("{context}: {err}"))
        }
        DeviceError::Io(source) => io_error(context, source),
        other => CliError::new(DEVICE_ERROR, format!("{context}: {other}")),
    }
}

pub fn frame_error(context: &str, err: FrameError) -> CliError {
    match err {
        FrameError::Io(source) => io_error(context, source),
        FrameError::EndOfStream { .. } => CliError::new(FAILURE, format!("{context}: {err}")),
        FrameError::ScaleMismatch { .. }
        | FrameError::NoAxisPresent
        | FrameError::ChannelOutOfBounds { .. }
        | FrameError::InvalidChannel { .. } => {
            CliError::new(DATA_INVALID, format!("{context}: {err}"))
        }
        other => CliError::new(INTERNAL, format!("{context}: {other}")),
    }
}

pub fn driver_error(context: &str, err: DriverError) -> CliError {
    match err {
        DriverError::NoTriggerFound { .. } => {
            CliError::new(DEVICE_ERROR, format!("{context}: {err}"))
        }
        DriverError::BufferConfig { device, source } => match source {
            BufferError::Sysfs(err) => device_error(&format!("{context} ({device})"), err),
            BufferError::Layout(err) => frame_error(&format!("{context} ({device})"), err),
            other => CliError::new(DATA_INVALID, format!("{context} ({device}): {other}")),
        },
        DriverError::ChannelOpen(err) | DriverError::ChannelConfig(err) => {
            device_error(context, err)
        }
        DriverError::StreamRead(err) => frame_error(context, err),
        DriverError::Registration(err) => io_error(context, err),
    }
}
