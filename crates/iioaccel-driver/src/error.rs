use std::path::PathBuf;

use iioaccel_device::DeviceError;
use iioaccel_frame::FrameError;

/// Errors raised while configuring the kernel scan buffer.
#[derive(Debug, thiserror::Error)]
pub enum BufferError {
    /// Reading or writing sysfs failed.
    #[error("sysfs access failed: {0}")]
    Sysfs(#[from] DeviceError),

    /// A scan element's `_type` attribute could not be parsed.
    #[error("channel {channel} has unparseable type {value:?}")]
    InvalidType { channel: String, value: String },

    /// A numeric attribute held something else.
    #[error("attribute {path} has invalid value {value:?}")]
    InvalidValue { path: PathBuf, value: String },

    /// No scan element is enabled.
    #[error("no scan elements are enabled")]
    NoChannels,

    /// The enabled channels do not form a usable scan.
    #[error("invalid scan layout: {0}")]
    Layout(#[from] FrameError),
}

/// Errors surfaced by the driver and its sessions.
#[derive(Debug, thiserror::Error)]
pub enum DriverError {
    /// No companion trigger exists for the device.
    #[error("no trigger found for {device}")]
    NoTriggerFound { device: String },

    /// The scan buffer could not be configured for the device/trigger pair.
    #[error("buffer configuration failed for {device}: {source}")]
    BufferConfig {
        device: String,
        #[source]
        source: BufferError,
    },

    /// The data channel could not be opened.
    #[error("failed to open data channel: {0}")]
    ChannelOpen(#[source] DeviceError),

    /// The data channel opened but nonblocking setup failed.
    #[error("failed to configure data channel: {0}")]
    ChannelConfig(#[source] DeviceError),

    /// A read failed with something other than "no data right now".
    #[error("stream read failed: {0}")]
    StreamRead(#[source] FrameError),

    /// The readiness multiplexer refused a registration change.
    #[error("readiness registration failed: {0}")]
    Registration(#[source] std::io::Error),
}

pub type Result<T> = std::result::Result<T, DriverError>;
