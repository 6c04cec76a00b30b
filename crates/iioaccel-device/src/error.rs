use std::path::PathBuf;

/// Errors that can occur while enumerating or opening IIO devices.
#[derive(Debug, thiserror::Error)]
pub enum DeviceError {
    /// Failed to list the devices of a bus subsystem.
    #[error("failed to enumerate {path}: {source}")]
    Enumerate {
        path: PathBuf,
        source: std::io::Error,
    },

    /// The sysfs path does not name a device.
    #[error("no such device: {0}")]
    NotFound(PathBuf),

    /// Failed to read or write a sysfs attribute.
    #[error("sysfs attribute {path}: {source}")]
    Attribute {
        path: PathBuf,
        source: std::io::Error,
    },

    /// Failed to open the device's character file.
    #[error("failed to open {path}: {source}")]
    Open {
        path: PathBuf,
        source: std::io::Error,
    },

    /// The data channel was opened but could not be configured.
    #[error("failed to configure {path}: {source}")]
    Configure {
        path: PathBuf,
        source: std::io::Error,
    },

    /// The device has no character file to stream from.
    #[error("device {0} has no device file")]
    NoDeviceFile(String),

    /// An I/O error occurred on an already-open handle.
    #[error("device I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, DeviceError>;
