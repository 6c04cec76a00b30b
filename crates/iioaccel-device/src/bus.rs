use std::fs;
use std::path::{Path, PathBuf};

use tracing::{debug, trace};

use crate::device::{Device, SysfsDevice};
use crate::error::{DeviceError, Result};

/// Subsystem name of the Industrial I/O bus.
pub const IIO_SUBSYSTEM: &str = "iio";

/// Where the sysfs and device node trees live.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BusConfig {
    /// Root of the sysfs mount. Default: `/sys`.
    pub sysfs_root: PathBuf,
    /// Directory holding device nodes. Default: `/dev`.
    pub dev_root: PathBuf,
}

impl Default for BusConfig {
    fn default() -> Self {
        Self {
            sysfs_root: PathBuf::from("/sys"),
            dev_root: PathBuf::from("/dev"),
        }
    }
}

/// Lists the devices attached to a bus subsystem.
pub trait DeviceEnumerator {
    /// All devices currently on `subsystem`, in stable (name) order.
    fn devices(&self, subsystem: &str) -> Result<Vec<Box<dyn Device>>>;
}

/// Enumerates devices from `<sysfs_root>/bus/<subsystem>/devices`.
#[derive(Debug, Clone, Default)]
pub struct SysfsBus {
    config: BusConfig,
}

impl SysfsBus {
    /// Enumerate the live system (`/sys`, `/dev`).
    pub fn new() -> Self {
        Self::default()
    }

    /// Enumerate an explicit sysfs/dev tree.
    pub fn with_config(config: BusConfig) -> Self {
        Self { config }
    }

    /// Current bus configuration.
    pub fn config(&self) -> &BusConfig {
        &self.config
    }

    /// Directory listing the devices of `subsystem`.
    pub fn subsystem_dir(&self, subsystem: &str) -> PathBuf {
        self.config
            .sysfs_root
            .join("bus")
            .join(subsystem)
            .join("devices")
    }

    /// Look up one device of `subsystem` by sysname.
    pub fn device(&self, subsystem: &str, sysname: &str) -> Result<SysfsDevice> {
        let syspath = self.subsystem_dir(subsystem).join(sysname);
        Ok(SysfsDevice::from_syspath(&syspath, &self.config.dev_root)?.with_subsystem(subsystem))
    }

    /// Resolve a user-supplied device reference.
    ///
    /// Accepts an absolute sysfs path, a sysname (`iio:device0`) or a bare
    /// device number (`0`).
    pub fn resolve(&self, reference: &str) -> Result<SysfsDevice> {
        let path = Path::new(reference);
        if path.is_absolute() {
            return SysfsDevice::from_syspath(path, &self.config.dev_root);
        }
        if !reference.is_empty() && reference.bytes().all(|b| b.is_ascii_digit()) {
            return self.device(IIO_SUBSYSTEM, &format!("iio:device{reference}"));
        }
        self.device(IIO_SUBSYSTEM, reference)
    }
}

impl DeviceEnumerator for SysfsBus {
    fn devices(&self, subsystem: &str) -> Result<Vec<Box<dyn Device>>> {
        let dir = self.subsystem_dir(subsystem);
        let entries = fs::read_dir(&dir).map_err(|source| DeviceError::Enumerate {
            path: dir.clone(),
            source,
        })?;

        let mut paths = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|source| DeviceError::Enumerate {
                path: dir.clone(),
                source,
            })?;
            paths.push(entry.path());
        }
        paths.sort();

        let mut devices: Vec<Box<dyn Device>> = Vec::with_capacity(paths.len());
        for path in paths {
            match SysfsDevice::from_syspath(&path, &self.config.dev_root) {
                Ok(device) => {
                    trace!(?path, "enumerated device");
                    devices.push(Box::new(device.with_subsystem(subsystem)));
                }
                Err(err) => debug!(?path, %err, "skipping bus entry"),
            }
        }

        debug!(subsystem, count = devices.len(), "enumerated bus");
        Ok(devices)
    }
}
