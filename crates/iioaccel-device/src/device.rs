use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use tracing::trace;

use crate::error::{DeviceError, Result};

/// A device as seen through the host's device model.
///
/// This is the fundamental identity type handed to drivers. The sysfs
/// implementation is [`SysfsDevice`]; tests substitute in-memory devices.
pub trait Device {
    /// Bus subsystem name, e.g. `"iio"`.
    fn subsystem(&self) -> Option<&str>;

    /// Kernel name of the device, e.g. `"iio:device0"`.
    fn sysname(&self) -> &str;

    /// Device number: the trailing decimal digits of the sysname.
    fn number(&self) -> Option<&str> {
        sysname_number(self.sysname())
    }

    /// Read a sysfs attribute, with trailing whitespace removed.
    fn sysfs_attr(&self, name: &str) -> Option<String>;

    /// Absolute sysfs directory of the device.
    fn sysfs_path(&self) -> &Path;

    /// Character device file used to stream buffered samples, if any.
    fn device_file(&self) -> Option<PathBuf>;
}

impl std::fmt::Debug for dyn Device {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Device")
            .field("sysname", &self.sysname())
            .field("subsystem", &self.subsystem())
            .finish()
    }
}

/// Return the trailing run of ASCII digits in `sysname`.
pub fn sysname_number(sysname: &str) -> Option<&str> {
    let digits = sysname
        .bytes()
        .rev()
        .take_while(u8::is_ascii_digit)
        .count();
    if digits == 0 {
        None
    } else {
        Some(&sysname[sysname.len() - digits..])
    }
}

/// Read a sysfs attribute file and strip trailing whitespace.
pub fn read_attr(path: impl AsRef<Path>) -> Result<String> {
    let path = path.as_ref();
    let raw = fs::read_to_string(path).map_err(|source| DeviceError::Attribute {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(raw.trim_end().to_string())
}

/// Write a value to a sysfs attribute file.
///
/// Sysfs attributes must be written in a single `write(2)`; the value is
/// written without a trailing newline.
pub fn write_attr(path: impl AsRef<Path>, value: &str) -> Result<()> {
    let path = path.as_ref();
    trace!(?path, value, "writing sysfs attribute");
    let attr_err = |source| DeviceError::Attribute {
        path: path.to_path_buf(),
        source,
    };
    let mut file = fs::OpenOptions::new()
        .write(true)
        .truncate(true)
        .open(path)
        .map_err(attr_err)?;
    file.write_all(value.as_bytes()).map_err(attr_err)
}

/// A device backed by a sysfs directory.
#[derive(Debug, Clone)]
pub struct SysfsDevice {
    sysname: String,
    syspath: PathBuf,
    subsystem: Option<String>,
    dev_root: PathBuf,
}

impl SysfsDevice {
    /// Build a device view from its sysfs directory.
    ///
    /// The subsystem is taken from the `subsystem` link when present.
    /// Device files are looked up under `dev_root` by sysname.
    pub fn from_syspath(syspath: impl AsRef<Path>, dev_root: impl AsRef<Path>) -> Result<Self> {
        let syspath = syspath.as_ref().to_path_buf();
        if !syspath.is_dir() {
            return Err(DeviceError::NotFound(syspath));
        }

        let sysname = syspath
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .ok_or_else(|| DeviceError::NotFound(syspath.clone()))?;

        let subsystem = fs::read_link(syspath.join("subsystem"))
            .ok()
            .and_then(|link| link.file_name().map(|n| n.to_string_lossy().into_owned()));

        Ok(Self {
            sysname,
            syspath,
            subsystem,
            dev_root: dev_root.as_ref().to_path_buf(),
        })
    }

    /// Record the subsystem the device was enumerated under.
    pub fn with_subsystem(mut self, subsystem: impl Into<String>) -> Self {
        self.subsystem = Some(subsystem.into());
        self
    }
}

impl Device for SysfsDevice {
    fn subsystem(&self) -> Option<&str> {
        self.subsystem.as_deref()
    }

    fn sysname(&self) -> &str {
        &self.sysname
    }

    fn sysfs_attr(&self, name: &str) -> Option<String> {
        read_attr(self.syspath.join(name)).ok()
    }

    fn sysfs_path(&self) -> &Path {
        &self.syspath
    }

    fn device_file(&self) -> Option<PathBuf> {
        // Only devices with a major:minor number get a node in /dev.
        if self.syspath.join("dev").exists() {
            Some(self.dev_root.join(&self.sysname))
        } else {
            None
        }
    }
}
