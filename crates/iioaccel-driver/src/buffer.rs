use std::fs;
use std::path::Path;

use iioaccel_device::device::{read_attr, write_attr};
use iioaccel_device::{Device, DeviceError};
use iioaccel_frame::{ChannelSpec, ScanDescriptor};
use tracing::{debug, info, warn};

use crate::config::BufferConfig;
use crate::error::BufferError;

/// Configures the kernel scan buffer and reports its frame layout.
pub trait ScanBuffer {
    /// Bind `trigger`, enable the buffer, and return the scan layout.
    fn build(&self, device: &dyn Device, trigger: &str) -> Result<ScanDescriptor, BufferError>;

    /// Undo [`ScanBuffer::build`]. Best effort; failures are logged.
    fn release(&self, device: &dyn Device);
}

/// Decoded `scan_elements/*_type` attribute.
///
/// Format: `[be|le]:[s|u]<bits>/<storage>[X<repeat>][>><shift>]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChannelType {
    pub big_endian: bool,
    pub signed: bool,
    pub bits_used: u32,
    pub storage_bits: u32,
    pub repeat: u32,
    pub shift: u32,
}

impl ChannelType {
    /// Parse a type string, or `None` if it is malformed.
    pub fn parse(value: &str) -> Option<Self> {
        let (endian, rest) = value.trim().split_once(':')?;
        let big_endian = match endian {
            "be" => true,
            "le" => false,
            _ => return None,
        };

        let signed = match rest.chars().next()? {
            's' | 'S' => true,
            'u' | 'U' => false,
            _ => return None,
        };
        let (bits, rest) = rest[1..].split_once('/')?;
        let (storage, shift) = match rest.split_once(">>") {
            Some((storage, shift)) => (storage, shift.parse().ok()?),
            None => (rest, 0),
        };
        let (storage, repeat) = match storage.split_once('X') {
            Some((storage, repeat)) => (storage, repeat.parse().ok()?),
            None => (storage, 1),
        };

        let parsed = Self {
            big_endian,
            signed,
            bits_used: bits.parse().ok()?,
            storage_bits: storage.parse().ok()?,
            repeat,
            shift,
        };
        let valid = parsed.storage_bits > 0
            && parsed.storage_bits % 8 == 0
            && parsed.bits_used > 0
            && parsed
                .bits_used
                .checked_add(parsed.shift)
                .is_some_and(|n| n <= parsed.storage_bits)
            && parsed.repeat > 0;
        valid.then_some(parsed)
    }

    fn into_spec(self, index: u32, scale: f64, value_offset: f64) -> ChannelSpec {
        ChannelSpec {
            present: true,
            index,
            offset: 0,
            width_bytes: (self.storage_bits / 8) as usize,
            repeat: self.repeat as usize,
            bits_used: self.bits_used,
            shift: self.shift,
            signed: self.signed,
            big_endian: self.big_endian,
            scale,
            value_offset,
        }
    }
}

/// Sets up buffered capture through the sysfs IIO buffer interface.
#[derive(Debug, Clone, Default)]
pub struct SysfsScanBuffer {
    config: BufferConfig,
}

impl SysfsScanBuffer {
    /// Create a scan buffer with explicit configuration.
    pub fn new(config: BufferConfig) -> Self {
        Self { config }
    }

    /// Current configuration.
    pub fn config(&self) -> &BufferConfig {
        &self.config
    }
}

impl ScanBuffer for SysfsScanBuffer {
    fn build(&self, device: &dyn Device, trigger: &str) -> Result<ScanDescriptor, BufferError> {
        let root = device.sysfs_path();
        let scan_dir = root.join("scan_elements");

        // The kernel rejects configuration changes while the buffer runs.
        write_attr(root.join("buffer/enable"), "0")?;
        write_attr(root.join("trigger/current_trigger"), trigger)?;

        if self.config.enable_all_channels {
            enable_all_elements(&scan_dir)?;
        }

        let elements = read_enabled_elements(root, &scan_dir)?;
        if elements.is_empty() {
            return Err(BufferError::NoChannels);
        }
        let descriptor = ScanDescriptor::from_elements(elements)?;

        write_attr(root.join("buffer/length"), &self.config.length.to_string())?;
        write_attr(root.join("buffer/enable"), "1")?;

        info!(
            device = device.sysname(),
            trigger,
            frame_size = descriptor.frame_size(),
            channels = descriptor.channels().count(),
            "scan buffer enabled"
        );
        Ok(descriptor)
    }

    fn release(&self, device: &dyn Device) {
        let enable = device.sysfs_path().join("buffer/enable");
        match write_attr(&enable, "0") {
            Ok(()) => debug!(device = device.sysname(), "scan buffer disabled"),
            Err(err) => warn!(device = device.sysname(), %err, "failed to disable scan buffer"),
        }
    }
}

fn list_elements(scan_dir: &Path) -> Result<Vec<String>, BufferError> {
    let entries = fs::read_dir(scan_dir).map_err(|source| DeviceError::Enumerate {
        path: scan_dir.to_path_buf(),
        source,
    })?;

    let mut names = Vec::new();
    for entry in entries {
        let entry = entry.map_err(|source| DeviceError::Enumerate {
            path: scan_dir.to_path_buf(),
            source,
        })?;
        let file_name = entry.file_name();
        if let Some(base) = file_name.to_string_lossy().strip_suffix("_en") {
            names.push(base.to_string());
        }
    }
    names.sort();
    Ok(names)
}

fn enable_all_elements(scan_dir: &Path) -> Result<(), BufferError> {
    for name in list_elements(scan_dir)? {
        let path = scan_dir.join(format!("{name}_en"));
        if let Err(err) = write_attr(&path, "1") {
            // Some elements are fixed by the driver; reading them back decides.
            debug!(channel = %name, %err, "could not enable scan element");
        }
    }
    Ok(())
}

fn read_enabled_elements(
    root: &Path,
    scan_dir: &Path,
) -> Result<Vec<(String, ChannelSpec)>, BufferError> {
    let mut elements = Vec::new();
    for name in list_elements(scan_dir)? {
        if read_attr(scan_dir.join(format!("{name}_en")))? != "1" {
            continue;
        }

        let index = parse_number(&scan_dir.join(format!("{name}_index")))?;
        let ty = read_attr(scan_dir.join(format!("{name}_type")))?;
        let ty = ChannelType::parse(&ty).ok_or_else(|| BufferError::InvalidType {
            channel: name.clone(),
            value: ty.clone(),
        })?;
        let scale = channel_float(root, &name, "scale")?.unwrap_or(1.0);
        let value_offset = channel_float(root, &name, "offset")?.unwrap_or(0.0);

        debug!(channel = %name, index, ?ty, scale, value_offset, "scan element");
        elements.push((name, ty.into_spec(index, scale, value_offset)));
    }
    Ok(elements)
}

/// Look up `<channel>_<suffix>`, then the shared `<type>_<suffix>`
/// (`in_accel_x` -> `in_accel`).
fn channel_float(root: &Path, channel: &str, suffix: &str) -> Result<Option<f64>, BufferError> {
    let mut candidates = vec![root.join(format!("{channel}_{suffix}"))];
    if let Some((shared, _)) = channel.rsplit_once('_') {
        candidates.push(root.join(format!("{shared}_{suffix}")));
    }

    for path in candidates {
        if !path.exists() {
            continue;
        }
        let value = read_attr(&path)?;
        return value
            .parse::<f64>()
            .map(Some)
            .map_err(|_| BufferError::InvalidValue { path, value });
    }
    Ok(None)
}

fn parse_number(path: &Path) -> Result<u32, BufferError> {
    let value = read_attr(path)?;
    value.parse().map_err(|_| BufferError::InvalidValue {
        path: path.to_path_buf(),
        value,
    })
}
