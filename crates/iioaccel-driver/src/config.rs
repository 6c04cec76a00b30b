use iioaccel_device::BusConfig;

/// Default kernel buffer length, in scans.
pub const DEFAULT_BUFFER_LENGTH: usize = 128;

/// Controls how the kernel scan buffer is set up.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BufferConfig {
    /// Number of scans the kernel buffer holds. Default: 128.
    pub length: usize,
    /// When true, every scan element is enabled before the layout is read.
    pub enable_all_channels: bool,
}

impl Default for BufferConfig {
    fn default() -> Self {
        Self {
            length: DEFAULT_BUFFER_LENGTH,
            enable_all_channels: true,
        }
    }
}

/// Full driver configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DriverConfig {
    /// Where sysfs and device nodes live.
    pub bus: BusConfig,
    /// Scan buffer setup.
    pub buffer: BufferConfig,
}
