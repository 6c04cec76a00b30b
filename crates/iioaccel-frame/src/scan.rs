use std::collections::BTreeMap;

use crate::error::{FrameError, Result};

/// X axis accelerometer channel.
pub const ACCEL_X: &str = "in_accel_x";
/// Y axis accelerometer channel.
pub const ACCEL_Y: &str = "in_accel_y";
/// Z axis accelerometer channel.
pub const ACCEL_Z: &str = "in_accel_z";
/// Axis channels in x, y, z order.
pub const ACCEL_AXES: [&str; 3] = [ACCEL_X, ACCEL_Y, ACCEL_Z];

/// Location and encoding of one channel inside a scan frame.
#[derive(Debug, Clone, PartialEq)]
pub struct ChannelSpec {
    /// Whether the channel is enabled in the scan.
    pub present: bool,
    /// Scan index; channels appear in the frame in index order.
    pub index: u32,
    /// Byte offset of the channel within the frame.
    pub offset: usize,
    /// Storage width of one element in bytes.
    pub width_bytes: usize,
    /// Number of elements stored back to back.
    pub repeat: usize,
    /// Significant bits after shifting.
    pub bits_used: u32,
    /// Right shift applied to the stored word before masking.
    pub shift: u32,
    /// Two's complement value.
    pub signed: bool,
    /// Stored big-endian.
    pub big_endian: bool,
    /// Multiplier from raw counts to physical units.
    pub scale: f64,
    /// IIO `_offset` attribute. Informational; decoding does not apply it.
    pub value_offset: f64,
}

impl Default for ChannelSpec {
    fn default() -> Self {
        Self {
            present: true,
            index: 0,
            offset: 0,
            width_bytes: 2,
            repeat: 1,
            bits_used: 16,
            shift: 0,
            signed: true,
            big_endian: false,
            scale: 1.0,
            value_offset: 0.0,
        }
    }
}

impl ChannelSpec {
    /// First byte past the channel's storage.
    pub fn end(&self) -> usize {
        self.offset + self.width_bytes * self.repeat.max(1)
    }
}

/// Layout of one scan frame, built once per open.
#[derive(Debug, Clone, PartialEq)]
pub struct ScanDescriptor {
    frame_size: usize,
    channels: BTreeMap<String, ChannelSpec>,
}

impl ScanDescriptor {
    /// Build a descriptor from explicit offsets.
    ///
    /// Every present channel must fit inside `frame_size`.
    pub fn new(
        frame_size: usize,
        channels: impl IntoIterator<Item = (String, ChannelSpec)>,
    ) -> Result<Self> {
        if frame_size == 0 {
            return Err(FrameError::InvalidFrameSize(frame_size));
        }
        let channels: BTreeMap<_, _> = channels.into_iter().collect();
        for (name, spec) in channels.iter().filter(|(_, spec)| spec.present) {
            if spec.end() > frame_size {
                return Err(FrameError::ChannelOutOfBounds {
                    name: name.clone(),
                    end: spec.end(),
                    frame_size,
                });
            }
        }
        Ok(Self {
            frame_size,
            channels,
        })
    }

    /// Build a descriptor by laying enabled scan elements out the way the
    /// kernel does.
    ///
    /// Elements are sorted by scan index. Each one starts at the next offset
    /// aligned to its storage width. The total size is padded to the largest
    /// alignment seen. Incoming offsets are ignored; absent elements take
    /// no space.
    pub fn from_elements(elements: impl IntoIterator<Item = (String, ChannelSpec)>) -> Result<Self> {
        let mut elements: Vec<_> = elements
            .into_iter()
            .filter(|(_, spec)| spec.present)
            .collect();
        elements.sort_by(|a, b| a.1.index.cmp(&b.1.index).then_with(|| a.0.cmp(&b.0)));

        let mut location = 0usize;
        let mut largest = 1usize;
        for (name, spec) in &mut elements {
            let align = spec.width_bytes;
            if align == 0 {
                return Err(FrameError::InvalidChannel {
                    name: name.clone(),
                    reason: "zero storage width",
                });
            }
            if location % align != 0 {
                location += align - location % align;
            }
            spec.offset = location;
            location = spec.end();
            largest = largest.max(align);
        }
        if location % largest != 0 {
            location += largest - location % largest;
        }

        Self::new(location, elements)
    }

    /// Size of one scan frame in bytes.
    pub fn frame_size(&self) -> usize {
        self.frame_size
    }

    /// Look up a channel by name, whether or not it is present.
    pub fn channel(&self, name: &str) -> Option<&ChannelSpec> {
        self.channels.get(name)
    }

    /// True if `name` is known and enabled.
    pub fn is_present(&self, name: &str) -> bool {
        self.channel(name).map(|spec| spec.present).unwrap_or(false)
    }

    /// All channels in name order.
    pub fn channels(&self) -> impl Iterator<Item = (&str, &ChannelSpec)> {
        self.channels.iter().map(|(name, spec)| (name.as_str(), spec))
    }
}
