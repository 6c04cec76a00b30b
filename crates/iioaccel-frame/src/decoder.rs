use serde::Serialize;
use tracing::trace;

use crate::assembler::RawFrame;
use crate::error::{FrameError, Result};
use crate::scan::{ChannelSpec, ScanDescriptor, ACCEL_AXES};

/// Which axes carried a value in a reading.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct AxisPresence {
    pub x: bool,
    pub y: bool,
    pub z: bool,
}

impl AxisPresence {
    /// True when all three axes are present.
    pub fn all(self) -> bool {
        self.x && self.y && self.z
    }
}

/// One accelerometer sample in m/s², sign-corrected.
///
/// An axis whose channel is not in the scan reads `0.0` and is marked
/// absent in [`AccelReading::present`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct AccelReading {
    pub x: f64,
    pub y: f64,
    pub z: f64,
    pub present: AxisPresence,
}

impl AccelReading {
    /// True when every axis carried a value.
    pub fn is_complete(&self) -> bool {
        self.present.all()
    }
}

/// Decodes accelerometer readings from scan frames.
///
/// Built once per descriptor; validates the axis channels up front so the
/// per-frame path cannot fail on layout.
#[derive(Debug, Clone)]
pub struct ReadingDecoder {
    frame_size: usize,
    axes: [Option<ChannelSpec>; 3],
    scale: f64,
}

impl ReadingDecoder {
    /// Validate the axis channels of `descriptor`.
    ///
    /// Fails if no axis is present, if an axis cannot be decoded, or if the
    /// present axes do not share one scale.
    pub fn new(descriptor: &ScanDescriptor) -> Result<Self> {
        let mut axes: [Option<ChannelSpec>; 3] = [None, None, None];
        let mut common: Option<(&str, f64)> = None;

        for (slot, name) in axes.iter_mut().zip(ACCEL_AXES) {
            let Some(spec) = descriptor.channel(name).filter(|spec| spec.present) else {
                continue;
            };
            validate_axis(name, spec)?;

            match common {
                None => common = Some((name, spec.scale)),
                Some((first_channel, first)) if !same_scale(first, spec.scale) => {
                    return Err(FrameError::ScaleMismatch {
                        first_channel: first_channel.to_string(),
                        first,
                        channel: name.to_string(),
                        scale: spec.scale,
                    });
                }
                Some(_) => {}
            }
            *slot = Some(spec.clone());
        }

        let (_, scale) = common.ok_or(FrameError::NoAxisPresent)?;
        Ok(Self {
            frame_size: descriptor.frame_size(),
            axes,
            scale,
        })
    }

    /// Scale shared by the present axes.
    pub fn scale(&self) -> f64 {
        self.scale
    }

    /// Which axes this decoder will report.
    pub fn presence(&self) -> AxisPresence {
        AxisPresence {
            x: self.axes[0].is_some(),
            y: self.axes[1].is_some(),
            z: self.axes[2].is_some(),
        }
    }

    /// Decode one frame.
    ///
    /// X and Y are negated to match the axis orientation consumers expect;
    /// Z is reported as measured.
    pub fn decode(&self, frame: &RawFrame) -> Result<AccelReading> {
        if frame.len() != self.frame_size {
            return Err(FrameError::FrameLength {
                expected: self.frame_size,
                actual: frame.len(),
            });
        }
        let data = frame.as_bytes();

        let raw = |axis: usize| self.axes[axis].as_ref().map(|spec| (extract_raw(data, spec), spec));
        let (rx, ry, rz) = (raw(0), raw(1), raw(2));
        trace!(
            x = rx.map(|(v, _)| v),
            y = ry.map(|(v, _)| v),
            z = rz.map(|(v, _)| v),
            "read from IIO"
        );

        let physical = |value: Option<(i64, &ChannelSpec)>| {
            value
                .map(|(raw, spec)| raw as f64 * spec.scale)
                .unwrap_or(0.0)
        };

        Ok(AccelReading {
            x: -physical(rx),
            y: -physical(ry),
            z: physical(rz),
            present: self.presence(),
        })
    }
}

/// Extract the integer value of `spec` from `data`.
///
/// Applies byte order, the right shift, the `bits_used` mask, and sign
/// extension for signed channels. `data` must cover the channel.
pub fn extract_raw(data: &[u8], spec: &ChannelSpec) -> i64 {
    let field = &data[spec.offset..spec.offset + spec.width_bytes];
    let word = if spec.big_endian {
        field.iter().fold(0u64, |acc, &b| (acc << 8) | u64::from(b))
    } else {
        field.iter().rev().fold(0u64, |acc, &b| (acc << 8) | u64::from(b))
    };

    let word = word >> spec.shift;
    let bits = spec.bits_used.min(64);
    if bits == 64 {
        return word as i64;
    }

    let masked = word & ((1u64 << bits) - 1);
    if spec.signed {
        let unused = 64 - bits;
        ((masked << unused) as i64) >> unused
    } else {
        masked as i64
    }
}

fn validate_axis(name: &str, spec: &ChannelSpec) -> Result<()> {
    let invalid = |reason| FrameError::InvalidChannel {
        name: name.to_string(),
        reason,
    };
    if !matches!(spec.width_bytes, 1 | 2 | 4 | 8) {
        return Err(invalid("storage width must be 1, 2, 4 or 8 bytes"));
    }
    let storage_bits = (spec.width_bytes * 8) as u32;
    if spec.bits_used == 0 || spec.bits_used > storage_bits {
        return Err(invalid("bits used must fit the storage width"));
    }
    if spec.shift >= storage_bits {
        return Err(invalid("shift must be smaller than the storage width"));
    }
    if !spec.scale.is_finite() {
        return Err(invalid("scale must be finite"));
    }
    Ok(())
}

fn same_scale(a: f64, b: f64) -> bool {
    (a - b).abs() <= f64::EPSILON * a.abs().max(b.abs())
}
