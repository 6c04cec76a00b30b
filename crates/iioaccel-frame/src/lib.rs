//! Scan-frame reassembly and decoding for IIO buffered accelerometers.
//!
//! The kernel delivers one fixed-size scan frame per trigger pulse. Its
//! layout is discovered at runtime and described by a [`ScanDescriptor`].
//! - [`FrameAssembler`] turns a nonblocking byte stream into whole frames
//! - [`ReadingDecoder`] turns a frame into a sign-corrected [`AccelReading`]
//!
//! No partial frames ever reach the decoder.

pub mod assembler;
pub mod decoder;
pub mod error;
pub mod scan;

pub use assembler::{AssemblerStats, FrameAssembler, RawFrame};
pub use decoder::{extract_raw, AccelReading, AxisPresence, ReadingDecoder};
pub use error::{FrameError, Result};
pub use scan::{ChannelSpec, ScanDescriptor, ACCEL_AXES, ACCEL_X, ACCEL_Y, ACCEL_Z};
