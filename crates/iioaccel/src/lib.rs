//! Buffered accelerometer readings from Linux IIO devices.
//!
//! # Crate Structure
//!
//! - [`device`]: sysfs bus and device model, nonblocking data channel, poll loop
//! - [`frame`]: scan layout, frame reassembly and reading decode
//! - [`driver`]: trigger binding, scan buffer setup and device sessions
//!   (behind `driver` feature)

/// Re-export device types.
pub mod device {
    pub use iioaccel_device::*;
}

/// Re-export frame types.
pub mod frame {
    pub use iioaccel_frame::*;
}

/// Re-export driver types (requires `driver` feature).
#[cfg(feature = "driver")]
pub mod driver {
    pub use iioaccel_driver::*;
}
