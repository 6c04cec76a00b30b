//! Accelerometer driver for IIO devices with a triggered scan buffer.
//!
//! This is the "just works" layer. Discover a device, open a session, turn
//! polling on, and call [`DeviceSession::dispatch`] whenever the multiplexer
//! reports the session's token.

pub mod accel;
pub mod buffer;
pub mod config;
pub mod driver;
pub mod error;
pub mod polling;
pub mod session;
pub mod trigger;

#[cfg(test)]
mod testing;

pub use accel::{IioBufferAccel, ACCEL_DEVICE_NAME, DRIVER_INFO};
pub use buffer::{ChannelType, ScanBuffer, SysfsScanBuffer};
pub use config::{BufferConfig, DriverConfig, DEFAULT_BUFFER_LENGTH};
pub use driver::{DriverInfo, DriverType, ReadingsCallback, SensorDriver, SpecificType};
pub use error::{BufferError, DriverError, Result};
pub use polling::{PollState, PollingController};
pub use session::DeviceSession;
pub use trigger::{expected_trigger_name, resolve_trigger, TriggerBinding, TRIGGER_PREFIX};
