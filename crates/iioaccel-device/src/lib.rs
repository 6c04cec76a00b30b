//! Device layer for IIO accelerometers.
//!
//! Provides the pieces the driver needs from the host system:
//! - A [`Device`] view over sysfs (subsystem, number, attributes, device file)
//! - Bus enumeration via [`DeviceEnumerator`] / [`SysfsBus`]
//! - A nonblocking [`DataChannel`] over the buffer character device
//! - A single-threaded poll(2) readiness [`Multiplexer`]
//!
//! This is the lowest layer of iioaccel. Everything else builds on top of
//! the types provided here.

pub mod bus;
pub mod device;
pub mod error;

#[cfg(unix)]
pub mod channel;
#[cfg(unix)]
pub mod poll;

pub use bus::{BusConfig, DeviceEnumerator, SysfsBus, IIO_SUBSYSTEM};
pub use device::{Device, SysfsDevice};
pub use error::{DeviceError, Result};

#[cfg(unix)]
pub use channel::DataChannel;
#[cfg(unix)]
pub use poll::{Multiplexer, PollLoop, Token};
