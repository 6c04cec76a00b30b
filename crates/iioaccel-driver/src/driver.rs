use iioaccel_device::{Device, Multiplexer};
use iioaccel_frame::AccelReading;
use serde::Serialize;

use crate::error::Result;

/// Kind of sensor a driver serves.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DriverType {
    Accelerometer,
}

/// How a driver obtains its samples.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SpecificType {
    IioBuffer,
}

/// Static description of a driver, handed to every callback.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct DriverInfo {
    pub name: &'static str,
    #[serde(rename = "type")]
    pub kind: DriverType,
    pub specific_type: SpecificType,
}

/// Receives each decoded reading, synchronously, during dispatch.
pub type ReadingsCallback = Box<dyn FnMut(&DriverInfo, &AccelReading)>;

/// Capabilities every sensor driver exposes to its host.
pub trait SensorDriver {
    /// Open device handle returned by [`SensorDriver::open`].
    type Session;

    fn info(&self) -> &DriverInfo;

    /// Whether this driver can serve `device`.
    fn discover(&self, device: &dyn Device) -> bool;

    /// Acquire everything needed to stream from `device`. The session
    /// starts Idle.
    fn open(&self, device: Box<dyn Device>, callback: ReadingsCallback) -> Result<Self::Session>;

    /// Start or stop delivering readings. Idempotent.
    fn set_polling(
        &self,
        session: &mut Self::Session,
        mux: &mut dyn Multiplexer,
        state: bool,
    ) -> Result<()>;

    /// Stop polling and release the device.
    fn close(&self, session: Self::Session, mux: &mut dyn Multiplexer);
}
