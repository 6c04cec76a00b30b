use std::rc::Rc;

use iioaccel_device::{Device, DeviceEnumerator, Multiplexer, SysfsBus, IIO_SUBSYSTEM};
use tracing::debug;

use crate::buffer::{ScanBuffer, SysfsScanBuffer};
use crate::config::DriverConfig;
use crate::driver::{DriverInfo, DriverType, ReadingsCallback, SensorDriver, SpecificType};
use crate::error::Result;
use crate::session::DeviceSession;

/// `name` attribute of the devices this driver serves.
pub const ACCEL_DEVICE_NAME: &str = "accel_3d";

pub const DRIVER_INFO: DriverInfo = DriverInfo {
    name: "IIO Buffer accelerometer",
    kind: DriverType::Accelerometer,
    specific_type: SpecificType::IioBuffer,
};

/// Accelerometer driver for IIO devices with a triggered scan buffer.
pub struct IioBufferAccel {
    bus: Box<dyn DeviceEnumerator>,
    buffer: Rc<dyn ScanBuffer>,
}

impl IioBufferAccel {
    /// Driver over the live (or configured) sysfs tree.
    pub fn new(config: DriverConfig) -> Self {
        Self {
            bus: Box::new(SysfsBus::with_config(config.bus)),
            buffer: Rc::new(SysfsScanBuffer::new(config.buffer)),
        }
    }

    /// Driver over caller-supplied collaborators.
    pub fn with_parts(bus: Box<dyn DeviceEnumerator>, buffer: Rc<dyn ScanBuffer>) -> Self {
        Self { bus, buffer }
    }
}

impl Default for IioBufferAccel {
    fn default() -> Self {
        Self::new(DriverConfig::default())
    }
}

impl std::fmt::Debug for IioBufferAccel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IioBufferAccel")
            .field("info", &DRIVER_INFO)
            .finish_non_exhaustive()
    }
}

impl SensorDriver for IioBufferAccel {
    type Session = DeviceSession;

    fn info(&self) -> &DriverInfo {
        &DRIVER_INFO
    }

    fn discover(&self, device: &dyn Device) -> bool {
        if device.subsystem() != Some(IIO_SUBSYSTEM) {
            return false;
        }
        if device.sysfs_attr("name").as_deref() != Some(ACCEL_DEVICE_NAME) {
            return false;
        }
        debug!(device = device.sysname(), "found IIO buffer accelerometer");
        true
    }

    fn open(&self, device: Box<dyn Device>, callback: ReadingsCallback) -> Result<DeviceSession> {
        DeviceSession::open(
            DRIVER_INFO,
            self.bus.as_ref(),
            Rc::clone(&self.buffer),
            device,
            callback,
        )
    }

    fn set_polling(
        &self,
        session: &mut DeviceSession,
        mux: &mut dyn Multiplexer,
        state: bool,
    ) -> Result<()> {
        session.set_polling(mux, state)
    }

    fn close(&self, session: DeviceSession, mux: &mut dyn Multiplexer) {
        session.close(mux);
    }
}
