use iioaccel_device::{Device, DeviceEnumerator, IIO_SUBSYSTEM};
use tracing::{debug, warn};

/// Name prefix of the hardware trigger paired with an `accel_3d` device.
pub const TRIGGER_PREFIX: &str = "accel_3d-dev";

/// The trigger bound to a session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TriggerBinding {
    name: String,
}

impl TriggerBinding {
    /// Trigger name as written to `trigger/current_trigger`.
    pub fn name(&self) -> &str {
        &self.name
    }
}

impl std::fmt::Display for TriggerBinding {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.name)
    }
}

/// Trigger name expected for `device`, or `None` if it has no device number.
pub fn expected_trigger_name(device: &dyn Device) -> Option<String> {
    device
        .number()
        .map(|number| format!("{TRIGGER_PREFIX}{number}"))
}

/// Find the trigger that paces buffered sampling for `device`.
///
/// Scans the iio bus once for a device whose `name` attribute equals the
/// expected trigger name. An enumeration failure counts as not found.
pub fn resolve_trigger(bus: &dyn DeviceEnumerator, device: &dyn Device) -> Option<TriggerBinding> {
    let Some(expected) = expected_trigger_name(device) else {
        warn!(device = device.sysname(), "device has no number; cannot derive trigger name");
        return None;
    };

    let candidates = match bus.devices(IIO_SUBSYSTEM) {
        Ok(candidates) => candidates,
        Err(err) => {
            warn!(device = device.sysname(), %err, "could not enumerate triggers");
            return None;
        }
    };

    let found = candidates
        .iter()
        .find(|candidate| candidate.sysfs_attr("name").as_deref() == Some(expected.as_str()));

    match found {
        Some(trigger) => {
            debug!(trigger = %expected, path = ?trigger.sysfs_path(), "found associated trigger");
            Some(TriggerBinding { name: expected })
        }
        None => {
            warn!(
                device = device.sysname(),
                path = ?device.sysfs_path(),
                "could not find trigger name associated with device"
            );
            None
        }
    }
}
