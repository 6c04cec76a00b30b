use iioaccel_device::{DeviceEnumerator, SysfsBus, IIO_SUBSYSTEM};
use iioaccel_driver::{resolve_trigger, IioBufferAccel, SensorDriver};

use crate::cmd::{Context, ListArgs};
use crate::exit::{device_error, CliResult, SUCCESS};
use crate::output::{print_devices, DeviceRow};

pub fn run(args: ListArgs, ctx: &Context) -> CliResult<i32> {
    let bus = SysfsBus::with_config(ctx.config.bus.clone());
    let driver = IioBufferAccel::new(ctx.config.clone());

    let devices = bus
        .devices(IIO_SUBSYSTEM)
        .map_err(|err| device_error("enumeration failed", err))?;

    let rows: Vec<DeviceRow> = devices
        .iter()
        .map(|device| {
            let accelerometer = driver.discover(device.as_ref());
            let trigger = accelerometer
                .then(|| resolve_trigger(&bus, device.as_ref()))
                .flatten()
                .map(|binding| binding.name().to_string());
            DeviceRow {
                sysname: device.sysname().to_string(),
                name: device.sysfs_attr("name"),
                accelerometer,
                trigger,
                path: device.sysfs_path().display().to_string(),
            }
        })
        .filter(|row| !args.accel_only || row.accelerometer)
        .collect();

    print_devices(&rows, ctx.format);
    Ok(SUCCESS)
}
