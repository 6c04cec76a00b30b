use iioaccel_device::{Device, SysfsBus};
use iioaccel_driver::{expected_trigger_name, resolve_trigger};

use crate::cmd::{Context, TriggerArgs};
use crate::exit::{device_error, CliResult, DEVICE_ERROR, SUCCESS};
use crate::output::{print_trigger, TriggerOutput};

pub fn run(args: TriggerArgs, ctx: &Context) -> CliResult<i32> {
    let bus = SysfsBus::with_config(ctx.config.bus.clone());
    let device = bus
        .resolve(&args.device)
        .map_err(|err| device_error("device lookup failed", err))?;

    let trigger = resolve_trigger(&bus, &device).map(|binding| binding.name().to_string());
    let out = TriggerOutput {
        device: device.sysname().to_string(),
        expected: expected_trigger_name(&device),
        found: trigger.is_some(),
        trigger,
    };

    print_trigger(&out, ctx.format);
    Ok(if out.found { SUCCESS } else { DEVICE_ERROR })
}
