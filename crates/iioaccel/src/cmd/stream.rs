use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use iioaccel_device::{Device, DeviceEnumerator, PollLoop, SysfsBus, SysfsDevice, IIO_SUBSYSTEM};
use iioaccel_driver::{DeviceSession, IioBufferAccel, ReadingsCallback, SensorDriver};
use tracing::{debug, info};

use crate::cmd::{parse_timeout, Context, StreamArgs};
use crate::exit::{
    device_error, driver_error, io_error, CliError, CliResult, DEVICE_ERROR, INTERNAL, SUCCESS,
    TIMEOUT,
};
use crate::output::print_reading;

/// Upper bound on one poll wait, so Ctrl-C and the timeout are noticed.
const TICK: Duration = Duration::from_millis(200);

pub fn run(args: StreamArgs, ctx: &Context) -> CliResult<i32> {
    let timeout = args.timeout.as_deref().map(parse_timeout).transpose()?;
    let bus = SysfsBus::with_config(ctx.config.bus.clone());
    let driver = IioBufferAccel::new(ctx.config.clone());
    let device = select_device(&bus, &driver, args.device.as_deref())?;

    let running = Arc::new(AtomicBool::new(true));
    install_ctrlc_handler(running.clone())?;

    let sysname = device.sysname().to_string();
    let format = ctx.format;
    let callback: ReadingsCallback = Box::new(move |_, reading| {
        print_reading(&sysname, reading, format);
    });

    let mut session = driver
        .open(Box::new(device), callback)
        .map_err(|err| driver_error("open failed", err))?;
    let mut mux = PollLoop::new();

    let result = pump(&driver, &mut session, &mut mux, args.count, timeout, &running);
    driver.close(session, &mut mux);
    result
}

fn pump(
    driver: &IioBufferAccel,
    session: &mut DeviceSession,
    mux: &mut PollLoop,
    count: Option<usize>,
    timeout: Option<Duration>,
    running: &AtomicBool,
) -> CliResult<i32> {
    driver
        .set_polling(session, mux, true)
        .map_err(|err| driver_error("polling failed", err))?;
    let token = session.token();

    let mut received = 0usize;
    let mut last_reading = Instant::now();
    while running.load(Ordering::SeqCst) {
        let ready = mux
            .wait(Some(TICK))
            .map_err(|err| io_error("poll failed", err))?;

        if ready.iter().any(|t| Some(*t) == token) {
            let reading = session
                .dispatch(mux)
                .map_err(|err| driver_error("stream failed", err))?;
            if reading.is_some() {
                received = received.saturating_add(1);
                last_reading = Instant::now();
                if count.is_some_and(|count| received >= count) {
                    info!(received, "reading count reached");
                    return Ok(SUCCESS);
                }
            }
        }

        if let Some(timeout) = timeout {
            if last_reading.elapsed() >= timeout {
                return Err(CliError::new(
                    TIMEOUT,
                    format!("no reading within {timeout:?}"),
                ));
            }
        }
    }

    debug!(received, "interrupted");
    Ok(SUCCESS)
}

fn select_device(
    bus: &SysfsBus,
    driver: &IioBufferAccel,
    reference: Option<&str>,
) -> CliResult<SysfsDevice> {
    if let Some(reference) = reference {
        let device = bus
            .resolve(reference)
            .map_err(|err| device_error("device lookup failed", err))?;
        if !driver.discover(&device) {
            return Err(CliError::new(
                DEVICE_ERROR,
                format!("{} is not an IIO buffer accelerometer", device.sysname()),
            ));
        }
        return Ok(device);
    }

    let candidates = bus
        .devices(IIO_SUBSYSTEM)
        .map_err(|err| device_error("enumeration failed", err))?;
    let found = candidates
        .iter()
        .find(|device| driver.discover(device.as_ref()))
        .ok_or_else(|| CliError::new(DEVICE_ERROR, "no IIO buffer accelerometer found"))?;

    bus.device(IIO_SUBSYSTEM, found.sysname())
        .map_err(|err| device_error("device lookup failed", err))
}

fn install_ctrlc_handler(running: Arc<AtomicBool>) -> CliResult<()> {
    ctrlc::set_handler(move || {
        running.store(false, Ordering::SeqCst);
    })
    .map_err(|err| CliError::new(INTERNAL, format!("signal handler setup failed: {err}")))
}
