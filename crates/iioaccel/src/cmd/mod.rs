use std::time::Duration;

use clap::{Args, Subcommand};
use iioaccel_driver::DriverConfig;

use crate::exit::{CliError, CliResult, USAGE};
use crate::output::OutputFormat;

pub mod list;
pub mod stream;
pub mod trigger;
pub mod version;

#[derive(Subcommand, Debug)]
pub enum Command {
    /// List IIO devices and whether they are buffered accelerometers.
    List(ListArgs),
    /// Resolve the hardware trigger paired with a device.
    Trigger(TriggerArgs),
    /// Stream accelerometer readings.
    Stream(StreamArgs),
    /// Show version information.
    Version(VersionArgs),
}

/// Settings shared by every subcommand.
#[derive(Debug)]
pub struct Context {
    pub format: OutputFormat,
    pub config: DriverConfig,
}

pub fn run(command: Command, ctx: &Context) -> CliResult<i32> {
    match command {
        Command::List(args) => list::run(args, ctx),
        Command::Trigger(args) => trigger::run(args, ctx),
        Command::Stream(args) => stream::run(args, ctx),
        Command::Version(args) => version::run(args),
    }
}

#[derive(Args, Debug, Default)]
pub struct ListArgs {
    /// Only show devices the accelerometer driver can serve.
    #[arg(long)]
    pub accel_only: bool,
}

#[derive(Args, Debug)]
pub struct TriggerArgs {
    /// Device: sysname (iio:device0), number (0) or sysfs path.
    pub device: String,
}

#[derive(Args, Debug)]
pub struct StreamArgs {
    /// Device to stream from. Default: the first accelerometer found.
    pub device: Option<String>,
    /// Exit after printing N readings.
    #[arg(long)]
    pub count: Option<usize>,
    /// Give up when no reading arrives within this long (e.g. 5s, 500ms).
    #[arg(long)]
    pub timeout: Option<String>,
}

#[derive(Args, Debug)]
pub struct VersionArgs {
    /// Show extended build provenance.
    #[arg(long)]
    pub extended: bool,
}

pub fn parse_timeout(input: &str) -> CliResult<Duration> {
    let input = input.trim();
    if input.is_empty() {
        return Err(CliError::new(USAGE, "timeout must not be empty"));
    }

    let (number, unit) = if let Some(num) = input.strip_suffix("ms") {
        (num, "ms")
    } else if let Some(num) = input.strip_suffix('s') {
        (num, "s")
    } else {
        (input, "s")
    };

    let value: u64 = number
        .parse()
        .map_err(|_| CliError::new(USAGE, format!("invalid timeout value: {input}")))?;

    if value == 0 {
        return Err(CliError::new(USAGE, "timeout must be greater than zero"));
    }

    match unit {
        "ms" => Ok(Duration::from_millis(value)),
        _ => Ok(Duration::from_secs(value)),
    }
}
