mod cmd;
mod exit;
mod logging;
mod output;

use std::path::PathBuf;

use clap::Parser;
use iioaccel_device::BusConfig;
use iioaccel_driver::{BufferConfig, DriverConfig, DEFAULT_BUFFER_LENGTH};

use crate::cmd::{Command, Context};
use crate::logging::{init_logging, LogFormat, LogLevel};
use crate::output::OutputFormat;

#[derive(Parser, Debug)]
#[command(name = "iioaccel", version, about = "IIO buffer accelerometer CLI")]
struct Cli {
    /// Output format.
    #[arg(long, value_name = "FORMAT", global = true)]
    format: Option<OutputFormat>,

    /// Log output format (stderr).
    #[arg(long, value_name = "FORMAT", default_value = "text", global = true)]
    log_format: LogFormat,

    /// Minimum log level (stderr).
    #[arg(long, value_name = "LEVEL", default_value = "info", global = true)]
    log_level: LogLevel,

    /// Root of the sysfs mount.
    #[arg(long, value_name = "DIR", env = "IIOACCEL_SYSFS_ROOT", default_value = "/sys", global = true)]
    sysfs_root: PathBuf,

    /// Directory holding device nodes.
    #[arg(long, value_name = "DIR", env = "IIOACCEL_DEV_ROOT", default_value = "/dev", global = true)]
    dev_root: PathBuf,

    /// Kernel scan buffer length, in scans.
    #[arg(long, value_name = "SCANS", default_value_t = DEFAULT_BUFFER_LENGTH, global = true)]
    buffer_length: usize,

    #[command(subcommand)]
    command: Command,
}

impl Cli {
    fn driver_config(&self) -> DriverConfig {
        DriverConfig {
            bus: BusConfig {
                sysfs_root: self.sysfs_root.clone(),
                dev_root: self.dev_root.clone(),
            },
            buffer: BufferConfig {
                length: self.buffer_length,
                ..BufferConfig::default()
            },
        }
    }
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.log_format, cli.log_level);

    if cli.buffer_length == 0 {
        eprintln!("error: --buffer-length must be greater than zero");
        std::process::exit(exit::USAGE);
    }

    let ctx = Context {
        format: cli.format.unwrap_or_else(OutputFormat::default_for_stdout),
        config: cli.driver_config(),
    };

    match cmd::run(cli.command, &ctx) {
        Ok(code) => std::process::exit(code),
        Err(err) => {
            eprintln!("error: {err}");
            std::process::exit(err.code);
        }
    }
}
