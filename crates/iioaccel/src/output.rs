use std::io::IsTerminal;
use std::time::{SystemTime, UNIX_EPOCH};

use clap::ValueEnum;
use comfy_table::{presets::UTF8_FULL, ContentArrangement, Table};
use iioaccel_frame::AccelReading;
use serde::Serialize;

#[derive(Clone, Debug, Copy, ValueEnum)]
pub enum OutputFormat {
    Json,
    Table,
    Pretty,
}

impl OutputFormat {
    pub fn default_for_stdout() -> Self {
        if std::io::stdout().is_terminal() {
            Self::Table
        } else {
            Self::Json
        }
    }
}

#[derive(Debug, Serialize)]
pub struct DeviceRow {
    pub sysname: String,
    pub name: Option<String>,
    pub accelerometer: bool,
    pub trigger: Option<String>,
    pub path: String,
}

#[derive(Serialize)]
struct DeviceListOutput<'a> {
    devices: &'a [DeviceRow],
}

pub fn print_devices(rows: &[DeviceRow], format: OutputFormat) {
    match format {
        OutputFormat::Json => {
            let out = DeviceListOutput { devices: rows };
            println!(
                "{}",
                serde_json::to_string(&out).unwrap_or_else(|_| "{}".to_string())
            );
        }
        OutputFormat::Table => {
            let mut table = Table::new();
            table
                .load_preset(UTF8_FULL)
                .set_content_arrangement(ContentArrangement::Dynamic)
                .set_header(vec!["DEVICE", "NAME", "ACCEL", "TRIGGER"]);
            for row in rows {
                table.add_row(vec![
                    row.sysname.clone(),
                    row.name.clone().unwrap_or_else(|| "-".to_string()),
                    yes_no(row.accelerometer).to_string(),
                    row.trigger.clone().unwrap_or_else(|| "-".to_string()),
                ]);
            }
            println!("{table}");
        }
        OutputFormat::Pretty => {
            for row in rows {
                println!(
                    "{} name={} accel={} trigger={}",
                    row.sysname,
                    row.name.as_deref().unwrap_or("-"),
                    yes_no(row.accelerometer),
                    row.trigger.as_deref().unwrap_or("-")
                );
            }
        }
    }
}

#[derive(Debug, Serialize)]
pub struct TriggerOutput {
    pub device: String,
    pub expected: Option<String>,
    pub trigger: Option<String>,
    pub found: bool,
}

pub fn print_trigger(out: &TriggerOutput, format: OutputFormat) {
    match format {
        OutputFormat::Json => {
            println!(
                "{}",
                serde_json::to_string(out).unwrap_or_else(|_| "{}".to_string())
            );
        }
        OutputFormat::Table | OutputFormat::Pretty => {
            println!("Trigger:");
            println!("  Device:   {}", out.device);
            println!("  Expected: {}", out.expected.as_deref().unwrap_or("-"));
            match &out.trigger {
                Some(name) => println!("  Bound:    {name}"),
                None => println!("  Bound:    not found"),
            }
        }
    }
}

#[derive(Serialize)]
struct ReadingOutput<'a> {
    device: &'a str,
    #[serde(flatten)]
    reading: &'a AccelReading,
    timestamp: String,
}

pub fn print_reading(device: &str, reading: &AccelReading, format: OutputFormat) {
    match format {
        OutputFormat::Json => {
            let out = ReadingOutput {
                device,
                reading,
                timestamp: now_unix_seconds(),
            };
            println!(
                "{}",
                serde_json::to_string(&out).unwrap_or_else(|_| "{}".to_string())
            );
        }
        OutputFormat::Table => {
            let mut table = Table::new();
            table
                .load_preset(UTF8_FULL)
                .set_content_arrangement(ContentArrangement::Dynamic)
                .set_header(vec!["DEVICE", "X", "Y", "Z"])
                .add_row(vec![
                    device.to_string(),
                    format!("{:.4}", reading.x),
                    format!("{:.4}", reading.y),
                    format!("{:.4}", reading.z),
                ]);
            println!("{table}");
        }
        OutputFormat::Pretty => {
            println!(
                "device={} x={:.4} y={:.4} z={:.4}",
                device, reading.x, reading.y, reading.z
            );
        }
    }
}

fn yes_no(value: bool) -> &'static str {
    if value {
        "yes"
    } else {
        "no"
    }
}

fn now_unix_seconds() -> String {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs().to_string())
        .unwrap_or_else(|_| "0".to_string())
}
