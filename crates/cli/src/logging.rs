//! Log sinks: JSON lines on the console, error-level lines also appended to a file.

use anyhow::{Context, Result};
use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::Path;
use std::sync::Mutex;

fn json_line(record: &log::Record) -> serde_json::Value {
    serde_json::json!({
        "timestamp": chrono::Utc::now().to_rfc3339_opts(chrono::SecondsFormat::Millis, true),
        "level": record.level().as_str().to_lowercase(),
        "target": record.target(),
        "message": record.args().to_string(),
    })
}

/// Write one record to the console; error-level records also go to `error_file` when set.
/// A failing error file never blocks console output.
fn write_record<C: Write + ?Sized, F: Write>(
    record: &log::Record,
    console: &mut C,
    error_file: Option<&Mutex<F>>,
) -> std::io::Result<()> {
    let line = json_line(record);
    if record.level() == log::Level::Error {
        if let Some(file) = error_file {
            if let Ok(mut f) = file.lock() {
                let _ = writeln!(f, "{}", line);
            }
        }
    }
    writeln!(console, "{}", line)
}

/// Install the global logger. Default filter is `info`; RUST_LOG overrides it.
/// Fails if the error log cannot be opened or a logger is already installed.
pub fn init(error_log: Option<&Path>) -> Result<()> {
    let error_file: Option<Mutex<File>> = match error_log {
        Some(path) => {
            let file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .with_context(|| format!("opening error log {}", path.display()))?;
            Some(Mutex::new(file))
        }
        None => None,
    };

    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format(move |buf, record| write_record(record, buf, error_file.as_ref()))
        .try_init()
        .context("installing logger")
}
