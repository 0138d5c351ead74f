//! CLI subcommand implementations.

pub mod check;
pub mod expand;
pub mod slots;

use std::io::{Read, Write};
use std::path::Path;

use anyhow::{Context, Result};
use booking_engine::{BusyInterval, WeeklyAvailability};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

/// Availability and busy bookings for one business, as read by `slots` and
/// `check`.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Snapshot {
    /// Missing availability means the business is closed every day.
    pub availability: Option<WeeklyAvailability>,
    pub busy: Vec<BusyInterval>,
}

/// Reads and parses the JSON input from `path`, or stdin when absent.
pub fn read_input<T: DeserializeOwned>(path: Option<&Path>) -> Result<T> {
    let raw = match path {
        Some(path) => std::fs::read_to_string(path)
            .with_context(|| format!("failed to read {}", path.display()))?,
        None => {
            let mut buf = String::new();
            std::io::stdin()
                .read_to_string(&mut buf)
                .context("failed to read stdin")?;
            buf
        }
    };
    serde_json::from_str(&raw).context("failed to parse input JSON")
}

/// Writes `value` as pretty JSON followed by a newline.
pub fn write_json<W: Write, T: Serialize>(writer: &mut W, value: &T) -> Result<()> {
    serde_json::to_writer_pretty(&mut *writer, value).context("failed to serialize output")?;
    writeln!(writer)?;
    Ok(())
}
