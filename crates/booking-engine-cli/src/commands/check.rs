//! `check`: re-validate a chosen start against a busy snapshot.

use std::io::Write;

use anyhow::Result;
use booking_engine::{validate_and_suggest, ConflictReason, EngineConfig};
use chrono::NaiveDateTime;
use serde::Serialize;

use super::{write_json, Snapshot};

#[derive(Debug, Serialize)]
struct CheckOutput {
    conflict: bool,
    reason: Option<ConflictReason>,
    alternatives: Vec<String>,
}

pub fn run<W: Write>(
    writer: &mut W,
    config: &EngineConfig,
    snapshot: &Snapshot,
    start: NaiveDateTime,
    duration_minutes: u32,
) -> Result<()> {
    let result = validate_and_suggest(
        config,
        snapshot.availability.as_ref(),
        start,
        duration_minutes,
        &snapshot.busy,
    )?;

    let output = CheckOutput {
        conflict: result.has_conflict,
        reason: result.reason,
        alternatives: result
            .alternatives
            .iter()
            .map(|slot| slot.start_iso())
            .collect(),
    };
    write_json(writer, &output)
}
