//! `slots`: bookable starts for one day.

use std::io::Write;

use anyhow::Result;
use booking_engine::{compute_slots, filter_advance_notice, EngineConfig};
use chrono::{NaiveDate, NaiveDateTime};
use serde::Serialize;

use super::{write_json, Snapshot};

#[derive(Debug, Serialize)]
struct SlotsOutput {
    date: NaiveDate,
    slots: Vec<String>,
}

pub fn run<W: Write>(
    writer: &mut W,
    config: &EngineConfig,
    snapshot: &Snapshot,
    date: NaiveDate,
    duration_minutes: u32,
    now: Option<NaiveDateTime>,
) -> Result<()> {
    let mut slots = compute_slots(
        config,
        snapshot.availability.as_ref(),
        date,
        duration_minutes,
        &snapshot.busy,
    )?;
    if let Some(now) = now {
        slots = filter_advance_notice(slots, now, config.advance_notice_minutes);
    }
    tracing::debug!(%date, count = slots.len(), "generated slots");

    let output = SlotsOutput {
        date,
        slots: slots.iter().map(|slot| slot.start_iso()).collect(),
    };
    write_json(writer, &output)
}
