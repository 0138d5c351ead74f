//! `expand`: materialize a recurrence pattern up to a horizon.

use std::io::Write;

use anyhow::Result;
use booking_engine::{
    run_expansion, EngineConfig, GeneratedOccurrence, PatternState, RecurrencePattern,
};
use chrono::NaiveDate;
use serde::Serialize;

use super::write_json;

#[derive(Debug, Serialize)]
struct ExpandOutput {
    occurrences: Vec<GeneratedOccurrence>,
    new_watermark: Option<NaiveDate>,
    occurrences_generated: u32,
    state: PatternState,
    /// The pattern with its watermark advanced, ready to feed the next run.
    pattern: RecurrencePattern,
}

pub fn run<W: Write>(
    writer: &mut W,
    config: &EngineConfig,
    pattern: &RecurrencePattern,
    up_to: NaiveDate,
) -> Result<()> {
    let expansion = run_expansion(config, pattern, up_to)?;

    let mut advanced = pattern.clone();
    advanced.advance(&expansion);
    let state = advanced.state()?;
    tracing::debug!(
        pattern_id = %pattern.id,
        emitted = expansion.occurrences.len(),
        ?state,
        "expanded pattern"
    );

    let output = ExpandOutput {
        new_watermark: expansion.new_watermark,
        occurrences_generated: expansion.occurrences_generated,
        occurrences: expansion.occurrences,
        state,
        pattern: advanced,
    };
    write_json(writer, &output)
}
