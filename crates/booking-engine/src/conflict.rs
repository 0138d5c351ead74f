//! Re-validate a chosen slot and suggest nearby alternatives on conflict.
//!
//! The overlap test is the one [`generate_slots_with_options`] applies, driven
//! by the same [`SlotOptions`], so a slot that was offered is never rejected
//! against the same snapshot. Alternatives come from the generator too,
//! restricted to the nearest starts on either side of the request.

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use crate::availability::DayHours;
use crate::error::EngineError;
use crate::slots::{collides, generate_slots_with_options, BusyInterval, SlotOptions, TimeSlot};

/// How many alternatives to collect on each side of a rejected start.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConflictOptions {
    pub alternatives_before: usize,
    pub alternatives_after: usize,
}

impl Default for ConflictOptions {
    fn default() -> Self {
        Self {
            alternatives_before: 3,
            alternatives_after: 3,
        }
    }
}

/// Why a proposed booking was rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConflictReason {
    /// Overlaps an existing booking or its buffer.
    Overlap,
    /// Falls on a closed day or outside the day's open window.
    OutsideOpenHours,
}

/// Outcome of a conflict check. A conflict is data, not an error.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConflictResult {
    pub has_conflict: bool,
    pub reason: Option<ConflictReason>,
    /// Nearest free slots, closest first; ties prefer the later start.
    pub alternatives: Vec<TimeSlot>,
}

impl ConflictResult {
    fn clear() -> Self {
        Self {
            has_conflict: false,
            reason: None,
            alternatives: Vec::new(),
        }
    }
}

/// Check a proposed booking starting at `start` against the busy snapshot.
///
/// `hours` must be the hours of `start`'s date. On conflict the result carries
/// up to `alternatives_before + alternatives_after` free slots from the same
/// day, ranked by distance from `start`. A fully booked day gives an empty
/// list, not an error.
///
/// # Errors
///
/// Propagates [`EngineError::InvalidDuration`] and
/// [`EngineError::InvalidDateRange`] from slot generation.
pub fn check_conflict(
    start: NaiveDateTime,
    duration_minutes: u32,
    busy: &[BusyInterval],
    hours: &DayHours,
    slot_options: &SlotOptions,
    options: &ConflictOptions,
) -> Result<ConflictResult, EngineError> {
    let proposed = TimeSlot::new(start, duration_minutes);
    let date = start.date();

    // Validates duration, granularity, and the busy snapshot in one go.
    let day_slots = generate_slots_with_options(date, hours, duration_minutes, busy, slot_options)?;

    let reason = match hours.window(date) {
        Some((open, close)) if proposed.start >= open && proposed.end() <= close => {
            collides(start, duration_minutes, busy, slot_options.buffer_minutes)
                .then_some(ConflictReason::Overlap)
        }
        _ => Some(ConflictReason::OutsideOpenHours),
    };

    let Some(reason) = reason else {
        return Ok(ConflictResult::clear());
    };

    let alternatives = nearest_alternatives(&day_slots, start, options);
    tracing::debug!(
        %start,
        ?reason,
        alternatives = alternatives.len(),
        "proposed booking conflicts"
    );

    Ok(ConflictResult {
        has_conflict: true,
        reason: Some(reason),
        alternatives,
    })
}

/// Up to N slots on each side of `requested`, ranked by absolute distance,
/// ties broken towards the later start.
fn nearest_alternatives(
    day_slots: &[TimeSlot],
    requested: NaiveDateTime,
    options: &ConflictOptions,
) -> Vec<TimeSlot> {
    let split = day_slots.partition_point(|slot| slot.start < requested);
    let before = &day_slots[split.saturating_sub(options.alternatives_before)..split];
    let after = day_slots[split..]
        .iter()
        .filter(|slot| slot.start > requested)
        .take(options.alternatives_after);

    let mut alternatives: Vec<TimeSlot> = before.iter().copied().chain(after.copied()).collect();
    alternatives.sort_by(|a, b| {
        let distance_a = (a.start - requested).num_seconds().abs();
        let distance_b = (b.start - requested).num_seconds().abs();
        distance_a.cmp(&distance_b).then(b.start.cmp(&a.start))
    });
    alternatives
}
