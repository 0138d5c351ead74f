//! Bookable slot generation for a single day.
//!
//! Walks the open window of a day and yields every start time whose
//! `[start, start + duration)` interval fits before closing and stays clear of
//! existing bookings, each widened by a symmetric buffer.
//!
//! # Stepping
//!
//! Candidates sit on a fixed grid `open + k * step`, where the step is the
//! configured granularity or, when none is set, the service duration. A
//! candidate that collides with a buffered busy interval is dropped; the grid
//! itself never moves, so the set of possible starts depends only on the
//! day's hours and the step.
//!
//! Advance-notice filtering ("not before now + N minutes") is a separate,
//! composable step: see [`filter_advance_notice`].

use chrono::{Duration, NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

use crate::availability::DayHours;
use crate::error::EngineError;

/// An existing non-cancelled booking, `[start, end)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BusyInterval {
    pub start: NaiveDateTime,
    pub end: NaiveDateTime,
}

impl BusyInterval {
    /// Build an interval, rejecting `end < start`.
    pub fn new(start: NaiveDateTime, end: NaiveDateTime) -> Result<Self, EngineError> {
        let interval = Self { start, end };
        interval.validate()?;
        Ok(interval)
    }

    /// Check `end >= start`.
    pub fn validate(&self) -> Result<(), EngineError> {
        if self.end < self.start {
            return Err(EngineError::InvalidDateRange(format!(
                "busy interval ends ({}) before it starts ({})",
                self.end, self.start
            )));
        }
        Ok(())
    }

    /// Whether `[start, end)` intersects this interval widened by `buffer` on
    /// both sides: `start < self.end + buffer && end > self.start - buffer`.
    pub fn overlaps(&self, start: NaiveDateTime, end: NaiveDateTime, buffer: Duration) -> bool {
        start < self.end + buffer && end > self.start - buffer
    }
}

/// A bookable start time for a service of fixed duration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TimeSlot {
    pub start: NaiveDateTime,
    pub duration_minutes: u32,
}

impl TimeSlot {
    pub fn new(start: NaiveDateTime, duration_minutes: u32) -> Self {
        Self {
            start,
            duration_minutes,
        }
    }

    pub fn end(&self) -> NaiveDateTime {
        self.start + Duration::minutes(i64::from(self.duration_minutes))
    }

    /// Start as an ISO-8601 local datetime (`YYYY-MM-DDTHH:MM:SS`).
    pub fn start_iso(&self) -> String {
        self.start.format("%Y-%m-%dT%H:%M:%S").to_string()
    }
}

/// Knobs shared by slot generation and conflict checking.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SlotOptions {
    /// Idle minutes required on both sides of every existing booking.
    pub buffer_minutes: u32,
    /// Step between candidate starts. `None` steps by the service duration.
    pub granularity_minutes: Option<u32>,
}

/// Generate the bookable slots for `date`, stepping by the service duration.
///
/// See [`generate_slots_with_options`] for the algorithm.
///
/// # Examples
///
/// ```
/// use booking_engine::availability::DayHours;
/// use booking_engine::slots::generate_slots;
/// use chrono::{NaiveDate, NaiveTime};
///
/// let date = NaiveDate::from_ymd_opt(2026, 3, 16).unwrap();
/// let hours = DayHours::open(
///     NaiveTime::from_hms_opt(9, 0, 0).unwrap(),
///     NaiveTime::from_hms_opt(17, 0, 0).unwrap(),
/// );
/// let slots = generate_slots(date, &hours, 30, &[], 0).unwrap();
/// assert_eq!(slots.len(), 16);
/// ```
pub fn generate_slots(
    date: NaiveDate,
    hours: &DayHours,
    duration_minutes: u32,
    busy: &[BusyInterval],
    buffer_minutes: u32,
) -> Result<Vec<TimeSlot>, EngineError> {
    let options = SlotOptions {
        buffer_minutes,
        granularity_minutes: None,
    };
    generate_slots_with_options(date, hours, duration_minutes, busy, &options)
}

/// Generate the bookable slots for `date`.
///
/// Returns an empty sequence when the day is closed or fully booked. Output is
/// in ascending start order and identical for identical inputs.
///
/// # Errors
///
/// Returns [`EngineError::InvalidDuration`] when `duration_minutes` or a
/// configured granularity is zero, and [`EngineError::InvalidDateRange`] when
/// a busy interval ends before it starts.
pub fn generate_slots_with_options(
    date: NaiveDate,
    hours: &DayHours,
    duration_minutes: u32,
    busy: &[BusyInterval],
    options: &SlotOptions,
) -> Result<Vec<TimeSlot>, EngineError> {
    let step_minutes = validate_steps(duration_minutes, options)?;
    for interval in busy {
        interval.validate()?;
    }

    let Some((open, close)) = hours.window(date) else {
        return Ok(Vec::new());
    };

    let duration = Duration::minutes(i64::from(duration_minutes));
    let step = Duration::minutes(i64::from(step_minutes));
    let buffer = Duration::minutes(i64::from(options.buffer_minutes));

    let mut slots = Vec::new();
    let mut cursor = open;
    while cursor + duration <= close {
        if !is_blocked(cursor, cursor + duration, busy, buffer) {
            slots.push(TimeSlot::new(cursor, duration_minutes));
        }
        cursor += step;
    }

    tracing::debug!(%date, duration_minutes, slots = slots.len(), "generated slots");
    Ok(slots)
}

/// Keep only slots starting at or after `now + notice_minutes`.
pub fn filter_advance_notice(
    slots: Vec<TimeSlot>,
    now: NaiveDateTime,
    notice_minutes: u32,
) -> Vec<TimeSlot> {
    let earliest = now + Duration::minutes(i64::from(notice_minutes));
    slots.into_iter().filter(|slot| slot.start >= earliest).collect()
}

/// Whether `[start, start + duration)` collides with any buffered interval.
pub fn collides(
    start: NaiveDateTime,
    duration_minutes: u32,
    busy: &[BusyInterval],
    buffer_minutes: u32,
) -> bool {
    let end = start + Duration::minutes(i64::from(duration_minutes));
    let buffer = Duration::minutes(i64::from(buffer_minutes));
    is_blocked(start, end, busy, buffer)
}

// ── Internal helpers ────────────────────────────────────────────────────────

/// The step size in minutes, rejecting zero durations and granularities.
fn validate_steps(duration_minutes: u32, options: &SlotOptions) -> Result<u32, EngineError> {
    if duration_minutes == 0 {
        return Err(EngineError::InvalidDuration(
            "service duration must be at least one minute".to_string(),
        ));
    }
    match options.granularity_minutes {
        Some(0) => Err(EngineError::InvalidDuration(
            "slot granularity must be at least one minute".to_string(),
        )),
        Some(granularity) => Ok(granularity),
        None => Ok(duration_minutes),
    }
}

fn is_blocked(
    start: NaiveDateTime,
    end: NaiveDateTime,
    busy: &[BusyInterval],
    buffer: Duration,
) -> bool {
    busy.iter().any(|interval| interval.overlaps(start, end, buffer))
}
