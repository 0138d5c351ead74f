//! Recurring-booking expansion.
//!
//! Turns a [`RecurrencePattern`] into concrete occurrence dates up to a
//! horizon, resuming from the pattern's watermark (`last_generated_date`) so
//! repeated runs never emit a date twice and never leave a gap.
//!
//! # Frequencies
//!
//! - **Daily** — every day from `start_date`.
//! - **Weekly** — every `day_of_week`, starting with the first one on or after
//!   `start_date`.
//! - **Biweekly** — like weekly, but only weeks where
//!   `floor((candidate - start_date) / 7) mod 2 == 0` count. The parity of the
//!   start date anchors the cycle, so a pattern starting just after its
//!   weekday can produce its first occurrence up to 13 days later.
//! - **Monthly** — `day_of_month` in every month, clamped to the month's last
//!   day. The clamp never moves the anchor: day 31 becomes Feb 28 and then
//!   Mar 31 again.
//!
//! # Bounds
//!
//! Expansion stops, without emitting the offending candidate, at the first
//! candidate past `end_date` or past the requested horizon, or once the total
//! occurrence count reaches `max_occurrences`. Candidates before `start_date`
//! are skipped. A hard iteration ceiling turns a runaway expansion into
//! [`EngineError::ExpansionLimitExceeded`].
//!
//! # Lifecycle
//!
//! `NotStarted` (no watermark) → `Advancing` → `Exhausted`. Expanding an
//! exhausted pattern returns an empty sequence.

use chrono::{Datelike, NaiveDate, NaiveDateTime, NaiveTime, Weekday};
use serde::{Deserialize, Serialize};

use crate::calendar::{
    add_days, clamped_day, days_in_month, next_month, next_weekday_after, previous_month, time_of_day,
    weekday_from_index, weekday_index,
};
use crate::error::EngineError;

/// Default ceiling on candidate steps per expansion run.
pub const DEFAULT_MAX_ITERATIONS: u32 = 1000;

// ── Pattern model ───────────────────────────────────────────────────────────

/// A day of the month, 1 through 31.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DayOfMonth(u8);

impl DayOfMonth {
    pub fn new(day: u8) -> Option<Self> {
        (1..=31).contains(&day).then_some(Self(day))
    }

    pub fn get(self) -> u8 {
        self.0
    }
}

/// How a pattern repeats. Frequency-specific fields live on their variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Recurrence {
    Daily,
    Weekly { day_of_week: Weekday },
    Biweekly { day_of_week: Weekday },
    Monthly { day_of_month: DayOfMonth },
}

impl Recurrence {
    pub fn frequency(&self) -> Frequency {
        match self {
            Recurrence::Daily => Frequency::Daily,
            Recurrence::Weekly { .. } => Frequency::Weekly,
            Recurrence::Biweekly { .. } => Frequency::Biweekly,
            Recurrence::Monthly { .. } => Frequency::Monthly,
        }
    }
}

/// Frequency tag used on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Frequency {
    Daily,
    Weekly,
    Biweekly,
    Monthly,
}

/// A recurring booking definition plus its expansion watermark.
///
/// Serializes through [`PatternRecord`], the flat wire form hosts store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "PatternRecord", into = "PatternRecord")]
pub struct RecurrencePattern {
    pub id: String,
    pub recurrence: Recurrence,
    pub time_of_day: NaiveTime,
    pub start_date: NaiveDate,
    pub end_date: Option<NaiveDate>,
    pub max_occurrences: Option<u32>,
    /// Last date already emitted. Later runs resume strictly after it.
    pub last_generated_date: Option<NaiveDate>,
    /// Occurrences emitted by earlier runs, counted against `max_occurrences`.
    pub occurrences_generated: u32,
}

/// Flat wire form of a [`RecurrencePattern`].
///
/// `day_of_week` uses 0 = Sunday through 6 = Saturday.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PatternRecord {
    pub id: String,
    pub frequency: Frequency,
    #[serde(default)]
    pub day_of_week: Option<u8>,
    #[serde(default)]
    pub day_of_month: Option<u8>,
    #[serde(with = "time_of_day")]
    pub time_of_day: NaiveTime,
    pub start_date: NaiveDate,
    #[serde(default)]
    pub end_date: Option<NaiveDate>,
    #[serde(default)]
    pub max_occurrences: Option<u32>,
    #[serde(default)]
    pub last_generated_date: Option<NaiveDate>,
    #[serde(default)]
    pub occurrences_generated: u32,
}

impl TryFrom<PatternRecord> for RecurrencePattern {
    type Error = EngineError;

    fn try_from(record: PatternRecord) -> Result<Self, Self::Error> {
        let weekday = |field: Option<u8>| {
            let index = field.ok_or_else(|| {
                EngineError::InvalidRecurrencePattern(format!(
                    "pattern '{}': day_of_week is required for {:?}",
                    record.id, record.frequency
                ))
            })?;
            weekday_from_index(index).ok_or_else(|| {
                EngineError::InvalidRecurrencePattern(format!(
                    "pattern '{}': day_of_week must be 0..=6, got {index}",
                    record.id
                ))
            })
        };

        let recurrence = match record.frequency {
            Frequency::Daily => Recurrence::Daily,
            Frequency::Weekly => Recurrence::Weekly {
                day_of_week: weekday(record.day_of_week)?,
            },
            Frequency::Biweekly => Recurrence::Biweekly {
                day_of_week: weekday(record.day_of_week)?,
            },
            Frequency::Monthly => {
                let day = record.day_of_month.ok_or_else(|| {
                    EngineError::InvalidRecurrencePattern(format!(
                        "pattern '{}': day_of_month is required for Monthly",
                        record.id
                    ))
                })?;
                let day_of_month = DayOfMonth::new(day).ok_or_else(|| {
                    EngineError::InvalidRecurrencePattern(format!(
                        "pattern '{}': day_of_month must be 1..=31, got {day}",
                        record.id
                    ))
                })?;
                Recurrence::Monthly { day_of_month }
            }
        };

        if let Some(end) = record.end_date {
            if end < record.start_date {
                return Err(EngineError::InvalidDateRange(format!(
                    "pattern '{}': end_date {end} is before start_date {}",
                    record.id, record.start_date
                )));
            }
        }

        Ok(Self {
            id: record.id,
            recurrence,
            time_of_day: record.time_of_day,
            start_date: record.start_date,
            end_date: record.end_date,
            max_occurrences: record.max_occurrences,
            last_generated_date: record.last_generated_date,
            occurrences_generated: record.occurrences_generated,
        })
    }
}

impl From<RecurrencePattern> for PatternRecord {
    fn from(pattern: RecurrencePattern) -> Self {
        let (day_of_week, day_of_month) = match pattern.recurrence {
            Recurrence::Daily => (None, None),
            Recurrence::Weekly { day_of_week } | Recurrence::Biweekly { day_of_week } => {
                (Some(weekday_index(day_of_week)), None)
            }
            Recurrence::Monthly { day_of_month } => (None, Some(day_of_month.get())),
        };
        Self {
            id: pattern.id,
            frequency: pattern.recurrence.frequency(),
            day_of_week,
            day_of_month,
            time_of_day: pattern.time_of_day,
            start_date: pattern.start_date,
            end_date: pattern.end_date,
            max_occurrences: pattern.max_occurrences,
            last_generated_date: pattern.last_generated_date,
            occurrences_generated: pattern.occurrences_generated,
        }
    }
}

/// Where a pattern is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PatternState {
    NotStarted,
    Advancing,
    Exhausted,
}

impl RecurrencePattern {
    /// A fresh pattern with no bounds and no watermark.
    pub fn new(
        id: impl Into<String>,
        recurrence: Recurrence,
        time_of_day: NaiveTime,
        start_date: NaiveDate,
    ) -> Self {
        Self {
            id: id.into(),
            recurrence,
            time_of_day,
            start_date,
            end_date: None,
            max_occurrences: None,
            last_generated_date: None,
            occurrences_generated: 0,
        }
    }

    /// Whether `max_occurrences` has been reached.
    pub fn count_exhausted(&self) -> bool {
        self.max_occurrences
            .is_some_and(|max| self.occurrences_generated >= max)
    }

    /// The next date this pattern would emit, ignoring any horizon.
    ///
    /// `None` once the pattern is exhausted.
    pub fn next_occurrence(&self) -> Result<Option<NaiveDate>, EngineError> {
        self.next_occurrence_with_limits(&ExpansionLimits::default())
    }

    pub fn next_occurrence_with_limits(
        &self,
        limits: &ExpansionLimits,
    ) -> Result<Option<NaiveDate>, EngineError> {
        if self.count_exhausted() {
            return Ok(None);
        }
        let mut stepper = Stepper::resume(self)?;
        let mut iterations = 0u32;
        while let Some(candidate) = stepper.next_candidate(self) {
            if self.end_date.is_some_and(|end| candidate.date > end) {
                return Ok(None);
            }
            if candidate.on_cycle && candidate.date >= self.start_date {
                return Ok(Some(candidate.date));
            }
            iterations += 1;
            if iterations > limits.max_iterations {
                return Err(self.limit_exceeded(limits));
            }
        }
        Ok(None)
    }

    /// Current lifecycle state.
    pub fn state(&self) -> Result<PatternState, EngineError> {
        if self.next_occurrence()?.is_none() {
            return Ok(PatternState::Exhausted);
        }
        Ok(match self.last_generated_date {
            None => PatternState::NotStarted,
            Some(_) => PatternState::Advancing,
        })
    }

    /// Apply a finished expansion: move the watermark forward and carry the
    /// running count. A watermark never moves backwards.
    pub fn advance(&mut self, expansion: &Expansion) {
        if let Some(watermark) = expansion.new_watermark {
            if self.last_generated_date.is_none_or(|current| watermark > current) {
                self.last_generated_date = Some(watermark);
            }
        }
        self.occurrences_generated = self.occurrences_generated.max(expansion.occurrences_generated);
    }

    fn limit_exceeded(&self, limits: &ExpansionLimits) -> EngineError {
        tracing::warn!(
            pattern_id = %self.id,
            limit = limits.max_iterations,
            "recurrence expansion hit the iteration ceiling"
        );
        EngineError::ExpansionLimitExceeded {
            pattern_id: self.id.clone(),
            limit: limits.max_iterations,
        }
    }
}

// ── Expansion ───────────────────────────────────────────────────────────────

/// Bounds on a single expansion run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExpansionLimits {
    /// Candidate steps (emitted or skipped) allowed before the run fails.
    pub max_iterations: u32,
}

impl Default for ExpansionLimits {
    fn default() -> Self {
        Self {
            max_iterations: DEFAULT_MAX_ITERATIONS,
        }
    }
}

/// One concrete booking date produced by a pattern.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GeneratedOccurrence {
    pub pattern_id: String,
    pub date: NaiveDate,
    /// `date` at the pattern's time of day.
    pub start: NaiveDateTime,
}

/// Result of one expansion run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Expansion {
    pub occurrences: Vec<GeneratedOccurrence>,
    /// Last emitted date, or the previous watermark when nothing was emitted.
    pub new_watermark: Option<NaiveDate>,
    /// Running total including earlier runs.
    pub occurrences_generated: u32,
}

/// Expand `pattern` through `generate_up_to` with the default iteration ceiling.
///
/// # Examples
///
/// ```
/// use booking_engine::recurrence::{expand, Recurrence, RecurrencePattern};
/// use chrono::{NaiveDate, NaiveTime, Weekday};
///
/// // 2026-03-16 is a Monday
/// let start = NaiveDate::from_ymd_opt(2026, 3, 16).unwrap();
/// let pattern = RecurrencePattern::new(
///     "standup",
///     Recurrence::Weekly { day_of_week: Weekday::Wed },
///     NaiveTime::from_hms_opt(14, 0, 0).unwrap(),
///     start,
/// );
/// let expansion = expand(&pattern, start + chrono::Duration::days(10)).unwrap();
/// assert_eq!(expansion.occurrences.len(), 1);
/// assert_eq!(expansion.occurrences[0].date, NaiveDate::from_ymd_opt(2026, 3, 18).unwrap());
/// ```
pub fn expand(
    pattern: &RecurrencePattern,
    generate_up_to: NaiveDate,
) -> Result<Expansion, EngineError> {
    expand_with_limits(pattern, generate_up_to, &ExpansionLimits::default())
}

/// Expand `pattern` through `generate_up_to`.
///
/// Resumes strictly after `last_generated_date`. The pattern is not mutated;
/// apply the result with [`RecurrencePattern::advance`] once the occurrences
/// have been persisted.
///
/// # Errors
///
/// Returns [`EngineError::ExpansionLimitExceeded`] when more than
/// `limits.max_iterations` candidates are needed to finish the run.
pub fn expand_with_limits(
    pattern: &RecurrencePattern,
    generate_up_to: NaiveDate,
    limits: &ExpansionLimits,
) -> Result<Expansion, EngineError> {
    let mut occurrences = Vec::new();
    let mut count = pattern.occurrences_generated;
    let mut stepper = Stepper::resume(pattern)?;
    let mut iterations = 0u32;

    loop {
        if pattern.max_occurrences.is_some_and(|max| count >= max) {
            break;
        }
        let Some(candidate) = stepper.next_candidate(pattern) else {
            break;
        };
        if candidate.date > generate_up_to || pattern.end_date.is_some_and(|end| candidate.date > end) {
            break;
        }

        iterations += 1;
        if iterations > limits.max_iterations {
            return Err(pattern.limit_exceeded(limits));
        }

        if !candidate.on_cycle || candidate.date < pattern.start_date {
            continue;
        }
        occurrences.push(GeneratedOccurrence {
            pattern_id: pattern.id.clone(),
            date: candidate.date,
            start: candidate.date.and_time(pattern.time_of_day),
        });
        count += 1;
    }

    let new_watermark = occurrences
        .last()
        .map(|occurrence| occurrence.date)
        .or(pattern.last_generated_date);

    tracing::debug!(
        pattern_id = %pattern.id,
        %generate_up_to,
        emitted = occurrences.len(),
        iterations,
        "expanded recurrence pattern"
    );

    Ok(Expansion {
        occurrences,
        new_watermark,
        occurrences_generated: count,
    })
}

// ── Internal stepping ───────────────────────────────────────────────────────

/// A date the stepper reached. Off-cycle biweekly weeks are reported so the
/// caller can count them against the iteration ceiling.
struct Candidate {
    date: NaiveDate,
    on_cycle: bool,
}

/// Cursor over candidate dates, positioned on the last consumed one.
enum Stepper {
    /// Daily, weekly, and biweekly patterns advance from a date.
    Day(NaiveDate),
    /// Monthly patterns advance from a month, so clamping never shifts the
    /// anchor day.
    Month { year: i32, month: u32 },
}

impl Stepper {
    /// Position the cursor just before the next candidate.
    ///
    /// A watermark before `start_date` (the pattern was edited after it ran)
    /// is ignored and generation restarts from `start_date`.
    fn resume(pattern: &RecurrencePattern) -> Result<Self, EngineError> {
        let watermark = pattern
            .last_generated_date
            .filter(|date| *date >= pattern.start_date);

        Ok(match (pattern.recurrence, watermark) {
            (Recurrence::Monthly { day_of_month }, Some(date)) => {
                // A reset watermark may sit before its own month's occurrence
                let anchor = u32::from(day_of_month.get())
                    .min(days_in_month(date.year(), date.month()));
                let (year, month) = if date.day() < anchor {
                    previous_month(date.year(), date.month())
                } else {
                    (date.year(), date.month())
                };
                Stepper::Month { year, month }
            }
            (Recurrence::Monthly { .. }, None) => {
                let (year, month) =
                    previous_month(pattern.start_date.year(), pattern.start_date.month());
                Stepper::Month { year, month }
            }
            (_, Some(date)) => Stepper::Day(date),
            (_, None) => Stepper::Day(add_days(pattern.start_date, -1).ok_or_else(|| {
                EngineError::InvalidDateRange(format!(
                    "pattern '{}': start_date {} is at the edge of the calendar",
                    pattern.id, pattern.start_date
                ))
            })?),
        })
    }

    /// Advance to the next candidate. `None` only on calendar overflow.
    fn next_candidate(&mut self, pattern: &RecurrencePattern) -> Option<Candidate> {
        match (self, pattern.recurrence) {
            (Stepper::Day(cursor), Recurrence::Daily) => {
                *cursor = add_days(*cursor, 1)?;
                Some(Candidate {
                    date: *cursor,
                    on_cycle: true,
                })
            }
            (Stepper::Day(cursor), Recurrence::Weekly { day_of_week }) => {
                *cursor = next_weekday_after(*cursor, day_of_week)?;
                Some(Candidate {
                    date: *cursor,
                    on_cycle: true,
                })
            }
            (Stepper::Day(cursor), Recurrence::Biweekly { day_of_week }) => {
                *cursor = next_weekday_after(*cursor, day_of_week)?;
                let weeks = (*cursor - pattern.start_date).num_days().div_euclid(7);
                Some(Candidate {
                    date: *cursor,
                    on_cycle: weeks.rem_euclid(2) == 0,
                })
            }
            (Stepper::Month { year, month }, Recurrence::Monthly { day_of_month }) => {
                let (next_year, next_month) = next_month(*year, *month);
                *year = next_year;
                *month = next_month;
                let date = clamped_day(next_year, next_month, u32::from(day_of_month.get()))?;
                Some(Candidate {
                    date,
                    on_cycle: true,
                })
            }
            // `resume` pairs monthly patterns with month cursors only.
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn two_pm() -> NaiveTime {
        NaiveTime::from_hms_opt(14, 0, 0).unwrap()
    }

    fn dates(expansion: &Expansion) -> Vec<NaiveDate> {
        expansion.occurrences.iter().map(|o| o.date).collect()
    }

    fn record(frequency: Frequency) -> PatternRecord {
        PatternRecord {
            id: "p1".to_string(),
            frequency,
            day_of_week: None,
            day_of_month: None,
            time_of_day: two_pm(),
            start_date: date(2026, 3, 16),
            end_date: None,
            max_occurrences: None,
            last_generated_date: None,
            occurrences_generated: 0,
        }
    }

    // ── validation ──────────────────────────────────────────────────────

    #[test]
    fn weekly_requires_day_of_week() {
        let result = RecurrencePattern::try_from(record(Frequency::Weekly));
        assert!(matches!(result, Err(EngineError::InvalidRecurrencePattern(_))));

        let result = RecurrencePattern::try_from(record(Frequency::Biweekly));
        assert!(matches!(result, Err(EngineError::InvalidRecurrencePattern(_))));
    }

    #[test]
    fn monthly_requires_day_of_month() {
        let result = RecurrencePattern::try_from(record(Frequency::Monthly));
        assert!(matches!(result, Err(EngineError::InvalidRecurrencePattern(_))));
    }

    #[test]
    fn out_of_range_fields_are_rejected() {
        let mut weekly = record(Frequency::Weekly);
        weekly.day_of_week = Some(7);
        assert!(RecurrencePattern::try_from(weekly).is_err());

        let mut monthly = record(Frequency::Monthly);
        monthly.day_of_month = Some(0);
        assert!(RecurrencePattern::try_from(monthly).is_err());
    }

    #[test]
    fn end_before_start_is_an_invalid_range() {
        let mut daily = record(Frequency::Daily);
        daily.end_date = Some(date(2026, 3, 1));
        assert!(matches!(
            RecurrencePattern::try_from(daily),
            Err(EngineError::InvalidDateRange(_))
        ));
    }

    #[test]
    fn record_conversion_maps_sunday_to_zero() {
        let mut weekly = record(Frequency::Weekly);
        weekly.day_of_week = Some(0);
        let pattern = RecurrencePattern::try_from(weekly.clone()).unwrap();
        assert_eq!(
            pattern.recurrence,
            Recurrence::Weekly {
                day_of_week: Weekday::Sun
            }
        );
        assert_eq!(PatternRecord::from(pattern), weekly);
    }

    // ── frequencies ─────────────────────────────────────────────────────

    #[test]
    fn daily_starts_on_start_date() {
        let pattern = RecurrencePattern::new("d", Recurrence::Daily, two_pm(), date(2026, 3, 16));
        let expansion = expand(&pattern, date(2026, 3, 18)).unwrap();
        assert_eq!(
            dates(&expansion),
            vec![date(2026, 3, 16), date(2026, 3, 17), date(2026, 3, 18)]
        );
        assert_eq!(
            expansion.occurrences[0].start,
            date(2026, 3, 16).and_time(two_pm())
        );
    }

    #[test]
    fn weekly_on_start_weekday_includes_start_date() {
        let pattern = RecurrencePattern::new(
            "w",
            Recurrence::Weekly {
                day_of_week: Weekday::Mon,
            },
            two_pm(),
            date(2026, 3, 16),
        );
        let expansion = expand(&pattern, date(2026, 3, 31)).unwrap();
        assert_eq!(
            dates(&expansion),
            vec![date(2026, 3, 16), date(2026, 3, 23), date(2026, 3, 30)]
        );
    }

    #[test]
    fn biweekly_parity_is_anchored_on_start_date() {
        // Start Monday 2026-03-16, meet on Sundays: first Sunday is in week 0
        let pattern = RecurrencePattern::new(
            "b",
            Recurrence::Biweekly {
                day_of_week: Weekday::Sun,
            },
            two_pm(),
            date(2026, 3, 16),
        );
        let expansion = expand(&pattern, date(2026, 4, 30)).unwrap();
        assert_eq!(
            dates(&expansion),
            vec![date(2026, 3, 22), date(2026, 4, 5), date(2026, 4, 19)]
        );
    }

    #[test]
    fn monthly_clamps_without_moving_anchor() {
        let pattern = RecurrencePattern::new(
            "m",
            Recurrence::Monthly {
                day_of_month: DayOfMonth::new(31).unwrap(),
            },
            two_pm(),
            date(2026, 1, 1),
        );
        let expansion = expand(&pattern, date(2026, 5, 31)).unwrap();
        assert_eq!(
            dates(&expansion),
            vec![
                date(2026, 1, 31),
                date(2026, 2, 28),
                date(2026, 3, 31),
                date(2026, 4, 30),
                date(2026, 5, 31),
            ]
        );
    }

    #[test]
    fn monthly_skips_day_before_start_in_first_month() {
        let pattern = RecurrencePattern::new(
            "m",
            Recurrence::Monthly {
                day_of_month: DayOfMonth::new(5).unwrap(),
            },
            two_pm(),
            date(2026, 3, 16),
        );
        let expansion = expand(&pattern, date(2026, 5, 31)).unwrap();
        assert_eq!(dates(&expansion), vec![date(2026, 4, 5), date(2026, 5, 5)]);
        assert_eq!(expansion.new_watermark, Some(date(2026, 5, 5)));
    }

    // ── bounds ──────────────────────────────────────────────────────────

    #[test]
    fn end_date_is_inclusive() {
        let mut pattern =
            RecurrencePattern::new("d", Recurrence::Daily, two_pm(), date(2026, 3, 16));
        pattern.end_date = Some(date(2026, 3, 17));
        let expansion = expand(&pattern, date(2026, 12, 31)).unwrap();
        assert_eq!(dates(&expansion), vec![date(2026, 3, 16), date(2026, 3, 17)]);
    }

    #[test]
    fn max_occurrences_counts_earlier_runs() {
        let mut pattern =
            RecurrencePattern::new("d", Recurrence::Daily, two_pm(), date(2026, 3, 16));
        pattern.max_occurrences = Some(5);

        let first = expand(&pattern, date(2026, 3, 18)).unwrap();
        assert_eq!(first.occurrences.len(), 3);
        pattern.advance(&first);

        let second = expand(&pattern, date(2026, 12, 31)).unwrap();
        assert_eq!(dates(&second), vec![date(2026, 3, 19), date(2026, 3, 20)]);
        assert_eq!(second.occurrences_generated, 5);
        pattern.advance(&second);

        assert_eq!(pattern.state().unwrap(), PatternState::Exhausted);
        assert!(expand(&pattern, date(2027, 1, 1)).unwrap().occurrences.is_empty());
    }

    #[test]
    fn horizon_before_start_yields_nothing() {
        let pattern = RecurrencePattern::new("d", Recurrence::Daily, two_pm(), date(2026, 3, 16));
        let expansion = expand(&pattern, date(2026, 3, 1)).unwrap();
        assert!(expansion.occurrences.is_empty());
        assert_eq!(expansion.new_watermark, None);
    }

    #[test]
    fn iteration_ceiling_surfaces_as_error() {
        let pattern = RecurrencePattern::new("d", Recurrence::Daily, two_pm(), date(2026, 1, 1));
        let limits = ExpansionLimits { max_iterations: 10 };
        let result = expand_with_limits(&pattern, date(2026, 12, 31), &limits);
        assert!(matches!(
            result,
            Err(EngineError::ExpansionLimitExceeded { limit: 10, .. })
        ));
    }

    #[test]
    fn ceiling_allows_exactly_max_iterations() {
        let pattern = RecurrencePattern::new("d", Recurrence::Daily, two_pm(), date(2026, 1, 1));
        let limits = ExpansionLimits { max_iterations: 10 };
        let expansion = expand_with_limits(&pattern, date(2026, 1, 10), &limits).unwrap();
        assert_eq!(expansion.occurrences.len(), 10);
    }

    // ── watermark and lifecycle ─────────────────────────────────────────

    #[test]
    fn resumes_strictly_after_watermark() {
        let mut pattern =
            RecurrencePattern::new("d", Recurrence::Daily, two_pm(), date(2026, 3, 16));
        pattern.last_generated_date = Some(date(2026, 3, 17));
        let expansion = expand(&pattern, date(2026, 3, 19)).unwrap();
        assert_eq!(dates(&expansion), vec![date(2026, 3, 18), date(2026, 3, 19)]);
    }

    #[test]
    fn monthly_resumes_within_watermark_month() {
        let mut pattern = RecurrencePattern::new(
            "m",
            Recurrence::Monthly {
                day_of_month: DayOfMonth::new(15).unwrap(),
            },
            two_pm(),
            date(2026, 1, 1),
        );
        pattern.last_generated_date = Some(date(2026, 3, 5));
        let expansion = expand(&pattern, date(2026, 4, 30)).unwrap();
        assert_eq!(dates(&expansion), vec![date(2026, 3, 15), date(2026, 4, 15)]);
    }

    #[test]
    fn monthly_watermark_on_clamped_day_does_not_repeat() {
        let mut pattern = RecurrencePattern::new(
            "m",
            Recurrence::Monthly {
                day_of_month: DayOfMonth::new(31).unwrap(),
            },
            two_pm(),
            date(2026, 1, 1),
        );
        pattern.last_generated_date = Some(date(2026, 2, 28));
        let expansion = expand(&pattern, date(2026, 3, 31)).unwrap();
        assert_eq!(dates(&expansion), vec![date(2026, 3, 31)]);
    }

    #[test]
    fn watermark_before_start_is_ignored() {
        let mut pattern =
            RecurrencePattern::new("d", Recurrence::Daily, two_pm(), date(2026, 3, 16));
        pattern.last_generated_date = Some(date(2025, 1, 1));
        let expansion = expand(&pattern, date(2026, 3, 16)).unwrap();
        assert_eq!(dates(&expansion), vec![date(2026, 3, 16)]);
    }

    #[test]
    fn empty_run_keeps_previous_watermark() {
        let mut pattern =
            RecurrencePattern::new("d", Recurrence::Daily, two_pm(), date(2026, 3, 16));
        pattern.last_generated_date = Some(date(2026, 3, 20));
        let expansion = expand(&pattern, date(2026, 3, 20)).unwrap();
        assert!(expansion.occurrences.is_empty());
        assert_eq!(expansion.new_watermark, Some(date(2026, 3, 20)));
    }

    #[test]
    fn lifecycle_states() {
        let mut pattern =
            RecurrencePattern::new("d", Recurrence::Daily, two_pm(), date(2026, 3, 16));
        pattern.end_date = Some(date(2026, 3, 18));
        assert_eq!(pattern.state().unwrap(), PatternState::NotStarted);

        let first = expand(&pattern, date(2026, 3, 16)).unwrap();
        pattern.advance(&first);
        assert_eq!(pattern.state().unwrap(), PatternState::Advancing);

        let rest = expand(&pattern, date(2026, 12, 31)).unwrap();
        pattern.advance(&rest);
        assert_eq!(pattern.last_generated_date, Some(date(2026, 3, 18)));
        assert_eq!(pattern.state().unwrap(), PatternState::Exhausted);
    }

    #[test]
    fn advance_never_moves_watermark_backwards() {
        let mut pattern =
            RecurrencePattern::new("d", Recurrence::Daily, two_pm(), date(2026, 3, 16));
        pattern.last_generated_date = Some(date(2026, 3, 20));
        let stale = Expansion {
            occurrences: Vec::new(),
            new_watermark: Some(date(2026, 3, 18)),
            occurrences_generated: 0,
        };
        pattern.advance(&stale);
        assert_eq!(pattern.last_generated_date, Some(date(2026, 3, 20)));
    }

    #[test]
    fn next_occurrence_ignores_horizon() {
        let pattern = RecurrencePattern::new(
            "m",
            Recurrence::Monthly {
                day_of_month: DayOfMonth::new(1).unwrap(),
            },
            two_pm(),
            date(2026, 3, 16),
        );
        assert_eq!(pattern.next_occurrence().unwrap(), Some(date(2026, 4, 1)));
    }

    #[test]
    fn pattern_round_trips_through_json_record() {
        let json = r#"{
            "id": "p9",
            "frequency": "biweekly",
            "day_of_week": 3,
            "time_of_day": "2:00 PM",
            "start_date": "2026-03-16"
        }"#;
        let pattern: RecurrencePattern = serde_json::from_str(json).unwrap();
        assert_eq!(
            pattern.recurrence,
            Recurrence::Biweekly {
                day_of_week: Weekday::Wed
            }
        );
        assert_eq!(pattern.time_of_day, two_pm());

        let value = serde_json::to_value(&pattern).unwrap();
        assert_eq!(value["time_of_day"], "14:00");
        assert_eq!(value["day_of_week"], 3);
    }

    #[test]
    fn json_missing_required_field_fails() {
        let json = r#"{
            "id": "p9",
            "frequency": "monthly",
            "time_of_day": "09:00",
            "start_date": "2026-03-16"
        }"#;
        let err = serde_json::from_str::<RecurrencePattern>(json).unwrap_err();
        assert!(err.to_string().contains("day_of_month"));
    }
}
