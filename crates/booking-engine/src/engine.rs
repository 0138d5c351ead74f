//! Host-facing call contracts and the persistence seam.
//!
//! The pure entry points [`compute_slots`], [`validate_and_suggest`] and
//! [`run_expansion`] work on snapshots the host has already fetched.
//! [`Scheduler`] wires them to a [`BookingStore`] for hosts that want the
//! engine to drive the reads and the expansion protocol itself.
//!
//! # Concurrency
//!
//! Everything here is synchronous and holds no shared mutable state. The
//! engine only guarantees correctness against the snapshot it read; the store
//! must make "verify no conflict, then insert" atomic, and must serialize
//! expansion runs per pattern (see [`BookingStore::lock_pattern`]).

use chrono::{Duration, NaiveDate, NaiveDateTime, NaiveTime};
use serde::{Deserialize, Serialize};

use crate::availability::{hours_for, WeeklyAvailability};
use crate::config::EngineConfig;
use crate::conflict::{check_conflict, ConflictReason, ConflictResult};
use crate::error::EngineError;
use crate::recurrence::{expand_with_limits, Expansion, GeneratedOccurrence, RecurrencePattern};
use crate::slots::{filter_advance_notice, generate_slots_with_options, BusyInterval, TimeSlot};

// ── Pure call contracts ─────────────────────────────────────────────────────

/// Open slots for `date`: resolve the weekday's hours, then generate.
///
/// A business without configured availability has no slots. Advance notice
/// is not applied here; compose with [`filter_advance_notice`].
pub fn compute_slots(
    config: &EngineConfig,
    availability: Option<&WeeklyAvailability>,
    date: NaiveDate,
    duration_minutes: u32,
    busy: &[BusyInterval],
) -> Result<Vec<TimeSlot>, EngineError> {
    let hours = hours_for(availability, date);
    generate_slots_with_options(date, &hours, duration_minutes, busy, &config.slots)
}

/// Re-check a chosen start against a fresh busy snapshot.
pub fn validate_and_suggest(
    config: &EngineConfig,
    availability: Option<&WeeklyAvailability>,
    start: NaiveDateTime,
    duration_minutes: u32,
    busy: &[BusyInterval],
) -> Result<ConflictResult, EngineError> {
    let hours = hours_for(availability, start.date());
    check_conflict(
        start,
        duration_minutes,
        busy,
        &hours,
        &config.slots,
        &config.conflict,
    )
}

/// Expand a pattern up to `up_to` under the configured iteration ceiling.
///
/// The caller persists each occurrence (after its own conflict check) and
/// commits [`Expansion::new_watermark`] in the same transaction.
pub fn run_expansion(
    config: &EngineConfig,
    pattern: &RecurrencePattern,
    up_to: NaiveDate,
) -> Result<Expansion, EngineError> {
    expand_with_limits(pattern, up_to, &config.expansion)
}

// ── Persistence seam ────────────────────────────────────────────────────────

/// Which bookings count as busy for a read.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BusyQuery {
    pub business_id: String,
    /// `None` means every location of the business.
    pub location_id: Option<String>,
    pub from: NaiveDateTime,
    pub to: NaiveDateTime,
}

/// A booking the engine asks the store to create.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewBooking {
    pub business_id: String,
    pub location_id: Option<String>,
    pub pattern_id: Option<String>,
    pub start: NaiveDateTime,
    pub duration_minutes: u32,
}

/// Everything one expansion run persists, as a single unit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExpansionCommit {
    pub pattern_id: String,
    pub bookings: Vec<NewBooking>,
    pub watermark: Option<NaiveDate>,
    pub occurrences_generated: u32,
}

/// Host-provided persistence.
///
/// Implementations own atomicity: reads return non-cancelled bookings only,
/// and [`commit_expansion`](Self::commit_expansion) must write the bookings,
/// the watermark, and the count together (or not at all).
pub trait BookingStore {
    type Error: std::error::Error + Send + Sync + 'static;

    /// Weekly hours for a business; `None` when never configured.
    fn weekly_availability(
        &self,
        business_id: &str,
    ) -> Result<Option<WeeklyAvailability>, Self::Error>;

    /// Non-cancelled bookings intersecting the query window.
    fn busy_intervals(&self, query: &BusyQuery) -> Result<Vec<BusyInterval>, Self::Error>;

    /// Take the single-writer lock for a pattern and return its current state.
    fn lock_pattern(&self, pattern_id: &str) -> Result<RecurrencePattern, Self::Error>;

    /// Persist one run's bookings and watermark atomically, releasing the lock.
    fn commit_expansion(&self, commit: &ExpansionCommit) -> Result<(), Self::Error>;

    /// Release the lock without writing anything.
    fn release_pattern(&self, pattern_id: &str) -> Result<(), Self::Error>;
}

// ── Scheduler ───────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SlotRequest {
    pub business_id: String,
    pub location_id: Option<String>,
    pub date: NaiveDate,
    pub duration_minutes: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BookingRequest {
    pub business_id: String,
    pub location_id: Option<String>,
    pub start: NaiveDateTime,
    pub duration_minutes: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MaterializeRequest {
    pub business_id: String,
    pub location_id: Option<String>,
    pub pattern_id: String,
    pub duration_minutes: u32,
    pub up_to: NaiveDate,
}

/// An occurrence that could not be booked.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SkippedOccurrence {
    pub occurrence: GeneratedOccurrence,
    pub reason: Option<ConflictReason>,
    pub alternatives: Vec<TimeSlot>,
}

/// Outcome of [`Scheduler::materialize_pattern`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MaterializeReport {
    pub pattern_id: String,
    pub booked: Vec<GeneratedOccurrence>,
    pub skipped: Vec<SkippedOccurrence>,
    pub new_watermark: Option<NaiveDate>,
    pub occurrences_generated: u32,
}

/// Drives the pure contracts against a [`BookingStore`].
#[derive(Debug)]
pub struct Scheduler<S> {
    store: S,
    config: EngineConfig,
}

impl<S: BookingStore> Scheduler<S> {
    pub fn new(store: S, config: EngineConfig) -> Self {
        Self { store, config }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Bookable slots for a day, with advance notice relative to `now`.
    pub fn available_slots(
        &self,
        request: &SlotRequest,
        now: NaiveDateTime,
    ) -> Result<Vec<TimeSlot>, EngineError> {
        let availability = self
            .store
            .weekly_availability(&request.business_id)
            .map_err(store_error)?;
        let busy = self.busy_on(&request.business_id, request.location_id.as_deref(), request.date)?;

        let slots = compute_slots(
            &self.config,
            availability.as_ref(),
            request.date,
            request.duration_minutes,
            &busy,
        )?;
        Ok(filter_advance_notice(
            slots,
            now,
            self.config.advance_notice_minutes,
        ))
    }

    /// Re-validate a chosen start against a fresh read of the store.
    pub fn validate_booking(&self, request: &BookingRequest) -> Result<ConflictResult, EngineError> {
        let availability = self
            .store
            .weekly_availability(&request.business_id)
            .map_err(store_error)?;
        let busy = self.busy_on(
            &request.business_id,
            request.location_id.as_deref(),
            request.start.date(),
        )?;
        validate_and_suggest(
            &self.config,
            availability.as_ref(),
            request.start,
            request.duration_minutes,
            &busy,
        )
    }

    /// Lock a pattern, expand it, conflict-check every occurrence against a
    /// fresh read, and commit the bookable ones together with the watermark.
    ///
    /// Conflicting occurrences are reported in
    /// [`MaterializeReport::skipped`]; the watermark still moves past them,
    /// so they are not retried by the next run. Any failure before the
    /// commit releases the lock and leaves the pattern untouched.
    pub fn materialize_pattern(
        &self,
        request: &MaterializeRequest,
    ) -> Result<MaterializeReport, EngineError> {
        let pattern = self
            .store
            .lock_pattern(&request.pattern_id)
            .map_err(store_error)?;

        let outcome = self
            .plan_expansion(&pattern, request)
            .and_then(|(commit, report)| {
                self.store
                    .commit_expansion(&commit)
                    .map_err(store_error)
                    .map(|()| report)
            });

        match outcome {
            Ok(report) => {
                tracing::info!(
                    pattern_id = %report.pattern_id,
                    booked = report.booked.len(),
                    skipped = report.skipped.len(),
                    watermark = ?report.new_watermark,
                    "materialized recurrence pattern"
                );
                Ok(report)
            }
            Err(err) => {
                if let Err(release_err) = self.store.release_pattern(&request.pattern_id) {
                    tracing::warn!(
                        pattern_id = %request.pattern_id,
                        error = %release_err,
                        "failed to release pattern lock"
                    );
                }
                Err(err)
            }
        }
    }

    fn plan_expansion(
        &self,
        pattern: &RecurrencePattern,
        request: &MaterializeRequest,
    ) -> Result<(ExpansionCommit, MaterializeReport), EngineError> {
        let expansion = run_expansion(&self.config, pattern, request.up_to)?;
        let availability = self
            .store
            .weekly_availability(&request.business_id)
            .map_err(store_error)?;

        let mut accepted: Vec<BusyInterval> = Vec::new();
        let mut booked = Vec::new();
        let mut skipped = Vec::new();

        for occurrence in expansion.occurrences {
            let mut busy = self.busy_on(
                &request.business_id,
                request.location_id.as_deref(),
                occurrence.date,
            )?;
            busy.extend(accepted.iter().copied());

            let result = validate_and_suggest(
                &self.config,
                availability.as_ref(),
                occurrence.start,
                request.duration_minutes,
                &busy,
            )?;

            if result.has_conflict {
                tracing::warn!(
                    pattern_id = %pattern.id,
                    start = %occurrence.start,
                    reason = ?result.reason,
                    "skipping conflicting occurrence"
                );
                skipped.push(SkippedOccurrence {
                    occurrence,
                    reason: result.reason,
                    alternatives: result.alternatives,
                });
            } else {
                let slot = TimeSlot::new(occurrence.start, request.duration_minutes);
                accepted.push(BusyInterval {
                    start: slot.start,
                    end: slot.end(),
                });
                booked.push(occurrence);
            }
        }

        let commit = ExpansionCommit {
            pattern_id: pattern.id.clone(),
            bookings: booked
                .iter()
                .map(|occurrence| NewBooking {
                    business_id: request.business_id.clone(),
                    location_id: request.location_id.clone(),
                    pattern_id: Some(pattern.id.clone()),
                    start: occurrence.start,
                    duration_minutes: request.duration_minutes,
                })
                .collect(),
            watermark: expansion.new_watermark,
            occurrences_generated: expansion.occurrences_generated,
        };
        let report = MaterializeReport {
            pattern_id: pattern.id.clone(),
            booked,
            skipped,
            new_watermark: expansion.new_watermark,
            occurrences_generated: expansion.occurrences_generated,
        };
        Ok((commit, report))
    }

    /// Busy intervals that can affect slots on `date`, widened by the buffer.
    fn busy_on(
        &self,
        business_id: &str,
        location_id: Option<&str>,
        date: NaiveDate,
    ) -> Result<Vec<BusyInterval>, EngineError> {
        let buffer = Duration::minutes(i64::from(self.config.slots.buffer_minutes));
        let day_start = date.and_time(NaiveTime::MIN);
        let query = BusyQuery {
            business_id: business_id.to_string(),
            location_id: location_id.map(str::to_string),
            from: day_start - buffer,
            to: day_start + Duration::days(1) + buffer,
        };
        self.store.busy_intervals(&query).map_err(store_error)
    }
}

fn store_error<E>(err: E) -> EngineError
where
    E: std::error::Error + Send + Sync + 'static,
{
    EngineError::Store(Box::new(err))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Weekday;

    use crate::availability::DayHours;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn weekdays() -> WeeklyAvailability {
        WeeklyAvailability::uniform(
            DayHours::open(
                NaiveTime::from_hms_opt(9, 0, 0).unwrap(),
                NaiveTime::from_hms_opt(17, 0, 0).unwrap(),
            ),
            &[Weekday::Mon, Weekday::Tue, Weekday::Wed, Weekday::Thu, Weekday::Fri],
        )
    }

    #[test]
    fn compute_slots_without_availability_is_empty() {
        let slots = compute_slots(&EngineConfig::default(), None, date(2026, 3, 16), 30, &[]).unwrap();
        assert!(slots.is_empty());
    }

    #[test]
    fn compute_slots_on_weekend_is_empty() {
        let weekly = weekdays();
        let slots =
            compute_slots(&EngineConfig::default(), Some(&weekly), date(2026, 3, 21), 30, &[]).unwrap();
        assert!(slots.is_empty());
    }

    #[test]
    fn compute_slots_uses_configured_buffer() {
        let mut config = EngineConfig::default();
        config.slots.buffer_minutes = 10;
        let day = date(2026, 3, 16);
        let busy = [BusyInterval::new(
            day.and_hms_opt(10, 0, 0).unwrap(),
            day.and_hms_opt(10, 30, 0).unwrap(),
        )
        .unwrap()];
        let slots = compute_slots(&config, Some(&weekdays()), day, 30, &busy).unwrap();
        // [09:50, 10:40) blocks 09:30, 10:00 and 10:30 on the 30-minute grid
        assert_eq!(slots[1].start, day.and_hms_opt(11, 0, 0).unwrap());
    }

    #[test]
    fn validate_and_suggest_resolves_hours_from_start_date() {
        let saturday = date(2026, 3, 21).and_hms_opt(10, 0, 0).unwrap();
        let result =
            validate_and_suggest(&EngineConfig::default(), Some(&weekdays()), saturday, 30, &[])
                .unwrap();
        assert_eq!(result.reason, Some(ConflictReason::OutsideOpenHours));
    }

    #[test]
    fn run_expansion_honors_configured_ceiling() {
        let mut config = EngineConfig::default();
        config.expansion.max_iterations = 5;
        let pattern = RecurrencePattern::new(
            "p",
            crate::recurrence::Recurrence::Daily,
            NaiveTime::from_hms_opt(9, 0, 0).unwrap(),
            date(2026, 3, 16),
        );
        let result = run_expansion(&config, &pattern, date(2026, 4, 30));
        assert!(matches!(
            result,
            Err(EngineError::ExpansionLimitExceeded { limit: 5, .. })
        ));
    }
}
