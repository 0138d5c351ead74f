//! # booking-engine
//!
//! Deterministic appointment scheduling.
//!
//! Given a business's weekly hours, a service duration, and the bookings
//! already on the calendar, the engine computes the slots a customer may book,
//! re-validates a chosen slot against a fresh snapshot (suggesting ranked
//! alternatives on conflict), and expands recurring-booking patterns into
//! concrete occurrences without duplicates or gaps.
//!
//! All instants are wall-clock values in a single reference timezone that the
//! caller normalizes to before calling in. Nothing here reads the system
//! clock or touches I/O except through a host-provided [`BookingStore`].
//!
//! ## Modules
//!
//! - [`calendar`] — Immutable date arithmetic and the fixed time-of-day formats
//! - [`availability`] — Weekly hours and the per-date resolver
//! - [`slots`] — Bookable slot generation and advance-notice filtering
//! - [`conflict`] — Conflict detection with ranked alternatives
//! - [`recurrence`] — Resumable recurring-booking expansion
//! - [`engine`] — Host call contracts, the store seam, and the scheduler
//! - [`config`] — Policy knobs
//! - [`error`] — Error types

pub mod availability;
pub mod calendar;
pub mod config;
pub mod conflict;
pub mod engine;
pub mod error;
pub mod recurrence;
pub mod slots;

pub use availability::{hours_for, DayHours, WeeklyAvailability};
pub use config::EngineConfig;
pub use conflict::{check_conflict, ConflictOptions, ConflictReason, ConflictResult};
pub use engine::{
    compute_slots, run_expansion, validate_and_suggest, BookingRequest, BookingStore, BusyQuery,
    ExpansionCommit, MaterializeReport, MaterializeRequest, NewBooking, Scheduler,
    SkippedOccurrence, SlotRequest,
};
pub use error::EngineError;
pub use recurrence::{
    expand, expand_with_limits, DayOfMonth, Expansion, ExpansionLimits, Frequency,
    GeneratedOccurrence, PatternRecord, PatternState, Recurrence, RecurrencePattern,
};
pub use slots::{
    filter_advance_notice, generate_slots, generate_slots_with_options, BusyInterval, SlotOptions,
    TimeSlot,
};
