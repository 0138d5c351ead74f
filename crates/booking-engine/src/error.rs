//! Error types for booking-engine operations.
//!
//! "No availability" and "slot conflict" are ordinary business states and are
//! returned as data (empty sequences, [`ConflictResult`](crate::ConflictResult)),
//! never as errors.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum EngineError {
    #[error("Invalid date range: {0}")]
    InvalidDateRange(String),

    #[error("Invalid time of day: {0}")]
    InvalidTimeOfDay(String),

    #[error("Invalid duration: {0}")]
    InvalidDuration(String),

    #[error("Invalid recurrence pattern: {0}")]
    InvalidRecurrencePattern(String),

    #[error("Expansion of pattern '{pattern_id}' exceeded {limit} iterations")]
    ExpansionLimitExceeded { pattern_id: String, limit: u32 },

    #[error("Booking store error: {0}")]
    Store(#[source] Box<dyn std::error::Error + Send + Sync>),
}

pub type Result<T> = std::result::Result<T, EngineError>;
