//! Side-effect-free calendar arithmetic.
//!
//! Every helper takes immutable `chrono` values and returns new ones; nothing
//! here reads the system clock. All instants are wall-clock values in the
//! single reference timezone the caller has already normalized to.
//!
//! # Time-of-day formats
//!
//! Exactly two formats are accepted:
//!
//! - `"HH:mm"` — 24-hour, e.g. `"09:00"`, `"17:30"`
//! - `"h:mm a"` — 12-hour with an AM/PM marker, e.g. `"2:30 PM"`, `"12:00am"`
//!
//! # Weekday numbering
//!
//! Hosts number weekdays 0 = Sunday through 6 = Saturday.
//! [`weekday_from_index`] and [`weekday_index`] convert at that boundary.

use chrono::{Datelike, Duration, NaiveDate, NaiveTime, Weekday};

use crate::error::EngineError;

/// Parse a time of day in `"HH:mm"` or `"h:mm a"` form.
///
/// # Errors
///
/// Returns [`EngineError::InvalidTimeOfDay`] for any other shape, including
/// bare hours (`"2pm"`), seconds (`"14:00:00"`), or out-of-range fields.
///
/// # Examples
///
/// ```
/// use booking_engine::calendar::parse_time_of_day;
/// use chrono::NaiveTime;
///
/// assert_eq!(parse_time_of_day("14:00").unwrap(), NaiveTime::from_hms_opt(14, 0, 0).unwrap());
/// assert_eq!(parse_time_of_day("2:30 PM").unwrap(), NaiveTime::from_hms_opt(14, 30, 0).unwrap());
/// assert!(parse_time_of_day("noon").is_err());
/// ```
pub fn parse_time_of_day(s: &str) -> Result<NaiveTime, EngineError> {
    let trimmed = s.trim();
    parse_24_hour(trimmed)
        .or_else(|| parse_12_hour(trimmed))
        .ok_or_else(|| EngineError::InvalidTimeOfDay(format!("'{s}': expected HH:mm or h:mm a")))
}

/// Format a time of day as `"HH:mm"`.
pub fn format_time_of_day(time: NaiveTime) -> String {
    time.format("%H:%M").to_string()
}

/// Map a host weekday index (0 = Sunday) to a [`Weekday`].
pub fn weekday_from_index(index: u8) -> Option<Weekday> {
    match index {
        0 => Some(Weekday::Sun),
        1 => Some(Weekday::Mon),
        2 => Some(Weekday::Tue),
        3 => Some(Weekday::Wed),
        4 => Some(Weekday::Thu),
        5 => Some(Weekday::Fri),
        6 => Some(Weekday::Sat),
        _ => None,
    }
}

/// Map a [`Weekday`] to the host index (0 = Sunday).
pub fn weekday_index(weekday: Weekday) -> u8 {
    weekday.num_days_from_sunday() as u8
}

/// Shift a date by a signed number of days. `None` on calendar overflow.
pub fn add_days(date: NaiveDate, days: i64) -> Option<NaiveDate> {
    date.checked_add_signed(Duration::try_days(days)?)
}

/// First date strictly after `date` that falls on `weekday`.
///
/// When `date` itself is a `weekday`, the result is a full week later, so the
/// same calendar date is never returned twice.
pub fn next_weekday_after(date: NaiveDate, weekday: Weekday) -> Option<NaiveDate> {
    let target = weekday.num_days_from_monday() as i64;
    let current = date.weekday().num_days_from_monday() as i64;
    let ahead = (target - current + 7) % 7;
    add_days(date, if ahead == 0 { 7 } else { ahead })
}

/// Number of days in the given month.
pub fn days_in_month(year: i32, month: u32) -> u32 {
    let (next_year, next_month) = next_month(year, month);
    NaiveDate::from_ymd_opt(next_year, next_month, 1)
        .and_then(|first_next| first_next.pred_opt())
        .map_or(28, |last| last.day())
}

/// The `(year, month)` following the given one.
pub fn next_month(year: i32, month: u32) -> (i32, u32) {
    if month >= 12 {
        (year + 1, 1)
    } else {
        (year, month + 1)
    }
}

/// The `(year, month)` preceding the given one.
pub fn previous_month(year: i32, month: u32) -> (i32, u32) {
    if month <= 1 {
        (year - 1, 12)
    } else {
        (year, month - 1)
    }
}

/// `day` of the given month, clamped to the month's last day.
///
/// Requesting day 31 of February 2026 yields February 28.
pub fn clamped_day(year: i32, month: u32, day: u32) -> Option<NaiveDate> {
    NaiveDate::from_ymd_opt(year, month, day.min(days_in_month(year, month)))
}

/// Serde adapter carrying a [`NaiveTime`] as an `"HH:mm"` string.
///
/// Deserialization accepts both fixed formats of [`parse_time_of_day`].
pub mod time_of_day {
    use chrono::NaiveTime;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(time: &NaiveTime, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&super::format_time_of_day(*time))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<NaiveTime, D::Error> {
        let raw = String::deserialize(deserializer)?;
        super::parse_time_of_day(&raw).map_err(serde::de::Error::custom)
    }
}

// ── Internal helpers ────────────────────────────────────────────────────────

/// "HH:mm". Requires two-digit minutes; chrono alone would also accept "9:5".
fn parse_24_hour(s: &str) -> Option<NaiveTime> {
    let (hour, minute) = s.split_once(':')?;
    if hour.is_empty() || hour.len() > 2 || minute.len() != 2 {
        return None;
    }
    let hour: u32 = parse_digits(hour)?;
    let minute: u32 = parse_digits(minute)?;
    NaiveTime::from_hms_opt(hour, minute, 0)
}

/// "h:mm a", with or without the space before the marker.
fn parse_12_hour(s: &str) -> Option<NaiveTime> {
    let lower = s.to_ascii_lowercase();
    let (clock, is_pm) = if let Some(rest) = lower.strip_suffix("pm") {
        (rest.trim_end(), true)
    } else if let Some(rest) = lower.strip_suffix("am") {
        (rest.trim_end(), false)
    } else {
        return None;
    };

    let (hour, minute) = clock.split_once(':')?;
    if hour.is_empty() || hour.len() > 2 || minute.len() != 2 {
        return None;
    }
    let hour: u32 = parse_digits(hour)?;
    let minute: u32 = parse_digits(minute)?;
    if !(1..=12).contains(&hour) {
        return None;
    }

    let hour24 = match (hour, is_pm) {
        (12, true) => 12,
        (12, false) => 0,
        (h, true) => h + 12,
        (h, false) => h,
    };
    NaiveTime::from_hms_opt(hour24, minute, 0)
}

fn parse_digits(s: &str) -> Option<u32> {
    if s.bytes().all(|b| b.is_ascii_digit()) {
        s.parse().ok()
    } else {
        None
    }
}

// ── Tests ───────────────────────────────────────────────────────────────────
