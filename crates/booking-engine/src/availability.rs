//! Weekly operating hours and the per-date resolver.
//!
//! A business configures one [`DayHours`] per weekday. A weekday with no
//! entry is closed, and a business with no [`WeeklyAvailability`] at all has
//! no open hours on any date: resolution fails closed, never open.

use chrono::{Datelike, NaiveDate, NaiveDateTime, NaiveTime, Weekday};
use serde::{Deserialize, Serialize};

use crate::calendar::time_of_day;

/// Opening hours for a single weekday.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DayHours {
    #[serde(with = "time_of_day")]
    pub open: NaiveTime,
    #[serde(with = "time_of_day")]
    pub close: NaiveTime,
    pub is_open: bool,
}

impl DayHours {
    /// Open from `open` until `close` on the same day.
    pub fn open(open: NaiveTime, close: NaiveTime) -> Self {
        Self {
            open,
            close,
            is_open: true,
        }
    }

    /// A closed day.
    pub fn closed() -> Self {
        Self {
            open: NaiveTime::MIN,
            close: NaiveTime::MIN,
            is_open: false,
        }
    }

    /// The concrete `[open, close)` window on `date`.
    ///
    /// `None` when the day is closed or when `close` is not after `open`.
    /// Hours spanning midnight are not representable and yield no window.
    pub fn window(&self, date: NaiveDate) -> Option<(NaiveDateTime, NaiveDateTime)> {
        if !self.is_open || self.close <= self.open {
            return None;
        }
        Some((date.and_time(self.open), date.and_time(self.close)))
    }
}

impl Default for DayHours {
    fn default() -> Self {
        Self::closed()
    }
}

/// A business's operating hours: seven fixed weekday entries.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct WeeklyAvailability {
    pub monday: Option<DayHours>,
    pub tuesday: Option<DayHours>,
    pub wednesday: Option<DayHours>,
    pub thursday: Option<DayHours>,
    pub friday: Option<DayHours>,
    pub saturday: Option<DayHours>,
    pub sunday: Option<DayHours>,
}

impl WeeklyAvailability {
    /// The same hours on every weekday in `days`; all other days closed.
    pub fn uniform(hours: DayHours, days: &[Weekday]) -> Self {
        let mut availability = Self::default();
        for &day in days {
            *availability.entry_mut(day) = Some(hours);
        }
        availability
    }

    /// Hours for the weekday of `date`. Unconfigured weekdays are closed.
    pub fn hours_for(&self, date: NaiveDate) -> DayHours {
        self.entry(date.weekday()).unwrap_or_else(DayHours::closed)
    }

    /// The configured entry for a weekday, if any.
    pub fn entry(&self, weekday: Weekday) -> Option<DayHours> {
        match weekday {
            Weekday::Mon => self.monday,
            Weekday::Tue => self.tuesday,
            Weekday::Wed => self.wednesday,
            Weekday::Thu => self.thursday,
            Weekday::Fri => self.friday,
            Weekday::Sat => self.saturday,
            Weekday::Sun => self.sunday,
        }
    }

    fn entry_mut(&mut self, weekday: Weekday) -> &mut Option<DayHours> {
        match weekday {
            Weekday::Mon => &mut self.monday,
            Weekday::Tue => &mut self.tuesday,
            Weekday::Wed => &mut self.wednesday,
            Weekday::Thu => &mut self.thursday,
            Weekday::Fri => &mut self.friday,
            Weekday::Sat => &mut self.saturday,
            Weekday::Sun => &mut self.sunday,
        }
    }
}

/// Resolve the hours for `date`, treating a missing configuration as closed.
pub fn hours_for(availability: Option<&WeeklyAvailability>, date: NaiveDate) -> DayHours {
    availability.map_or_else(DayHours::closed, |weekly| weekly.hours_for(date))
}
