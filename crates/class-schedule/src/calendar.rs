//! Calendar arithmetic: weekday advance, time-of-day application, fixed
//! offsets and occurrence keys.
//!
//! Everything here is pure. Instants are built on a naive (wall-clock)
//! calendar; the series timezone is never consulted. [`KeyCalendar`] decides
//! how that wall-clock value is pinned to an instant.

use std::fmt;
use std::str::FromStr;

use chrono::{
    DateTime, Duration, Local, NaiveDate, NaiveDateTime, NaiveTime, TimeZone, Timelike, Utc,
};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::config::KeyCalendar;
use crate::error::{Result, ScheduleError};
use crate::weekday::Weekday;

/// A time of day with minute precision, written `HH:MM`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TimeOfDay(NaiveTime);

impl TimeOfDay {
    pub fn new(hour: u32, minute: u32) -> Option<Self> {
        NaiveTime::from_hms_opt(hour, minute, 0).map(Self)
    }

    pub fn hour(self) -> u32 {
        self.0.hour()
    }

    pub fn minute(self) -> u32 {
        self.0.minute()
    }

    pub fn as_naive(self) -> NaiveTime {
        self.0
    }
}

/// 09:00, the start of the school day.
impl Default for TimeOfDay {
    fn default() -> Self {
        Self(NaiveTime::from_hms_opt(9, 0, 0).unwrap_or(NaiveTime::MIN))
    }
}

impl fmt::Display for TimeOfDay {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:02}:{:02}", self.hour(), self.minute())
    }
}

impl FromStr for TimeOfDay {
    type Err = ScheduleError;

    /// Accepts `H:MM` or `HH:MM`; seconds are not allowed.
    fn from_str(s: &str) -> Result<Self> {
        let invalid = || ScheduleError::InvalidTime(s.to_string());
        let (hour, minute) = s.trim().split_once(':').ok_or_else(invalid)?;
        let digits = |part: &str| part.bytes().all(|b| b.is_ascii_digit());
        if hour.is_empty()
            || hour.len() > 2
            || minute.len() != 2
            || !digits(hour)
            || !digits(minute)
        {
            return Err(invalid());
        }
        let hour: u32 = hour.parse().map_err(|_| invalid())?;
        let minute: u32 = minute.parse().map_err(|_| invalid())?;
        TimeOfDay::new(hour, minute).ok_or_else(invalid)
    }
}

impl Serialize for TimeOfDay {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for TimeOfDay {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

/// Parse a `YYYY-MM-DD` calendar date.
pub fn parse_date(date: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(date.trim(), "%Y-%m-%d")
        .map_err(|_| ScheduleError::InvalidDate(date.to_string()))
}

/// First date on or after `date` that falls on `weekday`.
///
/// Never moves backward and never moves more than six days.
pub fn next_on_or_after(date: NaiveDate, weekday: Weekday) -> NaiveDate {
    let current = Weekday::of(date).index();
    let ahead = (weekday.index() + 7 - current) % 7;
    date + Duration::days(i64::from(ahead))
}

/// Pin `time` onto `date`, with seconds and sub-seconds zeroed.
pub fn apply_time_of_day(
    date: NaiveDate,
    time: TimeOfDay,
    calendar: KeyCalendar,
) -> Result<DateTime<Utc>> {
    let wall = date.and_time(time.as_naive());
    match calendar {
        KeyCalendar::Floating => Ok(wall.and_utc()),
        KeyCalendar::SystemLocal => system_local(wall).ok_or_else(|| {
            ScheduleError::NonexistentLocalTime {
                date: date.to_string(),
                time: time.to_string(),
            }
        }),
    }
}

/// Host-local interpretation of a wall-clock value. Ambiguous times take the
/// earlier instant; times inside a DST gap move forward by one hour.
fn system_local(wall: NaiveDateTime) -> Option<DateTime<Utc>> {
    Local
        .from_local_datetime(&wall)
        .earliest()
        .or_else(|| Local.from_local_datetime(&(wall + Duration::hours(1))).earliest())
        .map(|dt| dt.with_timezone(&Utc))
}

/// Fixed-duration offset.
pub fn add_minutes(instant: DateTime<Utc>, minutes: u32) -> DateTime<Utc> {
    instant + Duration::minutes(i64::from(minutes))
}

/// Canonical key of the virtual occurrence on `date` at `time`.
///
/// Writers of exceptions/overrides and readers reconciling them against rule
/// expansion must both go through this function.
pub fn occurrence_key(date: &str, time: TimeOfDay, calendar: KeyCalendar) -> Result<DateTime<Utc>> {
    apply_time_of_day(parse_date(date)?, time, calendar)
}
