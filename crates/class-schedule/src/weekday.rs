//! Weekday codes and the weekday/time resolver.
//!
//! A recurrence rule can name its meeting days in three shapes. The resolver
//! collapses them into one ordered list of (weekday, time) slots:
//!
//! 1. `weekday_times` when non-empty, verbatim.
//! 2. `by_weekday` when non-empty, each day at the default time.
//! 3. The weekday of the start date, at the default time.
//!
//! Duplicates are passed through untouched.

use std::fmt;
use std::str::FromStr;

use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};

use crate::calendar::TimeOfDay;
use crate::error::ScheduleError;
use crate::types::{RecurrenceRule, WeekdayTime};

/// Two-letter RFC 5545 weekday code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Weekday {
    #[serde(rename = "SU")]
    Sunday,
    #[serde(rename = "MO")]
    Monday,
    #[serde(rename = "TU")]
    Tuesday,
    #[serde(rename = "WE")]
    Wednesday,
    #[serde(rename = "TH")]
    Thursday,
    #[serde(rename = "FR")]
    Friday,
    #[serde(rename = "SA")]
    Saturday,
}

impl Weekday {
    pub const ALL: [Weekday; 7] = [
        Weekday::Sunday,
        Weekday::Monday,
        Weekday::Tuesday,
        Weekday::Wednesday,
        Weekday::Thursday,
        Weekday::Friday,
        Weekday::Saturday,
    ];

    /// Index with Sunday = 0 through Saturday = 6.
    pub fn index(self) -> u32 {
        match self {
            Weekday::Sunday => 0,
            Weekday::Monday => 1,
            Weekday::Tuesday => 2,
            Weekday::Wednesday => 3,
            Weekday::Thursday => 4,
            Weekday::Friday => 5,
            Weekday::Saturday => 6,
        }
    }

    pub fn code(self) -> &'static str {
        match self {
            Weekday::Sunday => "SU",
            Weekday::Monday => "MO",
            Weekday::Tuesday => "TU",
            Weekday::Wednesday => "WE",
            Weekday::Thursday => "TH",
            Weekday::Friday => "FR",
            Weekday::Saturday => "SA",
        }
    }

    /// The weekday a calendar date falls on.
    pub fn of(date: NaiveDate) -> Self {
        Self::from(date.weekday())
    }

    pub fn to_chrono(self) -> chrono::Weekday {
        match self {
            Weekday::Sunday => chrono::Weekday::Sun,
            Weekday::Monday => chrono::Weekday::Mon,
            Weekday::Tuesday => chrono::Weekday::Tue,
            Weekday::Wednesday => chrono::Weekday::Wed,
            Weekday::Thursday => chrono::Weekday::Thu,
            Weekday::Friday => chrono::Weekday::Fri,
            Weekday::Saturday => chrono::Weekday::Sat,
        }
    }
}

impl From<chrono::Weekday> for Weekday {
    fn from(day: chrono::Weekday) -> Self {
        // num_days_from_sunday is always 0..=6
        Weekday::ALL[day.num_days_from_sunday() as usize]
    }
}

impl fmt::Display for Weekday {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

impl FromStr for Weekday {
    type Err = ScheduleError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let code = s.trim().to_ascii_uppercase();
        Weekday::ALL
            .into_iter()
            .find(|day| day.code() == code)
            .ok_or_else(|| ScheduleError::InvalidWeekday(s.to_string()))
    }
}

/// Resolve a rule's weekday intent into ordered (weekday, time) slots.
///
/// Returns an empty list only when no slot can be derived, i.e. neither list
/// on the rule is populated and there is no start date to fall back on.
pub fn resolve(
    rule: &RecurrenceRule,
    start_date: Option<NaiveDate>,
    default_time: TimeOfDay,
) -> Vec<WeekdayTime> {
    if !rule.weekday_times.is_empty() {
        tracing::debug!(slots = rule.weekday_times.len(), "using explicit weekday times");
        return rule.weekday_times.clone();
    }

    if !rule.by_weekday.is_empty() {
        tracing::debug!(
            days = ?rule.by_weekday,
            time = %default_time,
            "using by_weekday at default time"
        );
        return rule
            .by_weekday
            .iter()
            .map(|&day| WeekdayTime {
                day,
                time: default_time,
            })
            .collect();
    }

    match start_date {
        Some(date) => {
            let day = Weekday::of(date);
            tracing::debug!(%day, %date, "falling back to the start date's weekday");
            vec![WeekdayTime {
                day,
                time: default_time,
            }]
        }
        None => Vec::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Frequency;

    fn nine() -> TimeOfDay {
        TimeOfDay::new(9, 0).unwrap()
    }

    fn weekly() -> RecurrenceRule {
        RecurrenceRule::new(Frequency::Weekly)
    }

    #[test]
    fn weekday_times_take_precedence() {
        let mut rule = weekly();
        rule.by_weekday = vec![Weekday::Monday];
        rule.weekday_times = vec![WeekdayTime {
            day: Weekday::Friday,
            time: TimeOfDay::new(16, 0).unwrap(),
        }];

        let slots = resolve(&rule, NaiveDate::from_ymd_opt(2026, 1, 6), nine());
        assert_eq!(slots, rule.weekday_times);
    }

    #[test]
    fn by_weekday_gets_default_time_in_order() {
        let mut rule = weekly();
        rule.by_weekday = vec![Weekday::Wednesday, Weekday::Monday, Weekday::Wednesday];

        let slots = resolve(&rule, None, nine());
        let days: Vec<Weekday> = slots.iter().map(|s| s.day).collect();
        assert_eq!(
            days,
            vec![Weekday::Wednesday, Weekday::Monday, Weekday::Wednesday]
        );
        assert!(slots.iter().all(|s| s.time == nine()));
    }

    #[test]
    fn falls_back_to_start_date_weekday() {
        // 2026-01-08 is a Thursday
        let slots = resolve(&weekly(), NaiveDate::from_ymd_opt(2026, 1, 8), nine());
        assert_eq!(
            slots,
            vec![WeekdayTime {
                day: Weekday::Thursday,
                time: nine()
            }]
        );
    }

    #[test]
    fn nothing_to_resolve_without_a_start_date() {
        assert!(resolve(&weekly(), None, nine()).is_empty());
    }

    #[test]
    fn codes_parse_case_insensitively() {
        assert_eq!("mo".parse::<Weekday>().unwrap(), Weekday::Monday);
        assert_eq!(" SU ".parse::<Weekday>().unwrap(), Weekday::Sunday);
        assert!("XX".parse::<Weekday>().is_err());
    }

    #[test]
    fn sunday_is_index_zero() {
        let indices: Vec<u32> = Weekday::ALL.iter().map(|d| d.index()).collect();
        assert_eq!(indices, vec![0, 1, 2, 3, 4, 5, 6]);
        assert_eq!(Weekday::from(chrono::Weekday::Sun), Weekday::Sunday);
        assert_eq!(Weekday::Saturday.to_chrono(), chrono::Weekday::Sat);
    }
}
