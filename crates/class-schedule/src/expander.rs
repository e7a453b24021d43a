//! Schedule expansion -- turns one recurrence input into one concrete first
//! occurrence per resolved weekday.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::calendar::{self, TimeOfDay};
use crate::config::ScheduleConfig;
use crate::error::Result;
use crate::types::{RecurrenceInput, WeekdayTime};
use crate::weekday::{self, Weekday};

/// The first occurrence of one weekday's series.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExpandedSchedule {
    pub start_at: DateTime<Utc>,
    pub end_at: DateTime<Utc>,
    /// `None` for an ad-hoc session with no resolvable weekday.
    pub weekday: Option<Weekday>,
    /// Canonical time used for every occurrence key of this series.
    pub time: TimeOfDay,
}

/// Expand a recurrence input into one schedule per resolved weekday.
///
/// Output order follows resolver order. Duplicate weekdays in the input yield
/// duplicate schedules. Once `start_date` parses, the resolver always yields
/// at least the start date's weekday, so the ad-hoc branch of
/// [`expand_slots`] is a guard for an empty slot list.
///
/// # Errors
/// Returns `ScheduleError::InvalidDate` if `start_date` is not `YYYY-MM-DD`.
pub fn expand(
    input: &RecurrenceInput,
    config: &ScheduleConfig,
) -> Result<Vec<ExpandedSchedule>> {
    let start = calendar::parse_date(&input.start_date)?;
    let slots = weekday::resolve(&input.rule, Some(start), config.default_time);
    expand_slots(start, slots, config)
}

/// Pin resolved slots to their first occurrence on or after `start`.
///
/// An empty slot list yields a single ad-hoc session on `start` at the
/// default time, with no weekday.
pub fn expand_slots(
    start: NaiveDate,
    slots: Vec<WeekdayTime>,
    config: &ScheduleConfig,
) -> Result<Vec<ExpandedSchedule>> {
    if slots.is_empty() {
        let start_at =
            calendar::apply_time_of_day(start, config.default_time, config.key_calendar)?;
        tracing::debug!(%start_at, "no weekday resolved, expanding a single ad-hoc session");
        return Ok(vec![ExpandedSchedule {
            start_at,
            end_at: calendar::add_minutes(start_at, config.session_minutes),
            weekday: None,
            time: config.default_time,
        }]);
    }

    slots
        .into_iter()
        .map(|slot| {
            let date = calendar::next_on_or_after(start, slot.day);
            let start_at = calendar::apply_time_of_day(date, slot.time, config.key_calendar)?;
            tracing::debug!(day = %slot.day, time = %slot.time, %start_at, "expanded weekday");
            Ok(ExpandedSchedule {
                start_at,
                end_at: calendar::add_minutes(start_at, config.session_minutes),
                weekday: Some(slot.day),
                time: slot.time,
            })
        })
        .collect()
}
