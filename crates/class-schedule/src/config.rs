//! Defaults that shape expansion and materialization.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::calendar::TimeOfDay;

/// How a wall-clock date+time becomes an occurrence-key instant.
///
/// The series timezone is carried on every record but is never used for key
/// arithmetic. Stored keys only match when writer and reader agree on this
/// setting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum KeyCalendar {
    /// The wall-clock value written in UTC notation. Same result on every host.
    #[default]
    Floating,
    /// The wall-clock value interpreted in the host's local zone. Matches keys
    /// written by deployments that relied on the process timezone.
    SystemLocal,
}

impl fmt::Display for KeyCalendar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            KeyCalendar::Floating => "floating",
            KeyCalendar::SystemLocal => "system-local",
        })
    }
}

impl FromStr for KeyCalendar {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "floating" => Ok(KeyCalendar::Floating),
            "system-local" => Ok(KeyCalendar::SystemLocal),
            other => Err(format!(
                "unknown key calendar '{other}' (expected floating or system-local)"
            )),
        }
    }
}

/// What to do with records already written when a later write fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum FailurePolicy {
    /// Discard every series written by the failed call, children included.
    #[default]
    Compensate,
    /// Leave written records in place and only report them.
    LeavePartial,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct ScheduleConfig {
    /// Time of day used when a rule names weekdays without times.
    pub default_time: TimeOfDay,
    /// Length of every session and of every override's patched range.
    pub session_minutes: u32,
    pub key_calendar: KeyCalendar,
    pub failure_policy: FailurePolicy,
}

impl Default for ScheduleConfig {
    fn default() -> Self {
        Self {
            default_time: TimeOfDay::default(),
            session_minutes: 60,
            key_calendar: KeyCalendar::default(),
            failure_policy: FailurePolicy::default(),
        }
    }
}
