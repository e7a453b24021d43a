//! Caller-supplied inputs and the records written through the persistence
//! boundary.

use std::fmt;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::calendar::TimeOfDay;
use crate::weekday::Weekday;

// ---------------------------------------------------------------------------
// Inputs
// ---------------------------------------------------------------------------

/// Recurrence frequency. Only `Weekly` fans out per weekday; everything else
/// is carried through to the rule record unchanged.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Frequency {
    Secondly,
    Minutely,
    Hourly,
    Daily,
    Weekly,
    Monthly,
    Yearly,
    /// Anything else, kept verbatim.
    Other(String),
}

impl Frequency {
    pub fn as_str(&self) -> &str {
        match self {
            Frequency::Secondly => "secondly",
            Frequency::Minutely => "minutely",
            Frequency::Hourly => "hourly",
            Frequency::Daily => "daily",
            Frequency::Weekly => "weekly",
            Frequency::Monthly => "monthly",
            Frequency::Yearly => "yearly",
            Frequency::Other(raw) => raw,
        }
    }
}

impl From<String> for Frequency {
    fn from(raw: String) -> Self {
        match raw.to_ascii_lowercase().as_str() {
            "secondly" => Frequency::Secondly,
            "minutely" => Frequency::Minutely,
            "hourly" => Frequency::Hourly,
            "daily" => Frequency::Daily,
            "weekly" => Frequency::Weekly,
            "monthly" => Frequency::Monthly,
            "yearly" => Frequency::Yearly,
            _ => Frequency::Other(raw),
        }
    }
}

impl From<Frequency> for String {
    fn from(freq: Frequency) -> Self {
        freq.as_str().to_string()
    }
}

impl fmt::Display for Frequency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A weekday paired with an explicit time of day.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct WeekdayTime {
    pub day: Weekday,
    pub time: TimeOfDay,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecurrenceRule {
    pub frequency: Frequency,
    /// Repeat every N periods; `None` means 1.
    #[serde(default)]
    pub interval: Option<u32>,
    #[serde(default)]
    pub by_weekday: Vec<Weekday>,
    /// Takes precedence over `by_weekday` when non-empty.
    #[serde(default)]
    pub weekday_times: Vec<WeekdayTime>,
    #[serde(default)]
    pub count: Option<u32>,
    /// Last date of the series, `YYYY-MM-DD`.
    #[serde(default)]
    pub until: Option<String>,
    /// Falls back to the input's timezone.
    #[serde(default)]
    pub timezone: Option<String>,
}

impl RecurrenceRule {
    /// An unbounded rule with no weekday information.
    pub fn new(frequency: Frequency) -> Self {
        Self {
            frequency,
            interval: None,
            by_weekday: Vec::new(),
            weekday_times: Vec::new(),
            count: None,
            until: None,
            timezone: None,
        }
    }
}

/// Skip the occurrence that would fall on `date`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExceptionInput {
    pub date: String,
    #[serde(default)]
    pub reason: Option<String>,
}

/// Move or modify the occurrence that would fall on `original_date`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OverrideInput {
    pub original_date: String,
    /// Defaults to `original_date`.
    #[serde(default)]
    pub new_date: Option<String>,
    /// Defaults to the series' canonical time.
    #[serde(default)]
    pub new_time: Option<TimeOfDay>,
    #[serde(default)]
    pub status: Option<ScheduleStatus>,
    #[serde(default)]
    pub location: Option<String>,
    #[serde(default)]
    pub reason: Option<String>,
}

impl OverrideInput {
    pub fn new(original_date: impl Into<String>) -> Self {
        Self {
            original_date: original_date.into(),
            new_date: None,
            new_time: None,
            status: None,
            location: None,
            reason: None,
        }
    }
}

/// One desired series family.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecurrenceInput {
    /// `YYYY-MM-DD`.
    pub start_date: String,
    /// IANA zone name.
    pub timezone: String,
    pub rule: RecurrenceRule,
    #[serde(default)]
    pub exceptions: Vec<ExceptionInput>,
    #[serde(default)]
    pub overrides: Vec<OverrideInput>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ParticipantKind {
    Teacher,
    Student,
    /// Guardians and other watchers; never assigned to a schedule.
    Observer,
}

impl ParticipantKind {
    pub fn is_scheduled(self) -> bool {
        matches!(self, ParticipantKind::Teacher | ParticipantKind::Student)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Participant {
    pub id: String,
    pub kind: ParticipantKind,
}

/// Everything about the caller that ends up on the written records.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SeriesContext {
    pub org_id: String,
    pub created_by: String,
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub participants: Vec<Participant>,
}

// ---------------------------------------------------------------------------
// Records
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SeriesId(pub Uuid);

impl SeriesId {
    pub fn new_v4() -> Self {
        Self(Uuid::new_v4())
    }
}

impl fmt::Display for SeriesId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScheduleStatus {
    #[default]
    Scheduled,
    Cancelled,
    Completed,
}

/// Series header. `start_at`/`end_at` describe the first occurrence only.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SeriesRecord {
    pub org_id: String,
    pub created_by: String,
    pub title: String,
    pub description: Option<String>,
    pub start_at: DateTime<Utc>,
    pub end_at: DateTime<Utc>,
    pub timezone: String,
    pub status: ScheduleStatus,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ParticipantRecord {
    pub series_id: SeriesId,
    pub participant_id: String,
    pub kind: ParticipantKind,
}

/// The rule fields of a [`RecurrenceRuleRecord`], independent of any series.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RuleDefinition {
    pub frequency: Frequency,
    pub interval: u32,
    /// For weekly rules at most one day.
    pub by_weekday: Vec<Weekday>,
    pub count: Option<u32>,
    pub until: Option<NaiveDate>,
    pub timezone: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecurrenceRuleRecord {
    pub series_id: SeriesId,
    #[serde(flatten)]
    pub rule: RuleDefinition,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExceptionRecord {
    pub series_id: SeriesId,
    pub occurrence_key: DateTime<Utc>,
    pub reason: Option<String>,
}

/// The fields an override may replace on one occurrence.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OverridePatch {
    pub start_at: DateTime<Utc>,
    pub end_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<ScheduleStatus>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OverrideRecord {
    pub series_id: SeriesId,
    pub occurrence_key: DateTime<Utc>,
    pub patch: OverridePatch,
}
