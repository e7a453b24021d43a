//! RFC 5545 rendering of rule records.
//!
//! Downstream readers expand a series from its rule record. The record's own
//! shape is checked by [`RuleDefinition::validate`] before anything is
//! written; rendering additionally depends on the first start it is anchored
//! at.

use chrono::{DateTime, NaiveTime, Utc};
use rrule::{NWeekday, RRule, Tz};

use crate::error::{Result, ScheduleError};
use crate::types::{Frequency, RuleDefinition};

impl Frequency {
    /// The RFC 5545 frequency, or `None` for an opaque value.
    pub fn to_rfc5545(&self) -> Option<rrule::Frequency> {
        match self {
            Frequency::Secondly => Some(rrule::Frequency::Secondly),
            Frequency::Minutely => Some(rrule::Frequency::Minutely),
            Frequency::Hourly => Some(rrule::Frequency::Hourly),
            Frequency::Daily => Some(rrule::Frequency::Daily),
            Frequency::Weekly => Some(rrule::Frequency::Weekly),
            Frequency::Monthly => Some(rrule::Frequency::Monthly),
            Frequency::Yearly => Some(rrule::Frequency::Yearly),
            Frequency::Other(_) => None,
        }
    }
}

impl RuleDefinition {
    /// Check the parts of the rule that do not depend on where it starts.
    ///
    /// # Errors
    /// Returns `ScheduleError::InvalidRule` for a zero interval, an interval
    /// too large for an RRULE, or `count` and `until` set together.
    pub fn validate(&self) -> Result<()> {
        if self.interval == 0 {
            return Err(ScheduleError::InvalidRule(
                "interval must be at least 1".to_string(),
            ));
        }
        if u16::try_from(self.interval).is_err() {
            return Err(ScheduleError::InvalidRule(format!(
                "interval {} is too large",
                self.interval
            )));
        }
        if self.count.is_some() && self.until.is_some() {
            return Err(ScheduleError::InvalidRule(
                "count and until cannot both be set".to_string(),
            ));
        }
        Ok(())
    }

    /// Render as `DTSTART` + `RRULE` text anchored at `first_start`.
    ///
    /// `until` is inclusive of the whole day. Returns `Ok(None)` for opaque
    /// frequencies, which have no RFC 5545 form.
    ///
    /// # Errors
    /// Returns `ScheduleError::InvalidRule` if [`validate`](Self::validate)
    /// fails or the `rrule` crate rejects the anchored rule, for example when
    /// `until` falls before `first_start`.
    pub fn to_rrule(&self, first_start: DateTime<Utc>) -> Result<Option<String>> {
        let Some(freq) = self.frequency.to_rfc5545() else {
            return Ok(None);
        };
        self.validate()?;

        let interval = u16::try_from(self.interval).unwrap_or(u16::MAX);

        let mut rule = RRule::new(freq).interval(interval);
        if !self.by_weekday.is_empty() {
            rule = rule.by_weekday(
                self.by_weekday
                    .iter()
                    .map(|day| NWeekday::Every(day.to_chrono()))
                    .collect(),
            );
        }
        if let Some(count) = self.count {
            rule = rule.count(count);
        }
        if let Some(until) = self.until {
            let last_second = NaiveTime::from_hms_opt(23, 59, 59).unwrap_or(NaiveTime::MIN);
            let end_of_day = until.and_time(last_second);
            rule = rule.until(end_of_day.and_utc().with_timezone(&Tz::UTC));
        }

        let set = rule
            .build(first_start.with_timezone(&Tz::UTC))
            .map_err(|e| ScheduleError::InvalidRule(e.to_string()))?;
        Ok(Some(set.to_string()))
    }
}
