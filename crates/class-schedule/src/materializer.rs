//! Series materialization -- writes one series family per expanded schedule.
//!
//! A call runs in two phases. Planning expands every input and derives every
//! record (occurrence keys included) without touching the store, so input
//! errors surface before the first write. Writing then walks the plans in
//! order, issuing series → participants → rule → exceptions → overrides for
//! each one. A failed write stops the call; what happens to the records
//! already written is decided by [`FailurePolicy`].

use chrono::{DateTime, Utc};

use crate::calendar::{self, occurrence_key};
use crate::config::{FailurePolicy, ScheduleConfig};
use crate::error::{PartialWrite, Result, ScheduleError};
use crate::expander::{self, ExpandedSchedule};
use crate::store::{PersistenceError, SchedulePersistence, WriteStep};
use crate::types::{
    ExceptionRecord, Frequency, OverridePatch, OverrideRecord, Participant, ParticipantRecord,
    RecurrenceInput, RecurrenceRuleRecord, RuleDefinition, ScheduleStatus, SeriesContext,
    SeriesId, SeriesRecord,
};
use crate::weekday::Weekday;

/// Every record of one series, minus the id the store has yet to assign.
#[derive(Debug, Clone, PartialEq)]
pub struct SeriesPlan {
    pub schedule: ExpandedSchedule,
    pub series: SeriesRecord,
    pub participants: Vec<Participant>,
    pub rule: RuleDefinition,
    pub exceptions: Vec<(DateTime<Utc>, Option<String>)>,
    pub overrides: Vec<(DateTime<Utc>, OverridePatch)>,
}

impl SeriesPlan {
    fn participant_records(&self, series_id: SeriesId) -> Vec<ParticipantRecord> {
        self.participants
            .iter()
            .map(|p| ParticipantRecord {
                series_id,
                participant_id: p.id.clone(),
                kind: p.kind,
            })
            .collect()
    }

    fn rule_record(&self, series_id: SeriesId) -> RecurrenceRuleRecord {
        RecurrenceRuleRecord {
            series_id,
            rule: self.rule.clone(),
        }
    }

    fn exception_records(&self, series_id: SeriesId) -> Vec<ExceptionRecord> {
        self.exceptions
            .iter()
            .map(|(key, reason)| ExceptionRecord {
                series_id,
                occurrence_key: *key,
                reason: reason.clone(),
            })
            .collect()
    }

    fn override_records(&self, series_id: SeriesId) -> Vec<OverrideRecord> {
        self.overrides
            .iter()
            .map(|(key, patch)| OverrideRecord {
                series_id,
                occurrence_key: *key,
                patch: patch.clone(),
            })
            .collect()
    }
}

/// Derive every series plan for `inputs` without writing anything.
///
/// # Errors
/// Any input error in any input: bad dates or times, an unknown timezone, or
/// a malformed rule (see [`RuleDefinition::validate`]). An `until` that ends
/// before a series' first occurrence is not an error; that series simply
/// has no further occurrences.
pub fn plan(
    context: &SeriesContext,
    inputs: &[RecurrenceInput],
    config: &ScheduleConfig,
) -> Result<Vec<SeriesPlan>> {
    let participants: Vec<Participant> = context
        .participants
        .iter()
        .filter(|p| p.kind.is_scheduled())
        .cloned()
        .collect();

    let mut plans = Vec::new();
    for input in inputs {
        validate_timezone(&input.timezone)?;
        let rule_timezone = input
            .rule
            .timezone
            .clone()
            .unwrap_or_else(|| input.timezone.clone());
        validate_timezone(&rule_timezone)?;
        let until = input
            .rule
            .until
            .as_deref()
            .map(calendar::parse_date)
            .transpose()?;

        for schedule in expander::expand(input, config)? {
            let rule = RuleDefinition {
                frequency: input.rule.frequency.clone(),
                interval: input.rule.interval.unwrap_or(1),
                by_weekday: rule_weekdays(input, &schedule),
                count: input.rule.count,
                until,
                timezone: rule_timezone.clone(),
            };
            // Opaque frequencies are stored as given.
            if rule.frequency.to_rfc5545().is_some() {
                rule.validate()?;
            }

            let exceptions = input
                .exceptions
                .iter()
                .map(|ex| {
                    let key = occurrence_key(&ex.date, schedule.time, config.key_calendar)?;
                    Ok((key, ex.reason.clone()))
                })
                .collect::<Result<Vec<_>>>()?;

            let overrides = input
                .overrides
                .iter()
                .map(|ov| {
                    // Lookup key always uses the canonical time, never the new one.
                    let key =
                        occurrence_key(&ov.original_date, schedule.time, config.key_calendar)?;
                    let new_date = ov.new_date.as_deref().unwrap_or(&ov.original_date);
                    let start_at = occurrence_key(
                        new_date,
                        ov.new_time.unwrap_or(schedule.time),
                        config.key_calendar,
                    )?;
                    let patch = OverridePatch {
                        start_at,
                        end_at: calendar::add_minutes(start_at, config.session_minutes),
                        status: ov.status,
                        location: ov.location.clone(),
                        reason: ov.reason.clone(),
                    };
                    Ok((key, patch))
                })
                .collect::<Result<Vec<_>>>()?;

            plans.push(SeriesPlan {
                series: SeriesRecord {
                    org_id: context.org_id.clone(),
                    created_by: context.created_by.clone(),
                    title: context.title.clone(),
                    description: context.description.clone(),
                    start_at: schedule.start_at,
                    end_at: schedule.end_at,
                    timezone: input.timezone.clone(),
                    status: ScheduleStatus::Scheduled,
                },
                participants: participants.clone(),
                rule,
                exceptions,
                overrides,
                schedule,
            });
        }
    }
    Ok(plans)
}

/// Weekly series carry exactly the weekday they were expanded for.
fn rule_weekdays(input: &RecurrenceInput, schedule: &ExpandedSchedule) -> Vec<Weekday> {
    match (&input.rule.frequency, schedule.weekday) {
        (Frequency::Weekly, Some(day)) => vec![day],
        _ => input.rule.by_weekday.clone(),
    }
}

fn validate_timezone(timezone: &str) -> Result<()> {
    timezone
        .parse::<chrono_tz::Tz>()
        .map(|_| ())
        .map_err(|_| ScheduleError::InvalidTimezone(timezone.to_string()))
}

/// Writes planned series through a [`SchedulePersistence`].
pub struct Materializer<'a, S: SchedulePersistence + ?Sized> {
    store: &'a S,
    config: ScheduleConfig,
}

impl<'a, S: SchedulePersistence + ?Sized> Materializer<'a, S> {
    pub fn new(store: &'a S, config: ScheduleConfig) -> Self {
        Self { store, config }
    }

    /// Create one series per expanded schedule of every input and return the
    /// new ids in write order.
    ///
    /// Inputs and their series are processed strictly one at a time.
    ///
    /// # Errors
    /// Input errors are returned before any write. A failed write returns
    /// `ScheduleError::Write` naming the failed step, with the partial state
    /// after the configured [`FailurePolicy`] ran.
    pub async fn materialize(
        &self,
        context: &SeriesContext,
        inputs: &[RecurrenceInput],
    ) -> Result<Vec<SeriesId>> {
        let plans = plan(context, inputs, &self.config)?;
        tracing::debug!(inputs = inputs.len(), series = plans.len(), "planned series");

        let mut written = Vec::with_capacity(plans.len());
        for plan in &plans {
            if let Err((step, source)) = self.write_plan(plan, &mut written).await {
                return Err(self.fail(step, source, written).await);
            }
        }

        tracing::info!(org_id = %context.org_id, series = written.len(), "materialized schedule");
        Ok(written)
    }

    async fn write_plan(
        &self,
        plan: &SeriesPlan,
        written: &mut Vec<SeriesId>,
    ) -> std::result::Result<(), (WriteStep, PersistenceError)> {
        let id = self
            .store
            .create_series(&plan.series)
            .await
            .map_err(|e| (WriteStep::Series, e))?;
        written.push(id);

        let participants = plan.participant_records(id);
        if !participants.is_empty() {
            self.store
                .create_participants(&participants)
                .await
                .map_err(|e| (WriteStep::Participants, e))?;
        }

        self.store
            .create_recurrence_rule(&plan.rule_record(id))
            .await
            .map_err(|e| (WriteStep::RecurrenceRule, e))?;

        let exceptions = plan.exception_records(id);
        if !exceptions.is_empty() {
            self.store
                .create_exceptions(&exceptions)
                .await
                .map_err(|e| (WriteStep::Exceptions, e))?;
        }

        let overrides = plan.override_records(id);
        if !overrides.is_empty() {
            self.store
                .create_overrides(&overrides)
                .await
                .map_err(|e| (WriteStep::Overrides, e))?;
        }

        tracing::info!(
            series_id = %id,
            weekday = ?plan.schedule.weekday,
            start_at = %plan.series.start_at,
            exceptions = exceptions.len(),
            overrides = overrides.len(),
            "wrote series"
        );
        Ok(())
    }

    async fn fail(
        &self,
        step: WriteStep,
        source: PersistenceError,
        written: Vec<SeriesId>,
    ) -> ScheduleError {
        let mut partial = PartialWrite {
            written,
            ..PartialWrite::default()
        };

        match self.config.failure_policy {
            FailurePolicy::LeavePartial => {
                tracing::warn!(
                    %step,
                    error = %source,
                    left = partial.written.len(),
                    "write failed, leaving partial records"
                );
            }
            FailurePolicy::Compensate => {
                tracing::warn!(
                    %step,
                    error = %source,
                    series = partial.written.len(),
                    "write failed, discarding written series"
                );
                for &id in partial.written.iter().rev() {
                    match self.store.discard_series(id).await {
                        Ok(()) => partial.compensated.push(id),
                        Err(e) => {
                            tracing::error!(
                                series_id = %id,
                                error = %e,
                                "compensation failed, series orphaned"
                            );
                            partial.orphaned.push((id, e.to_string()));
                        }
                    }
                }
            }
        }

        ScheduleError::Write {
            step,
            source,
            partial,
        }
    }
}

/// Convenience wrapper around [`Materializer::materialize`].
pub async fn materialize<S: SchedulePersistence + ?Sized>(
    store: &S,
    config: ScheduleConfig,
    context: &SeriesContext,
    inputs: &[RecurrenceInput],
) -> Result<Vec<SeriesId>> {
    Materializer::new(store, config)
        .materialize(context, inputs)
        .await
}
