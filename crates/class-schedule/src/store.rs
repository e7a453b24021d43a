//! The persistence boundary and an in-memory implementation of it.
//!
//! The materializer never talks to a data store directly. It is handed a
//! [`SchedulePersistence`] and calls its five create operations in a fixed
//! order per series, plus [`SchedulePersistence::discard_series`] when a
//! failed call is compensated. Each call is assumed atomic on its own; the
//! calls together are not.

use std::fmt;
use std::str::FromStr;
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::types::{
    ExceptionRecord, OverrideRecord, ParticipantRecord, RecurrenceRuleRecord, SeriesId,
    SeriesRecord,
};

/// Error reported by a persistence implementation.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum PersistenceError {
    #[error("Write rejected: {0}")]
    Rejected(String),

    #[error("Store unavailable: {0}")]
    Unavailable(String),

    #[error("Series not found: {0}")]
    NotFound(SeriesId),

    #[error("Internal store error: {0}")]
    Internal(String),
}

pub type PersistenceResult<T> = std::result::Result<T, PersistenceError>;

/// The five record kinds, in the order they are written for one series.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum WriteStep {
    Series,
    Participants,
    RecurrenceRule,
    Exceptions,
    Overrides,
}

impl WriteStep {
    pub const ALL: [WriteStep; 5] = [
        WriteStep::Series,
        WriteStep::Participants,
        WriteStep::RecurrenceRule,
        WriteStep::Exceptions,
        WriteStep::Overrides,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            WriteStep::Series => "series",
            WriteStep::Participants => "participants",
            WriteStep::RecurrenceRule => "recurrence-rule",
            WriteStep::Exceptions => "exceptions",
            WriteStep::Overrides => "overrides",
        }
    }
}

impl fmt::Display for WriteStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for WriteStep {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        WriteStep::ALL
            .into_iter()
            .find(|step| step.as_str() == s)
            .ok_or_else(|| format!("unknown write step '{s}'"))
    }
}

/// Write capability for schedule records.
///
/// Implementations must be `Send + Sync`; the materializer awaits one call at
/// a time and never issues a child write before its series id exists.
#[async_trait]
pub trait SchedulePersistence: Send + Sync {
    /// Write a series header and return its new id.
    async fn create_series(&self, record: &SeriesRecord) -> PersistenceResult<SeriesId>;

    /// Assign participants to a series. Empty input is a no-op.
    async fn create_participants(&self, records: &[ParticipantRecord]) -> PersistenceResult<()>;

    async fn create_recurrence_rule(&self, record: &RecurrenceRuleRecord)
        -> PersistenceResult<()>;

    /// Empty input is a no-op.
    async fn create_exceptions(&self, records: &[ExceptionRecord]) -> PersistenceResult<()>;

    /// Empty input is a no-op.
    async fn create_overrides(&self, records: &[OverrideRecord]) -> PersistenceResult<()>;

    /// Remove a series together with every child record that references it.
    ///
    /// Only used to compensate a failed materialize call.
    async fn discard_series(&self, id: SeriesId) -> PersistenceResult<()>;
}

/// A stored series header with its assigned id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoredSeries {
    pub id: SeriesId,
    #[serde(flatten)]
    pub record: SeriesRecord,
}

/// Everything a [`MemoryStore`] holds, in write order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoreSnapshot {
    pub series: Vec<StoredSeries>,
    pub participants: Vec<ParticipantRecord>,
    pub rules: Vec<RecurrenceRuleRecord>,
    pub exceptions: Vec<ExceptionRecord>,
    pub overrides: Vec<OverrideRecord>,
}

impl StoreSnapshot {
    pub fn rule_for(&self, id: SeriesId) -> Option<&RecurrenceRuleRecord> {
        self.rules.iter().find(|r| r.series_id == id)
    }

    pub fn exceptions_for(&self, id: SeriesId) -> Vec<&ExceptionRecord> {
        self.exceptions.iter().filter(|e| e.series_id == id).collect()
    }

    pub fn overrides_for(&self, id: SeriesId) -> Vec<&OverrideRecord> {
        self.overrides.iter().filter(|o| o.series_id == id).collect()
    }

    pub fn participants_for(&self, id: SeriesId) -> Vec<&ParticipantRecord> {
        self.participants
            .iter()
            .filter(|p| p.series_id == id)
            .collect()
    }

    pub fn is_empty(&self) -> bool {
        self.series.is_empty()
            && self.participants.is_empty()
            && self.rules.is_empty()
            && self.exceptions.is_empty()
            && self.overrides.is_empty()
    }
}

#[derive(Default)]
struct MemoryData {
    records: StoreSnapshot,
    // (step, 1-based call number); `None` call number fails every call
    fail_at: Option<(WriteStep, Option<usize>)>,
    fail_discard: bool,
    calls: [usize; 5],
}

impl MemoryData {
    fn record_call(&mut self, step: WriteStep) -> PersistenceResult<()> {
        let slot = &mut self.calls[step as usize];
        *slot += 1;
        let call = *slot;
        match self.fail_at {
            Some((failing, None)) if failing == step => {}
            Some((failing, Some(n))) if failing == step && n == call => {}
            _ => return Ok(()),
        }
        tracing::debug!(%step, call, "injected write failure");
        Err(PersistenceError::Rejected(format!(
            "injected failure on {step} call {call}"
        )))
    }
}

/// In-memory [`SchedulePersistence`] for tests, local runs and the CLI.
///
/// Cloning shares the underlying data.
#[derive(Clone, Default)]
pub struct MemoryStore {
    data: Arc<RwLock<MemoryData>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reject every call of `step`.
    pub fn fail_on(self, step: WriteStep) -> Self {
        if let Ok(mut data) = self.data.write() {
            data.fail_at = Some((step, None));
        }
        self
    }

    /// Reject only the `call`-th (1-based) call of `step`.
    pub fn fail_on_nth(self, step: WriteStep, call: usize) -> Self {
        if let Ok(mut data) = self.data.write() {
            data.fail_at = Some((step, Some(call)));
        }
        self
    }

    /// Reject every `discard_series` call.
    pub fn fail_discard(self) -> Self {
        if let Ok(mut data) = self.data.write() {
            data.fail_discard = true;
        }
        self
    }

    /// Copy of everything currently stored.
    pub fn snapshot(&self) -> PersistenceResult<StoreSnapshot> {
        Ok(self.read()?.records.clone())
    }

    /// Number of times `step` has been called, failed calls included.
    pub fn calls(&self, step: WriteStep) -> PersistenceResult<usize> {
        Ok(self.read()?.calls[step as usize])
    }

    fn read(&self) -> PersistenceResult<RwLockReadGuard<'_, MemoryData>> {
        self.data
            .read()
            .map_err(|_| PersistenceError::Internal("memory store lock poisoned".to_string()))
    }

    fn write(&self) -> PersistenceResult<RwLockWriteGuard<'_, MemoryData>> {
        self.data
            .write()
            .map_err(|_| PersistenceError::Internal("memory store lock poisoned".to_string()))
    }
}

#[async_trait]
impl SchedulePersistence for MemoryStore {
    async fn create_series(&self, record: &SeriesRecord) -> PersistenceResult<SeriesId> {
        let mut data = self.write()?;
        data.record_call(WriteStep::Series)?;
        let id = SeriesId::new_v4();
        data.records.series.push(StoredSeries {
            id,
            record: record.clone(),
        });
        Ok(id)
    }

    async fn create_participants(&self, records: &[ParticipantRecord]) -> PersistenceResult<()> {
        let mut data = self.write()?;
        data.record_call(WriteStep::Participants)?;
        data.records.participants.extend_from_slice(records);
        Ok(())
    }

    async fn create_recurrence_rule(
        &self,
        record: &RecurrenceRuleRecord,
    ) -> PersistenceResult<()> {
        let mut data = self.write()?;
        data.record_call(WriteStep::RecurrenceRule)?;
        data.records.rules.push(record.clone());
        Ok(())
    }

    async fn create_exceptions(&self, records: &[ExceptionRecord]) -> PersistenceResult<()> {
        let mut data = self.write()?;
        data.record_call(WriteStep::Exceptions)?;
        data.records.exceptions.extend_from_slice(records);
        Ok(())
    }

    async fn create_overrides(&self, records: &[OverrideRecord]) -> PersistenceResult<()> {
        let mut data = self.write()?;
        data.record_call(WriteStep::Overrides)?;
        data.records.overrides.extend_from_slice(records);
        Ok(())
    }

    async fn discard_series(&self, id: SeriesId) -> PersistenceResult<()> {
        let mut data = self.write()?;
        if data.fail_discard {
            return Err(PersistenceError::Unavailable(format!(
                "discard of {id} refused"
            )));
        }
        let records = &mut data.records;
        let before = records.series.len();
        records.series.retain(|s| s.id != id);
        if records.series.len() == before {
            return Err(PersistenceError::NotFound(id));
        }
        records.participants.retain(|p| p.series_id != id);
        records.rules.retain(|r| r.series_id != id);
        records.exceptions.retain(|e| e.series_id != id);
        records.overrides.retain(|o| o.series_id != id);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{ParticipantKind, ScheduleStatus};
    use chrono::{TimeZone, Utc};

    fn series() -> SeriesRecord {
        let start = Utc.with_ymd_and_hms(2026, 1, 5, 9, 0, 0).unwrap();
        SeriesRecord {
            org_id: "org-1".to_string(),
            created_by: "user-1".to_string(),
            title: "Algebra".to_string(),
            description: None,
            start_at: start,
            end_at: start + chrono::Duration::minutes(60),
            timezone: "UTC".to_string(),
            status: ScheduleStatus::Scheduled,
        }
    }

    #[tokio::test]
    async fn discard_removes_children_of_that_series_only() {
        let store = MemoryStore::new();
        let a = store.create_series(&series()).await.unwrap();
        let b = store.create_series(&series()).await.unwrap();
        let participant = |series_id| ParticipantRecord {
            series_id,
            participant_id: "s-1".to_string(),
            kind: ParticipantKind::Student,
        };
        store
            .create_participants(&[participant(a), participant(b)])
            .await
            .unwrap();

        store.discard_series(a).await.unwrap();

        let snap = store.snapshot().unwrap();
        assert_eq!(snap.series.len(), 1);
        assert_eq!(snap.series[0].id, b);
        assert!(snap.participants_for(a).is_empty());
        assert_eq!(snap.participants_for(b).len(), 1);
    }

    #[tokio::test]
    async fn discard_of_unknown_series_is_not_found() {
        let store = MemoryStore::new();
        let id = SeriesId::new_v4();
        assert_eq!(
            store.discard_series(id).await,
            Err(PersistenceError::NotFound(id))
        );
    }

    #[tokio::test]
    async fn nth_failure_only_hits_that_call() {
        let store = MemoryStore::new().fail_on_nth(WriteStep::Series, 2);
        assert!(store.create_series(&series()).await.is_ok());
        assert!(matches!(
            store.create_series(&series()).await,
            Err(PersistenceError::Rejected(_))
        ));
        assert!(store.create_series(&series()).await.is_ok());
        assert_eq!(store.calls(WriteStep::Series).unwrap(), 3);
        assert_eq!(store.snapshot().unwrap().series.len(), 2);
    }

    #[test]
    fn write_steps_parse_from_their_names() {
        for step in WriteStep::ALL {
            assert_eq!(step.as_str().parse::<WriteStep>().unwrap(), step);
        }
        assert!("rule".parse::<WriteStep>().is_err());
    }
}
