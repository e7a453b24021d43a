//! Error types for class-schedule operations.

use thiserror::Error;

use crate::store::{PersistenceError, WriteStep};
use crate::types::SeriesId;

#[derive(Error, Debug)]
pub enum ScheduleError {
    #[error("Invalid date '{0}': expected YYYY-MM-DD")]
    InvalidDate(String),

    #[error("Invalid time of day '{0}': expected HH:MM")]
    InvalidTime(String),

    #[error("Invalid weekday code: {0}")]
    InvalidWeekday(String),

    #[error("Invalid timezone: {0}")]
    InvalidTimezone(String),

    #[error("Invalid recurrence rule: {0}")]
    InvalidRule(String),

    #[error("{date} {time} does not exist on the local calendar")]
    NonexistentLocalTime { date: String, time: String },

    #[error("Failed to write {step}: {source}")]
    Write {
        step: WriteStep,
        #[source]
        source: PersistenceError,
        partial: PartialWrite,
    },
}

impl ScheduleError {
    /// True for errors raised before any record was written.
    pub fn is_input_error(&self) -> bool {
        !matches!(self, ScheduleError::Write { .. })
    }
}

/// What a failed materialize call had already done when it stopped.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PartialWrite {
    /// Series headers written before the failure, in write order.
    pub written: Vec<SeriesId>,
    /// Series that were removed again by compensation.
    pub compensated: Vec<SeriesId>,
    /// Series whose compensation itself failed, with the store's message.
    pub orphaned: Vec<(SeriesId, String)>,
}

impl PartialWrite {
    /// True when no record written by the failed call is left behind.
    pub fn is_clean(&self) -> bool {
        self.orphaned.is_empty() && self.written.len() == self.compensated.len()
    }
}

pub type Result<T> = std::result::Result<T, ScheduleError>;
