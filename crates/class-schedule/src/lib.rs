//! # class-schedule
//!
//! Recurring class schedule creation: turns a recurrence description
//! (frequency, weekdays, times, count/until bounds) into persisted schedule
//! series, each with its own recurrence rule, exceptions and overrides.
//!
//! A description naming several weekdays becomes several independent series,
//! one per weekday. Every exception and override is addressed by an
//! occurrence key derived from a calendar date and the series' canonical time.
//!
//! ## Modules
//!
//! - [`weekday`] - Weekday codes and the weekday/time resolver
//! - [`calendar`] - Date arithmetic and occurrence keys
//! - [`expander`] - Recurrence input → one first occurrence per weekday
//! - [`materializer`] - Expanded schedules → written records
//! - [`store`] - The persistence boundary and an in-memory store
//! - [`rrule_text`] - RFC 5545 rendering and validation of rule records
//! - [`config`] - Defaults and policies
//! - [`types`] - Inputs and records
//! - [`error`] - Error types

pub mod calendar;
pub mod config;
pub mod error;
pub mod expander;
pub mod materializer;
pub mod rrule_text;
pub mod store;
pub mod types;
pub mod weekday;

pub use calendar::{occurrence_key, TimeOfDay};
pub use config::{FailurePolicy, KeyCalendar, ScheduleConfig};
pub use error::{PartialWrite, ScheduleError};
pub use expander::{expand, ExpandedSchedule};
pub use materializer::{materialize, Materializer};
pub use store::{MemoryStore, PersistenceError, SchedulePersistence, WriteStep};
pub use types::*;
pub use weekday::Weekday;
