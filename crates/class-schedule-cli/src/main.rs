//! `schedule` CLI - expand and materialize recurring class schedules from the
//! command line.
//!
//! ## Usage
//!
//! ```sh
//! # Expand recurrence inputs into first occurrences (stdin → stdout)
//! echo '{"startDate":"2026-01-05","timezone":"UTC","rule":{"frequency":"weekly","byWeekday":["MO","WE"]}}' \
//!   | schedule expand
//!
//! # Materialize a request against an in-memory store and print every record
//! schedule materialize -i request.json
//!
//! # Simulate a failing rule write to see compensation at work
//! schedule materialize -i request.json --fail-at recurrence-rule
//!
//! # Print the occurrence key for a date at a series time
//! schedule key 2026-01-12 16:00
//!
//! # Settings from a file, with a flag on top
//! schedule --config schedule.json --session-minutes 45 expand -i input.json
//! ```

use anyhow::{Context, Result};
use chrono::SecondsFormat;
use clap::{ArgAction, Parser, Subcommand};
use class_schedule::{
    expand, occurrence_key, ExpandedSchedule, FailurePolicy, KeyCalendar, Materializer,
    MemoryStore, RecurrenceInput, ScheduleConfig, ScheduleError, SeriesContext, SeriesId,
    TimeOfDay, WriteStep,
};
use class_schedule::store::StoreSnapshot;
use serde::{Deserialize, Serialize};
use std::io::{self, Read};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[derive(Parser)]
#[command(
    name = "schedule",
    version,
    about = "Recurring class schedule expansion and materialization"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// JSON file with schedule settings (default-time, session-minutes, ...)
    #[arg(long, global = true)]
    config: Option<String>,

    /// Time of day for weekdays given without a time, as HH:MM
    #[arg(long, global = true)]
    default_time: Option<TimeOfDay>,

    /// Length of every session in minutes
    #[arg(long, global = true)]
    session_minutes: Option<u32>,

    /// How occurrence keys are pinned to instants: floating or system-local
    #[arg(long, global = true)]
    key_calendar: Option<KeyCalendar>,

    /// Increase log verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,
}

#[derive(Subcommand)]
enum Commands {
    /// Expand recurrence inputs into one first occurrence per weekday
    Expand {
        /// Input file (reads from stdin if omitted)
        #[arg(short, long)]
        input: Option<String>,
        /// Output file (writes to stdout if omitted)
        #[arg(short, long)]
        output: Option<String>,
    },
    /// Write a request's series into an in-memory store and print the records
    Materialize {
        /// Input file (reads from stdin if omitted)
        #[arg(short, long)]
        input: Option<String>,
        /// Output file (writes to stdout if omitted)
        #[arg(short, long)]
        output: Option<String>,
        /// Make the store reject every call of this write step
        #[arg(long)]
        fail_at: Option<WriteStep>,
        /// Keep records written before a failure instead of discarding them
        #[arg(long)]
        leave_partial: bool,
    },
    /// Print the occurrence key for a date at a time of day
    Key {
        /// Calendar date, YYYY-MM-DD
        date: String,
        /// Series time, HH:MM
        time: TimeOfDay,
    },
}

/// `expand` accepts a single input or a list of them.
#[derive(Deserialize)]
#[serde(untagged)]
enum OneOrMany {
    One(Box<RecurrenceInput>),
    Many(Vec<RecurrenceInput>),
}

impl OneOrMany {
    fn into_vec(self) -> Vec<RecurrenceInput> {
        match self {
            OneOrMany::One(input) => vec![*input],
            OneOrMany::Many(inputs) => inputs,
        }
    }
}

#[derive(Serialize)]
struct ExpandedOutput {
    /// Index of the input this schedule came from.
    input: usize,
    #[serde(flatten)]
    schedule: ExpandedSchedule,
}

#[derive(Deserialize)]
struct MaterializeRequest {
    context: SeriesContext,
    inputs: Vec<RecurrenceInput>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct MaterializeOutput {
    series_ids: Vec<SeriesId>,
    records: StoreSnapshot,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let config = load_config(&cli)?;
    tracing::debug!(?config, "configuration loaded");

    match cli.command {
        Commands::Expand { input, output } => {
            let raw = read_input(input.as_deref())?;
            let inputs = serde_json::from_str::<OneOrMany>(&raw)
                .context("Failed to parse recurrence input JSON")?
                .into_vec();

            let mut expanded = Vec::new();
            for (index, inp) in inputs.iter().enumerate() {
                let schedules = expand(inp, &config)
                    .with_context(|| format!("Failed to expand input {}", index))?;
                expanded.extend(schedules.into_iter().map(|schedule| ExpandedOutput {
                    input: index,
                    schedule,
                }));
            }

            write_output(output.as_deref(), &serde_json::to_string_pretty(&expanded)?)?;
        }
        Commands::Materialize {
            input,
            output,
            fail_at,
            leave_partial,
        } => {
            let raw = read_input(input.as_deref())?;
            let request: MaterializeRequest =
                serde_json::from_str(&raw).context("Failed to parse materialize request JSON")?;

            let config = ScheduleConfig {
                failure_policy: if leave_partial {
                    FailurePolicy::LeavePartial
                } else {
                    config.failure_policy
                },
                ..config
            };
            let store = match fail_at {
                Some(step) => MemoryStore::new().fail_on(step),
                None => MemoryStore::new(),
            };

            let series_ids = match Materializer::new(&store, config)
                .materialize(&request.context, &request.inputs)
                .await
            {
                Ok(ids) => ids,
                Err(err) => {
                    report_partial(&err);
                    return Err(err).context("Failed to materialize schedule");
                }
            };

            let result = MaterializeOutput {
                series_ids,
                records: store.snapshot()?,
            };
            write_output(output.as_deref(), &serde_json::to_string_pretty(&result)?)?;
        }
        Commands::Key { date, time } => {
            let key = occurrence_key(&date, time, config.key_calendar)
                .context("Failed to compute occurrence key")?;
            println!("{}", key.to_rfc3339_opts(SecondsFormat::Millis, true));
        }
    }

    Ok(())
}

/// Log to stderr. `RUST_LOG` wins over `-v`.
fn init_tracing(verbose: u8) {
    let default = match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(io::stderr).with_target(true))
        .init();
}

/// Settings file first, then individual flags on top.
fn load_config(cli: &Cli) -> Result<ScheduleConfig> {
    let mut config = match cli.config.as_deref() {
        Some(path) => {
            let raw = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read config file: {}", path))?;
            serde_json::from_str(&raw)
                .with_context(|| format!("Failed to parse config file: {}", path))?
        }
        None => ScheduleConfig::default(),
    };

    if let Some(time) = cli.default_time {
        config.default_time = time;
    }
    if let Some(minutes) = cli.session_minutes {
        config.session_minutes = minutes;
    }
    if let Some(calendar) = cli.key_calendar {
        config.key_calendar = calendar;
    }
    Ok(config)
}

fn report_partial(err: &ScheduleError) {
    if let ScheduleError::Write { partial, .. } = err {
        eprintln!(
            "{} series written, {} discarded, {} left behind",
            partial.written.len(),
            partial.compensated.len(),
            partial.written.len() - partial.compensated.len()
        );
        for (id, reason) in &partial.orphaned {
            eprintln!("  orphaned {}: {}", id, reason);
        }
    }
}

fn read_input(path: Option<&str>) -> Result<String> {
    match path {
        Some(path) => {
            std::fs::read_to_string(path).with_context(|| format!("Failed to read file: {}", path))
        }
        None => {
            let mut buf = String::new();
            io::stdin()
                .read_to_string(&mut buf)
                .context("Failed to read from stdin")?;
            Ok(buf)
        }
    }
}

fn write_output(path: Option<&str>, content: &str) -> Result<()> {
    match path {
        Some(path) => {
            std::fs::write(path, content)
                .with_context(|| format!("Failed to write file: {}", path))?;
        }
        None => {
            println!("{}", content);
        }
    }
    Ok(())
}
