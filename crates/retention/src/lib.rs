//! Soft-delete retention: a cron-scheduled sweep that purges entities
//! whose `softdel:*` marker has outlived the configured retention period.
//!
//! The scheduler process this would run as (flag parsing, daemonization)
//! is out of scope; this crate is the sweep logic and its minimal cron
//! trigger, meant to be driven from `main.rs` as a background task
//! alongside the ingest worker pool.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod cron;
pub mod error;
pub mod scheduler;
pub mod sweep;

pub use cron::CronSchedule;
pub use error::{RetentionError, Result};
pub use scheduler::{RetentionPeriod, TICK_INTERVAL};
pub use sweep::{sweep, SweepReport};
