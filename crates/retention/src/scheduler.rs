//! Minute-resolution tick loop that fires [`crate::sweep::sweep`] whenever
//! the wall clock matches the configured cron schedule.

use std::time::Duration;

use chrono::{Timelike, Utc};
use progressdb_core::clock::next_ns;
use progressdb_storage::Stores;
use tokio::sync::watch;

use crate::cron::CronSchedule;
use crate::sweep::sweep;

/// How often the scheduler wakes to check the clock against the schedule.
/// One minute matches cron's own resolution; checking more often would
/// just burn cycles re-checking a minute that hasn't changed.
pub const TICK_INTERVAL: Duration = Duration::from_secs(60);

/// Nanosecond retention period the sweep purges against.
#[derive(Debug, Clone, Copy)]
pub struct RetentionPeriod(
    /// Nanoseconds a soft-deleted entity survives before becoming
    /// eligible for purge.
    pub i64,
);

/// Drive [`sweep`] on `schedule`, stopping as soon as `shutdown` reports a
/// `true` value.
pub async fn run(stores: Stores, schedule: CronSchedule, period: RetentionPeriod, mut shutdown: watch::Receiver<bool>) {
    let mut ticker = tokio::time::interval(TICK_INTERVAL);
    let mut last_fired_minute = None;
    loop {
        tokio::select! {
            _ = ticker.tick() => {
                let now = Utc::now();
                let minute_key = (now.date_naive(), now.hour(), now.minute());
                if last_fired_minute == Some(minute_key) {
                    continue;
                }
                if !schedule.matches(now) {
                    continue;
                }
                last_fired_minute = Some(minute_key);
                match sweep(&stores, period.0, next_ns()) {
                    Ok(report) => tracing::debug!(?report, "retention sweep completed"),
                    Err(e) => tracing::warn!(error = %e, "retention sweep failed"),
                }
            }
            res = shutdown.changed() => {
                if res.is_err() || *shutdown.borrow() {
                    tracing::info!("retention scheduler stopping");
                    break;
                }
            }
        }
    }
}
