//! Bin fill-level simulation.
//!
//! There is no sensor feed: a bin's fill level is a synthetic, linear
//! function of the time elapsed since it was last emptied, on a fixed
//! 480-hour (20-day) cycle. The level is recomputed and persisted on every
//! staff dashboard read, so repeated reads within the same second are
//! idempotent and the level never moves backwards until a reset.

use chrono::{DateTime, Utc};
use tracing::warn;

use crate::model::{BinStatus, DISPATCH_THRESHOLD, FILL_CYCLE_HOURS};
use crate::storage::Storage;

/// Seconds of elapsed time per percentage point of fill.
const SECS_PER_FILL_PERCENT: i64 = FILL_CYCLE_HOURS * 3600 / 100;

/// Outcome of a bulk fill-level refresh.
///
/// Per-bin persistence failures are reported, not swallowed: the caller
/// gets the ids of bins whose stored state may be stale.
#[derive(Debug, Default)]
pub struct RefreshReport {
    pub updated: usize,
    pub failed: Vec<i64>,
}

/// Fill percentage for a bin last emptied at `last_emptied`, as of `now`.
///
/// Floor semantics, capped at 100. A `last_emptied` in the future (clock
/// skew) reads as 0 rather than going negative.
pub fn fill_level_at(last_emptied: DateTime<Utc>, now: DateTime<Utc>) -> i64 {
    let elapsed_secs = (now - last_emptied).num_seconds().max(0);
    (elapsed_secs / SECS_PER_FILL_PERCENT).min(100)
}

/// Recompute and persist fill level and status for every bin.
///
/// Failures on individual bins leave that bin's previous state in place and
/// are collected into the report; the refresh continues with the remaining
/// bins.
pub async fn refresh_bins(storage: &Storage, now: DateTime<Utc>) -> anyhow::Result<RefreshReport> {
    let bins = storage.list_bins().await?;

    let mut report = RefreshReport::default();
    for bin in bins {
        let fill_level = fill_level_at(bin.last_emptied, now);
        let status = BinStatus::from_fill_level(fill_level);

        match storage.update_bin_state(bin.id, fill_level, status).await {
            Ok(()) => report.updated += 1,
            Err(e) => {
                warn!(bin_id = bin.id, error = %e, "Failed to persist bin fill level");
                report.failed.push(bin.id);
            }
        }
    }

    Ok(report)
}

/// Empty every bin at or above the dispatch threshold.
///
/// Returns the number of bins reset. The reset is a single statement, so a
/// dispatch either empties all qualifying bins or none of them.
pub async fn dispatch_collection(storage: &Storage, now: DateTime<Utc>) -> anyhow::Result<u64> {
    storage.reset_full_bins(DISPATCH_THRESHOLD, now).await
}
