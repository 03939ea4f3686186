//! # Warm-up Filter
//!
//! Drops the first part of every run so startup transients (cold starts,
//! autoscaler ramp-up, connection setup) do not skew the statistics. The
//! cutoff is `started_at_ms + window`, where `started_at_ms` is the first
//! timestamp the run was loaded with. Because that anchor is never moved,
//! filtering an already filtered run removes nothing further.

use crate::schema::Run;
use std::path::PathBuf;
use std::time::Duration;
use tracing::debug;

/// Result of applying the warm-up window to a run
#[derive(Debug)]
pub enum WarmupOutcome {
    /// At least one row survived
    Retained { run: Run, removed: usize },
    /// Every row fell inside the window; the run takes no further part
    Empty { source: PathBuf, removed: usize },
}

/// Removes rows that fall inside a fixed window at the start of a run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WarmupFilter {
    window_ms: i64,
}

impl Default for WarmupFilter {
    fn default() -> Self {
        Self::new(crate::defaults::WARMUP)
    }
}

impl WarmupFilter {
    pub fn new(window: Duration) -> Self {
        Self {
            window_ms: i64::try_from(window.as_millis()).unwrap_or(i64::MAX),
        }
    }

    pub fn window(&self) -> Duration {
        Duration::from_millis(self.window_ms as u64)
    }

    /// First timestamp that is kept, or `None` for a run with no rows
    pub fn cutoff(&self, run: &Run) -> Option<i64> {
        run.started_at_ms
            .map(|start| start.saturating_add(self.window_ms))
    }

    pub fn apply(&self, mut run: Run) -> WarmupOutcome {
        let before = run.rows.len();
        if let Some(cutoff) = self.cutoff(&run) {
            run.rows.retain(|row| row.timestamp_ms >= cutoff);
        }
        let removed = before - run.rows.len();

        if run.rows.is_empty() {
            debug!(
                "{}: all {} rows inside the {:?} warm-up window",
                run.source.display(),
                removed,
                self.window()
            );
            return WarmupOutcome::Empty {
                source: run.source,
                removed,
            };
        }

        debug!(
            "{}: warm-up removed {} of {} rows",
            run.source.display(),
            removed,
            before
        );
        WarmupOutcome::Retained { run, removed }
    }
}
