//! # Run Aggregator
//!
//! Folds per-run metrics into a `SummaryTable` keyed by (rate, spin-delay).
//! Runs must be inserted in discovery order: when two files resolve to the same
//! key, the later insert replaces the earlier one and a `DuplicateRun`
//! diagnostic is returned.

use crate::error::Diagnostic;
use crate::metrics::RunMetrics;
use crate::schema::RunKey;
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};
use std::path::PathBuf;
use tracing::warn;

/// One row of the summary: a run's metrics plus the file they came from
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SummaryRow {
    pub source: PathBuf,
    #[serde(flatten)]
    pub metrics: RunMetrics,
}

/// Accumulates run metrics in discovery order
#[derive(Debug, Default)]
pub struct RunAggregator {
    entries: BTreeMap<RunKey, SummaryRow>,
}

impl RunAggregator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a run; returns a diagnostic if it replaced an earlier run
    pub fn insert(&mut self, source: impl Into<PathBuf>, metrics: RunMetrics) -> Option<Diagnostic> {
        let source = source.into();
        let key = metrics.key();
        let previous = self.entries.insert(
            key,
            SummaryRow {
                source: source.clone(),
                metrics,
            },
        )?;

        let diagnostic = Diagnostic::DuplicateRun {
            rate: key.rate,
            spin_delay_ms: key.spin_delay_ms,
            replaced: previous.source,
            kept: source,
        };
        warn!("{}", diagnostic);
        Some(diagnostic)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn finish(self) -> SummaryTable {
        SummaryTable {
            entries: self.entries,
        }
    }
}

/// Read-only table of run metrics keyed by (rate, spin-delay)
///
/// Rows iterate in key order: ascending rate, then ascending spin-delay.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SummaryTable {
    entries: BTreeMap<RunKey, SummaryRow>,
}

impl SummaryTable {
    pub fn get(&self, key: &RunKey) -> Option<&SummaryRow> {
        self.entries.get(key)
    }

    pub fn rows(&self) -> impl Iterator<Item = &SummaryRow> {
        self.entries.values()
    }

    pub fn entries(&self) -> &BTreeMap<RunKey, SummaryRow> {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Sorted distinct request rates
    pub fn distinct_rates(&self) -> Vec<u32> {
        self.entries
            .keys()
            .map(|k| k.rate)
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }

    /// Sorted distinct spin delays
    pub fn distinct_spin_delays(&self) -> Vec<u32> {
        self.entries
            .keys()
            .map(|k| k.spin_delay_ms)
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn metrics(rate: u32, spin: u32, mean: f64) -> RunMetrics {
        RunMetrics {
            rate,
            spin_delay_ms: spin,
            total_count: 10,
            failure_count: 0,
            failure_rate: 0.0,
            mean_latency_ms: mean,
            p50_latency_ms: mean,
            p95_latency_ms: mean,
            overhead: crate::metrics::overhead(mean, spin),
            median_overhead: crate::metrics::overhead(mean, spin),
            min_latency_ms: mean,
            max_latency_ms: mean,
            std_dev_latency_ms: 0.0,
            percentiles: Vec::new(),
        }
    }

    #[test]
    fn test_later_duplicate_wins() {
        let mut aggregator = RunAggregator::new();
        assert!(aggregator.insert("a.csv", metrics(50, 5, 100.0)).is_none());
        let diag = aggregator.insert("b.csv", metrics(50, 5, 7.0));

        assert!(matches!(
            diag,
            Some(Diagnostic::DuplicateRun { rate: 50, spin_delay_ms: 5, .. })
        ));
        let table = aggregator.finish();
        assert_eq!(table.len(), 1);
        let row = table.get(&RunKey::new(50, 5)).unwrap();
        assert_eq!(row.source, PathBuf::from("b.csv"));
        assert_eq!(row.metrics, metrics(50, 5, 7.0));
    }

    #[test]
    fn test_rows_in_key_order_and_distinct_axes() {
        let mut aggregator = RunAggregator::new();
        aggregator.insert("c.csv", metrics(200, 10, 12.0));
        aggregator.insert("a.csv", metrics(50, 20, 22.0));
        aggregator.insert("b.csv", metrics(50, 10, 11.0));
        let table = aggregator.finish();

        let keys: Vec<RunKey> = table.rows().map(|r| r.metrics.key()).collect();
        assert_eq!(
            keys,
            vec![RunKey::new(50, 10), RunKey::new(50, 20), RunKey::new(200, 10)]
        );
        assert_eq!(table.distinct_rates(), vec![50, 200]);
        assert_eq!(table.distinct_spin_delays(), vec![10, 20]);
    }

    #[test]
    fn test_empty_table() {
        let table = RunAggregator::new().finish();
        assert!(table.is_empty());
        assert!(table.distinct_rates().is_empty());
    }
}
