use crate::error::{ConfigField, Diagnostic};
use crate::schema::{Run, RunKey};
use anyhow::Result;
use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::{debug, warn};

/// Which central value the overhead is computed from
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OverheadBasis {
    /// (mean latency - spin) / spin
    #[default]
    Mean,
    /// (median latency - spin) / spin
    Median,
}

/// Percentile value pair
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PercentileValue {
    pub percentile: f64,
    pub value_ms: f64,
}

/// Derived metrics for one run after warm-up filtering
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunMetrics {
    pub rate: u32,
    pub spin_delay_ms: u32,
    pub total_count: usize,
    pub failure_count: usize,
    pub failure_rate: f64,
    pub mean_latency_ms: f64,
    pub p50_latency_ms: f64,
    pub p95_latency_ms: f64,
    /// `None` when the spin delay is zero
    pub overhead: Option<f64>,
    pub median_overhead: Option<f64>,
    pub min_latency_ms: f64,
    pub max_latency_ms: f64,
    pub std_dev_latency_ms: f64,
    pub percentiles: Vec<PercentileValue>,
}

impl RunMetrics {
    pub fn key(&self) -> RunKey {
        RunKey::new(self.rate, self.spin_delay_ms)
    }
}

/// Fractional excess of `latency_ms` over the configured spin delay
pub fn overhead(latency_ms: f64, spin_delay_ms: u32) -> Option<f64> {
    if spin_delay_ms == 0 {
        return None;
    }
    let spin = f64::from(spin_delay_ms);
    Some((latency_ms - spin) / spin)
}

/// Pick the most frequent value, preferring `first` on ties
fn majority(values: impl Iterator<Item = u32>, first: u32) -> (u32, usize) {
    let mut counts: BTreeMap<u32, usize> = BTreeMap::new();
    for value in values {
        *counts.entry(value).or_default() += 1;
    }
    let best = counts.values().copied().max().unwrap_or(0);
    let chosen = if counts.get(&first).copied() == Some(best) {
        first
    } else {
        counts
            .iter()
            .find(|&(_, &count)| count == best)
            .map(|(&value, _)| value)
            .unwrap_or(first)
    };
    (chosen, counts.len())
}

/// Computes `RunMetrics` from a filtered run
#[derive(Debug, Clone)]
pub struct MetricCalculator {
    overhead_basis: OverheadBasis,
    percentiles: Vec<f64>,
}

impl Default for MetricCalculator {
    fn default() -> Self {
        Self::new(OverheadBasis::default(), crate::defaults::PERCENTILES.to_vec())
    }
}

impl MetricCalculator {
    pub fn new(overhead_basis: OverheadBasis, percentiles: Vec<f64>) -> Self {
        Self {
            overhead_basis,
            percentiles,
        }
    }

    /// Compute metrics for a non-empty run.
    ///
    /// Rows that disagree on rate or spin-delay produce a consistency
    /// diagnostic and the majority value is used.
    pub fn compute(&self, run: &Run) -> Result<(RunMetrics, Vec<Diagnostic>)> {
        let first = match run.rows.first() {
            Some(row) => row,
            None => anyhow::bail!("Cannot compute metrics for empty run {}", run.source.display()),
        };

        let mut diagnostics = Vec::new();
        let mut resolve = |field: ConfigField, values: Vec<u32>, first_value: u32| -> u32 {
            let (chosen, distinct_values) = majority(values.into_iter(), first_value);
            if distinct_values > 1 {
                let diagnostic = Diagnostic::Consistency {
                    source: run.source.clone(),
                    field,
                    chosen,
                    distinct_values,
                };
                warn!("{}", diagnostic);
                diagnostics.push(diagnostic);
            }
            chosen
        };
        let rate = resolve(
            ConfigField::Rate,
            run.rows.iter().map(|r| r.rate).collect(),
            first.rate,
        );
        let spin_delay_ms = resolve(
            ConfigField::SpinDelay,
            run.rows.iter().map(|r| r.spin_delay_ms).collect(),
            first.spin_delay_ms,
        );

        if let Some(file_key) = run.file_key {
            if file_key != RunKey::new(rate, spin_delay_ms) {
                debug!(
                    "{}: file name says {}, row data says rate={} spin={}ms; using row data",
                    run.source.display(),
                    file_key,
                    rate,
                    spin_delay_ms
                );
            }
        }

        let latencies: Vec<f64> = run.rows.iter().map(|r| r.latency_ms).collect();
        let mut sorted = latencies.clone();
        sorted.sort_by(f64::total_cmp);

        let (mean, min, max, std_dev) = stats::calculate_stats(&latencies);
        let p50 = stats::percentile(&sorted, 50.0).unwrap_or(0.0);
        let p95 = stats::percentile(&sorted, 95.0).unwrap_or(0.0);

        let total_count = run.rows.len();
        let failure_count = run.rows.iter().filter(|r| !r.success).count();

        let central = match self.overhead_basis {
            OverheadBasis::Mean => mean,
            OverheadBasis::Median => p50,
        };

        let metrics = RunMetrics {
            rate,
            spin_delay_ms,
            total_count,
            failure_count,
            failure_rate: failure_count as f64 / total_count as f64,
            mean_latency_ms: mean,
            p50_latency_ms: p50,
            p95_latency_ms: p95,
            overhead: overhead(central, spin_delay_ms),
            median_overhead: overhead(p50, spin_delay_ms),
            min_latency_ms: min,
            max_latency_ms: max,
            std_dev_latency_ms: std_dev,
            percentiles: stats::sorted_percentiles(&sorted, &self.percentiles),
        };

        Ok((metrics, diagnostics))
    }
}

/// Statistics over latency samples
pub mod stats {
    use super::PercentileValue;

    /// (mean, min, max, population standard deviation); zeros for no values
    pub fn calculate_stats(values: &[f64]) -> (f64, f64, f64, f64) {
        if values.is_empty() {
            return (0.0, 0.0, 0.0, 0.0);
        }

        let count = values.len() as f64;
        let mean = values.iter().sum::<f64>() / count;
        let min = values.iter().copied().fold(f64::INFINITY, f64::min);
        let max = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        let variance = values.iter().map(|x| (x - mean).powi(2)).sum::<f64>() / count;

        (mean, min, max, variance.sqrt())
    }

    /// Linear interpolation between order statistics ("type 7").
    ///
    /// `sorted` must be ascending and `p` is in percent. The virtual index is
    /// `(n - 1) * q`, and the lerp runs from whichever neighbour is closer, as
    /// NumPy's `linear` method does.
    pub fn percentile(sorted: &[f64], p: f64) -> Option<f64> {
        let n = sorted.len();
        if n == 0 {
            return None;
        }
        let q = (p / 100.0).clamp(0.0, 1.0);
        let virtual_index = (n - 1) as f64 * q;
        let floor = virtual_index.floor();
        let lower = (floor.max(0.0) as usize).min(n - 1);
        let upper = (lower + 1).min(n - 1);
        let gamma = virtual_index - floor;

        let (a, b) = (sorted[lower], sorted[upper]);
        let diff = b - a;
        if gamma >= 0.5 {
            Some(b - diff * (1.0 - gamma))
        } else {
            Some(a + diff * gamma)
        }
    }

    /// Percentiles of an already sorted sample
    pub fn sorted_percentiles(sorted: &[f64], percentiles: &[f64]) -> Vec<PercentileValue> {
        percentiles
            .iter()
            .filter_map(|&p| {
                percentile(sorted, p).map(|value_ms| PercentileValue {
                    percentile: p,
                    value_ms,
                })
            })
            .collect()
    }

    /// Percentiles of an unsorted sample
    pub fn calculate_percentiles(values: &[f64], percentiles: &[f64]) -> Vec<PercentileValue> {
        let mut sorted = values.to_vec();
        sorted.sort_by(f64::total_cmp);
        sorted_percentiles(&sorted, percentiles)
    }
}
