//! # Matrix Builder
//!
//! Reshapes a `SummaryTable` into a spin-delay × rate grid for heatmaps.
//! Rows are the sorted distinct spin delays, columns the sorted distinct rates.
//! Sparse coverage is normal: a cell with no run, or with an undefined
//! overhead, is an explicit `Missing` variant rather than a sentinel float.

use crate::aggregate::SummaryTable;
use crate::schema::RunKey;
use serde::Serialize;

/// Why a cell carries no value
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MissingReason {
    /// No run covers this (rate, spin-delay)
    NoRun,
    /// A run exists but its overhead is undefined (spin-delay of zero)
    Undefined,
}

/// A single heatmap cell
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum MatrixCell {
    Value { overhead: f64 },
    Missing { reason: MissingReason },
}

impl MatrixCell {
    pub fn value(&self) -> Option<f64> {
        match self {
            MatrixCell::Value { overhead } => Some(*overhead),
            MatrixCell::Missing { .. } => None,
        }
    }

    pub fn is_missing(&self) -> bool {
        matches!(self, MatrixCell::Missing { .. })
    }
}

/// Overhead grid indexed by spin delay (rows) and rate (columns)
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OverheadMatrix {
    pub spin_delays_ms: Vec<u32>,
    pub rates: Vec<u32>,
    pub cells: Vec<Vec<MatrixCell>>,
}

impl OverheadMatrix {
    pub fn from_table(table: &SummaryTable) -> Self {
        let spin_delays_ms = table.distinct_spin_delays();
        let rates = table.distinct_rates();

        let cells = spin_delays_ms
            .iter()
            .map(|&spin| {
                rates
                    .iter()
                    .map(|&rate| match table.get(&RunKey::new(rate, spin)) {
                        None => MatrixCell::Missing {
                            reason: MissingReason::NoRun,
                        },
                        Some(row) => match row.metrics.overhead {
                            Some(overhead) if overhead.is_finite() => MatrixCell::Value { overhead },
                            _ => MatrixCell::Missing {
                                reason: MissingReason::Undefined,
                            },
                        },
                    })
                    .collect()
            })
            .collect();

        Self {
            spin_delays_ms,
            rates,
            cells,
        }
    }

    /// (rows, columns)
    pub fn shape(&self) -> (usize, usize) {
        (self.spin_delays_ms.len(), self.rates.len())
    }

    pub fn cell(&self, spin_delay_ms: u32, rate: u32) -> Option<&MatrixCell> {
        let row = self.spin_delays_ms.binary_search(&spin_delay_ms).ok()?;
        let col = self.rates.binary_search(&rate).ok()?;
        self.cells.get(row)?.get(col)
    }

    pub fn missing_count(&self) -> usize {
        self.cells
            .iter()
            .flatten()
            .filter(|cell| cell.is_missing())
            .count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aggregate::RunAggregator;
    use crate::metrics::RunMetrics;

    fn metrics(rate: u32, spin: u32, mean: f64) -> RunMetrics {
        RunMetrics {
            rate,
            spin_delay_ms: spin,
            total_count: 1,
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

    fn table(entries: &[(u32, u32, f64)]) -> SummaryTable {
        let mut aggregator = RunAggregator::new();
        for &(rate, spin, mean) in entries {
            aggregator.insert(format!("{}-{}.csv", rate, spin), metrics(rate, spin, mean));
        }
        aggregator.finish()
    }

    #[test]
    fn test_ragged_coverage() {
        let matrix = OverheadMatrix::from_table(&table(&[
            (10, 5, 10.0),
            (20, 5, 15.0),
            (20, 10, 12.0),
        ]));

        assert_eq!(matrix.shape(), (2, 2));
        assert_eq!(matrix.spin_delays_ms, vec![5, 10]);
        assert_eq!(matrix.rates, vec![10, 20]);
        assert_eq!(matrix.cell(5, 10).and_then(|c| c.value()), Some(1.0));
        assert_eq!(matrix.cell(5, 20).and_then(|c| c.value()), Some(2.0));
        assert_eq!(
            matrix.cell(10, 10),
            Some(&MatrixCell::Missing {
                reason: MissingReason::NoRun
            })
        );
        assert!((matrix.cell(10, 20).and_then(|c| c.value()).unwrap() - 0.2).abs() < 1e-12);
        assert_eq!(matrix.missing_count(), 1);
    }

    #[test]
    fn test_zero_spin_row_is_undefined() {
        let matrix = OverheadMatrix::from_table(&table(&[(10, 0, 3.0), (10, 5, 6.0)]));
        assert_eq!(
            matrix.cell(0, 10),
            Some(&MatrixCell::Missing {
                reason: MissingReason::Undefined
            })
        );
        assert!(matrix.cell(5, 10).unwrap().value().is_some());
    }

    #[test]
    fn test_every_cell_indexed() {
        let matrix = OverheadMatrix::from_table(&table(&[
            (1, 1, 2.0),
            (2, 3, 4.0),
            (5, 7, 8.0),
            (9, 1, 1.5),
        ]));
        let (rows, cols) = matrix.shape();
        assert_eq!((rows, cols), (3, 4));
        assert_eq!(matrix.cells.len(), rows);
        for row in &matrix.cells {
            assert_eq!(row.len(), cols);
            for cell in row {
                match cell {
                    MatrixCell::Value { overhead } => assert!(overhead.is_finite()),
                    MatrixCell::Missing { .. } => {}
                }
            }
        }
        assert!(matrix.cell(2, 1).is_none());
    }

    #[test]
    fn test_empty_table_gives_empty_matrix() {
        let matrix = OverheadMatrix::from_table(&SummaryTable::default());
        assert_eq!(matrix.shape(), (0, 0));
        assert!(matrix.cells.is_empty());
    }

    #[test]
    fn test_cell_serializes_tagged() {
        let cell = MatrixCell::Missing {
            reason: MissingReason::NoRun,
        };
        let json = serde_json::to_value(cell).unwrap();
        assert_eq!(json["state"], "missing");
        assert_eq!(json["reason"], "no_run");
    }
}
