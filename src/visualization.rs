//! # Visualization Payloads
//!
//! Builds the data handed to chart renderers. Nothing in this crate draws
//! pixels; a `Renderer` receives a `VisualizationPayload` and does whatever it
//! likes with it. The bundled `JsonPayloadWriter` serializes the payload for
//! an external plotting step.

use crate::aggregate::SummaryTable;
use crate::matrix::OverheadMatrix;
use anyhow::{Context, Result};
use serde::Serialize;
use std::collections::BTreeMap;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use tracing::info;

/// One point on a latency-vs-rate chart
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LatencyPoint {
    pub rate: u32,
    pub p50_latency_ms: f64,
    pub p95_latency_ms: f64,
}

/// Latency against rate for a single spin delay, ordered by rate
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LatencySeries {
    pub spin_delay_ms: u32,
    pub points: Vec<LatencyPoint>,
}

/// Heatmap input: the overhead matrix with its axis labels
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HeatmapPayload {
    pub title: String,
    pub row_label: String,
    pub column_label: String,
    pub matrix: OverheadMatrix,
}

/// Everything a renderer needs
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VisualizationPayload {
    pub latency_series: Vec<LatencySeries>,
    pub heatmap: HeatmapPayload,
}

/// Group the table into one series per spin delay
pub fn latency_series(table: &SummaryTable) -> Vec<LatencySeries> {
    let mut by_spin: BTreeMap<u32, Vec<LatencyPoint>> = BTreeMap::new();
    for (key, row) in table.entries() {
        by_spin.entry(key.spin_delay_ms).or_default().push(LatencyPoint {
            rate: key.rate,
            p50_latency_ms: row.metrics.p50_latency_ms,
            p95_latency_ms: row.metrics.p95_latency_ms,
        });
    }

    by_spin
        .into_iter()
        .map(|(spin_delay_ms, mut points)| {
            points.sort_by_key(|p| p.rate);
            LatencySeries {
                spin_delay_ms,
                points,
            }
        })
        .collect()
}

impl VisualizationPayload {
    pub fn build(table: &SummaryTable, matrix: &OverheadMatrix) -> Self {
        Self {
            latency_series: latency_series(table),
            heatmap: HeatmapPayload {
                title: "Observed overhead (latency - spin) / spin".to_string(),
                row_label: "spin_ms".to_string(),
                column_label: "rps".to_string(),
                matrix: matrix.clone(),
            },
        }
    }
}

/// Consumer of visualization payloads
pub trait Renderer {
    fn render(&self, payload: &VisualizationPayload) -> Result<()>;
}

/// Writes the payload as pretty JSON, replacing any existing file
pub struct JsonPayloadWriter {
    path: PathBuf,
}

impl JsonPayloadWriter {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Renderer for JsonPayloadWriter {
    fn render(&self, payload: &VisualizationPayload) -> Result<()> {
        let file = File::create(&self.path)
            .with_context(|| format!("Failed to create payload file: {}", self.path.display()))?;
        let mut writer = BufWriter::new(file);
        serde_json::to_writer_pretty(&mut writer, payload)?;
        writeln!(writer)?;
        writer.flush()?;

        info!("Visualization payload written to: {:?}", self.path);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aggregate::RunAggregator;
    use crate::metrics::RunMetrics;
    use tempfile::tempdir;

    fn metrics(rate: u32, spin: u32, p50: f64, p95: f64) -> RunMetrics {
        RunMetrics {
            rate,
            spin_delay_ms: spin,
            total_count: 4,
            failure_count: 0,
            failure_rate: 0.0,
            mean_latency_ms: p50,
            p50_latency_ms: p50,
            p95_latency_ms: p95,
            overhead: crate::metrics::overhead(p50, spin),
            median_overhead: crate::metrics::overhead(p50, spin),
            min_latency_ms: p50,
            max_latency_ms: p95,
            std_dev_latency_ms: 0.0,
            percentiles: Vec::new(),
        }
    }

    fn sample_table() -> SummaryTable {
        let mut aggregator = RunAggregator::new();
        aggregator.insert("a.csv", metrics(100, 10, 11.0, 20.0));
        aggregator.insert("b.csv", metrics(5, 10, 10.5, 12.0));
        aggregator.insert("c.csv", metrics(5, 50, 52.0, 60.0));
        aggregator.finish()
    }

    #[test]
    fn test_series_grouped_by_spin_and_ordered_by_rate() {
        let series = latency_series(&sample_table());
        assert_eq!(series.len(), 2);
        assert_eq!(series[0].spin_delay_ms, 10);
        let rates: Vec<u32> = series[0].points.iter().map(|p| p.rate).collect();
        assert_eq!(rates, vec![5, 100]);
        assert_eq!(series[0].points[1].p95_latency_ms, 20.0);
        assert_eq!(series[1].spin_delay_ms, 50);
        assert_eq!(series[1].points.len(), 1);
    }

    #[test]
    fn test_json_writer_overwrites() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("viz.json");
        std::fs::write(&path, "stale content that is longer than nothing").unwrap();

        let table = sample_table();
        let matrix = OverheadMatrix::from_table(&table);
        let payload = VisualizationPayload::build(&table, &matrix);
        JsonPayloadWriter::new(&path).render(&payload).unwrap();

        let value: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(value["latency_series"].as_array().unwrap().len(), 2);
        assert_eq!(value["heatmap"]["matrix"]["rates"], serde_json::json!([5, 100]));
        assert_eq!(
            value["heatmap"]["matrix"]["cells"][1][1]["state"],
            "missing"
        );
    }
}
