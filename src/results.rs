use crate::aggregate::{SummaryRow, SummaryTable};
use crate::cli::AnalysisConfig;
use crate::error::Diagnostic;
use crate::matrix::OverheadMatrix;
use crate::metrics::RunMetrics;
use crate::pipeline::AnalysisOutcome;
use crate::utils::{
    format_latency_ms, format_overhead, format_percent, print_table_row, print_table_separator,
};
use anyhow::{Context, Result};
use serde::Serialize;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// One line of the summary CSV
#[derive(Debug, Serialize)]
struct SummaryRecord {
    source: String,
    rps: u32,
    spin_ms: u32,
    total_count: usize,
    failure_count: usize,
    failure_rate: f64,
    mean_latency_ms: f64,
    p50_latency_ms: f64,
    p95_latency_ms: f64,
    overhead: Option<f64>,
}

impl From<&SummaryRow> for SummaryRecord {
    fn from(row: &SummaryRow) -> Self {
        let m = &row.metrics;
        Self {
            source: row.source.display().to_string(),
            rps: m.rate,
            spin_ms: m.spin_delay_ms,
            total_count: m.total_count,
            failure_count: m.failure_count,
            failure_rate: m.failure_rate,
            mean_latency_ms: m.mean_latency_ms,
            p50_latency_ms: m.p50_latency_ms,
            p95_latency_ms: m.p95_latency_ms,
            overhead: m.overhead,
        }
    }
}

/// Full JSON report
#[derive(Debug, Serialize)]
pub struct AnalysisReport<'a> {
    pub metadata: ReportMetadata,
    pub config: &'a AnalysisConfig,
    pub runs: Vec<&'a SummaryRow>,
    pub overhead_matrix: &'a OverheadMatrix,
    pub diagnostics: &'a [Diagnostic],
}

/// Report metadata
#[derive(Debug, Serialize)]
pub struct ReportMetadata {
    pub version: String,
    pub timestamp: chrono::DateTime<chrono::Utc>,
    pub files_discovered: usize,
    pub runs_aggregated: usize,
    pub skipped_files: usize,
    pub empty_runs: usize,
    pub duplicate_runs: usize,
}

/// Writes the summary table and, optionally, the JSON report
pub struct SummaryExporter {
    csv_path: PathBuf,
    report_path: Option<PathBuf>,
}

impl SummaryExporter {
    pub fn new(csv_path: &Path) -> Self {
        Self {
            csv_path: csv_path.to_path_buf(),
            report_path: None,
        }
    }

    pub fn with_report(mut self, report_path: Option<&Path>) -> Self {
        self.report_path = report_path.map(Path::to_path_buf);
        self
    }

    pub fn csv_path(&self) -> &Path {
        &self.csv_path
    }

    /// Write every configured output, replacing existing files
    pub fn finalize(&self, outcome: &AnalysisOutcome, config: &AnalysisConfig) -> Result<()> {
        self.write_csv(&outcome.table)?;
        if let Some(ref report_path) = self.report_path {
            Self::write_report(report_path, outcome, config)?;
        }
        Ok(())
    }

    /// One row per run; an undefined overhead is an empty cell
    pub fn write_csv(&self, table: &SummaryTable) -> Result<()> {
        let mut writer = csv::Writer::from_path(&self.csv_path)
            .with_context(|| format!("Failed to create summary file: {}", self.csv_path.display()))?;
        for row in table.rows() {
            writer.serialize(SummaryRecord::from(row))?;
        }
        writer.flush()?;

        info!("Summary table written to: {:?}", self.csv_path);
        Ok(())
    }

    pub fn write_report(path: &Path, outcome: &AnalysisOutcome, config: &AnalysisConfig) -> Result<()> {
        let report = AnalysisReport {
            metadata: ReportMetadata {
                version: crate::VERSION.to_string(),
                timestamp: chrono::Utc::now(),
                files_discovered: outcome.files_discovered,
                runs_aggregated: outcome.table.len(),
                skipped_files: outcome.skipped_files(),
                empty_runs: outcome.empty_runs(),
                duplicate_runs: outcome.duplicate_runs(),
            },
            config,
            runs: outcome.table.rows().collect(),
            overhead_matrix: &outcome.matrix,
            diagnostics: &outcome.diagnostics,
        };

        let json = serde_json::to_string_pretty(&report)?;
        std::fs::write(path, json)
            .with_context(|| format!("Failed to write report: {}", path.display()))?;

        debug!("Report contains {} runs", report.runs.len());
        info!("Report written to: {:?}", path);
        Ok(())
    }
}

const SUMMARY_COLUMNS: [&str; 8] = ["rps", "spin", "count", "fail %", "mean", "p50", "p95", "overhead"];
const SUMMARY_WIDTHS: [usize; 8] = [8, 8, 8, 9, 10, 10, 10, 10];

/// Console cells for one run, in `SUMMARY_COLUMNS` order
fn summary_cells(m: &RunMetrics) -> [String; 8] {
    [
        m.rate.to_string(),
        format!("{}ms", m.spin_delay_ms),
        m.total_count.to_string(),
        format_percent(m.failure_rate),
        format_latency_ms(m.mean_latency_ms),
        format_latency_ms(m.p50_latency_ms),
        format_latency_ms(m.p95_latency_ms),
        format_overhead(m.overhead),
    ]
}

/// Print the summary table to stdout
pub fn print_summary_table(table: &SummaryTable) {
    print_table_separator(&SUMMARY_WIDTHS);
    print_table_row(&SUMMARY_COLUMNS, &SUMMARY_WIDTHS);
    print_table_separator(&SUMMARY_WIDTHS);
    for row in table.rows() {
        let cells = summary_cells(&row.metrics);
        let columns: Vec<&str> = cells.iter().map(String::as_str).collect();
        print_table_row(&columns, &SUMMARY_WIDTHS);
    }
    print_table_separator(&SUMMARY_WIDTHS);
}
