//! # Loadrun Analyzer Library
//!
//! Aggregates per-run latency files from a load-testing harness into
//! comparative statistics across a matrix of (request rate, spin delay)
//! configurations.
//!
//! Each run file holds one row per request: timestamp, configured rate,
//! configured spin delay, sequence number, observed latency and a success flag.
//! The library turns a directory of such files into:
//!
//! - a **summary table** with count, failure rate, mean, p50, p95 and overhead
//!   for every run
//! - an **overhead matrix** (spin delay × rate) for heatmaps, with missing
//!   combinations marked explicitly
//! - **latency series** (rate → p50/p95 per spin delay) for line charts
//!
//! ## Architecture Overview
//!
//! - `schema`: tolerant header resolution and row coercion
//! - `warmup`: startup window exclusion
//! - `metrics`: per-run statistics and type-7 percentiles
//! - `aggregate`: fold runs into the summary table
//! - `matrix`: reshape the table into the overhead grid
//! - `visualization`: payloads for external renderers
//! - `pipeline`: sequential orchestration with per-file error isolation
//! - `results`: CSV and JSON export
//!
//! ## Usage Example
//!
//! ```rust,no_run
//! use loadrun_analyzer::{discovery, AnalysisConfig, AnalysisRunner};
//! use regex::Regex;
//! use std::path::Path;
//!
//! fn main() -> anyhow::Result<()> {
//!     let include = Regex::new(loadrun_analyzer::defaults::FILE_PATTERN)?;
//!     let files = discovery::discover_result_files(Path::new("results"), &include)?;
//!
//!     let runner = AnalysisRunner::new(AnalysisConfig::default());
//!     let outcome = runner.run(&files)?;
//!
//!     for row in outcome.table.rows() {
//!         println!("{:?} -> {:?}", row.metrics.key(), row.metrics.overhead);
//!     }
//!     Ok(())
//! }
//! ```

/// Summary table construction and duplicate handling
pub mod aggregate;

/// Command-line interface and analysis configuration
///
/// Provides argument parsing using clap and converts CLI options into the
/// `AnalysisConfig` passed to the pipeline stages.
pub mod cli;

pub mod discovery;

/// Error taxonomy and non-fatal diagnostics
pub mod error;

pub mod logging;

/// Overhead matrix for heatmap consumption
pub mod matrix;

/// Per-run metric derivation
///
/// Computes mean, percentiles, failure rate and overhead from a filtered run.
/// Percentiles use linear interpolation between order statistics.
pub mod metrics;

pub mod pipeline;

/// Summary CSV and JSON report output
pub mod results;

/// Record normalization
pub mod schema;

pub mod utils;

pub mod visualization;

pub mod warmup;

pub use aggregate::{RunAggregator, SummaryRow, SummaryTable};
pub use cli::{AnalysisConfig, Args};
pub use error::{AnalysisError, Diagnostic};
pub use matrix::{MatrixCell, OverheadMatrix};
pub use metrics::{MetricCalculator, OverheadBasis, RunMetrics};
pub use pipeline::{AnalysisOutcome, AnalysisRunner};
pub use results::SummaryExporter;
pub use schema::{RawRow, Run, RunKey};
pub use warmup::WarmupFilter;

/// The current version, reported in JSON output
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Default configuration values
pub mod defaults {
    use std::time::Duration;

    /// Warm-up window excluded from the start of every run
    pub const WARMUP: Duration = Duration::from_secs(120);

    pub const RESULTS_DIR: &str = "results";

    /// Result files written by the load driver: `results-<rps>rps-<spin>ms.csv`
    pub const FILE_PATTERN: &str = r"^results-.*\.csv$";

    pub const SUMMARY_FILE: &str = "summary.csv";

    pub const PAYLOAD_FILE: &str = "visualization.json";

    /// Percentiles listed in the JSON report
    pub const PERCENTILES: [f64; 3] = [50.0, 95.0, 99.0];
}
