use crate::metrics::OverheadBasis;
use clap::Parser;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Loadrun Analyzer - aggregate load test latency files into summary tables
#[derive(Parser, Debug, Clone)]
#[clap(version, about, long_about = None)]
pub struct Args {
    /// Directory containing per-run result CSVs
    #[clap(short = 'd', long, default_value = crate::defaults::RESULTS_DIR, help_heading = "Input")]
    pub results_dir: PathBuf,

    /// Regular expression selecting result files by name
    #[clap(long, default_value = crate::defaults::FILE_PATTERN, help_heading = "Input")]
    pub pattern: String,

    /// Initial window of each run excluded from metrics (e.g. "2m", "90s")
    #[clap(short = 'w', long, value_parser = parse_duration, default_value = "2m", help_heading = "Analysis")]
    pub warmup: Duration,

    /// Percentiles included in the JSON report
    #[clap(long, default_values_t = crate::defaults::PERCENTILES.to_vec(), num_args = 1.., help_heading = "Analysis")]
    pub percentiles: Vec<f64>,

    /// Central latency used for the overhead column and heatmap
    #[clap(long, value_enum, default_value_t = OverheadBasis::Mean, help_heading = "Analysis")]
    pub overhead_basis: OverheadBasis,

    /// Summary table output (CSV). Defaults to <results-dir>/summary.csv
    #[clap(short = 'o', long, help_heading = "Output")]
    pub summary_csv: Option<PathBuf>,

    /// Visualization payload output (JSON). Defaults to <results-dir>/visualization.json
    #[clap(long, help_heading = "Output")]
    pub payload_json: Option<PathBuf>,

    /// Full JSON report including diagnostics
    #[clap(long, help_heading = "Output")]
    pub report_json: Option<PathBuf>,

    /// Do not print the summary table to stdout
    #[clap(long, default_value_t = false, help_heading = "Output")]
    pub quiet_table: bool,

    /// Verbose output
    #[clap(short = 'v', long, default_value_t = false)]
    pub verbose: bool,

    /// Also write log output to this file
    #[clap(long)]
    pub log_file: Option<PathBuf>,
}

impl Args {
    pub fn summary_csv_path(&self) -> PathBuf {
        self.summary_csv
            .clone()
            .unwrap_or_else(|| self.results_dir.join(crate::defaults::SUMMARY_FILE))
    }

    pub fn payload_json_path(&self) -> PathBuf {
        self.payload_json
            .clone()
            .unwrap_or_else(|| self.results_dir.join(crate::defaults::PAYLOAD_FILE))
    }
}

/// Parameters that change how runs are analyzed
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct AnalysisConfig {
    pub warmup: Duration,
    pub percentiles: Vec<f64>,
    pub overhead_basis: OverheadBasis,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            warmup: crate::defaults::WARMUP,
            percentiles: crate::defaults::PERCENTILES.to_vec(),
            overhead_basis: OverheadBasis::Mean,
        }
    }
}

impl From<&Args> for AnalysisConfig {
    fn from(args: &Args) -> Self {
        Self {
            warmup: args.warmup,
            percentiles: args.percentiles.clone(),
            overhead_basis: args.overhead_basis,
        }
    }
}

/// Parse duration from string (e.g., "10s", "5m", "1h")
pub fn parse_duration(s: &str) -> Result<Duration, String> {
    let s = s.trim();

    if s.is_empty() {
        return Err("Duration cannot be empty".to_string());
    }

    let (num_str, unit) = if let Some(stripped) = s.strip_suffix("ms") {
        (stripped, "ms")
    } else if let Some(stripped) = s.strip_suffix('s') {
        (stripped, "s")
    } else if let Some(stripped) = s.strip_suffix('m') {
        (stripped, "m")
    } else if let Some(stripped) = s.strip_suffix('h') {
        (stripped, "h")
    } else {
        (s, "s") // Default to seconds
    };

    let num: f64 = num_str
        .trim()
        .parse()
        .map_err(|_| format!("Invalid number in duration: {}", num_str))?;
    if !num.is_finite() || num < 0.0 {
        return Err(format!("Duration must be a non-negative number: {}", num_str));
    }

    let millis = match unit {
        "ms" => num,
        "s" => num * 1_000.0,
        "m" => num * 60_000.0,
        "h" => num * 3_600_000.0,
        _ => return Err(format!("Invalid duration unit: {}", unit)),
    };

    Ok(Duration::from_millis(millis.round() as u64))
}
