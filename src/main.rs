//! # Loadrun Analyzer - Main Entry Point
//!
//! 1. **Initialize logging**: colorized console output, optional log file
//! 2. **Parse arguments**: results directory, warm-up window, outputs
//! 3. **Discover files**: sorted by path for reproducible duplicate handling
//! 4. **Analyze**: normalize, filter, compute and aggregate every run
//! 5. **Export**: summary CSV, visualization payload, optional JSON report
//!
//! Discovering no files, or no usable run, is the only fatal condition and
//! exits with a non-zero status.

use anyhow::{Context, Result};
use clap::Parser;
use colored::*;
use loadrun_analyzer::{
    cli::{AnalysisConfig, Args},
    discovery,
    logging::init_logging,
    pipeline::AnalysisRunner,
    results::{print_summary_table, SummaryExporter},
    visualization::{JsonPayloadWriter, Renderer},
    AnalysisError,
};
use regex::Regex;
use tracing::{error, info};

fn main() -> Result<()> {
    let args = Args::parse();
    let log_guard = init_logging(args.verbose, args.log_file.as_deref())?;

    info!("Starting Loadrun Analyzer {}", loadrun_analyzer::VERSION);
    info!("Configuration: {:?}", args);

    let include = Regex::new(&args.pattern)
        .with_context(|| format!("Invalid file pattern: {}", args.pattern))?;
    let files = discovery::discover_result_files(&args.results_dir, &include)?;
    info!("Discovered {} result files in {:?}", files.len(), args.results_dir);

    let config = AnalysisConfig::from(&args);
    let runner = AnalysisRunner::new(config.clone());
    let outcome = match runner.run(&files) {
        Ok(outcome) => outcome,
        Err(e @ AnalysisError::NoData(_)) => {
            error!("{}", e);
            eprintln!("{}", format!("No data in {}", args.results_dir.display()).red().bold());
            drop(log_guard);
            std::process::exit(1);
        }
        Err(e) => return Err(e.into()),
    };

    if !args.quiet_table {
        print_summary_table(&outcome.table);
    }

    SummaryExporter::new(&args.summary_csv_path())
        .with_report(args.report_json.as_deref())
        .finalize(&outcome, &config)?;

    JsonPayloadWriter::new(args.payload_json_path()).render(&outcome.payload())?;

    info!(
        "Analysis complete: {} runs, {} diagnostics",
        outcome.table.len(),
        outcome.diagnostics.len()
    );
    drop(log_guard);
    Ok(())
}
