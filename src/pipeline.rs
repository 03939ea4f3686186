//! # Analysis Pipeline
//!
//! Drives every discovered file through the stages in order:
//!
//! 1. **Normalize**: `schema::load_run` reads and coerces the file
//! 2. **Warm-up**: `WarmupFilter` drops the startup window
//! 3. **Metrics**: `MetricCalculator` derives the per-run record
//! 4. **Aggregate**: `RunAggregator` folds the record into the summary
//!
//! Files are processed one at a time in the order given, which callers must
//! keep deterministic (discovery sorts by path). A failure in one file is
//! recorded as a diagnostic and never stops the others. The only fatal
//! outcome is ending up with no usable run at all.

use crate::aggregate::{RunAggregator, SummaryTable};
use crate::cli::AnalysisConfig;
use crate::discovery::DiscoveredFile;
use crate::error::{AnalysisError, Diagnostic};
use crate::matrix::OverheadMatrix;
use crate::metrics::MetricCalculator;
use crate::schema;
use crate::visualization::VisualizationPayload;
use crate::warmup::{WarmupFilter, WarmupOutcome};
use tracing::{debug, info, warn};

/// Everything produced by one analysis pass
#[derive(Debug, Clone)]
pub struct AnalysisOutcome {
    pub table: SummaryTable,
    pub matrix: OverheadMatrix,
    pub diagnostics: Vec<Diagnostic>,
    pub files_discovered: usize,
}

impl AnalysisOutcome {
    pub fn payload(&self) -> VisualizationPayload {
        VisualizationPayload::build(&self.table, &self.matrix)
    }

    pub fn skipped_files(&self) -> usize {
        self.count(|d| matches!(d, Diagnostic::SkippedFile { .. }))
    }

    pub fn empty_runs(&self) -> usize {
        self.count(|d| matches!(d, Diagnostic::EmptyAfterWarmup { .. }))
    }

    pub fn duplicate_runs(&self) -> usize {
        self.count(|d| matches!(d, Diagnostic::DuplicateRun { .. }))
    }

    fn count(&self, predicate: impl Fn(&Diagnostic) -> bool) -> usize {
        self.diagnostics.iter().filter(|d| predicate(d)).count()
    }
}

/// Sequential analysis over a fixed set of result files
pub struct AnalysisRunner {
    config: AnalysisConfig,
    warmup: WarmupFilter,
    calculator: MetricCalculator,
}

impl AnalysisRunner {
    pub fn new(config: AnalysisConfig) -> Self {
        let warmup = WarmupFilter::new(config.warmup);
        let calculator = MetricCalculator::new(config.overhead_basis, config.percentiles.clone());
        Self {
            config,
            warmup,
            calculator,
        }
    }

    pub fn config(&self) -> &AnalysisConfig {
        &self.config
    }

    /// Analyze `files` in the given order
    pub fn run(&self, files: &[DiscoveredFile]) -> Result<AnalysisOutcome, AnalysisError> {
        if files.is_empty() {
            return Err(AnalysisError::NoData(
                "no result files discovered".to_string(),
            ));
        }

        info!(
            "Analyzing {} result files (warm-up {:?}, overhead basis {:?})",
            files.len(),
            self.config.warmup,
            self.config.overhead_basis
        );

        let mut aggregator = RunAggregator::new();
        let mut diagnostics = Vec::new();

        for file in files {
            self.process_file(file, &mut aggregator, &mut diagnostics);
        }

        if aggregator.is_empty() {
            return Err(AnalysisError::NoData(format!(
                "none of {} result files produced a usable run",
                files.len()
            )));
        }

        let table = aggregator.finish();
        let matrix = OverheadMatrix::from_table(&table);
        let (rows, cols) = matrix.shape();
        info!(
            "Aggregated {} runs into a {}x{} overhead matrix ({} missing cells)",
            table.len(),
            rows,
            cols,
            matrix.missing_count()
        );

        Ok(AnalysisOutcome {
            table,
            matrix,
            diagnostics,
            files_discovered: files.len(),
        })
    }

    fn process_file(
        &self,
        file: &DiscoveredFile,
        aggregator: &mut RunAggregator,
        diagnostics: &mut Vec<Diagnostic>,
    ) {
        debug!("Loading {:?}", file.path);

        let run = match schema::load_run(&file.path, file.file_key) {
            Ok(run) => run,
            Err(e) => {
                warn!("Skipping {:?}: {}", file.path, e);
                diagnostics.push(Diagnostic::SkippedFile {
                    source: file.path.clone(),
                    reason: e.to_string(),
                });
                return;
            }
        };

        let run = match self.warmup.apply(run) {
            WarmupOutcome::Retained { run, .. } => run,
            WarmupOutcome::Empty { source, .. } => {
                diagnostics.push(Diagnostic::EmptyAfterWarmup { source });
                return;
            }
        };

        match self.calculator.compute(&run) {
            Ok((metrics, consistency)) => {
                diagnostics.extend(consistency);
                debug!(
                    "{:?}: {} rows, mean {:.3}ms, p95 {:.3}ms",
                    file.path, metrics.total_count, metrics.mean_latency_ms, metrics.p95_latency_ms
                );
                if let Some(duplicate) = aggregator.insert(file.path.clone(), metrics) {
                    diagnostics.push(duplicate);
                }
            }
            Err(e) => {
                warn!("Skipping {:?}: {}", file.path, e);
                diagnostics.push(Diagnostic::SkippedFile {
                    source: file.path.clone(),
                    reason: e.to_string(),
                });
            }
        }
    }
}
