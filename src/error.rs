//! # Error Taxonomy and Diagnostics
//!
//! Failures in this crate fall into two groups:
//!
//! - **Errors** (`AnalysisError`): a result file could not be turned into a run
//!   at all. These are isolated to the offending file by the pipeline; only
//!   `NoData` is fatal at the top level.
//! - **Diagnostics** (`Diagnostic`): non-fatal conditions that are recorded on
//!   the analysis outcome and logged, but never interrupt processing.

use crate::schema::Field;
use serde::Serialize;
use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

/// Errors produced while loading or exporting run data
#[derive(Debug, Error)]
pub enum AnalysisError {
    /// A required semantic column could not be located in the header row
    #[error("{}: required field `{}` not found in header", path.display(), missing)]
    Schema { path: PathBuf, missing: Field },

    /// The file has no header row at all
    #[error("{}: missing header row", path.display())]
    EmptyFile { path: PathBuf },

    /// Every data row was malformed
    #[error("{}: no parseable rows ({} dropped)", path.display(), dropped)]
    NoParseableRows { path: PathBuf, dropped: usize },

    #[error("I/O error on {}: {}", path.display(), source)]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("CSV error on {}: {}", path.display(), source)]
    Csv {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },

    /// No usable run survived loading and warm-up filtering
    #[error("no data: {0}")]
    NoData(String),
}

impl AnalysisError {
    /// Attach a path to a CSV error
    pub fn csv(path: impl Into<PathBuf>, source: csv::Error) -> Self {
        AnalysisError::Csv {
            path: path.into(),
            source,
        }
    }

    /// Attach a path to an I/O error
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        AnalysisError::Io {
            path: path.into(),
            source,
        }
    }
}

/// Which configured value a consistency warning refers to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ConfigField {
    Rate,
    SpinDelay,
}

impl fmt::Display for ConfigField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigField::Rate => write!(f, "rate"),
            ConfigField::SpinDelay => write!(f, "spin-delay"),
        }
    }
}

/// Non-fatal conditions raised while processing runs
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Diagnostic {
    /// Rows of one run disagree on a configured value; the majority won
    Consistency {
        source: PathBuf,
        field: ConfigField,
        chosen: u32,
        distinct_values: usize,
    },

    /// Two files resolved to the same (rate, spin-delay); the later one won
    DuplicateRun {
        rate: u32,
        spin_delay_ms: u32,
        replaced: PathBuf,
        kept: PathBuf,
    },

    /// Every row fell inside the warm-up window
    EmptyAfterWarmup { source: PathBuf },

    /// A file was skipped entirely
    SkippedFile { source: PathBuf, reason: String },
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Diagnostic::Consistency {
                source,
                field,
                chosen,
                distinct_values,
            } => write!(
                f,
                "{}: rows disagree on {} ({} distinct values), using majority value {}",
                source.display(),
                field,
                distinct_values,
                chosen
            ),
            Diagnostic::DuplicateRun {
                rate,
                spin_delay_ms,
                replaced,
                kept,
            } => write!(
                f,
                "duplicate run for rate={} spin={}ms: {} replaces {}",
                rate,
                spin_delay_ms,
                kept.display(),
                replaced.display()
            ),
            Diagnostic::EmptyAfterWarmup { source } => {
                write!(f, "{}: no rows left after warm-up window", source.display())
            }
            Diagnostic::SkippedFile { source, reason } => {
                write!(f, "{}: skipped ({})", source.display(), reason)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_schema_error_names_field_and_path() {
        let err = AnalysisError::Schema {
            path: PathBuf::from("results/a.csv"),
            missing: Field::Latency,
        };
        let msg = err.to_string();
        assert!(msg.contains("results/a.csv"));
        assert!(msg.contains("latency_ms"));
    }

    #[test]
    fn test_duplicate_diagnostic_display() {
        let diag = Diagnostic::DuplicateRun {
            rate: 50,
            spin_delay_ms: 5,
            replaced: PathBuf::from("a.csv"),
            kept: PathBuf::from("b.csv"),
        };
        assert_eq!(
            diag.to_string(),
            "duplicate run for rate=50 spin=5ms: b.csv replaces a.csv"
        );
    }

    #[test]
    fn test_diagnostic_serializes_tagged() {
        let diag = Diagnostic::EmptyAfterWarmup {
            source: PathBuf::from("x.csv"),
        };
        let json = serde_json::to_value(&diag).unwrap();
        assert_eq!(json["kind"], "empty_after_warmup");
        assert_eq!(json["source"], "x.csv");
    }
}
