//! # Record Normalizer
//!
//! Turns one raw result file into a uniform set of typed rows. The load driver
//! writes `timestamp_ms,rps,spin_ms,seq,latency_ms,status`, but files produced
//! by older drivers or massaged by hand use different names, padded headers or
//! text-typed numbers. The normalizer copes with that in two steps:
//!
//! 1. **Field resolution** (`resolve_fields`): a pure mapping from the header
//!    row to column indices. Each semantic field is matched by its canonical
//!    name first, then by a short list of aliases.
//! 2. **Row coercion** (`normalize_reader`): each record is parsed into a
//!    `RawRow`. Records with unparseable values are dropped and counted; they
//!    never fail the whole file.
//!
//! Rate and spin-delay columns may be absent when the caller can supply the
//! run key from the file name. When both are present, the row data wins.

use crate::error::AnalysisError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::debug;

/// Semantic columns of a result file
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Field {
    Timestamp,
    Rate,
    SpinDelay,
    Sequence,
    Latency,
    Success,
}

impl Field {
    pub const ALL: [Field; 6] = [
        Field::Timestamp,
        Field::Rate,
        Field::SpinDelay,
        Field::Sequence,
        Field::Latency,
        Field::Success,
    ];

    /// Column name written by the load driver
    pub fn canonical_name(self) -> &'static str {
        match self {
            Field::Timestamp => "timestamp_ms",
            Field::Rate => "rps",
            Field::SpinDelay => "spin_ms",
            Field::Sequence => "seq",
            Field::Latency => "latency_ms",
            Field::Success => "status",
        }
    }

    /// Alternate names accepted after the canonical name fails to match.
    /// Alias sets are disjoint so a column can never satisfy two fields.
    pub fn aliases(self) -> &'static [&'static str] {
        match self {
            Field::Timestamp => &["timestamp", "ts_ms", "ts", "time_ms", "time", "start_ms"],
            Field::Rate => &["rate", "target_rps", "request_rate", "requests_per_second"],
            Field::SpinDelay => &["spin", "spin_delay", "spin_delay_ms", "delay_ms"],
            Field::Sequence => &["sequence", "seq_no", "seq_num", "request_id"],
            Field::Latency => &["latency", "duration_ms", "elapsed_ms"],
            Field::Success => &["success", "ok", "result", "outcome"],
        }
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.canonical_name())
    }
}

/// A required field could not be located in a header row
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("required field `{missing}` not found")]
pub struct SchemaError {
    pub missing: Field,
}

/// Column index of every semantic field in one file
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldMap {
    pub timestamp: usize,
    pub rate: Option<usize>,
    pub spin_delay: Option<usize>,
    pub sequence: usize,
    pub latency: usize,
    pub success: usize,
}

/// The configuration pair that identifies a run
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct RunKey {
    pub rate: u32,
    pub spin_delay_ms: u32,
}

impl RunKey {
    pub fn new(rate: u32, spin_delay_ms: u32) -> Self {
        Self {
            rate,
            spin_delay_ms,
        }
    }
}

impl fmt::Display for RunKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "rate={} spin={}ms", self.rate, self.spin_delay_ms)
    }
}

/// One measurement, after type coercion
#[derive(Debug, Clone, PartialEq)]
pub struct RawRow {
    /// Request start time, milliseconds since the Unix epoch
    pub timestamp_ms: i64,
    pub rate: u32,
    pub spin_delay_ms: u32,
    pub sequence: u64,
    pub latency_ms: f64,
    pub success: bool,
}

/// All rows of one result file, sorted by timestamp
///
/// `started_at_ms` is fixed when the run is built and survives filtering, so
/// the warm-up cutoff is always measured from the first request the driver
/// actually sent.
#[derive(Debug, Clone)]
pub struct Run {
    pub source: PathBuf,
    pub file_key: Option<RunKey>,
    pub started_at_ms: Option<i64>,
    pub rows: Vec<RawRow>,
}

impl Run {
    pub fn new(source: impl Into<PathBuf>, file_key: Option<RunKey>, mut rows: Vec<RawRow>) -> Self {
        rows.sort_by_key(|row| row.timestamp_ms);
        let started_at_ms = rows.first().map(|row| row.timestamp_ms);
        Self {
            source: source.into(),
            file_key,
            started_at_ms,
            rows,
        }
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

/// Output of normalizing one file
#[derive(Debug, Clone)]
pub struct NormalizedFile {
    pub rows: Vec<RawRow>,
    /// Records dropped because a value could not be coerced
    pub dropped: usize,
}

fn normalize_header(name: &str) -> String {
    name.trim_start_matches('\u{feff}')
        .trim()
        .to_ascii_lowercase()
        .replace(|c: char| c == ' ' || c == '-', "_")
}

/// Map a header row to field indices.
///
/// Every field is first matched against its canonical name across all
/// columns, then against its aliases in order. Rate and spin-delay are
/// optional here; whether their absence is fatal depends on the file name.
pub fn resolve_fields<S: AsRef<str>>(headers: &[S]) -> Result<FieldMap, SchemaError> {
    let normalized: Vec<String> = headers
        .iter()
        .map(|h| normalize_header(h.as_ref()))
        .collect();

    let locate = |field: Field| -> Option<usize> {
        std::iter::once(field.canonical_name())
            .chain(field.aliases().iter().copied())
            .find_map(|name| normalized.iter().position(|h| h == name))
    };
    let require = |field: Field| locate(field).ok_or(SchemaError { missing: field });

    Ok(FieldMap {
        timestamp: require(Field::Timestamp)?,
        rate: locate(Field::Rate),
        spin_delay: locate(Field::SpinDelay),
        sequence: require(Field::Sequence)?,
        latency: require(Field::Latency)?,
        success: require(Field::Success)?,
    })
}

/// Interpret a boolean-like status cell
pub fn parse_success(text: &str) -> Option<bool> {
    match text.trim().to_ascii_lowercase().as_str() {
        "success" | "ok" | "true" | "yes" | "1" | "1.0" => Some(true),
        "failure" | "fail" | "error" | "false" | "no" | "0" | "0.0" => Some(false),
        _ => None,
    }
}

fn parse_number(text: &str) -> Option<f64> {
    let value: f64 = text.trim().parse().ok()?;
    value.is_finite().then_some(value)
}

/// Integral values may arrive as `100` or `100.0`; anything fractional is rejected
fn parse_integral(text: &str) -> Option<i64> {
    let trimmed = text.trim();
    if let Ok(value) = trimmed.parse::<i64>() {
        return Some(value);
    }
    let value = parse_number(trimmed)?;
    if value.fract() != 0.0 || value.abs() > i64::MAX as f64 {
        return None;
    }
    Some(value as i64)
}

fn parse_row(record: &csv::StringRecord, map: &FieldMap, fallback: Option<RunKey>) -> Option<RawRow> {
    let cell = |idx: usize| record.get(idx);

    let key_value = |idx: Option<usize>, fallback: Option<u32>| -> Option<u32> {
        match idx {
            Some(idx) => u32::try_from(parse_integral(cell(idx)?)?).ok(),
            None => fallback,
        }
    };

    let latency_ms = parse_number(cell(map.latency)?)?;
    if latency_ms < 0.0 {
        return None;
    }

    Some(RawRow {
        timestamp_ms: parse_integral(cell(map.timestamp)?)?,
        rate: key_value(map.rate, fallback.map(|k| k.rate))?,
        spin_delay_ms: key_value(map.spin_delay, fallback.map(|k| k.spin_delay_ms))?,
        sequence: u64::try_from(parse_integral(cell(map.sequence)?)?).ok()?,
        latency_ms,
        success: parse_success(cell(map.success)?)?,
    })
}

/// Normalize a tabular stream into typed rows.
///
/// `source` is only used for error context. `fallback` supplies rate and
/// spin-delay for files that do not carry them as columns.
pub fn normalize_reader<R: Read>(
    source: &Path,
    reader: R,
    fallback: Option<RunKey>,
) -> Result<NormalizedFile, AnalysisError> {
    let mut csv_reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .flexible(true)
        .from_reader(reader);

    let headers = csv_reader
        .headers()
        .map_err(|e| AnalysisError::csv(source, e))?
        .clone();
    if headers.is_empty() || headers.iter().all(|h| h.trim().is_empty()) {
        return Err(AnalysisError::EmptyFile {
            path: source.to_path_buf(),
        });
    }

    let header_names: Vec<&str> = headers.iter().collect();
    let map = resolve_fields(&header_names).map_err(|e| AnalysisError::Schema {
        path: source.to_path_buf(),
        missing: e.missing,
    })?;

    if fallback.is_none() {
        if map.rate.is_none() {
            return Err(AnalysisError::Schema {
                path: source.to_path_buf(),
                missing: Field::Rate,
            });
        }
        if map.spin_delay.is_none() {
            return Err(AnalysisError::Schema {
                path: source.to_path_buf(),
                missing: Field::SpinDelay,
            });
        }
    }

    let mut rows = Vec::new();
    let mut dropped = 0;
    for (line, record) in csv_reader.records().enumerate() {
        let record = match record {
            Ok(record) => record,
            Err(e) if e.is_io_error() => return Err(AnalysisError::csv(source, e)),
            Err(e) => {
                debug!("{}: dropping unreadable record {}: {}", source.display(), line + 2, e);
                dropped += 1;
                continue;
            }
        };
        match parse_row(&record, &map, fallback) {
            Some(row) => rows.push(row),
            None => dropped += 1,
        }
    }

    Ok(NormalizedFile { rows, dropped })
}

/// Load one result file into a `Run`
pub fn load_run(path: &Path, file_key: Option<RunKey>) -> Result<Run, AnalysisError> {
    let file = File::open(path).map_err(|e| AnalysisError::io(path, e))?;
    let normalized = normalize_reader(path, file, file_key)?;

    if normalized.dropped > 0 {
        debug!(
            "{}: dropped {} malformed rows, kept {}",
            path.display(),
            normalized.dropped,
            normalized.rows.len()
        );
        if normalized.rows.is_empty() {
            return Err(AnalysisError::NoParseableRows {
                path: path.to_path_buf(),
                dropped: normalized.dropped,
            });
        }
    }

    Ok(Run::new(path, file_key, normalized.rows))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn normalize(text: &str, fallback: Option<RunKey>) -> Result<NormalizedFile, AnalysisError> {
        normalize_reader(Path::new("test.csv"), text.as_bytes(), fallback)
    }

    #[test]
    fn test_field_names_are_disjoint() {
        let mut seen = std::collections::HashSet::new();
        for field in Field::ALL {
            for name in std::iter::once(field.canonical_name()).chain(field.aliases().iter().copied()) {
                assert!(seen.insert(name), "{} claimed twice", name);
            }
        }
    }

    #[test]
    fn test_resolve_canonical_headers() {
        let map = resolve_fields(&["timestamp_ms", "rps", "spin_ms", "seq", "latency_ms", "status"])
            .unwrap();
        assert_eq!(map.timestamp, 0);
        assert_eq!(map.rate, Some(1));
        assert_eq!(map.spin_delay, Some(2));
        assert_eq!(map.sequence, 3);
        assert_eq!(map.latency, 4);
        assert_eq!(map.success, 5);
    }

    #[test]
    fn test_resolve_aliases_whitespace_and_order() {
        let map = resolve_fields(&[" Status ", "latency", " timestamp", "Sequence", "RATE", "spin-delay"])
            .unwrap();
        assert_eq!(map.success, 0);
        assert_eq!(map.latency, 1);
        assert_eq!(map.timestamp, 2);
        assert_eq!(map.sequence, 3);
        assert_eq!(map.rate, Some(4));
        assert_eq!(map.spin_delay, Some(5));
    }

    #[test]
    fn test_resolve_prefers_canonical_over_alias() {
        let map = resolve_fields(&["timestamp", "timestamp_ms", "seq", "latency_ms", "status"]).unwrap();
        assert_eq!(map.timestamp, 1);
        assert_eq!(map.rate, None);
    }

    #[test]
    fn test_resolve_missing_latency() {
        let err = resolve_fields(&["timestamp_ms", "rps", "spin_ms", "seq", "status"]).unwrap_err();
        assert_eq!(err.missing, Field::Latency);
    }

    #[test]
    fn test_parse_success_variants() {
        assert_eq!(parse_success("success"), Some(true));
        assert_eq!(parse_success(" FAILURE "), Some(false));
        assert_eq!(parse_success("1"), Some(true));
        assert_eq!(parse_success("0"), Some(false));
        assert_eq!(parse_success("True"), Some(true));
        assert_eq!(parse_success("maybe"), None);
    }

    #[test]
    fn test_normalize_coerces_and_drops_bad_rows() {
        let text = "timestamp_ms,rps,spin_ms,seq,latency_ms,status\n\
                    1000,100,10,1,12,success\n\
                    1001,100.0,10,2, 13.5 ,failure\n\
                    1002,100,10,3,abc,success\n\
                    1003,100,10,4,-1,success\n\
                    1004,100,10,5,11,unknown\n";
        let normalized = normalize(text, None).unwrap();
        assert_eq!(normalized.rows.len(), 2);
        assert_eq!(normalized.dropped, 3);
        assert_eq!(normalized.rows[1].rate, 100);
        assert_eq!(normalized.rows[1].latency_ms, 13.5);
        assert!(!normalized.rows[1].success);
    }

    #[test]
    fn test_normalize_uses_fallback_key_when_columns_absent() {
        let text = "ts,seq,latency_ms,status\n5,1,10,ok\n";
        let normalized = normalize(text, Some(RunKey::new(50, 5))).unwrap();
        assert_eq!(normalized.rows[0].rate, 50);
        assert_eq!(normalized.rows[0].spin_delay_ms, 5);
    }

    #[test]
    fn test_normalize_row_data_beats_fallback() {
        let text = "timestamp_ms,rps,spin_ms,seq,latency_ms,status\n1,200,20,1,25,success\n";
        let normalized = normalize(text, Some(RunKey::new(50, 5))).unwrap();
        assert_eq!(normalized.rows[0].rate, 200);
        assert_eq!(normalized.rows[0].spin_delay_ms, 20);
    }

    #[test]
    fn test_normalize_without_key_source_is_schema_error() {
        let text = "timestamp_ms,seq,latency_ms,status\n1,1,10,success\n";
        match normalize(text, None) {
            Err(AnalysisError::Schema { missing, .. }) => assert_eq!(missing, Field::Rate),
            other => panic!("expected schema error, got {:?}", other),
        }
    }

    #[test]
    fn test_normalize_empty_input() {
        assert!(matches!(normalize("", None), Err(AnalysisError::EmptyFile { .. })));
    }

    #[test]
    fn test_load_run_with_only_malformed_rows() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("results-10rps-5ms.csv");
        std::fs::write(
            &path,
            "timestamp_ms,rps,spin_ms,seq,latency_ms,status\n1,10,5,1,fast,success\n2,10,5,2,9,maybe\n",
        )
        .unwrap();
        match load_run(&path, None) {
            Err(AnalysisError::NoParseableRows { dropped, .. }) => assert_eq!(dropped, 2),
            other => panic!("expected no parseable rows, got {:?}", other),
        }
    }

    #[test]
    fn test_load_run_header_only_is_empty_run() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("results-10rps-5ms.csv");
        std::fs::write(&path, "timestamp_ms,rps,spin_ms,seq,latency_ms,status\n").unwrap();
        assert!(load_run(&path, None).unwrap().is_empty());
    }

    #[test]
    fn test_run_sorts_rows_and_anchors_start() {
        let row = |ts: i64, seq: u64| RawRow {
            timestamp_ms: ts,
            rate: 1,
            spin_delay_ms: 1,
            sequence: seq,
            latency_ms: 1.0,
            success: true,
        };
        let run = Run::new("r.csv", None, vec![row(30, 3), row(10, 1), row(20, 2)]);
        assert_eq!(run.started_at_ms, Some(10));
        let seqs: Vec<u64> = run.rows.iter().map(|r| r.sequence).collect();
        assert_eq!(seqs, vec![1, 2, 3]);
    }
}
