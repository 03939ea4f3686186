//! Result file discovery.
//!
//! Files are returned sorted by path so that duplicate handling downstream
//! is reproducible from one invocation to the next.

use crate::error::AnalysisError;
use crate::schema::RunKey;
use regex::Regex;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;
use tracing::debug;

/// A result file together with the run key its name advertises, if any
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiscoveredFile {
    pub path: PathBuf,
    pub file_key: Option<RunKey>,
}

fn key_pattern() -> Option<&'static Regex> {
    static PATTERN: OnceLock<Option<Regex>> = OnceLock::new();
    PATTERN
        .get_or_init(|| Regex::new(r"(?i)(\d+)\s*rps[-_](\d+)\s*ms").ok())
        .as_ref()
}

/// Extract (rate, spin-delay) from names like `results-100rps-10ms.csv`
pub fn key_from_file_name(path: &Path) -> Option<RunKey> {
    let name = path.file_name()?.to_str()?;
    let captures = key_pattern()?.captures(name)?;
    let rate = captures.get(1)?.as_str().parse().ok()?;
    let spin = captures.get(2)?.as_str().parse().ok()?;
    Some(RunKey::new(rate, spin))
}

/// List files in `dir` whose name matches `include`, sorted lexicographically
pub fn discover_result_files(dir: &Path, include: &Regex) -> Result<Vec<DiscoveredFile>, AnalysisError> {
    let entries = fs::read_dir(dir).map_err(|e| AnalysisError::io(dir, e))?;

    let mut paths = Vec::new();
    for entry in entries {
        let entry = entry.map_err(|e| AnalysisError::io(dir, e))?;
        let path = entry.path();
        if !path.is_file() {
            continue;
        }
        let matches = path
            .file_name()
            .and_then(|n| n.to_str())
            .is_some_and(|name| include.is_match(name));
        if matches {
            paths.push(path);
        } else {
            debug!("Ignoring {:?}", path);
        }
    }
    paths.sort();

    Ok(paths
        .into_iter()
        .map(|path| {
            let file_key = key_from_file_name(&path);
            DiscoveredFile { path, file_key }
        })
        .collect())
}
