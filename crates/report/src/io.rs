//! I/O operations for run reports.
//!
//! Each run writes two files into the output directory, named after the
//! run id: `<run_id>.json` holding the full [`RunResult`] and
//! `<run_id>.md` holding the markdown summary.

use crate::markdown;
use loadgauge_core::RunResult;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

/// Default output directory path.
pub const OUTPUT_DIR: &str = "reports";

/// Paths of the files written for one run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReportPaths {
    /// Full result as JSON.
    pub json: PathBuf,
    /// Markdown summary.
    pub markdown: PathBuf,
}

/// Write a run result as pretty-printed JSON.
pub fn write_run_json(result: &RunResult, path: impl AsRef<Path>) -> io::Result<()> {
    let json = serde_json::to_string_pretty(result)
        .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;
    fs::write(path, json)
}

/// Write the markdown summary of a run.
pub fn write_summary(result: &RunResult, path: impl AsRef<Path>) -> io::Result<()> {
    fs::write(path, markdown::generate_summary(result))
}

/// Write every report for a run into `dir`, creating it if needed.
pub fn write_all_outputs(result: &RunResult, dir: impl AsRef<Path>) -> io::Result<ReportPaths> {
    let dir = dir.as_ref();
    fs::create_dir_all(dir)?;

    let paths = ReportPaths {
        json: dir.join(format!("{}.json", result.run_id)),
        markdown: dir.join(format!("{}.md", result.run_id)),
    };
    write_run_json(result, &paths.json)?;
    write_summary(result, &paths.markdown)?;
    Ok(paths)
}

/// Read a run result from a JSON file.
pub fn read_run_json(path: impl AsRef<Path>) -> io::Result<RunResult> {
    let content = fs::read_to_string(path)?;
    serde_json::from_str(&content).map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))
}
