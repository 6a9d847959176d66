//! Reports for loadgauge runs.
//!
//! Turns a [`loadgauge_core::RunResult`] into a [`RunSummary`], a JSON document and a
//! markdown summary.
//!
//! # Quick Start
//!
//! ```no_run
//! # fn example(result: &loadgauge_core::RunResult) -> std::io::Result<()> {
//! use loadgauge_report::{write_all_outputs, RunSummary, OUTPUT_DIR};
//!
//! let paths = write_all_outputs(result, OUTPUT_DIR)?;
//! let summary = RunSummary::from(result);
//! println!("{} -> {}", summary.status_label(), paths.markdown.display());
//! # Ok(())
//! # }
//! ```
//!
//! # Modules
//!
//! - [`summary`] - The condensed `RunSummary`
//! - [`io`] - Reading and writing report files
//! - [`markdown`] - Markdown report generation

#![warn(missing_docs, rust_2018_idioms)]
#![deny(unsafe_code)]

pub mod io;
pub mod markdown;
pub mod summary;

pub use io::{read_run_json, write_all_outputs, write_run_json, ReportPaths, OUTPUT_DIR};
pub use markdown::generate_summary;
pub use summary::RunSummary;
