//! Run summary types.
//!
//! A [`RunSummary`] is the compact, one-line-per-run view of a
//! [`RunResult`]: counts and the overall verdict, without per-operation
//! metrics.

use chrono::{DateTime, Utc};
use loadgauge_core::RunResult;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Condensed view of a completed run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunSummary {
    /// Run identifier.
    pub run_id: Uuid,
    /// Profile the run was configured from.
    pub profile_name: String,
    /// Target base URL.
    pub base_url: String,
    /// When the load phase began.
    pub started_at: DateTime<Utc>,
    /// Total run duration in seconds.
    pub duration_secs: f64,
    /// Samples collected across all operations.
    pub total_samples: usize,
    /// Operations with a verdict.
    pub operations: usize,
    /// Judged operations that passed.
    pub passed: usize,
    /// Judged operations that failed.
    pub failed: usize,
    /// Operations without a benchmark.
    pub informational: usize,
    /// Warnings across all verdicts.
    pub warnings: usize,
    /// Overall run verdict.
    pub overall_passed: bool,
}

impl From<&RunResult> for RunSummary {
    fn from(result: &RunResult) -> Self {
        let verdicts = result.verdicts.values();
        Self {
            run_id: result.run_id,
            profile_name: result.profile_name.clone(),
            base_url: result.base_url.clone(),
            started_at: result.started_at,
            duration_secs: result.duration_secs(),
            total_samples: result.total_samples,
            operations: result.verdicts.len(),
            passed: verdicts.clone().filter(|v| v.passed == Some(true)).count(),
            failed: result.failed_operations().count(),
            informational: result.informational_operations().count(),
            warnings: verdicts.map(|v| v.warnings().count()).sum(),
            overall_passed: result.overall_passed,
        }
    }
}

impl RunSummary {
    /// `PASSED` or `FAILED`.
    pub fn status_label(&self) -> &'static str {
        if self.overall_passed {
            "PASSED"
        } else {
            "FAILED"
        }
    }
}
