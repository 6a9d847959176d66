// Copyright 2025 Loadgauge Contributors
// SPDX-License-Identifier: Apache-2.0

//! Run lifecycle and the final result document.

use crate::evaluate::EvaluationVerdict;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use uuid::Uuid;

/// Lifecycle state of an orchestrated run.
///
/// ```text
/// Configured -> Running -> Aggregating -> Evaluated -> Done
///      \___________\___________\______________\_____-> Failed
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum RunState {
    /// Inputs accepted, nothing dispatched yet.
    Configured,
    /// Workers are dispatching requests.
    Running,
    /// Samples are being reduced to metrics.
    Aggregating,
    /// Verdicts are computed.
    Evaluated,
    /// Result is final and immutable.
    Done,
    /// Aborted by a configuration error or an unreachable target.
    Failed,
}

impl RunState {
    fn rank(&self) -> u8 {
        match self {
            Self::Configured => 0,
            Self::Running => 1,
            Self::Aggregating => 2,
            Self::Evaluated => 3,
            Self::Done => 4,
            Self::Failed => 5,
        }
    }

    /// Whether no further transition is possible.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Done | Self::Failed)
    }

    /// Whether `next` is the single permitted successor of `self`.
    ///
    /// `Failed` is reachable from every non-terminal state.
    pub fn can_transition_to(&self, next: RunState) -> bool {
        if self.is_terminal() {
            return false;
        }
        match next {
            Self::Failed => true,
            _ => next.rank() == self.rank() + 1,
        }
    }
}

impl std::fmt::Display for RunState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Configured => "CONFIGURED",
            Self::Running => "RUNNING",
            Self::Aggregating => "AGGREGATING",
            Self::Evaluated => "EVALUATED",
            Self::Done => "DONE",
            Self::Failed => "FAILED",
        };
        f.write_str(s)
    }
}

/// Result of one completed run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunResult {
    /// Unique run identifier.
    pub run_id: Uuid,
    /// When the load phase began.
    pub started_at: DateTime<Utc>,
    /// When evaluation finished.
    pub ended_at: DateTime<Utc>,
    /// Profile the run was configured from.
    pub profile_name: String,
    /// Target base URL.
    pub base_url: String,
    /// Number of concurrent workers.
    pub concurrency: usize,
    /// Samples collected across all operations.
    pub total_samples: usize,
    /// Observed wall-clock length of the load phase.
    pub window_secs: f64,
    /// Verdicts keyed by operation name.
    pub verdicts: BTreeMap<String, EvaluationVerdict>,
    /// Whether every judged verdict passed.
    pub overall_passed: bool,
}

impl RunResult {
    /// Verdicts that carry a pass/fail judgement and failed.
    pub fn failed_operations(&self) -> impl Iterator<Item = &EvaluationVerdict> {
        self.verdicts.values().filter(|v| v.passed == Some(false))
    }

    /// Verdicts without a benchmark.
    pub fn informational_operations(&self) -> impl Iterator<Item = &EvaluationVerdict> {
        self.verdicts.values().filter(|v| v.is_informational())
    }

    /// Total run duration, start to end.
    pub fn duration_secs(&self) -> f64 {
        self.ended_at
            .signed_duration_since(self.started_at)
            .num_milliseconds() as f64
            / 1000.0
    }
}
