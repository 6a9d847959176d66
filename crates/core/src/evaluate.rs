// Copyright 2025 Loadgauge Contributors
// SPDX-License-Identifier: Apache-2.0

//! Comparison of aggregated metrics against benchmarks.
//!
//! A verdict passes when `p95 <= max_time_ms` and
//! `success_rate >= min_success_rate`. A p95 between the target and the
//! ceiling passes with a warning. Every failing condition is reported, not
//! only the first one. Operations without a benchmark are informational.

use crate::aggregate::AggregatedMetric;
use crate::benchmark::Benchmark;
use serde::{Deserialize, Serialize};

/// Mean-latency growth above which a degradation warning is recorded.
pub const DEGRADATION_WARNING_RATIO: f64 = 1.5;

/// Severity of a violation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    /// Soft degradation; the verdict still passes.
    Warning,
    /// Hard failure; the verdict fails.
    Failure,
}

/// One human-readable reason attached to a verdict.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Violation {
    /// Whether the reason fails the verdict.
    pub severity: Severity,
    /// Description of the violated condition.
    pub message: String,
}

impl Violation {
    fn failure(message: impl Into<String>) -> Self {
        Self {
            severity: Severity::Failure,
            message: message.into(),
        }
    }

    fn warning(message: impl Into<String>) -> Self {
        Self {
            severity: Severity::Warning,
            message: message.into(),
        }
    }

    /// Whether this violation fails the verdict.
    pub fn is_failure(&self) -> bool {
        self.severity == Severity::Failure
    }
}

impl std::fmt::Display for Violation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.severity {
            Severity::Warning => write!(f, "warning: {}", self.message),
            Severity::Failure => write!(f, "failure: {}", self.message),
        }
    }
}

/// Outcome of comparing one operation's metric against its benchmark.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvaluationVerdict {
    /// Operation under evaluation.
    pub operation_name: String,
    /// Measured metric.
    pub metric: AggregatedMetric,
    /// Budget the metric was compared to; `None` when none was registered.
    pub benchmark: Option<Benchmark>,
    /// `Some(true|false)` when judged, `None` when informational only.
    pub passed: Option<bool>,
    /// Every violated condition, in evaluation order.
    pub violations: Vec<Violation>,
}

impl EvaluationVerdict {
    /// Whether the verdict carries no pass/fail judgement.
    pub fn is_informational(&self) -> bool {
        self.passed.is_none()
    }

    /// Violations that fail the verdict.
    pub fn failures(&self) -> impl Iterator<Item = &Violation> {
        self.violations.iter().filter(|v| v.is_failure())
    }

    /// Violations that only warn.
    pub fn warnings(&self) -> impl Iterator<Item = &Violation> {
        self.violations.iter().filter(|v| !v.is_failure())
    }
}

/// Verdict without a benchmark: metrics only, no judgement.
pub fn informational(metric: AggregatedMetric) -> EvaluationVerdict {
    EvaluationVerdict {
        operation_name: metric.operation_name.clone(),
        metric,
        benchmark: None,
        passed: None,
        violations: Vec::new(),
    }
}

/// Evaluate a metric against a benchmark.
pub fn evaluate(metric: AggregatedMetric, benchmark: &Benchmark) -> EvaluationVerdict {
    let mut violations = Vec::new();

    match metric.p95_ms {
        None => violations.push(Violation::failure("no successful samples")),
        Some(p95) if p95 > benchmark.max_time_ms => violations.push(Violation::failure(format!(
            "p95 {:.2} ms exceeds max {:.2} ms",
            p95, benchmark.max_time_ms
        ))),
        Some(p95) if p95 > benchmark.target_time_ms => violations.push(Violation::warning(format!(
            "p95 {:.2} ms within max but above target {:.2} ms",
            p95, benchmark.target_time_ms
        ))),
        Some(_) => {}
    }

    if metric.success_rate < benchmark.min_success_rate {
        violations.push(Violation::failure(format!(
            "success rate {:.2}% below required {:.2}%",
            metric.success_rate * 100.0,
            benchmark.min_success_rate * 100.0
        )));
    }

    if let (Some(limit), Some(mean)) = (benchmark.max_mean_ms, metric.mean_ms) {
        if mean > limit {
            violations.push(Violation::failure(format!(
                "mean {:.2} ms exceeds max mean {:.2} ms",
                mean, limit
            )));
        }
    }

    if let Some(ratio) = metric.degradation_ratio {
        if ratio > DEGRADATION_WARNING_RATIO {
            violations.push(Violation::warning(format!(
                "latency degraded {:.0}% between first and last quarter of the run",
                (ratio - 1.0) * 100.0
            )));
        }
    }

    let passed = !violations.iter().any(Violation::is_failure);

    EvaluationVerdict {
        operation_name: metric.operation_name.clone(),
        metric,
        benchmark: Some(benchmark.clone()),
        passed: Some(passed),
        violations,
    }
}

/// Conjunction of all judged verdicts. Informational verdicts are ignored.
pub fn overall_passed<'a>(verdicts: impl IntoIterator<Item = &'a EvaluationVerdict>) -> bool {
    verdicts
        .into_iter()
        .filter_map(|v| v.passed)
        .all(|passed| passed)
}
