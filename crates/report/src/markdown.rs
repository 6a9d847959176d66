//! Markdown output generation for run results.

use crate::summary::RunSummary;
use loadgauge_core::{EvaluationVerdict, RunResult};
use std::fmt;

/// Placeholder for metrics that are undefined for an operation.
pub const NOT_AVAILABLE: &str = "n/a";

/// Generate a markdown summary of one run.
pub fn generate_summary(result: &RunResult) -> String {
    MarkdownSummary(result).to_string()
}

struct MarkdownSummary<'a>(&'a RunResult);

impl fmt::Display for MarkdownSummary<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let result = self.0;
        let summary = RunSummary::from(result);

        writeln!(f, "# Load Test Report")?;
        writeln!(f)?;
        writeln!(f, "- **Run:** {}", summary.run_id)?;
        writeln!(f, "- **Profile:** {}", summary.profile_name)?;
        writeln!(f, "- **Target:** {}", summary.base_url)?;
        writeln!(
            f,
            "- **Started:** {}",
            summary.started_at.format("%Y-%m-%d %H:%M:%S UTC")
        )?;
        writeln!(f, "- **Duration:** {:.1} s", summary.duration_secs)?;
        writeln!(f, "- **Concurrency:** {}", result.concurrency)?;
        writeln!(f, "- **Samples:** {}", summary.total_samples)?;
        writeln!(f, "- **Result:** {}", summary.status_label())?;
        writeln!(f)?;

        writeln!(f, "## Operations")?;
        writeln!(f)?;
        writeln!(
            f,
            "| Operation | Samples | Success | Mean (ms) | Median (ms) | p95 (ms) | p99 (ms) | Min (ms) | Max (ms) | Req/s | Status |"
        )?;
        writeln!(
            f,
            "|-----------|---------|---------|-----------|-------------|----------|----------|----------|----------|-------|--------|"
        )?;
        for verdict in result.verdicts.values() {
            let m = &verdict.metric;
            writeln!(
                f,
                "| {} | {} | {:.1}% | {} | {} | {} | {} | {} | {} | {:.2} | {} |",
                verdict.operation_name,
                m.sample_count,
                m.success_rate * 100.0,
                format_ms(m.mean_ms),
                format_ms(m.median_ms),
                format_ms(m.p95_ms),
                format_ms(m.p99_ms),
                format_ms(m.min_ms),
                format_ms(m.max_ms),
                m.throughput_rps,
                status_label(verdict),
            )?;
        }

        let with_violations: Vec<_> = result
            .verdicts
            .values()
            .filter(|v| !v.violations.is_empty())
            .collect();
        if !with_violations.is_empty() {
            writeln!(f)?;
            writeln!(f, "## Violations")?;
            writeln!(f)?;
            for verdict in with_violations {
                for violation in &verdict.violations {
                    writeln!(f, "- `{}` {}", verdict.operation_name, violation)?;
                }
            }
        }

        writeln!(f)?;
        writeln!(f, "---")?;
        writeln!(
            f,
            "Passed: {} | Failed: {} | Informational: {} | Warnings: {}",
            summary.passed, summary.failed, summary.informational, summary.warnings
        )?;
        Ok(())
    }
}

/// Format an optional latency, `n/a` when undefined.
pub fn format_ms(value: Option<f64>) -> String {
    match value {
        Some(ms) => format!("{:.1}", ms),
        None => NOT_AVAILABLE.to_string(),
    }
}

/// Short status for a verdict: `PASS`, `FAIL` or `INFO`.
pub fn status_label(verdict: &EvaluationVerdict) -> &'static str {
    match verdict.passed {
        Some(true) => "PASS",
        Some(false) => "FAIL",
        None => "INFO",
    }
}
