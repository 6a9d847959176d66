//! Terminal rendering of run results.

use colored::{ColoredString, Colorize};
use loadgauge_core::{EvaluationVerdict, RunProfile, RunResult, Severity};
use loadgauge_report::markdown::{format_ms, status_label};
use loadgauge_report::{ReportPaths, RunSummary};

/// Print the per-operation verdict table and overall result.
pub fn print_result(result: &RunResult) {
    let summary = RunSummary::from(result);

    println!();
    println!(
        "{} {} against {} ({} workers, {:.1}s, {} samples)",
        "Run".bold(),
        summary.profile_name.cyan(),
        summary.base_url,
        result.concurrency,
        result.window_secs,
        summary.total_samples
    );
    println!();
    println!(
        "{}",
        format!(
            "{:<18} {:>8} {:>9} {:>10} {:>10} {:>10} {:>10} {:>8}  {}",
            "OPERATION", "SAMPLES", "SUCCESS", "MEAN ms", "P50 ms", "P95 ms", "P99 ms", "REQ/S", "STATUS"
        )
        .bold()
    );

    for verdict in result.verdicts.values() {
        let m = &verdict.metric;
        println!(
            "{:<18} {:>8} {:>8.1}% {:>10} {:>10} {:>10} {:>10} {:>8.2}  {}",
            verdict.operation_name,
            m.sample_count,
            m.success_rate * 100.0,
            format_ms(m.mean_ms),
            format_ms(m.median_ms),
            format_ms(m.p95_ms),
            format_ms(m.p99_ms),
            m.throughput_rps,
            colored_status(verdict)
        );
        for violation in &verdict.violations {
            let line = format!("    {}", violation);
            match violation.severity {
                Severity::Failure => println!("{}", line.red()),
                Severity::Warning => println!("{}", line.yellow()),
            }
        }
    }

    println!();
    let overall = if summary.overall_passed {
        summary.status_label().green().bold()
    } else {
        summary.status_label().red().bold()
    };
    println!(
        "Overall: {}  ({} passed, {} failed, {} informational)",
        overall, summary.passed, summary.failed, summary.informational
    );
}

/// Print where reports were written.
pub fn print_report_paths(paths: &ReportPaths) {
    println!("Reports: {}, {}", paths.json.display(), paths.markdown.display());
}

/// Print the built-in profiles.
pub fn print_profiles() {
    println!("{}", "Built-in profiles".bold());
    for profile in RunProfile::ALL {
        let shape = match profile.plan_builder().build() {
            Ok(plan) => format!(
                "{} workers{}, {}, think time {}, operations: {}",
                plan.concurrency,
                plan.spawn_rate
                    .map(|rate| format!(" at {}/s", rate))
                    .unwrap_or_default(),
                plan.stop,
                plan.think_time,
                plan.operations
                    .iter()
                    .map(|op| op.name.as_str())
                    .collect::<Vec<_>>()
                    .join(", ")
            ),
            Err(_) => "operations and limits from configuration".to_string(),
        };
        println!("  {:<8} {}", profile.name().cyan(), profile.description());
        println!("           {}", shape.dimmed());
    }
}

fn colored_status(verdict: &EvaluationVerdict) -> ColoredString {
    let label = status_label(verdict);
    match verdict.passed {
        Some(true) => label.green(),
        Some(false) => label.red().bold(),
        None => label.yellow(),
    }
}
