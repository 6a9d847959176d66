// Copyright 2025 Loadgauge Contributors
// SPDX-License-Identifier: Apache-2.0

//! Reduction of raw samples into per-operation statistics.
//!
//! # Semantics
//!
//! - Latency statistics only consider [`Outcome::Success`] samples. Failed,
//!   timed-out and refused requests still count in the success-rate
//!   denominator.
//! - p95/p99 use the nearest-rank method: `index = ceil(p * n) - 1`.
//! - With zero successful samples every latency field is `None`
//!   ("undefined"), never zero.
//! - Throughput is successful requests per second of the observed run
//!   window, not of the summed latencies.
//!
//! [`Outcome::Success`]: crate::sample::Outcome::Success

use crate::sample::Sample;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Minimum number of successful samples for a degradation ratio.
pub const MIN_DEGRADATION_SAMPLES: usize = 4;

/// Statistical summary of one operation's samples.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AggregatedMetric {
    /// Operation the samples belong to.
    pub operation_name: String,
    /// All samples, successful or not.
    pub sample_count: usize,
    /// Successful samples.
    pub success_count: usize,
    /// Mean latency of successful samples.
    pub mean_ms: Option<f64>,
    /// Median latency of successful samples.
    pub median_ms: Option<f64>,
    /// 95th percentile (nearest rank).
    pub p95_ms: Option<f64>,
    /// 99th percentile (nearest rank).
    pub p99_ms: Option<f64>,
    /// Minimum latency of successful samples.
    pub min_ms: Option<f64>,
    /// Maximum latency of successful samples.
    pub max_ms: Option<f64>,
    /// `success_count / sample_count`, 0 when there are no samples.
    pub success_rate: f64,
    /// Successful requests per second of the run window.
    pub throughput_rps: f64,
    /// Mean of the last quarter of successes divided by the mean of the first.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub degradation_ratio: Option<f64>,
}

impl AggregatedMetric {
    /// Whether latency statistics exist.
    pub fn has_latency(&self) -> bool {
        self.success_count > 0
    }

    /// Failed samples of any kind.
    pub fn failure_count(&self) -> usize {
        self.sample_count - self.success_count
    }
}

/// Aggregate the samples of one operation over a run window.
///
/// Samples whose `operation_name` differs from `operation_name` are
/// ignored. The result depends only on the inputs.
pub fn aggregate(operation_name: &str, samples: &[Sample], window: Duration) -> AggregatedMetric {
    let own: Vec<&Sample> = samples
        .iter()
        .filter(|s| s.operation_name == operation_name)
        .collect();
    let sample_count = own.len();

    let mut successes: Vec<&Sample> = own.iter().copied().filter(|s| s.is_success()).collect();
    let success_count = successes.len();

    let success_rate = if sample_count == 0 {
        0.0
    } else {
        success_count as f64 / sample_count as f64
    };

    let window_secs = window.as_secs_f64();
    let throughput_rps = if window_secs > 0.0 {
        success_count as f64 / window_secs
    } else {
        0.0
    };

    // Issue order, for the degradation trend. Stable, so ties keep input order.
    successes.sort_by_key(|s| s.timestamp);
    let degradation_ratio = degradation_ratio(&successes);

    let mut sorted: Vec<f64> = successes.iter().map(|s| s.latency_ms).collect();
    sorted.sort_by(|a, b| a.total_cmp(b));

    let (mean_ms, median_ms, p95_ms, p99_ms, min_ms, max_ms) = if sorted.is_empty() {
        (None, None, None, None, None, None)
    } else {
        let n = sorted.len();
        let sum: f64 = sorted.iter().sum();
        (
            Some(sum / n as f64),
            Some(median(&sorted)),
            Some(nearest_rank(&sorted, 95)),
            Some(nearest_rank(&sorted, 99)),
            Some(sorted[0]),
            Some(sorted[n - 1]),
        )
    };

    AggregatedMetric {
        operation_name: operation_name.to_string(),
        sample_count,
        success_count,
        mean_ms,
        median_ms,
        p95_ms,
        p99_ms,
        min_ms,
        max_ms,
        success_rate,
        throughput_rps,
        degradation_ratio,
    }
}

/// Nearest-rank percentile of an ascending, non-empty slice.
///
/// `ceil(percent * n / 100)` is computed in integers so that e.g. p95 of 20
/// samples is exactly rank 19.
pub fn nearest_rank(sorted: &[f64], percent: usize) -> f64 {
    let n = sorted.len();
    let rank = (percent * n + 99) / 100;
    let index = rank.saturating_sub(1).min(n - 1);
    sorted[index]
}

fn median(sorted: &[f64]) -> f64 {
    let n = sorted.len();
    if n % 2 == 1 {
        sorted[n / 2]
    } else {
        (sorted[n / 2 - 1] + sorted[n / 2]) / 2.0
    }
}

fn degradation_ratio(in_issue_order: &[&Sample]) -> Option<f64> {
    let n = in_issue_order.len();
    if n < MIN_DEGRADATION_SAMPLES {
        return None;
    }
    let quarter = n / 4;
    let mean = |slice: &[&Sample]| slice.iter().map(|s| s.latency_ms).sum::<f64>() / slice.len() as f64;
    let first = mean(&in_issue_order[..quarter]);
    let last = mean(&in_issue_order[n - quarter..]);
    if first > 0.0 {
        Some(last / first)
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sample::Outcome;
    use chrono::{DateTime, Duration as ChronoDuration, TimeZone, Utc};

    fn at(offset_ms: i64) -> DateTime<Utc> {
        Utc.timestamp_opt(1_700_000_000, 0).unwrap() + ChronoDuration::milliseconds(offset_ms)
    }

    fn ok(latency: f64, offset: i64) -> Sample {
        Sample::success("homepage", at(offset), latency, 200)
    }

    fn failed(outcome: Outcome, latency: f64, offset: i64) -> Sample {
        Sample::failure("homepage", at(offset), latency, outcome, "boom")
    }

    #[test]
    fn test_percentiles_use_nearest_rank() {
        let samples: Vec<Sample> = (1..=100).map(|i| ok(i as f64, i)).collect();
        let metric = aggregate("homepage", &samples, Duration::from_secs(10));

        assert_eq!(metric.sample_count, 100);
        assert_eq!(metric.p95_ms, Some(95.0));
        assert_eq!(metric.p99_ms, Some(99.0));
        assert_eq!(metric.median_ms, Some(50.5));
        assert_eq!(metric.mean_ms, Some(50.5));
        assert_eq!(metric.min_ms, Some(1.0));
        assert_eq!(metric.max_ms, Some(100.0));
        assert_eq!(metric.success_rate, 1.0);
        assert_eq!(metric.throughput_rps, 10.0);
    }

    #[test]
    fn test_nearest_rank_small_sets() {
        assert_eq!(nearest_rank(&[42.0], 95), 42.0);
        assert_eq!(nearest_rank(&[42.0], 99), 42.0);

        let twenty: Vec<f64> = (1..=20).map(f64::from).collect();
        // ceil(0.95 * 20) = 19
        assert_eq!(nearest_rank(&twenty, 95), 19.0);
        // ceil(0.99 * 20) = 20
        assert_eq!(nearest_rank(&twenty, 99), 20.0);

        let ten: Vec<f64> = (1..=10).map(f64::from).collect();
        assert_eq!(nearest_rank(&ten, 95), 10.0);
        assert_eq!(nearest_rank(&ten, 50), 5.0);
    }

    #[test]
    fn test_aggregate_is_idempotent() {
        let samples: Vec<Sample> = [12.5, 3.25, 99.0, 7.75, 41.0, 0.5, 18.0]
            .iter()
            .enumerate()
            .map(|(i, l)| ok(*l, i as i64))
            .collect();
        let window = Duration::from_millis(1500);

        let first = aggregate("homepage", &samples, window);
        let second = aggregate("homepage", &samples, window);
        assert_eq!(first, second);
        assert_eq!(
            first.mean_ms.map(f64::to_bits),
            second.mean_ms.map(f64::to_bits)
        );
        assert_eq!(first.throughput_rps.to_bits(), second.throughput_rps.to_bits());
    }

    #[test]
    fn test_zero_successes_leaves_latency_undefined() {
        let samples = vec![
            failed(Outcome::Timeout, 10_000.0, 0),
            failed(Outcome::ConnectionError, 3.0, 1),
            Sample::http_error("homepage", at(2), 5.0, 500),
        ];
        let metric = aggregate("homepage", &samples, Duration::from_secs(1));

        assert_eq!(metric.sample_count, 3);
        assert_eq!(metric.success_count, 0);
        assert_eq!(metric.success_rate, 0.0);
        assert_eq!(metric.throughput_rps, 0.0);
        assert!(metric.mean_ms.is_none());
        assert!(metric.median_ms.is_none());
        assert!(metric.p95_ms.is_none());
        assert!(metric.p99_ms.is_none());
        assert!(metric.max_ms.is_none());
        assert!(!metric.has_latency());

        let json = serde_json::to_value(&metric).unwrap();
        assert!(json["p95_ms"].is_null());
    }

    #[test]
    fn test_empty_sample_set() {
        let metric = aggregate("homepage", &[], Duration::from_secs(1));
        assert_eq!(metric.sample_count, 0);
        assert_eq!(metric.success_rate, 0.0);
        assert!(metric.p95_ms.is_none());
    }

    #[test]
    fn test_failures_excluded_from_latency_but_counted_in_rate() {
        let mut samples: Vec<Sample> = (0..7).map(|i| ok(10.0, i)).collect();
        samples.push(failed(Outcome::Timeout, 5_000.0, 7));
        samples.push(failed(Outcome::ConnectionError, 1.0, 8));
        samples.push(failed(Outcome::ConnectionError, 1.0, 9));

        let metric = aggregate("homepage", &samples, Duration::from_secs(2));
        assert_eq!(metric.sample_count, 10);
        assert_eq!(metric.success_count, 7);
        assert_eq!(metric.failure_count(), 3);
        assert!((metric.success_rate - 0.7).abs() < 1e-12);
        assert_eq!(metric.max_ms, Some(10.0));
        assert_eq!(metric.throughput_rps, 3.5);
    }

    #[test]
    fn test_samples_of_other_operations_are_ignored() {
        let samples = vec![ok(10.0, 0), Sample::success("search", at(1), 900.0, 200)];
        let metric = aggregate("homepage", &samples, Duration::from_secs(1));
        assert_eq!(metric.sample_count, 1);
        assert_eq!(metric.max_ms, Some(10.0));
    }

    #[test]
    fn test_zero_window_yields_zero_throughput() {
        let metric = aggregate("homepage", &[ok(1.0, 0)], Duration::ZERO);
        assert_eq!(metric.throughput_rps, 0.0);
    }

    #[test]
    fn test_degradation_ratio_follows_issue_order() {
        // Latencies double towards the end of the run; shuffled input order.
        let samples = vec![
            ok(20.0, 7),
            ok(10.0, 0),
            ok(10.0, 2),
            ok(10.0, 1),
            ok(20.0, 6),
            ok(10.0, 3),
            ok(10.0, 4),
            ok(10.0, 5),
        ];
        let metric = aggregate("homepage", &samples, Duration::from_secs(1));
        assert_eq!(metric.degradation_ratio, Some(2.0));

        let few = vec![ok(10.0, 0), ok(20.0, 1), ok(30.0, 2)];
        assert!(aggregate("homepage", &few, Duration::from_secs(1))
            .degradation_ratio
            .is_none());
    }
}
