// Copyright 2025 Loadgauge Contributors
// SPDX-License-Identifier: Apache-2.0

//! Concurrent load generation.
//!
//! The executor spawns one tokio task per virtual user. Each worker owns a
//! weighted round-robin selector and a local sample buffer; buffers are
//! merged into per-operation buckets only after every worker has been
//! joined, so the hot path takes no locks. A request-count stop condition
//! is enforced with a shared atomic ticket counter, so exactly the
//! configured number of requests is dispatched. With a spawn rate, worker
//! `i` begins `i / rate` seconds into the phase.

use crate::collector::Collector;
use crate::schedule::WeightedRoundRobin;
use futures::future::join_all;
use loadgauge_core::{
    ConfigurationError, LoadPlan, RequestSpec, Sample, StopCondition, StopPolicy, ThinkTime,
};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Samples of one load phase, bucketed by operation.
#[derive(Debug, Clone, Default)]
pub struct SampleSet {
    buckets: BTreeMap<String, Vec<Sample>>,
    window: Duration,
}

impl SampleSet {
    /// Samples recorded for an operation; empty if none.
    pub fn get(&self, operation_name: &str) -> &[Sample] {
        self.buckets
            .get(operation_name)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Operation names, in sorted order.
    pub fn operations(&self) -> impl Iterator<Item = &str> {
        self.buckets.keys().map(String::as_str)
    }

    /// `(operation, samples)` pairs, in sorted order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &[Sample])> {
        self.buckets
            .iter()
            .map(|(name, samples)| (name.as_str(), samples.as_slice()))
    }

    /// Observed wall-clock length of the load phase.
    pub fn window(&self) -> Duration {
        self.window
    }

    /// Total samples across all operations.
    pub fn total(&self) -> usize {
        self.buckets.values().map(Vec::len).sum()
    }
}

/// Runs load plans against one target.
pub struct LoadExecutor {
    collector: Arc<dyn Collector>,
    base_url: String,
}

impl LoadExecutor {
    /// Create an executor that resolves operation paths against `base_url`.
    pub fn new(collector: Arc<dyn Collector>, base_url: impl Into<String>) -> Self {
        Self {
            collector,
            base_url: base_url.into(),
        }
    }

    /// Run a plan until its stop condition is met or `stop` is cancelled.
    ///
    /// Cancelling `stop` prevents new dispatches; in-flight requests run to
    /// completion or to their own timeout. A [`ConfigurationError`] from any
    /// worker stops the others and is returned instead of samples.
    pub async fn run(
        &self,
        plan: &LoadPlan,
        stop: CancellationToken,
    ) -> Result<SampleSet, ConfigurationError> {
        plan.validate()?;

        let operations: Arc<[PreparedOperation]> = plan
            .operations
            .iter()
            .map(|op| PreparedOperation {
                name: op.name.clone(),
                request: op.request(&self.base_url),
            })
            .collect();
        let weights: Vec<u32> = plan.operations.iter().map(|op| op.weight).collect();

        let started = Instant::now();
        let (deadline, budget) = match plan.stop {
            StopCondition::Duration(duration) => (Some(started + duration), None),
            StopCondition::Requests(limit) => (None, Some(Arc::new(RequestBudget::new(limit)))),
        };
        // Child token: a worker aborting on bad configuration must not
        // cancel the caller's token.
        let abort = match plan.stop_policy {
            StopPolicy::BestEffort => stop.child_token(),
        };

        info!(
            base_url = %self.base_url,
            operations = operations.len(),
            concurrency = plan.concurrency,
            stop = %plan.stop,
            stop_policy = %plan.stop_policy,
            think_time = %plan.think_time,
            spawn_rate = ?plan.spawn_rate,
            "Starting load phase"
        );

        let handles: Vec<_> = (0..plan.concurrency)
            .map(|id| {
                let worker = Worker {
                    id,
                    collector: Arc::clone(&self.collector),
                    operations: Arc::clone(&operations),
                    schedule: WeightedRoundRobin::with_offset(&weights, id),
                    start_at: started + plan.start_offset(id),
                    deadline,
                    budget: budget.clone(),
                    stop: abort.clone(),
                    timeout: plan.request_timeout,
                    think_time: plan.think_time,
                    rng: StdRng::from_entropy(),
                };
                tokio::spawn(worker.run())
            })
            .collect();

        let results = join_all(handles).await;
        let window = started.elapsed();

        let mut buckets: BTreeMap<String, Vec<Sample>> = operations
            .iter()
            .map(|op| (op.name.clone(), Vec::new()))
            .collect();
        let mut first_error = None;

        for result in results {
            match result {
                Ok(Ok(samples)) => {
                    for sample in samples {
                        buckets
                            .entry(sample.operation_name.clone())
                            .or_default()
                            .push(sample);
                    }
                }
                Ok(Err(err)) => {
                    first_error.get_or_insert(err);
                }
                Err(join_err) => {
                    if join_err.is_panic() {
                        std::panic::resume_unwind(join_err.into_panic());
                    }
                }
            }
        }

        if let Some(err) = first_error {
            return Err(err);
        }

        let set = SampleSet { buckets, window };
        info!(
            samples = set.total(),
            window_ms = window.as_millis() as u64,
            "Load phase complete"
        );
        Ok(set)
    }
}

struct PreparedOperation {
    name: String,
    request: RequestSpec,
}

/// Shared request tickets for a count-bounded run.
struct RequestBudget {
    issued: AtomicU64,
    limit: u64,
}

impl RequestBudget {
    fn new(limit: u64) -> Self {
        Self {
            issued: AtomicU64::new(0),
            limit,
        }
    }

    /// Claim one request; `false` once the limit is reached.
    fn take(&self) -> bool {
        self.issued.fetch_add(1, Ordering::Relaxed) < self.limit
    }
}

struct Worker {
    id: usize,
    collector: Arc<dyn Collector>,
    operations: Arc<[PreparedOperation]>,
    schedule: WeightedRoundRobin,
    start_at: Instant,
    deadline: Option<Instant>,
    budget: Option<Arc<RequestBudget>>,
    stop: CancellationToken,
    timeout: Duration,
    think_time: ThinkTime,
    rng: StdRng,
}

impl Worker {
    async fn run(mut self) -> Result<Vec<Sample>, ConfigurationError> {
        let mut samples = Vec::new();

        if !self.pause_until(self.start_at).await {
            return Ok(samples);
        }

        loop {
            if self.stop.is_cancelled() {
                break;
            }
            if let Some(deadline) = self.deadline {
                if Instant::now() >= deadline {
                    break;
                }
            }
            if let Some(budget) = &self.budget {
                if !budget.take() {
                    break;
                }
            }

            let op = &self.operations[self.schedule.next_index()];
            match self.collector.collect(&op.name, &op.request, self.timeout).await {
                Ok(sample) => samples.push(sample),
                Err(err) => {
                    warn!(worker = self.id, operation = %op.name, error = %err, "Aborting load phase");
                    self.stop.cancel();
                    return Err(err);
                }
            }

            if !self.think_time.is_zero() {
                let pause = self.next_pause();
                if !self.pause_until(Instant::now() + pause).await {
                    break;
                }
            }
        }

        debug!(worker = self.id, samples = samples.len(), "Worker finished");
        Ok(samples)
    }

    fn next_pause(&mut self) -> Duration {
        if self.think_time.is_fixed() {
            self.think_time.min
        } else {
            self.rng.gen_range(self.think_time.min..=self.think_time.max)
        }
    }

    /// Sleep until `until`, or the deadline if that comes first.
    ///
    /// Returns `false` if the stop token fired during the wait.
    async fn pause_until(&self, until: Instant) -> bool {
        let until = match self.deadline {
            Some(deadline) => until.min(deadline),
            None => until,
        };
        tokio::select! {
            _ = tokio::time::sleep_until(until) => true,
            _ = self.stop.cancelled() => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::ScriptedCollector;
    use loadgauge_core::{OperationSpec, Outcome};

    fn plan(ops: Vec<OperationSpec>, concurrency: usize, requests: u64) -> LoadPlan {
        LoadPlan::builder()
            .operations(ops)
            .concurrency(concurrency)
            .requests(requests)
            .build()
            .unwrap()
    }

    #[tokio::test]
    async fn test_request_count_is_exact_across_workers() {
        let collector = Arc::new(ScriptedCollector::new());
        let executor = LoadExecutor::new(collector.clone(), "http://target");
        let plan = plan(
            vec![
                OperationSpec::get("homepage", "/").with_weight(3),
                OperationSpec::get("products", "/products"),
            ],
            8,
            250,
        );

        let set = executor.run(&plan, CancellationToken::new()).await.unwrap();

        assert_eq!(set.total(), 250);
        assert_eq!(collector.calls(), 250);
        for (name, samples) in set.iter() {
            assert!(samples.iter().all(|s| s.operation_name == name));
        }
    }

    #[tokio::test]
    async fn test_single_worker_preserves_weights_and_order() {
        let collector = Arc::new(ScriptedCollector::new());
        let executor = LoadExecutor::new(collector, "http://target");
        let plan = plan(
            vec![
                OperationSpec::get("homepage", "/").with_weight(3),
                OperationSpec::get("products", "/products"),
            ],
            1,
            400,
        );

        let set = executor.run(&plan, CancellationToken::new()).await.unwrap();
        assert_eq!(set.get("homepage").len(), 300);
        assert_eq!(set.get("products").len(), 100);

        let homepage = set.get("homepage");
        assert!(homepage
            .windows(2)
            .all(|pair| pair[0].timestamp <= pair[1].timestamp));
    }

    #[tokio::test]
    async fn test_failed_samples_do_not_stop_the_run() {
        let collector = Arc::new(
            ScriptedCollector::new().with_script("homepage", vec![Outcome::ConnectionError; 5]),
        );
        let executor = LoadExecutor::new(collector, "http://target");
        let plan = plan(vec![OperationSpec::get("homepage", "/")], 2, 12);

        let set = executor.run(&plan, CancellationToken::new()).await.unwrap();
        let samples = set.get("homepage");
        assert_eq!(samples.len(), 12);
        assert_eq!(
            samples
                .iter()
                .filter(|s| s.outcome == Outcome::ConnectionError)
                .count(),
            5
        );
    }

    #[tokio::test]
    async fn test_every_operation_gets_a_bucket() {
        let collector = Arc::new(ScriptedCollector::new());
        let executor = LoadExecutor::new(collector, "http://target");
        let plan = plan(
            vec![
                OperationSpec::get("homepage", "/"),
                OperationSpec::get("search", "/products?search=phone"),
            ],
            1,
            1,
        );

        let set = executor.run(&plan, CancellationToken::new()).await.unwrap();
        let names: Vec<&str> = set.operations().collect();
        assert_eq!(names, vec!["homepage", "search"]);
        assert_eq!(set.get("homepage").len(), 1);
        assert!(set.get("search").is_empty());
    }

    #[tokio::test]
    async fn test_configuration_error_aborts_executor() {
        let collector = Arc::new(ScriptedCollector::new().with_malformed("broken"));
        let executor = LoadExecutor::new(collector, "http://target");
        let plan = LoadPlan::builder()
            .operations(vec![
                OperationSpec::get("homepage", "/"),
                OperationSpec::get("broken", "/broken"),
            ])
            .concurrency(4)
            .duration(Duration::from_secs(30))
            .build()
            .unwrap();

        let stop = CancellationToken::new();
        let err = executor.run(&plan, stop.clone()).await.unwrap_err();
        assert!(matches!(err, ConfigurationError::MalformedRequest { .. }));
        assert!(!stop.is_cancelled());
    }

    #[tokio::test]
    async fn test_duration_stop_condition() {
        let collector = Arc::new(ScriptedCollector::new().with_delay(Duration::from_millis(5)));
        let executor = LoadExecutor::new(collector, "http://target");
        let plan = LoadPlan::builder()
            .operation(OperationSpec::get("homepage", "/"))
            .concurrency(2)
            .duration(Duration::from_millis(100))
            .build()
            .unwrap();

        let set = executor.run(&plan, CancellationToken::new()).await.unwrap();
        assert!(set.total() > 0);
        assert!(set.window() >= Duration::from_millis(100));
        assert!(set.window() < Duration::from_secs(5));
    }

    #[tokio::test]
    async fn test_cancelled_stop_dispatches_nothing() {
        let collector = Arc::new(ScriptedCollector::new());
        let executor = LoadExecutor::new(collector.clone(), "http://target");
        let plan = plan(vec![OperationSpec::get("homepage", "/")], 3, 100);

        let stop = CancellationToken::new();
        stop.cancel();
        let set = executor.run(&plan, stop).await.unwrap();
        assert_eq!(set.total(), 0);
        assert_eq!(collector.calls(), 0);
    }

    #[tokio::test]
    async fn test_stop_interrupts_think_time_but_keeps_samples() {
        let collector = Arc::new(ScriptedCollector::new());
        let executor = LoadExecutor::new(collector, "http://target");
        let plan = LoadPlan::builder()
            .operation(OperationSpec::get("homepage", "/"))
            .concurrency(2)
            .duration(Duration::from_secs(60))
            .think_time(Duration::from_secs(30))
            .build()
            .unwrap();

        let stop = CancellationToken::new();
        let trigger = stop.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(50)).await;
            trigger.cancel();
        });

        let set = executor.run(&plan, stop).await.unwrap();
        // One request per worker before the long pause.
        assert_eq!(set.total(), 2);
        assert!(set.window() < Duration::from_secs(30));
    }

    #[tokio::test(start_paused = true)]
    async fn test_deadline_cuts_think_time_short() {
        let collector = Arc::new(ScriptedCollector::new());
        let executor = LoadExecutor::new(collector, "http://target");
        let plan = LoadPlan::builder()
            .operation(OperationSpec::get("homepage", "/"))
            .duration(Duration::from_millis(100))
            .think_time(Duration::from_secs(3))
            .build()
            .unwrap();

        let set = executor.run(&plan, CancellationToken::new()).await.unwrap();
        assert_eq!(set.total(), 1);
        assert!(set.window() >= Duration::from_millis(100));
        assert!(set.window() < Duration::from_millis(500));
    }

    #[tokio::test(start_paused = true)]
    async fn test_random_think_time_stays_in_range() {
        let collector = Arc::new(ScriptedCollector::new());
        let executor = LoadExecutor::new(collector, "http://target");
        let plan = LoadPlan::builder()
            .operation(OperationSpec::get("homepage", "/"))
            .requests(5)
            .think_time_between(Duration::from_millis(100), Duration::from_millis(300))
            .build()
            .unwrap();

        let set = executor.run(&plan, CancellationToken::new()).await.unwrap();
        assert_eq!(set.total(), 5);
        // One pause follows each request.
        assert!(set.window() >= Duration::from_millis(500));
        assert!(set.window() <= Duration::from_millis(1510));
    }

    #[tokio::test(start_paused = true)]
    async fn test_spawn_rate_staggers_worker_starts() {
        let collector = Arc::new(ScriptedCollector::new());
        let executor = LoadExecutor::new(collector, "http://target");
        let plan = LoadPlan::builder()
            .operation(OperationSpec::get("homepage", "/"))
            .concurrency(4)
            .spawn_rate(2.0)
            .duration(Duration::from_millis(1200))
            .think_time(Duration::from_millis(100))
            .build()
            .unwrap();

        let set = executor.run(&plan, CancellationToken::new()).await.unwrap();
        // Workers start at 0, 0.5, 1.0 and 1.5 s: roughly 12 + 7 + 2 + 0
        // requests instead of 4 * 12 with every worker started at once.
        assert!(
            (18..=24).contains(&set.total()),
            "unexpected total {}",
            set.total()
        );
        assert!(set.window() < Duration::from_millis(1300));
    }

    #[tokio::test(start_paused = true)]
    async fn test_stop_cancels_pending_worker_starts() {
        let collector = Arc::new(ScriptedCollector::new().with_delay(Duration::from_millis(10)));
        let executor = LoadExecutor::new(collector.clone(), "http://target");
        let plan = LoadPlan::builder()
            .operation(OperationSpec::get("homepage", "/"))
            .concurrency(3)
            .spawn_rate(0.1)
            .duration(Duration::from_secs(60))
            .build()
            .unwrap();

        let stop = CancellationToken::new();
        let trigger = stop.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_secs(1)).await;
            trigger.cancel();
        });

        let set = executor.run(&plan, stop).await.unwrap();
        // Only the first worker started; the others were due at 10 s and 20 s.
        assert!((95..=101).contains(&collector.calls()), "{}", collector.calls());
        assert_eq!(set.total(), collector.calls());
        assert!(set.window() < Duration::from_secs(2));
    }

    #[tokio::test(start_paused = true)]
    async fn test_timed_out_requests_do_not_block_other_workers() {
        let collector = Arc::new(
            ScriptedCollector::new()
                .with_delay(Duration::from_millis(10))
                .with_operation_delay("slow", Duration::from_secs(5)),
        );
        let executor = LoadExecutor::new(collector, "http://target");
        let plan = LoadPlan::builder()
            .operations(vec![
                OperationSpec::get("slow", "/slow"),
                OperationSpec::get("fast", "/fast").with_weight(9),
            ])
            .concurrency(4)
            .duration(Duration::from_secs(1))
            .request_timeout(Duration::from_millis(400))
            .build()
            .unwrap();

        let set = executor.run(&plan, CancellationToken::new()).await.unwrap();

        let slow = set.get("slow");
        assert!(slow.len() >= 4);
        assert!(slow.iter().all(|s| s.outcome == Outcome::Timeout));
        assert!(slow.iter().all(|s| s.latency_ms == 400.0));
        // Serialized behind the stuck requests, four workers would manage
        // fewer than 20 fast samples in one second.
        assert!(set.get("fast").len() > 40, "fast = {}", set.get("fast").len());
        assert!(set.window() <= Duration::from_millis(1450));
    }

    #[tokio::test(start_paused = true)]
    async fn test_best_effort_stop_drains_in_flight_requests() {
        let collector = Arc::new(ScriptedCollector::new().with_delay(Duration::from_millis(200)));
        let executor = LoadExecutor::new(collector, "http://target");
        let plan = LoadPlan::builder()
            .operation(OperationSpec::get("homepage", "/"))
            .concurrency(2)
            .duration(Duration::from_secs(60))
            .stop_policy(StopPolicy::BestEffort)
            .build()
            .unwrap();

        let stop = CancellationToken::new();
        let trigger = stop.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(50)).await;
            trigger.cancel();
        });

        let set = executor.run(&plan, stop).await.unwrap();
        let samples = set.get("homepage");
        assert_eq!(samples.len(), 2);
        assert!(samples.iter().all(Sample::is_success));
        assert!(set.window() >= Duration::from_millis(200));
    }
}
