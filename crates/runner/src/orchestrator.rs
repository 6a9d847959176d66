// Copyright 2025 Loadgauge Contributors
// SPDX-License-Identifier: Apache-2.0

//! Top-level run coordination.
//!
//! A [`RunOrchestrator`] walks one run through
//! `CONFIGURED -> RUNNING -> AGGREGATING -> EVALUATED -> DONE`. Any
//! configuration problem, and a target that fails the pre-flight probe,
//! moves it to `FAILED` instead; nothing is dispatched in that case and no
//! result is produced. An orchestrator runs at most once.

use crate::collector::{validate_request, Collector};
use crate::executor::LoadExecutor;
use chrono::Utc;
use loadgauge_core::{
    aggregate, evaluate, informational, overall_passed, BenchmarkRegistry, ConfigurationError,
    EngineError, EvaluationVerdict, LoadPlan, RunResult, RunState,
};
use reqwest::Url;
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use uuid::Uuid;

/// Timeout of the pre-flight probe.
pub const DEFAULT_PROBE_TIMEOUT: Duration = Duration::from_secs(5);

/// Everything needed to start one run.
#[derive(Debug, Clone)]
pub struct RunConfig {
    /// Profile name recorded in the result.
    pub profile_name: String,
    /// Target base URL.
    pub base_url: String,
    /// Load phase description.
    pub plan: LoadPlan,
    /// Timeout of the pre-flight probe.
    pub probe_timeout: Duration,
}

impl RunConfig {
    /// Config with the default probe timeout.
    pub fn new(profile_name: impl Into<String>, base_url: impl Into<String>, plan: LoadPlan) -> Self {
        Self {
            profile_name: profile_name.into(),
            base_url: base_url.into(),
            plan,
            probe_timeout: DEFAULT_PROBE_TIMEOUT,
        }
    }

    /// Override the probe timeout.
    pub fn with_probe_timeout(mut self, timeout: Duration) -> Self {
        self.probe_timeout = timeout;
        self
    }

    fn validate(&self) -> Result<(), ConfigurationError> {
        self.plan.validate()?;
        let base = Url::parse(&self.base_url).map_err(|e| {
            ConfigurationError::invalid_operation(
                "base_url",
                format!("invalid base url '{}': {}", self.base_url, e),
            )
        })?;
        if !matches!(base.scheme(), "http" | "https") {
            return Err(ConfigurationError::invalid_operation(
                "base_url",
                format!("unsupported scheme '{}'", base.scheme()),
            ));
        }
        for op in &self.plan.operations {
            validate_request(&op.name, &op.request(&self.base_url))?;
        }
        Ok(())
    }
}

/// Coordinates probe, load, aggregation and evaluation for one run.
pub struct RunOrchestrator {
    config: RunConfig,
    registry: BenchmarkRegistry,
    collector: Arc<dyn Collector>,
    state: RunState,
    stop: CancellationToken,
    result: Option<Arc<RunResult>>,
}

impl RunOrchestrator {
    /// Create an orchestrator in the `CONFIGURED` state.
    pub fn new(config: RunConfig, registry: BenchmarkRegistry, collector: Arc<dyn Collector>) -> Self {
        Self {
            config,
            registry,
            collector,
            state: RunState::Configured,
            stop: CancellationToken::new(),
            result: None,
        }
    }

    /// Current lifecycle state.
    pub fn state(&self) -> RunState {
        self.state
    }

    /// Final result, once the run is `DONE`.
    pub fn result(&self) -> Option<Arc<RunResult>> {
        self.result.clone()
    }

    /// Token that stops dispatching when cancelled.
    ///
    /// In-flight requests still finish; the run then completes normally
    /// with whatever was collected.
    pub fn stop_handle(&self) -> CancellationToken {
        self.stop.clone()
    }

    /// Execute the run.
    pub async fn run(&mut self) -> Result<Arc<RunResult>, EngineError> {
        if self.state != RunState::Configured {
            return Err(EngineError::AlreadyStarted(self.state.to_string()));
        }

        if let Err(err) = self.config.validate() {
            return Err(self.fail(err.into()));
        }

        info!(
            profile = %self.config.profile_name,
            base_url = %self.config.base_url,
            "Pre-flight probe"
        );
        if let Err(err) = self
            .collector
            .probe(&self.config.base_url, self.config.probe_timeout)
            .await
        {
            return Err(self.fail(err.into()));
        }

        let run_id = Uuid::new_v4();
        let started_at = Utc::now();
        self.transition(RunState::Running);

        let executor = LoadExecutor::new(Arc::clone(&self.collector), self.config.base_url.clone());
        let samples = match executor.run(&self.config.plan, self.stop.clone()).await {
            Ok(samples) => samples,
            Err(err) => return Err(self.fail(err.into())),
        };

        self.transition(RunState::Aggregating);
        let window = samples.window();
        let metrics: Vec<_> = samples
            .iter()
            .map(|(name, bucket)| aggregate(name, bucket, window))
            .collect();

        let verdicts: BTreeMap<String, EvaluationVerdict> = metrics
            .into_iter()
            .map(|metric| {
                let verdict = match self.registry.get(&metric.operation_name) {
                    Ok(benchmark) => evaluate(metric, benchmark),
                    Err(missing) => {
                        debug!(%missing, "Operation is informational only");
                        informational(metric)
                    }
                };
                log_verdict(&verdict);
                (verdict.operation_name.clone(), verdict)
            })
            .collect();
        self.transition(RunState::Evaluated);

        let overall = overall_passed(verdicts.values());
        let result = Arc::new(RunResult {
            run_id,
            started_at,
            ended_at: Utc::now(),
            profile_name: self.config.profile_name.clone(),
            base_url: self.config.base_url.clone(),
            concurrency: self.config.plan.concurrency,
            total_samples: samples.total(),
            window_secs: window.as_secs_f64(),
            verdicts,
            overall_passed: overall,
        });
        self.result = Some(Arc::clone(&result));
        self.transition(RunState::Done);

        info!(
            run_id = %run_id,
            overall_passed = overall,
            samples = result.total_samples,
            "Run complete"
        );
        Ok(result)
    }

    fn transition(&mut self, next: RunState) {
        debug_assert!(
            self.state.can_transition_to(next),
            "illegal transition {} -> {}",
            self.state,
            next
        );
        debug!(from = %self.state, to = %next, "Run state transition");
        self.state = next;
    }

    fn fail(&mut self, err: EngineError) -> EngineError {
        warn!(state = %self.state, error = %err, "Run failed");
        self.transition(RunState::Failed);
        err
    }
}

fn log_verdict(verdict: &EvaluationVerdict) {
    let metric = &verdict.metric;
    match verdict.passed {
        Some(true) => info!(
            operation = %verdict.operation_name,
            samples = metric.sample_count,
            p95_ms = ?metric.p95_ms,
            success_rate = metric.success_rate,
            warnings = verdict.warnings().count(),
            "Benchmark passed"
        ),
        Some(false) => warn!(
            operation = %verdict.operation_name,
            samples = metric.sample_count,
            p95_ms = ?metric.p95_ms,
            success_rate = metric.success_rate,
            failures = verdict.failures().count(),
            "Benchmark failed"
        ),
        None => info!(
            operation = %verdict.operation_name,
            samples = metric.sample_count,
            p95_ms = ?metric.p95_ms,
            "No benchmark registered"
        ),
    }
}
