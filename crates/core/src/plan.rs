// Copyright 2025 Loadgauge Contributors
// SPDX-License-Identifier: Apache-2.0

//! Load plans: what a load executor runs, how hard, and for how long.

use crate::error::ConfigurationError;
use crate::operation::{validate_operations, OperationSpec};
use std::time::Duration;

/// Default per-request timeout.
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// When workers stop dispatching new requests.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopCondition {
    /// Stop once this much wall-clock time has elapsed since the run began.
    Duration(Duration),
    /// Stop once this many requests have been dispatched across all workers.
    Requests(u64),
}

impl StopCondition {
    fn validate(&self) -> Result<(), ConfigurationError> {
        match self {
            Self::Duration(d) if d.is_zero() => Err(ConfigurationError::InvalidStopCondition(
                "duration must be positive".to_string(),
            )),
            Self::Requests(0) => Err(ConfigurationError::InvalidStopCondition(
                "request count must be positive".to_string(),
            )),
            _ => Ok(()),
        }
    }
}

impl std::fmt::Display for StopCondition {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Duration(d) => write!(f, "{}s", d.as_secs_f64()),
            Self::Requests(n) => write!(f, "{} requests", n),
        }
    }
}

/// How a run winds down once stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StopPolicy {
    /// Stop dispatching, let in-flight requests finish or time out.
    #[default]
    BestEffort,
}

impl std::fmt::Display for StopPolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::BestEffort => f.write_str("best-effort"),
        }
    }
}

/// Pause between two requests of one worker, drawn uniformly from
/// `min..=max` before every request after the first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ThinkTime {
    /// Shortest pause.
    pub min: Duration,
    /// Longest pause.
    pub max: Duration,
}

impl ThinkTime {
    /// No pause at all.
    pub const NONE: ThinkTime = ThinkTime {
        min: Duration::ZERO,
        max: Duration::ZERO,
    };

    /// Always pause for exactly `pause`.
    pub fn fixed(pause: Duration) -> Self {
        Self {
            min: pause,
            max: pause,
        }
    }

    /// Pause for a uniformly random time in `min..=max`.
    pub fn between(min: Duration, max: Duration) -> Self {
        Self { min, max }
    }

    /// Whether workers never pause.
    pub fn is_zero(&self) -> bool {
        self.max.is_zero()
    }

    /// Whether every pause has the same length.
    pub fn is_fixed(&self) -> bool {
        self.min == self.max
    }

    fn validate(&self) -> Result<(), ConfigurationError> {
        if self.min > self.max {
            return Err(ConfigurationError::InvalidLoadShape(format!(
                "think time minimum {:?} exceeds maximum {:?}",
                self.min, self.max
            )));
        }
        Ok(())
    }
}

impl std::fmt::Display for ThinkTime {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.is_zero() {
            f.write_str("none")
        } else if self.is_fixed() {
            write!(f, "{}ms", self.min.as_millis())
        } else {
            write!(f, "{}-{}ms", self.min.as_millis(), self.max.as_millis())
        }
    }
}

/// A validated description of one load phase.
#[derive(Debug, Clone, PartialEq)]
pub struct LoadPlan {
    /// Operations to dispatch, selected by weight.
    pub operations: Vec<OperationSpec>,
    /// Number of concurrent workers.
    pub concurrency: usize,
    /// When to stop dispatching.
    pub stop: StopCondition,
    /// How to wind down.
    pub stop_policy: StopPolicy,
    /// Timeout applied to every individual request.
    pub request_timeout: Duration,
    /// Pause between two requests of the same worker.
    pub think_time: ThinkTime,
    /// Workers started per second; `None` starts every worker at once.
    pub spawn_rate: Option<f64>,
}

impl LoadPlan {
    /// Create a new builder.
    pub fn builder() -> LoadPlanBuilder {
        LoadPlanBuilder::default()
    }

    /// Check every structural invariant.
    pub fn validate(&self) -> Result<(), ConfigurationError> {
        validate_operations(&self.operations)?;
        if self.concurrency == 0 {
            return Err(ConfigurationError::NonPositiveConcurrency(self.concurrency));
        }
        self.stop.validate()?;
        if self.request_timeout.is_zero() {
            return Err(ConfigurationError::InvalidTimeout);
        }
        self.think_time.validate()?;
        if let Some(rate) = self.spawn_rate {
            if !rate.is_finite() || rate <= 0.0 {
                return Err(ConfigurationError::InvalidLoadShape(format!(
                    "spawn rate must be positive, got {}",
                    rate
                )));
            }
        }
        Ok(())
    }

    /// Offset from the start of the load phase at which worker `index` begins.
    pub fn start_offset(&self, index: usize) -> Duration {
        match self.spawn_rate {
            Some(rate) => Duration::from_nanos((index as f64 * 1e9 / rate).round() as u64),
            None => Duration::ZERO,
        }
    }
}

/// Builder for [`LoadPlan`] instances.
#[derive(Debug, Default)]
pub struct LoadPlanBuilder {
    operations: Vec<OperationSpec>,
    concurrency: Option<usize>,
    stop: Option<StopCondition>,
    stop_policy: StopPolicy,
    request_timeout: Option<Duration>,
    think_time: ThinkTime,
    spawn_rate: Option<f64>,
}

impl LoadPlanBuilder {
    /// Add an operation.
    pub fn operation(mut self, operation: OperationSpec) -> Self {
        self.operations.push(operation);
        self
    }

    /// Replace all operations.
    pub fn operations(mut self, operations: impl IntoIterator<Item = OperationSpec>) -> Self {
        self.operations = operations.into_iter().collect();
        self
    }

    /// Set the number of workers (default: 1).
    pub fn concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = Some(concurrency);
        self
    }

    /// Run for a fixed duration.
    pub fn duration(mut self, duration: Duration) -> Self {
        self.stop = Some(StopCondition::Duration(duration));
        self
    }

    /// Run for a fixed number of requests.
    pub fn requests(mut self, count: u64) -> Self {
        self.stop = Some(StopCondition::Requests(count));
        self
    }

    /// Set the stop condition directly.
    pub fn stop(mut self, stop: StopCondition) -> Self {
        self.stop = Some(stop);
        self
    }

    /// Set the stop policy (default: best effort).
    pub fn stop_policy(mut self, policy: StopPolicy) -> Self {
        self.stop_policy = policy;
        self
    }

    /// Set the per-request timeout (default: 10s).
    pub fn request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = Some(timeout);
        self
    }

    /// Set a fixed pause between requests of one worker (default: none).
    pub fn think_time(mut self, think_time: Duration) -> Self {
        self.think_time = ThinkTime::fixed(think_time);
        self
    }

    /// Set a random pause in `min..=max` between requests of one worker.
    pub fn think_time_between(mut self, min: Duration, max: Duration) -> Self {
        self.think_time = ThinkTime::between(min, max);
        self
    }

    /// Start workers gradually, `rate` per second (default: all at once).
    pub fn spawn_rate(mut self, rate: f64) -> Self {
        self.spawn_rate = Some(rate);
        self
    }

    /// Build and validate the plan.
    pub fn build(self) -> Result<LoadPlan, ConfigurationError> {
        let stop = self.stop.ok_or_else(|| {
            ConfigurationError::InvalidStopCondition(
                "either a duration or a request count is required".to_string(),
            )
        })?;
        let plan = LoadPlan {
            operations: self.operations,
            concurrency: self.concurrency.unwrap_or(1),
            stop,
            stop_policy: self.stop_policy,
            request_timeout: self.request_timeout.unwrap_or(DEFAULT_REQUEST_TIMEOUT),
            think_time: self.think_time,
            spawn_rate: self.spawn_rate,
        };
        plan.validate()?;
        Ok(plan)
    }
}
