// Copyright 2025 Loadgauge Contributors
// SPDX-License-Identifier: Apache-2.0

//! Scripted collector for unit tests.

use crate::collector::Collector;
use async_trait::async_trait;
use chrono::Utc;
use loadgauge_core::{ConfigurationError, Outcome, RequestSpec, Sample, UnreachableTargetError};
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

/// Returns scripted outcomes per operation, then successes.
pub(crate) struct ScriptedCollector {
    scripts: Mutex<HashMap<String, VecDeque<Outcome>>>,
    malformed: Option<String>,
    latency_ms: f64,
    delay: Duration,
    operation_delays: HashMap<String, Duration>,
    reachable: bool,
    calls: AtomicUsize,
}

impl ScriptedCollector {
    pub(crate) fn new() -> Self {
        Self {
            scripts: Mutex::new(HashMap::new()),
            malformed: None,
            latency_ms: 50.0,
            delay: Duration::ZERO,
            operation_delays: HashMap::new(),
            reachable: true,
            calls: AtomicUsize::new(0),
        }
    }

    pub(crate) fn with_script(self, operation: &str, outcomes: Vec<Outcome>) -> Self {
        self.scripts
            .lock()
            .unwrap()
            .insert(operation.to_string(), outcomes.into());
        self
    }

    pub(crate) fn with_malformed(mut self, operation: &str) -> Self {
        self.malformed = Some(operation.to_string());
        self
    }

    pub(crate) fn with_latency(mut self, latency_ms: f64) -> Self {
        self.latency_ms = latency_ms;
        self
    }

    pub(crate) fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    /// Delay for one operation only. A delay at or past the request
    /// timeout ends in a `Timeout` sample once the timeout elapses.
    pub(crate) fn with_operation_delay(mut self, operation: &str, delay: Duration) -> Self {
        self.operation_delays.insert(operation.to_string(), delay);
        self
    }

    pub(crate) fn unreachable(mut self) -> Self {
        self.reachable = false;
        self
    }

    pub(crate) fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Collector for ScriptedCollector {
    async fn collect(
        &self,
        operation_name: &str,
        _request: &RequestSpec,
        timeout: Duration,
    ) -> Result<Sample, ConfigurationError> {
        if self.malformed.as_deref() == Some(operation_name) {
            return Err(ConfigurationError::malformed_request(
                operation_name,
                "scripted failure",
            ));
        }
        self.calls.fetch_add(1, Ordering::SeqCst);
        let delay = self
            .operation_delays
            .get(operation_name)
            .copied()
            .unwrap_or(self.delay);
        if delay >= timeout {
            tokio::time::sleep(timeout).await;
            return Ok(Sample::failure(
                operation_name,
                Utc::now(),
                timeout.as_secs_f64() * 1000.0,
                Outcome::Timeout,
                "timed out",
            ));
        }
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }

        let outcome = self
            .scripts
            .lock()
            .unwrap()
            .get_mut(operation_name)
            .and_then(VecDeque::pop_front)
            .unwrap_or(Outcome::Success);

        let now = Utc::now();
        Ok(match outcome {
            Outcome::Success => Sample::success(operation_name, now, self.latency_ms, 200),
            Outcome::HttpError => Sample::http_error(operation_name, now, self.latency_ms, 500),
            Outcome::Timeout => Sample::failure(
                operation_name,
                now,
                timeout.as_secs_f64() * 1000.0,
                Outcome::Timeout,
                "timed out",
            ),
            Outcome::ConnectionError => Sample::failure(
                operation_name,
                now,
                1.0,
                Outcome::ConnectionError,
                "connection refused",
            ),
        })
    }

    async fn probe(&self, base_url: &str, _timeout: Duration) -> Result<(), UnreachableTargetError> {
        if self.reachable {
            Ok(())
        } else {
            Err(UnreachableTargetError {
                base_url: base_url.to_string(),
                reason: "connection refused".to_string(),
            })
        }
    }
}
