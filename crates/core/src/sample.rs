// Copyright 2025 Loadgauge Contributors
// SPDX-License-Identifier: Apache-2.0

//! Raw latency samples.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// How a single request ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Outcome {
    /// Response received with an accepted status code.
    Success,
    /// Response received with a status code that was not accepted.
    HttpError,
    /// The request exceeded its own timeout.
    Timeout,
    /// The connection could not be established or was dropped.
    ConnectionError,
}

impl Outcome {
    /// Whether this outcome counts towards latency statistics.
    pub fn is_success(&self) -> bool {
        matches!(self, Outcome::Success)
    }
}

impl std::fmt::Display for Outcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Outcome::Success => "success",
            Outcome::HttpError => "http_error",
            Outcome::Timeout => "timeout",
            Outcome::ConnectionError => "connection_error",
        };
        f.write_str(s)
    }
}

/// One measured request.
///
/// Samples are created by a collector and never mutated afterwards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Sample {
    /// Operation the request was generated for.
    pub operation_name: String,
    /// Wall-clock time the request was issued.
    pub timestamp: DateTime<Utc>,
    /// Elapsed time in milliseconds. For timeouts this is the timeout boundary.
    pub latency_ms: f64,
    /// How the request ended.
    pub outcome: Outcome,
    /// HTTP status, when a response was received.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status_code: Option<u16>,
    /// Transport error text for failed requests.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

impl Sample {
    /// Sample for a response with an accepted status.
    pub fn success(
        operation_name: impl Into<String>,
        timestamp: DateTime<Utc>,
        latency_ms: f64,
        status_code: u16,
    ) -> Self {
        Self {
            operation_name: operation_name.into(),
            timestamp,
            latency_ms,
            outcome: Outcome::Success,
            status_code: Some(status_code),
            detail: None,
        }
    }

    /// Sample for a response whose status was not accepted.
    pub fn http_error(
        operation_name: impl Into<String>,
        timestamp: DateTime<Utc>,
        latency_ms: f64,
        status_code: u16,
    ) -> Self {
        Self {
            operation_name: operation_name.into(),
            timestamp,
            latency_ms,
            outcome: Outcome::HttpError,
            status_code: Some(status_code),
            detail: None,
        }
    }

    /// Sample for a request that failed before a complete response arrived.
    pub fn failure(
        operation_name: impl Into<String>,
        timestamp: DateTime<Utc>,
        latency_ms: f64,
        outcome: Outcome,
        detail: impl Into<String>,
    ) -> Self {
        Self {
            operation_name: operation_name.into(),
            timestamp,
            latency_ms,
            outcome,
            status_code: None,
            detail: Some(detail.into()),
        }
    }

    /// Whether the request succeeded.
    pub fn is_success(&self) -> bool {
        self.outcome.is_success()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_outcome_serializes_in_screaming_case() {
        let json = serde_json::to_string(&Outcome::ConnectionError).unwrap();
        assert_eq!(json, "\"CONNECTION_ERROR\"");
    }

    #[test]
    fn test_failure_sample_has_no_status() {
        let sample = Sample::failure("search", Utc::now(), 10.0, Outcome::Timeout, "timed out");
        assert!(!sample.is_success());
        assert!(sample.status_code.is_none());
        assert_eq!(sample.detail.as_deref(), Some("timed out"));

        let json = serde_json::to_value(&sample).unwrap();
        assert!(json.get("status_code").is_none());
        assert_eq!(json["outcome"], "TIMEOUT");
    }
}
