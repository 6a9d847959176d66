// Copyright 2025 Loadgauge Contributors
// SPDX-License-Identifier: Apache-2.0

//! Error taxonomy for the load engine.
//!
//! Only [`ConfigurationError`] and [`UnreachableTargetError`] ever cross a
//! component boundary as a failure. Per-request network problems are
//! recorded as [`crate::sample::Outcome`] values and a missing benchmark
//! degrades an operation to informational-only.

use thiserror::Error;

/// A run was configured in a way that can never execute.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigurationError {
    /// No operations were supplied.
    #[error("at least one operation must be configured")]
    NoOperations,

    /// Operation names must be unique within a run.
    #[error("duplicate operation name: {0}")]
    DuplicateOperation(String),

    /// An operation spec failed validation.
    #[error("invalid operation '{name}': {reason}")]
    InvalidOperation {
        /// Operation name (may be empty).
        name: String,
        /// What is wrong with it.
        reason: String,
    },

    /// A weight of zero can never be selected.
    #[error("operation '{0}' has a zero weight")]
    InvalidWeight(String),

    /// Concurrency must be at least one worker.
    #[error("concurrency must be positive, got {0}")]
    NonPositiveConcurrency(usize),

    /// Duration or request-count stop condition is empty.
    #[error("invalid stop condition: {0}")]
    InvalidStopCondition(String),

    /// Per-request timeout must be non-zero.
    #[error("request timeout must be positive")]
    InvalidTimeout,

    /// Think time range or spawn rate is unusable.
    #[error("invalid load shape: {0}")]
    InvalidLoadShape(String),

    /// A benchmark violates its own invariants.
    #[error("invalid benchmark '{name}': {reason}")]
    InvalidBenchmark {
        /// Operation the benchmark belongs to.
        name: String,
        /// What is wrong with it.
        reason: String,
    },

    /// A request could not be built from its spec.
    #[error("malformed request for '{operation}': {reason}")]
    MalformedRequest {
        /// Operation the request belongs to.
        operation: String,
        /// Why the request could not be built.
        reason: String,
    },

    /// Unknown profile name.
    #[error("unknown profile: {0}")]
    UnknownProfile(String),

    /// The HTTP client could not be constructed.
    #[error("http client error: {0}")]
    Client(String),
}

impl ConfigurationError {
    /// Shorthand for [`ConfigurationError::InvalidOperation`].
    pub fn invalid_operation(name: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidOperation {
            name: name.into(),
            reason: reason.into(),
        }
    }

    /// Shorthand for [`ConfigurationError::InvalidBenchmark`].
    pub fn invalid_benchmark(name: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidBenchmark {
            name: name.into(),
            reason: reason.into(),
        }
    }

    /// Shorthand for [`ConfigurationError::MalformedRequest`].
    pub fn malformed_request(operation: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::MalformedRequest {
            operation: operation.into(),
            reason: reason.into(),
        }
    }
}

/// The pre-flight probe could not reach the target system.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("target {base_url} is unreachable: {reason}")]
pub struct UnreachableTargetError {
    /// Base URL that was probed.
    pub base_url: String,
    /// Transport-level reason.
    pub reason: String,
}

/// No benchmark is registered for an operation.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("no benchmark registered for operation '{0}'")]
pub struct MissingBenchmarkError(pub String);

/// Failures that abort a whole run.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EngineError {
    /// Invalid configuration.
    #[error(transparent)]
    Configuration(#[from] ConfigurationError),

    /// Target failed the pre-flight probe.
    #[error(transparent)]
    Unreachable(#[from] UnreachableTargetError),

    /// The orchestrator was asked to run more than once.
    #[error("run already started (state: {0})")]
    AlreadyStarted(String),
}

/// Result type for engine operations.
pub type Result<T> = std::result::Result<T, EngineError>;
