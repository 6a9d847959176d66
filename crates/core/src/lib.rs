// Copyright 2025 Loadgauge Contributors
// SPDX-License-Identifier: Apache-2.0

//! Core types for loadgauge.
//!
//! This crate holds everything about a load run that does not touch the
//! network: the sample and benchmark data model, load plans and profiles,
//! the metrics aggregator and the benchmark evaluator.
//!
//! # Modules
//!
//! - [`sample`] - raw per-request samples
//! - [`operation`] - operation and request specifications
//! - [`plan`] - validated load plans and stop conditions
//! - [`profile`] - quick/full/stress/custom defaults
//! - [`benchmark`] - performance budgets and their registry
//! - [`aggregate`] - sample reduction into percentile metrics
//! - [`evaluate`] - verdicts against budgets
//! - [`run`] - run lifecycle and result document
//! - [`error`] - error taxonomy

#![warn(missing_docs, rust_2018_idioms)]
#![deny(unsafe_code)]

pub mod aggregate;
pub mod benchmark;
pub mod error;
pub mod evaluate;
pub mod operation;
pub mod plan;
pub mod profile;
pub mod run;
pub mod sample;

pub use aggregate::{aggregate, AggregatedMetric};
pub use benchmark::{Benchmark, BenchmarkRegistry};
pub use error::{
    ConfigurationError, EngineError, MissingBenchmarkError, Result, UnreachableTargetError,
};
pub use evaluate::{evaluate, informational, overall_passed, EvaluationVerdict, Severity, Violation};
pub use operation::{HttpMethod, OperationSpec, RequestSpec};
pub use plan::{LoadPlan, StopCondition, StopPolicy, ThinkTime};
pub use profile::RunProfile;
pub use run::{RunResult, RunState};
pub use sample::{Outcome, Sample};
