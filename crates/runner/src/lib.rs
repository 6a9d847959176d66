// Copyright 2025 Loadgauge Contributors
// SPDX-License-Identifier: Apache-2.0

//! Load execution for loadgauge.
//!
//! This crate owns everything that touches the network: the HTTP sample
//! collector, the weighted operation scheduler, the concurrent load
//! executor and the run orchestrator that ties them to the aggregation and
//! evaluation logic in `loadgauge-core`.
//!
//! # Example
//!
//! ```no_run
//! use loadgauge_core::RunProfile;
//! use loadgauge_runner::{HttpCollector, RunConfig, RunOrchestrator};
//! use std::sync::Arc;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let profile = RunProfile::Quick;
//! let plan = profile.plan_builder().build()?;
//! let config = RunConfig::new(profile.name(), "http://localhost:5000", plan);
//!
//! let mut orchestrator = RunOrchestrator::new(
//!     config,
//!     profile.benchmarks()?,
//!     Arc::new(HttpCollector::new()?),
//! );
//! let result = orchestrator.run().await?;
//! println!("overall passed: {}", result.overall_passed);
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs, rust_2018_idioms)]
#![deny(unsafe_code)]

pub mod collector;
pub mod executor;
pub mod orchestrator;
pub mod schedule;

#[cfg(test)]
pub(crate) mod testing;

pub use collector::{Collector, HttpCollector};
pub use executor::{LoadExecutor, SampleSet};
pub use orchestrator::{RunConfig, RunOrchestrator, DEFAULT_PROBE_TIMEOUT};
pub use schedule::WeightedRoundRobin;
