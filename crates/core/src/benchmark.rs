// Copyright 2025 Loadgauge Contributors
// SPDX-License-Identifier: Apache-2.0

//! Performance budgets and the registry that holds them.

use crate::error::{ConfigurationError, MissingBenchmarkError};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Performance budget for one operation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Benchmark {
    /// Operation this budget applies to.
    pub operation_name: String,
    /// Hard p95 ceiling in milliseconds.
    pub max_time_ms: f64,
    /// Desired p95 in milliseconds. Exceeding it only warns.
    pub target_time_ms: f64,
    /// Required fraction of successful requests (0.0 - 1.0).
    pub min_success_rate: f64,
    /// Optional ceiling on the mean latency in milliseconds.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_mean_ms: Option<f64>,
}

impl Benchmark {
    /// Create a budget with no mean-latency ceiling.
    pub fn new(
        operation_name: impl Into<String>,
        max_time_ms: f64,
        target_time_ms: f64,
        min_success_rate: f64,
    ) -> Self {
        Self {
            operation_name: operation_name.into(),
            max_time_ms,
            target_time_ms,
            min_success_rate,
            max_mean_ms: None,
        }
    }

    /// Add a mean-latency ceiling.
    pub fn with_max_mean(mut self, max_mean_ms: f64) -> Self {
        self.max_mean_ms = Some(max_mean_ms);
        self
    }

    /// Check `max >= target >= 0` and `min_success_rate` in `[0, 1]`.
    pub fn validate(&self) -> Result<(), ConfigurationError> {
        let name = &self.operation_name;
        if name.trim().is_empty() {
            return Err(ConfigurationError::invalid_benchmark(
                name,
                "operation name must not be empty",
            ));
        }
        if !self.target_time_ms.is_finite() || self.target_time_ms < 0.0 {
            return Err(ConfigurationError::invalid_benchmark(
                name,
                format!("target_time_ms {} must be >= 0", self.target_time_ms),
            ));
        }
        if !self.max_time_ms.is_finite() || self.max_time_ms < self.target_time_ms {
            return Err(ConfigurationError::invalid_benchmark(
                name,
                format!(
                    "max_time_ms {} must be >= target_time_ms {}",
                    self.max_time_ms, self.target_time_ms
                ),
            ));
        }
        if !(0.0..=1.0).contains(&self.min_success_rate) {
            return Err(ConfigurationError::invalid_benchmark(
                name,
                format!("min_success_rate {} must be within [0, 1]", self.min_success_rate),
            ));
        }
        if let Some(mean) = self.max_mean_ms {
            if !mean.is_finite() || mean < 0.0 {
                return Err(ConfigurationError::invalid_benchmark(
                    name,
                    format!("max_mean_ms {} must be >= 0", mean),
                ));
            }
        }
        Ok(())
    }
}

/// Read-only lookup table of budgets keyed by operation name.
#[derive(Debug, Clone, Default)]
pub struct BenchmarkRegistry {
    entries: HashMap<String, Benchmark>,
}

impl BenchmarkRegistry {
    /// Empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a registry from a list, validating every entry.
    ///
    /// Later entries replace earlier ones with the same operation name.
    pub fn from_benchmarks(
        benchmarks: impl IntoIterator<Item = Benchmark>,
    ) -> Result<Self, ConfigurationError> {
        let mut registry = Self::new();
        for benchmark in benchmarks {
            registry.register(benchmark)?;
        }
        Ok(registry)
    }

    /// Budgets for the storefront operations, in milliseconds.
    pub fn with_defaults(min_success_rate: f64) -> Result<Self, ConfigurationError> {
        Self::from_benchmarks(
            [
                ("homepage", 1000.0, 500.0),
                ("products", 2000.0, 1000.0),
                ("product_detail", 1500.0, 800.0),
                ("login", 2000.0, 1000.0),
                ("search", 3000.0, 1500.0),
            ]
            .into_iter()
            .map(|(name, max, target)| Benchmark::new(name, max, target, min_success_rate)),
        )
    }

    /// Add or replace a budget.
    pub fn register(&mut self, benchmark: Benchmark) -> Result<(), ConfigurationError> {
        benchmark.validate()?;
        self.entries
            .insert(benchmark.operation_name.clone(), benchmark);
        Ok(())
    }

    /// Look up the budget for an operation.
    pub fn get(&self, operation_name: &str) -> Result<&Benchmark, MissingBenchmarkError> {
        self.entries
            .get(operation_name)
            .ok_or_else(|| MissingBenchmarkError(operation_name.to_string()))
    }

    /// Number of registered budgets.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether no budgets are registered.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterate over registered budgets in no particular order.
    pub fn iter(&self) -> impl Iterator<Item = &Benchmark> {
        self.entries.values()
    }
}
