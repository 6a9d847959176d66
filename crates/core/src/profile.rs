// Copyright 2025 Loadgauge Contributors
// SPDX-License-Identifier: Apache-2.0

//! Named bundles of default run parameters.

use crate::benchmark::BenchmarkRegistry;
use crate::error::ConfigurationError;
use crate::operation::OperationSpec;
use crate::plan::{LoadPlan, LoadPlanBuilder};
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use std::time::Duration;

/// Run profile.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunProfile {
    /// Two cheap pages, a handful of requests.
    Quick,
    /// Every storefront operation for a minute.
    Full,
    /// Many users with short pauses, relaxed success requirement.
    Stress,
    /// Everything supplied by the caller.
    Custom,
}

impl RunProfile {
    /// All profiles, in listing order.
    pub const ALL: [RunProfile; 4] = [Self::Quick, Self::Full, Self::Stress, Self::Custom];

    /// Profile name as used on the command line.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Quick => "quick",
            Self::Full => "full",
            Self::Stress => "stress",
            Self::Custom => "custom",
        }
    }

    /// One-line description.
    pub fn description(&self) -> &'static str {
        match self {
            Self::Quick => "homepage and product list, 2 users, 20 requests",
            Self::Full => "all storefront operations, 10 users at 2/s, 60 seconds, 1-3 s think time",
            Self::Stress => "browsing operations, 20 users at 5/s, 120 seconds, 100-500 ms think time",
            Self::Custom => "operations, users and stop condition from configuration",
        }
    }

    /// Success rate every default benchmark requires under this profile.
    pub fn min_success_rate(&self) -> f64 {
        match self {
            Self::Stress => 0.80,
            _ => 0.95,
        }
    }

    /// Default operations. Empty for [`RunProfile::Custom`].
    pub fn operations(&self) -> Vec<OperationSpec> {
        let all = storefront_operations();
        let keep: &[&str] = match self {
            Self::Quick => &["homepage", "products"],
            Self::Full => &["homepage", "products", "product_detail", "search", "login"],
            Self::Stress => &["homepage", "products", "product_detail", "search"],
            Self::Custom => &[],
        };
        all.into_iter()
            .filter(|op| keep.contains(&op.name.as_str()))
            .collect()
    }

    /// Plan builder pre-filled with this profile's defaults.
    ///
    /// Builder calls made afterwards override individual defaults.
    pub fn plan_builder(&self) -> LoadPlanBuilder {
        let builder = LoadPlan::builder().operations(self.operations());
        match self {
            Self::Quick => builder.concurrency(2).requests(20),
            Self::Full => builder
                .concurrency(10)
                .spawn_rate(2.0)
                .duration(Duration::from_secs(60))
                .think_time_between(Duration::from_secs(1), Duration::from_secs(3)),
            Self::Stress => builder
                .concurrency(20)
                .spawn_rate(5.0)
                .duration(Duration::from_secs(120))
                .think_time_between(Duration::from_millis(100), Duration::from_millis(500)),
            Self::Custom => builder,
        }
    }

    /// Default budgets for this profile.
    pub fn benchmarks(&self) -> Result<BenchmarkRegistry, ConfigurationError> {
        BenchmarkRegistry::with_defaults(self.min_success_rate())
    }
}

impl FromStr for RunProfile {
    type Err = ConfigurationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "quick" => Ok(Self::Quick),
            "full" => Ok(Self::Full),
            "stress" => Ok(Self::Stress),
            "custom" => Ok(Self::Custom),
            _ => Err(ConfigurationError::UnknownProfile(s.to_string())),
        }
    }
}

impl std::fmt::Display for RunProfile {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// The storefront's operations with their relative weights.
///
/// Browsing weights are 10/8/6/4 for homepage, products, product detail
/// and search. Login happens once per session on a real storefront; here
/// it is a recurring low-weight operation (2) so its latency is sampled
/// throughout the run rather than only during ramp-up.
pub fn storefront_operations() -> Vec<OperationSpec> {
    vec![
        OperationSpec::get("homepage", "/").with_weight(10),
        OperationSpec::get("products", "/products").with_weight(8),
        OperationSpec::get("product_detail", "/products/1")
            .with_weight(6)
            .expecting([200, 404]),
        OperationSpec::get("search", "/products?search=phone").with_weight(4),
        OperationSpec::get("login", "/login").with_weight(2),
    ]
}
