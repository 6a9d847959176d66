//! Layered run settings.
//!
//! Sources, lowest precedence first: an optional TOML file, `LOADGAUGE_*`
//! environment variables, then command-line flags applied by the caller.

use config::{Config, Environment, File, FileFormat};
use loadgauge_core::{
    Benchmark, BenchmarkRegistry, ConfigurationError, LoadPlan, OperationSpec, RunProfile,
};
use loadgauge_runner::{RunConfig, DEFAULT_PROBE_TIMEOUT};
use serde::Deserialize;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

/// Environment variable prefix.
pub const ENV_PREFIX: &str = "LOADGAUGE";

/// Base URL used when none is configured.
pub const DEFAULT_BASE_URL: &str = "http://localhost:5000";

/// Errors raised while loading or resolving settings.
#[derive(Error, Debug)]
pub enum SettingsError {
    /// A source could not be read or deserialized.
    #[error("failed to load settings: {0}")]
    Load(#[from] config::ConfigError),

    /// Both a duration and a request count were configured.
    #[error("duration_secs and requests are mutually exclusive")]
    ConflictingStop,

    /// The resolved plan or benchmarks are invalid.
    #[error(transparent)]
    Configuration(#[from] ConfigurationError),
}

/// Raw settings as read from file and environment.
///
/// Every field is optional; unset fields fall back to the profile's
/// defaults.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Target base URL.
    pub base_url: Option<String>,
    /// Built-in profile (default: quick).
    pub profile: Option<RunProfile>,
    /// Concurrent workers.
    pub users: Option<usize>,
    /// Load phase length in seconds.
    pub duration_secs: Option<u64>,
    /// Total request budget.
    pub requests: Option<u64>,
    /// Per-request timeout in milliseconds.
    pub timeout_ms: Option<u64>,
    /// Pause between requests of one worker, in milliseconds. With
    /// `think_time_max_ms` this is the lower bound of a random pause.
    pub think_time_ms: Option<u64>,
    /// Upper bound of a random pause, in milliseconds.
    pub think_time_max_ms: Option<u64>,
    /// Workers started per second.
    pub spawn_rate: Option<f64>,
    /// Pre-flight probe timeout in milliseconds.
    pub probe_timeout_ms: Option<u64>,
    /// Report directory.
    pub output_dir: Option<PathBuf>,
    /// Operations replacing the profile's defaults.
    pub operations: Vec<OperationSpec>,
    /// Budgets added to, or replacing, the profile's defaults.
    pub benchmarks: Vec<Benchmark>,
}

/// Everything needed to start and report one run.
#[derive(Debug)]
pub struct ResolvedRun {
    /// Selected profile.
    pub profile: RunProfile,
    /// Orchestrator configuration.
    pub config: RunConfig,
    /// Budgets to evaluate against.
    pub registry: BenchmarkRegistry,
    /// Report directory.
    pub output_dir: PathBuf,
}

impl Settings {
    /// Load from an optional file and the process environment.
    pub fn load(file: Option<&Path>) -> Result<Self, SettingsError> {
        Self::load_from(file, None)
    }

    /// Load from an optional file and an explicit environment map.
    ///
    /// With `env` set to `None` the process environment is read.
    pub fn load_from(
        file: Option<&Path>,
        env: Option<HashMap<String, String>>,
    ) -> Result<Self, SettingsError> {
        let mut builder = Config::builder();
        if let Some(path) = file {
            builder = builder.add_source(File::from(path).format(FileFormat::Toml).required(true));
        }
        builder = builder.add_source(
            Environment::with_prefix(ENV_PREFIX)
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true)
                .source(env),
        );
        Ok(builder.build()?.try_deserialize()?)
    }

    /// Set the stop condition to a duration, clearing any request count.
    pub fn set_duration_secs(&mut self, secs: u64) {
        self.duration_secs = Some(secs);
        self.requests = None;
    }

    /// Set the stop condition to a request count, clearing any duration.
    pub fn set_requests(&mut self, count: u64) {
        self.requests = Some(count);
        self.duration_secs = None;
    }

    /// Turn the settings into a validated run.
    pub fn resolve(self) -> Result<ResolvedRun, SettingsError> {
        let profile = self.profile.unwrap_or(RunProfile::Quick);

        let mut builder = profile.plan_builder();
        if !self.operations.is_empty() {
            builder = builder.operations(self.operations);
        }
        if let Some(users) = self.users {
            builder = builder.concurrency(users);
        }
        builder = match (self.duration_secs, self.requests) {
            (Some(_), Some(_)) => return Err(SettingsError::ConflictingStop),
            (Some(secs), None) => builder.duration(Duration::from_secs(secs)),
            (None, Some(count)) => builder.requests(count),
            (None, None) => builder,
        };
        if let Some(ms) = self.timeout_ms {
            builder = builder.request_timeout(Duration::from_millis(ms));
        }
        builder = match (self.think_time_ms, self.think_time_max_ms) {
            (min, Some(max)) => builder.think_time_between(
                Duration::from_millis(min.unwrap_or(0)),
                Duration::from_millis(max),
            ),
            (Some(ms), None) => builder.think_time(Duration::from_millis(ms)),
            (None, None) => builder,
        };
        if let Some(rate) = self.spawn_rate {
            builder = builder.spawn_rate(rate);
        }
        let plan: LoadPlan = builder.build()?;

        let mut registry = profile.benchmarks()?;
        for benchmark in self.benchmarks {
            registry.register(benchmark)?;
        }

        let base_url = self
            .base_url
            .unwrap_or_else(|| DEFAULT_BASE_URL.to_string());
        let probe_timeout = self
            .probe_timeout_ms
            .map(Duration::from_millis)
            .unwrap_or(DEFAULT_PROBE_TIMEOUT);

        Ok(ResolvedRun {
            profile,
            config: RunConfig::new(profile.name(), base_url, plan).with_probe_timeout(probe_timeout),
            registry,
            output_dir: self
                .output_dir
                .unwrap_or_else(|| PathBuf::from(loadgauge_report::OUTPUT_DIR)),
        })
    }
}
