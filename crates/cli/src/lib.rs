//! CLI for loadgauge.
//!
//! This crate provides the `loadgauge` command-line interface: the `run`
//! subcommand executes one orchestrated load test and writes its reports,
//! `profiles` lists the built-in profiles.

#![warn(missing_docs, rust_2018_idioms)]
#![deny(unsafe_code)]

pub mod output;
pub mod settings;

use anyhow::Context;
use clap::{Args, Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};
use loadgauge_core::RunProfile;
use loadgauge_runner::{HttpCollector, RunOrchestrator};
use settings::Settings;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

/// loadgauge CLI.
#[derive(Parser, Debug)]
#[command(name = "loadgauge")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Emit logs as JSON.
    #[arg(long, global = true)]
    pub json_logs: bool,

    /// Subcommand to run.
    #[command(subcommand)]
    pub command: Commands,
}

/// Available CLI commands.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run a load test and evaluate it against its benchmarks.
    ///
    /// Settings are layered: the config file, then LOADGAUGE_* environment
    /// variables, then these flags.
    Run(RunArgs),

    /// List the built-in profiles.
    Profiles,
}

/// Flags of the `run` subcommand.
#[derive(Args, Debug, Default)]
pub struct RunArgs {
    /// Profile: quick, full, stress or custom.
    #[arg(short, long)]
    pub profile: Option<RunProfile>,

    /// Target base URL.
    #[arg(short, long)]
    pub base_url: Option<String>,

    /// TOML settings file.
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Concurrent workers.
    #[arg(short, long)]
    pub users: Option<usize>,

    /// Run for this many seconds.
    #[arg(short, long, conflicts_with = "requests")]
    pub duration: Option<u64>,

    /// Run for this many requests in total.
    #[arg(short = 'n', long)]
    pub requests: Option<u64>,

    /// Per-request timeout in milliseconds.
    #[arg(long)]
    pub timeout_ms: Option<u64>,

    /// Pause between requests of one worker, in milliseconds.
    #[arg(long)]
    pub think_time_ms: Option<u64>,

    /// Randomize the pause up to this many milliseconds.
    #[arg(long)]
    pub think_time_max_ms: Option<u64>,

    /// Workers started per second (default: all at once).
    #[arg(long)]
    pub spawn_rate: Option<f64>,

    /// Report directory.
    #[arg(short, long)]
    pub output: Option<PathBuf>,
}

impl RunArgs {
    /// Apply flags on top of loaded settings.
    pub fn apply(&self, settings: &mut Settings) {
        if let Some(profile) = self.profile {
            settings.profile = Some(profile);
        }
        if let Some(url) = &self.base_url {
            settings.base_url = Some(url.clone());
        }
        if let Some(users) = self.users {
            settings.users = Some(users);
        }
        if let Some(secs) = self.duration {
            settings.set_duration_secs(secs);
        }
        if let Some(count) = self.requests {
            settings.set_requests(count);
        }
        if let Some(ms) = self.timeout_ms {
            settings.timeout_ms = Some(ms);
        }
        if let Some(ms) = self.think_time_ms {
            settings.think_time_ms = Some(ms);
        }
        if let Some(ms) = self.think_time_max_ms {
            settings.think_time_max_ms = Some(ms);
        }
        if let Some(rate) = self.spawn_rate {
            settings.spawn_rate = Some(rate);
        }
        if let Some(dir) = &self.output {
            settings.output_dir = Some(dir.clone());
        }
    }
}

/// Install the global tracing subscriber.
///
/// The filter comes from `RUST_LOG`, defaulting to `info`.
pub fn init_logging(json: bool) {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .with_writer(std::io::stderr);
    if json {
        builder.json().init();
    } else {
        builder.init();
    }
}

/// Run the CLI.
///
/// # Returns
///
/// `Ok(true)` when the command succeeded and, for `run`, every judged
/// benchmark passed.
pub async fn run(cli: Cli) -> anyhow::Result<bool> {
    match cli.command {
        Commands::Run(args) => run_load_test(args).await,
        Commands::Profiles => {
            output::print_profiles();
            Ok(true)
        }
    }
}

async fn run_load_test(args: RunArgs) -> anyhow::Result<bool> {
    let mut settings = Settings::load(args.config.as_deref()).context("loading settings")?;
    args.apply(&mut settings);
    let resolved = settings.resolve()?;

    let collector = Arc::new(HttpCollector::new()?);
    let mut orchestrator = RunOrchestrator::new(resolved.config.clone(), resolved.registry, collector);

    let stop = orchestrator.stop_handle();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupt received, finishing in-flight requests");
            stop.cancel();
        }
    });

    let spinner = ProgressBar::new_spinner();
    spinner.set_style(ProgressStyle::default_spinner().template("{spinner:.green} [{elapsed_precise}] {msg}")?);
    spinner.set_message(format!(
        "{} profile against {} ({})",
        resolved.profile, resolved.config.base_url, resolved.config.plan.stop
    ));
    spinner.enable_steady_tick(Duration::from_millis(100));

    let outcome = orchestrator.run().await;
    spinner.finish_and_clear();
    let result = outcome?;

    output::print_result(&result);
    let paths = loadgauge_report::write_all_outputs(&result, &resolved.output_dir)
        .with_context(|| format!("writing reports to {}", resolved.output_dir.display()))?;
    info!(json = %paths.json.display(), markdown = %paths.markdown.display(), "Reports written");
    output::print_report_paths(&paths);

    Ok(result.overall_passed)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_run_flags() {
        let cli = Cli::try_parse_from([
            "loadgauge",
            "run",
            "--profile",
            "stress",
            "--base-url",
            "http://127.0.0.1:8000",
            "--users",
            "8",
            "--requests",
            "100",
            "--spawn-rate",
            "4",
            "--think-time-max-ms",
            "250",
            "--json-logs",
        ])
        .unwrap();

        assert!(cli.json_logs);
        let Commands::Run(args) = cli.command else {
            panic!("expected run command");
        };
        assert_eq!(args.profile, Some(RunProfile::Stress));
        assert_eq!(args.users, Some(8));
        assert_eq!(args.requests, Some(100));
        assert_eq!(args.duration, None);
        assert_eq!(args.spawn_rate, Some(4.0));
        assert_eq!(args.think_time_max_ms, Some(250));
    }

    #[test]
    fn test_duration_conflicts_with_requests() {
        let result = Cli::try_parse_from(["loadgauge", "run", "--duration", "10", "--requests", "5"]);
        assert!(result.is_err());
    }

    #[test]
    fn test_unknown_profile_rejected() {
        let result = Cli::try_parse_from(["loadgauge", "run", "--profile", "soak"]);
        assert!(result.is_err());
    }

    #[test]
    fn test_flags_override_settings() {
        let mut settings = Settings {
            profile: Some(RunProfile::Full),
            requests: Some(500),
            users: Some(3),
            ..Settings::default()
        };
        let args = RunArgs {
            duration: Some(5),
            base_url: Some("http://example.test".to_string()),
            ..RunArgs::default()
        };

        args.apply(&mut settings);

        assert_eq!(settings.duration_secs, Some(5));
        assert_eq!(settings.requests, None);
        assert_eq!(settings.users, Some(3));
        assert_eq!(settings.base_url.as_deref(), Some("http://example.test"));
        assert_eq!(settings.profile, Some(RunProfile::Full));
    }
}
