//! Process subcommand - extract every PDF in a folder into a CSV table

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context, Result};
use chrono::Utc;
use clap::Args;

use docex_core::{
    BatchConfig, ProgressStore, ReasoningEffort, RequestOptions, SchedulerConfig,
    SharedProgress, ShutdownCoordinator, Summary, TaskRunner, default_output_path,
};
use docex_providers::{ProviderKind, ProviderSettings};

use super::{EffortArg, ProviderArg, parse_temperature, provider_settings};
use crate::config::Config;

const MAX_CONCURRENCY: usize = 20;
const MAX_RETRIES: u32 = 10;

#[derive(Args, Debug)]
pub struct ProcessArgs {
    /// Folder containing PDF files
    #[arg(long, default_value = "documents")]
    pub folder: PathBuf,

    /// Output CSV path (default: <output dir>/results-<model>-<millis>.csv)
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Number of concurrent requests (1-20)
    #[arg(long, value_parser = clap::value_parser!(u8).range(1..=20))]
    pub concurrency: Option<u8>,

    /// Model name passed to the provider
    #[arg(short, long)]
    pub model: String,

    /// Model provider
    #[arg(short, long, value_enum, default_value = "openai")]
    pub provider: ProviderArg,

    /// Reasoning effort (o3 models only)
    #[arg(long, value_enum)]
    pub reasoning_effort: Option<EffortArg>,

    /// Sampling temperature (0.0-2.0, gpt- and Gemini models)
    #[arg(short, long, value_parser = parse_temperature)]
    pub temperature: Option<f64>,

    /// Retries per file after the first attempt (0-10)
    #[arg(short, long, value_parser = clap::value_parser!(u32).range(0..=10))]
    pub retries: Option<u32>,

    /// Progress file (default: <output dir>/progress-<model>.json)
    #[arg(long)]
    pub progress_file: Option<PathBuf>,

    /// Submit files recorded as failed by an earlier run again
    #[arg(long)]
    pub retry_failed: bool,
}

/// Settings resolved from flags over config
#[derive(Debug)]
struct Resolved {
    batch: BatchConfig,
    retries: u32,
    settings: ProviderSettings,
}

fn resolve(args: &ProcessArgs, config: &Config) -> Result<Resolved> {
    let settings = provider_settings(ProviderKind::from(args.provider), config)?;

    let concurrency = args
        .concurrency
        .map(usize::from)
        .unwrap_or(config.defaults.concurrency);
    anyhow::ensure!(
        (1..=MAX_CONCURRENCY).contains(&concurrency),
        "Concurrency must be between 1 and {MAX_CONCURRENCY}, got {concurrency}"
    );
    let retries = args.retries.unwrap_or(config.defaults.retries);
    anyhow::ensure!(
        retries <= MAX_RETRIES,
        "Retries must be between 0 and {MAX_RETRIES}, got {retries}"
    );

    let output_dir = &config.output.dir;
    let output = args
        .output
        .clone()
        .unwrap_or_else(|| default_output_path(output_dir, &args.model, Utc::now()));
    let progress_file = args
        .progress_file
        .clone()
        .unwrap_or_else(|| ProgressStore::default_path(output_dir, &args.model));

    Ok(Resolved {
        batch: BatchConfig {
            folder: args.folder.clone(),
            output,
            progress_file,
            retry_failed: args.retry_failed,
            scheduler: SchedulerConfig {
                concurrency,
                checkpoint_every: config.defaults.checkpoint_every,
                drain_timeout: config.drain_timeout(),
            },
        },
        retries,
        settings,
    })
}

pub fn run(args: ProcessArgs, config: &Config, progress: &SharedProgress) -> Result<ExitCode> {
    let resolved = resolve(&args, config)?;

    let provider = docex_providers::build_provider(&resolved.settings)
        .context("Failed to create model provider")?;
    let runner = TaskRunner::new(
        provider,
        config.retry.policy(resolved.retries),
        RequestOptions {
            model: args.model,
            temperature: args.temperature,
            reasoning_effort: args.reasoning_effort.map(ReasoningEffort::from),
        },
    );

    let shutdown = ShutdownCoordinator::new();
    shutdown
        .listen_for_signals()
        .context("Failed to install signal handlers")?;

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("Failed to build tokio runtime")?;
    let summary = runtime.block_on(docex_core::run(
        &resolved.batch,
        runner,
        &shutdown,
        progress,
    ))?;

    Ok(finish(&summary, progress.is_tty()))
}

/// Report the run. An interrupted run has flushed its progress and exits 0
/// like a completed one; the rerun resumes it.
fn finish(summary: &Summary, tty: bool) -> ExitCode {
    if tty {
        summary.print();
    } else {
        summary.log();
    }
    ExitCode::SUCCESS
}
