//! Batch runner: discovery, resume filtering, scheduling and cleanup

use std::path::PathBuf;
use std::time::Instant;

use anyhow::{Context, Result};

use crate::discover::discover_documents;
use crate::ledger::{self, ProgressStore};
use crate::progress::ProgressContext;
use crate::scheduler::{Scheduler, SchedulerConfig};
use crate::shutdown::ShutdownCoordinator;
use crate::summary::Summary;
use crate::task::TaskRunner;

/// Inputs of one run
#[derive(Clone, Debug)]
pub struct BatchConfig {
    pub folder: PathBuf,
    pub output: PathBuf,
    pub progress_file: PathBuf,
    /// Clear recorded failures before filtering so they are submitted again
    pub retry_failed: bool,
    pub scheduler: SchedulerConfig,
}

/// Run the whole batch.
///
/// Returns `Err` only for input errors (missing folder) and sink failures.
/// Item failures end up in the summary.
pub async fn run(
    config: &BatchConfig,
    runner: TaskRunner,
    shutdown: &ShutdownCoordinator,
    progress_ctx: &ProgressContext,
) -> Result<Summary> {
    log::info!("Starting bulk processing");
    log::info!("Folder: {}", config.folder.display());
    log::info!("Output: {}", config.output.display());
    log::info!("Concurrency: {}", config.scheduler.concurrency);
    log::info!(
        "Model: {} ({})",
        runner.options().model,
        runner.provider_name()
    );
    log::info!("Max retries: {}", runner.policy().max_retries());

    let discovered = discover_documents(&config.folder)?;
    log::info!("Found {} PDF files", discovered.len());

    let store = ProgressStore::new(&config.progress_file);
    let mut progress = store.load();
    if config.retry_failed {
        let requeued = progress.forget_failed();
        if requeued > 0 {
            log::info!("Retrying {requeued} previously failed files");
        }
    }

    let discovered_count = discovered.len();
    let todo = ledger::pending(&progress, discovered);
    log::info!(
        "{} files to process ({} already completed, {} failed)",
        todo.len(),
        progress.completed().len(),
        progress.failed().len()
    );

    let mut summary = Summary {
        discovered: discovered_count,
        pending: todo.len(),
        progress_file: config.progress_file.clone(),
        ..Default::default()
    };

    if todo.is_empty() {
        log::info!("All files already processed");
        return Ok(summary);
    }

    progress.set_total_files(discovered_count);
    if let Err(e) = store.save(&mut progress) {
        log::error!("Failed to save progress: {e:#}");
    }

    let started = Instant::now();
    let scheduler = Scheduler::new(runner, config.scheduler.clone(), shutdown.token())
        .with_progress_bar(progress_ctx.run_bar(todo.len()));
    let report = scheduler
        .run_all(todo, &mut progress, &store, &config.output)
        .await
        .with_context(|| format!("Result sink failed: {}", config.output.display()))?;

    summary.succeeded = report.succeeded;
    summary.failed = report.failed;
    summary.elapsed = started.elapsed();
    summary.output = report.output_opened.then(|| config.output.clone());
    summary.interrupted = report.interrupted;
    summary.failed_files = progress.failed().iter().cloned().collect();

    if report.interrupted {
        shutdown.mark_exited();
        log::warn!(
            "Interrupted: {} completed, {} failed so far; rerun to resume",
            progress.completed().len(),
            progress.failed().len()
        );
        return Ok(summary);
    }

    if progress.failed().is_empty() {
        match store.clear() {
            Ok(true) => {
                summary.progress_cleared = true;
                log::info!("Cleaned up progress file: {}", store.path().display());
            }
            Ok(false) => summary.progress_cleared = true,
            Err(e) => log::warn!("Failed to delete progress file: {e}"),
        }
    }

    Ok(summary)
}
