//! Bounded-concurrency scheduler
//!
//! A single coordinating loop owns the progress ledger and the result sink.
//! Task runners execute on a `JoinSet` capped at the configured concurrency;
//! their terminal results flow back to the loop, which is the only place that
//! mutates shared state. No locks are needed.

use std::collections::VecDeque;
use std::path::Path;
use std::time::{Duration, Instant};

use indicatif::ProgressBar;
use tokio::task::{JoinError, JoinSet};
use tokio_util::sync::CancellationToken;

use crate::ledger::{ProcessingProgress, ProgressStore};
use crate::sink::{CsvSink, ExtractionRecord, SinkError};
use crate::task::{TaskAttemptResult, TaskOutcome, TaskRunner, WorkItem};

/// Persist progress after this many terminal results
pub const DEFAULT_CHECKPOINT_EVERY: usize = 10;

#[derive(Clone, Debug)]
pub struct SchedulerConfig {
    /// Maximum outstanding task runners
    pub concurrency: usize,
    pub checkpoint_every: usize,
    /// How long an interrupted run waits for in-flight tasks. Zero abandons them.
    pub drain_timeout: Duration,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            concurrency: 3,
            checkpoint_every: DEFAULT_CHECKPOINT_EVERY,
            drain_timeout: Duration::ZERO,
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct SchedulerReport {
    pub succeeded: usize,
    pub failed: usize,
    /// Stopped by the cancellation token before the queue drained
    pub interrupted: bool,
    /// In-flight tasks dropped on interruption
    pub abandoned: usize,
    /// The result file was created (truncated) by this run
    pub output_opened: bool,
    pub elapsed: Duration,
}

impl SchedulerReport {
    pub fn terminal(&self) -> usize {
        self.succeeded + self.failed
    }
}

pub struct Scheduler {
    runner: TaskRunner,
    config: SchedulerConfig,
    cancel: CancellationToken,
    bar: ProgressBar,
}

impl Scheduler {
    pub fn new(runner: TaskRunner, config: SchedulerConfig, cancel: CancellationToken) -> Self {
        Self {
            runner,
            config,
            cancel,
            bar: ProgressBar::hidden(),
        }
    }

    pub fn with_progress_bar(mut self, bar: ProgressBar) -> Self {
        self.bar = bar;
        self
    }

    fn concurrency(&self) -> usize {
        self.config.concurrency.max(1)
    }

    /// Process `items` FIFO with at most `concurrency` in flight.
    ///
    /// Opens the sink at `output` only when there is work and the token is not
    /// already cancelled; an existing file is never truncated by a run that
    /// launches nothing. Progress is saved every `checkpoint_every` terminal
    /// results and once at the end. A sink failure aborts the run after a
    /// best-effort checkpoint.
    pub async fn run_all(
        &self,
        items: Vec<WorkItem>,
        progress: &mut ProcessingProgress,
        store: &ProgressStore,
        output: &Path,
    ) -> Result<SchedulerReport, SinkError> {
        let started = Instant::now();
        let mut report = SchedulerReport::default();
        if items.is_empty() {
            return Ok(report);
        }
        if self.cancel.is_cancelled() {
            log::warn!("Shutting down: {} items never started", items.len());
            self.bar.finish_and_clear();
            report.interrupted = true;
            report.elapsed = started.elapsed();
            return Ok(report);
        }

        let mut sink = CsvSink::open(output)?;
        report.output_opened = true;
        let mut queue: VecDeque<WorkItem> = items.into();
        let mut in_flight: JoinSet<TaskAttemptResult> = JoinSet::new();
        let limit = self.concurrency();

        loop {
            if self.cancel.is_cancelled() {
                report.interrupted = true;
                break;
            }

            while in_flight.len() < limit {
                let Some(item) = queue.pop_front() else {
                    break;
                };
                self.launch(&mut in_flight, item);
            }

            if in_flight.is_empty() {
                break;
            }

            tokio::select! {
                biased;
                () = self.cancel.cancelled() => {
                    report.interrupted = true;
                    break;
                }
                Some(joined) = in_flight.join_next() => {
                    if let Err(e) = self.handle(joined, progress, store, &mut sink, &mut report) {
                        in_flight.abort_all();
                        self.checkpoint(store, progress);
                        sink.close_or_log();
                        return Err(e);
                    }
                }
            }
        }

        if report.interrupted {
            log::warn!("Shutting down: {} items never started", queue.len());
            let drained = self
                .drain(&mut in_flight, progress, store, &mut sink, &mut report)
                .await;
            report.abandoned = in_flight.len();
            if report.abandoned > 0 {
                log::warn!("Abandoning {} in-flight items", report.abandoned);
            }
            in_flight.abort_all();
            let closed = sink.close();
            self.checkpoint(store, progress);
            drained?;
            closed?;
        } else {
            self.checkpoint(store, progress);
            sink.close()?;
        }

        self.bar.finish_and_clear();
        report.elapsed = started.elapsed();
        Ok(report)
    }

    fn launch(&self, in_flight: &mut JoinSet<TaskAttemptResult>, item: WorkItem) {
        log::info!("Processing: {}", item.filename);
        let runner = self.runner.clone();
        in_flight.spawn(async move { runner.run_guarded(item).await });
    }

    /// Route one terminal result to the sink and the ledger
    fn handle(
        &self,
        joined: Result<TaskAttemptResult, JoinError>,
        progress: &mut ProcessingProgress,
        store: &ProgressStore,
        sink: &mut CsvSink,
        report: &mut SchedulerReport,
    ) -> Result<(), SinkError> {
        let result = match joined {
            Ok(result) => result,
            Err(e) => {
                // Only reachable for aborted tasks
                log::debug!("Task join failed: {e}");
                return Ok(());
            }
        };

        let filename = result.item.filename;
        match result.outcome {
            TaskOutcome::Success(data) => {
                sink.write(&ExtractionRecord::new(filename.as_str(), data))?;
                report.succeeded += 1;
                progress.record_success(&filename);
                log::info!(
                    "Completed: {filename} ({}/{}) after {} attempt(s)",
                    report.succeeded,
                    progress.total_files(),
                    result.attempts
                );
            }
            TaskOutcome::Failure(error) => {
                report.failed += 1;
                progress.record_failure(&filename);
                log::error!("Failed: {filename} - {error}");
            }
        }
        self.bar.inc(1);
        self.bar.set_message(filename);

        let every = self.config.checkpoint_every.max(1);
        if report.terminal() % every == 0 {
            self.checkpoint(store, progress);
        }
        Ok(())
    }

    /// Wait up to `drain_timeout` for in-flight tasks, recording their results
    async fn drain(
        &self,
        in_flight: &mut JoinSet<TaskAttemptResult>,
        progress: &mut ProcessingProgress,
        store: &ProgressStore,
        sink: &mut CsvSink,
        report: &mut SchedulerReport,
    ) -> Result<(), SinkError> {
        if self.config.drain_timeout.is_zero() || in_flight.is_empty() {
            return Ok(());
        }
        log::info!(
            "Waiting up to {:?} for {} in-flight items",
            self.config.drain_timeout,
            in_flight.len()
        );
        let deadline = tokio::time::sleep(self.config.drain_timeout);
        tokio::pin!(deadline);

        while !in_flight.is_empty() {
            tokio::select! {
                () = &mut deadline => break,
                Some(joined) = in_flight.join_next() => {
                    self.handle(joined, progress, store, sink, report)?;
                }
            }
        }
        Ok(())
    }

    fn checkpoint(&self, store: &ProgressStore, progress: &mut ProcessingProgress) {
        debug_assert!(progress.is_disjoint());
        match store.save(progress) {
            Ok(()) => log::debug!(
                "Checkpoint: {} completed, {} failed",
                progress.completed().len(),
                progress.failed().len()
            ),
            Err(e) => log::error!("Checkpoint failed, progress not persisted: {e:#}"),
        }
    }
}
