//! Task runner: one work item, end to end, including retries

use std::panic::AssertUnwindSafe;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;

use futures_util::FutureExt;

use crate::provider::{Extraction, ExtractionRequest, ReasoningEffort, SharedProvider};
use crate::retry::RetryPolicy;

/// One document to process, keyed by filename within a run
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct WorkItem {
    pub filename: String,
    pub path: PathBuf,
}

impl WorkItem {
    pub fn new(folder: &Path, filename: impl Into<String>) -> Self {
        let filename = filename.into();
        let path = folder.join(&filename);
        Self { filename, path }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum TaskOutcome {
    Success(Extraction),
    Failure(String),
}

/// Terminal result of a work item
#[derive(Clone, Debug)]
pub struct TaskAttemptResult {
    pub item: WorkItem,
    pub outcome: TaskOutcome,
    /// 1-based count of attempts consumed, the final one included.
    /// For a panicked task this is the attempt that panicked.
    pub attempts: u32,
}

impl TaskAttemptResult {
    pub fn is_success(&self) -> bool {
        matches!(self.outcome, TaskOutcome::Success(_))
    }
}

/// Model parameters shared by every request of a run
#[derive(Clone, Debug)]
pub struct RequestOptions {
    pub model: String,
    pub temperature: Option<f64>,
    pub reasoning_effort: Option<ReasoningEffort>,
}

/// Runs the remote call for a work item under a [`RetryPolicy`].
///
/// Cheap to clone; each spawned task gets its own handle. It never touches the
/// progress ledger or the result sink.
#[derive(Clone)]
pub struct TaskRunner {
    provider: SharedProvider,
    policy: RetryPolicy,
    options: Arc<RequestOptions>,
}

impl std::fmt::Debug for TaskRunner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TaskRunner")
            .field("provider", &self.provider.name())
            .field("policy", &self.policy)
            .field("model", &self.options.model)
            .finish_non_exhaustive()
    }
}

impl TaskRunner {
    pub fn new(provider: SharedProvider, policy: RetryPolicy, options: RequestOptions) -> Self {
        Self {
            provider,
            policy,
            options: Arc::new(options),
        }
    }

    pub fn policy(&self) -> RetryPolicy {
        self.policy
    }

    pub fn options(&self) -> &RequestOptions {
        &self.options
    }

    pub fn provider_name(&self) -> &'static str {
        self.provider.name()
    }

    fn request_for(&self, item: &WorkItem) -> ExtractionRequest {
        ExtractionRequest {
            files: vec![item.path.clone()],
            model: self.options.model.clone(),
            temperature: self.options.temperature,
            reasoning_effort: self.options.reasoning_effort,
        }
    }

    /// Attempt the item up to `max_retries + 1` times.
    ///
    /// Backoff sleeps are async, so other runners keep going meanwhile.
    pub async fn run(&self, item: WorkItem) -> TaskAttemptResult {
        self.run_counted(item, &AtomicU32::new(0)).await
    }

    /// [`run`](Self::run), with a panic anywhere in the attempt loop turned
    /// into a failure for that item.
    pub async fn run_guarded(&self, item: WorkItem) -> TaskAttemptResult {
        let started = AtomicU32::new(0);
        let fallback = item.clone();
        match AssertUnwindSafe(self.run_counted(item, &started))
            .catch_unwind()
            .await
        {
            Ok(result) => result,
            Err(panic) => TaskAttemptResult {
                item: fallback,
                outcome: TaskOutcome::Failure(panic_message(&*panic)),
                attempts: started.load(Ordering::Relaxed).max(1),
            },
        }
    }

    async fn run_counted(&self, item: WorkItem, started: &AtomicU32) -> TaskAttemptResult {
        let request = self.request_for(&item);
        let max_attempts = self.policy.max_attempts();
        let mut attempt_index = 0u32;

        loop {
            started.store(attempt_index + 1, Ordering::Relaxed);
            match self.provider.extract(&request).await.into_result() {
                Ok(data) => {
                    return TaskAttemptResult {
                        item,
                        outcome: TaskOutcome::Success(data),
                        attempts: attempt_index + 1,
                    };
                }
                Err(error) => {
                    log::warn!(
                        "{}: attempt {}/{max_attempts} failed: {error}",
                        item.filename,
                        attempt_index + 1
                    );
                    if !self.policy.should_retry(attempt_index) {
                        return TaskAttemptResult {
                            item,
                            outcome: TaskOutcome::Failure(error),
                            attempts: attempt_index + 1,
                        };
                    }
                    let delay = self.policy.backoff_delay(attempt_index);
                    log::info!(
                        "{}: retrying in {}ms (attempt {}/{max_attempts})",
                        item.filename,
                        delay.as_millis(),
                        attempt_index + 2
                    );
                    tokio::time::sleep(delay).await;
                    attempt_index += 1;
                }
            }
        }
    }
}

fn panic_message(panic: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        format!("task panicked: {s}")
    } else if let Some(s) = panic.downcast_ref::<String>() {
        format!("task panicked: {s}")
    } else {
        "task panicked".to_string()
    }
}
