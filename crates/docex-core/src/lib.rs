//! docex core - bulk document extraction pipeline
//!
//! Discovers documents, submits each to a model provider under a concurrency
//! cap with retries, streams results to CSV and keeps a resumable progress
//! ledger that survives crashes and interruptions. Also samples one document
//! repeatedly and scores result tables against a labelled reference.

pub mod discover;
pub mod evaluate;
pub mod ledger;
pub mod logging;
pub mod progress;
pub mod provider;
pub mod retry;
pub mod runner;
pub mod sample;
pub mod scheduler;
pub mod shutdown;
pub mod sink;
pub mod summary;
pub mod task;

// Re-exports for convenience
pub use discover::discover_documents;
pub use evaluate::{Evaluation, ScoredRow, compare, load_rows};
pub use ledger::{ProcessingProgress, ProgressStore};
pub use logging::{IndicatifLogger, init_logging};
pub use progress::{ProgressContext, SharedProgress};
pub use provider::{
    Extraction, ExtractionRequest, ModelProvider, ModelResponse, ReasoningEffort, SharedProvider,
};
pub use retry::RetryPolicy;
pub use runner::{BatchConfig, run};
pub use sample::{SampleError, SampleReport, SampleRun, sample};
pub use scheduler::{Scheduler, SchedulerConfig, SchedulerReport};
pub use shutdown::{ShutdownCoordinator, ShutdownState};
pub use sink::{CsvSink, ExtractionRecord, SinkError, default_output_path};
pub use summary::Summary;
pub use task::{RequestOptions, TaskAttemptResult, TaskOutcome, TaskRunner, WorkItem};
