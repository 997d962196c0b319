//! Repeated extraction of a single document
//!
//! Runs the same request several times in a row so the outputs can be compared
//! for consistency. Attempts are sequential and the first failure stops the run.

use std::collections::BTreeSet;
use std::time::{Duration, Instant};

use crate::provider::{Extraction, ExtractionRequest, ModelProvider};

#[derive(Clone, Debug, PartialEq)]
pub struct SampleRun {
    /// 1-based
    pub attempt: u32,
    pub extraction: Extraction,
    pub elapsed: Duration,
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct SampleReport {
    pub runs: Vec<SampleRun>,
}

impl SampleReport {
    /// Number of different outputs; topic order is ignored
    pub fn distinct_outputs(&self) -> usize {
        self.runs
            .iter()
            .map(|run| {
                let topics: BTreeSet<&str> =
                    run.extraction.topics.iter().map(String::as_str).collect();
                (run.extraction.summary.as_str(), topics)
            })
            .collect::<BTreeSet<_>>()
            .len()
    }

    pub fn is_consistent(&self) -> bool {
        self.distinct_outputs() <= 1
    }
}

#[derive(Debug)]
pub struct SampleError {
    pub attempt: u32,
    pub message: String,
}

impl std::fmt::Display for SampleError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Attempt {} failed: {}", self.attempt, self.message)
    }
}

impl std::error::Error for SampleError {}

/// Send `request` to `provider` `count` times, one after another
pub async fn sample(
    provider: &dyn ModelProvider,
    request: &ExtractionRequest,
    count: u32,
) -> Result<SampleReport, SampleError> {
    let mut report = SampleReport::default();
    for attempt in 1..=count {
        log::info!("Attempt {attempt}/{count}...");
        let started = Instant::now();
        let extraction = provider
            .extract(request)
            .await
            .into_result()
            .map_err(|message| SampleError { attempt, message })?;
        let elapsed = started.elapsed();
        log::info!(
            "Attempt {attempt} completed in {:.1}s",
            elapsed.as_secs_f64()
        );
        report.runs.push(SampleRun {
            attempt,
            extraction,
            elapsed,
        });
    }
    Ok(report)
}
