//! Model provider contract: the remote extraction call as seen by the pipeline

use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Reasoning effort hint for reasoning models
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReasoningEffort {
    Low,
    Medium,
    High,
}

impl ReasoningEffort {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
        }
    }
}

impl fmt::Display for ReasoningEffort {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Structured payload extracted from one document
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Extraction {
    pub summary: String,
    pub topics: Vec<String>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct ExtractionRequest {
    pub files: Vec<PathBuf>,
    pub model: String,
    pub temperature: Option<f64>,
    pub reasoning_effort: Option<ReasoningEffort>,
}

/// Provider answer. The pipeline only branches on `success`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ModelResponse {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Extraction>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ModelResponse {
    pub fn ok(data: Extraction) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
        }
    }

    pub fn failure(error: impl Into<String>) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(error.into()),
        }
    }

    /// Collapse into the payload or an error message
    pub fn into_result(self) -> Result<Extraction, String> {
        match (self.success, self.data) {
            (true, Some(data)) => Ok(data),
            (true, None) => Err("Model provider reported success without data".to_string()),
            (false, _) => Err(self
                .error
                .unwrap_or_else(|| "Model provider request failed".to_string())),
        }
    }
}

impl<E: fmt::Display> From<Result<Extraction, E>> for ModelResponse {
    fn from(result: Result<Extraction, E>) -> Self {
        match result {
            Ok(data) => Self::ok(data),
            Err(e) => Self::failure(e.to_string()),
        }
    }
}

/// Remote extraction service.
///
/// Implementations must not retry internally; the task runner owns the single
/// retry layer.
#[async_trait]
pub trait ModelProvider: Send + Sync {
    /// Short provider name for logs
    fn name(&self) -> &'static str;

    async fn extract(&self, request: &ExtractionRequest) -> ModelResponse;
}

pub type SharedProvider = Arc<dyn ModelProvider>;
