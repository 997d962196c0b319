//! Provider error type

use std::path::PathBuf;

/// Error from one provider call. Rendered into the failure message the task
/// runner logs and retries on.
#[derive(Debug)]
pub enum ProviderError {
    /// Transport failure or non-2xx answer
    Http {
        status: Option<u16>,
        message: String,
    },
    /// I/O error
    Io(std::io::Error),
    /// Input file rejected before sending
    File { path: PathBuf, reason: String },
    /// Response envelope is missing a required field
    InvalidResponse(String),
    /// Response content is not a valid extraction
    Parse(String),
}

impl std::fmt::Display for ProviderError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Http {
                status: Some(s),
                message,
            } => write!(f, "HTTP {s}: {message}"),
            Self::Http {
                status: None,
                message,
            } => write!(f, "HTTP error: {message}"),
            Self::Io(e) => write!(f, "IO error: {e}"),
            Self::File { path, reason } => write!(f, "{reason}: {}", path.display()),
            Self::InvalidResponse(what) => write!(f, "Invalid response structure: {what}"),
            Self::Parse(message) => write!(f, "{message}"),
        }
    }
}

impl std::error::Error for ProviderError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Io(e) => Some(e),
            _ => None,
        }
    }
}

impl ProviderError {
    /// Create HTTP error from reqwest error.
    ///
    /// The URL is dropped from the message since it may carry an API key.
    pub fn from_reqwest(e: reqwest::Error) -> Self {
        let status = e.status().map(|s| s.as_u16());
        let e = e.without_url();
        let message = if e.is_timeout() {
            format!("request timed out ({e})")
        } else {
            e.to_string()
        };
        Self::Http { status, message }
    }
}

impl From<std::io::Error> for ProviderError {
    fn from(e: std::io::Error) -> Self {
        Self::Io(e)
    }
}
