//! Model provider clients for docex
//!
//! OpenAI chat completions and Gemini generateContent behind the
//! [`docex_core::ModelProvider`] trait. Clients make exactly one HTTP call per
//! request; retries belong to the pipeline.

pub mod error;
pub mod files;
pub mod gemini;
pub mod http;
pub mod openai;
pub mod prompt;

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use docex_core::SharedProvider;

pub use error::ProviderError;
pub use gemini::GeminiProvider;
pub use http::DEFAULT_REQUEST_TIMEOUT;
pub use openai::OpenAiProvider;

/// Supported providers
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ProviderKind {
    #[default]
    OpenAi,
    Gemini,
}

impl ProviderKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::OpenAi => "openai",
            Self::Gemini => "gemini",
        }
    }

    /// Environment variable holding the API key
    pub fn api_key_env(self) -> &'static str {
        match self {
            Self::OpenAi => "OPENAI_API_KEY",
            Self::Gemini => "GEMINI_API_KEY",
        }
    }

    pub fn default_base_url(self) -> &'static str {
        match self {
            Self::OpenAi => openai::DEFAULT_BASE_URL,
            Self::Gemini => gemini::DEFAULT_BASE_URL,
        }
    }
}

impl fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ProviderKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "openai" => Ok(Self::OpenAi),
            "gemini" => Ok(Self::Gemini),
            other => Err(format!(
                "unsupported provider '{other}' (expected openai or gemini)"
            )),
        }
    }
}

/// Everything needed to construct a client
#[derive(Clone, Debug)]
pub struct ProviderSettings {
    pub kind: ProviderKind,
    pub api_key: String,
    /// `None` uses the public endpoint
    pub base_url: Option<String>,
    pub request_timeout: Duration,
}

impl ProviderSettings {
    pub fn new(kind: ProviderKind, api_key: impl Into<String>) -> Self {
        Self {
            kind,
            api_key: api_key.into(),
            base_url: None,
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
        }
    }

    pub fn base_url(&self) -> &str {
        self.base_url
            .as_deref()
            .filter(|u| !u.trim().is_empty())
            .unwrap_or(self.kind.default_base_url())
    }
}

/// Build the provider client for `settings`
pub fn build_provider(settings: &ProviderSettings) -> Result<SharedProvider, ProviderError> {
    let client = http::build_client(settings.request_timeout)?;
    let base_url = settings.base_url();
    log::debug!("Using {} endpoint {base_url}", settings.kind);
    let provider: SharedProvider = match settings.kind {
        ProviderKind::OpenAi => Arc::new(OpenAiProvider::new(client, base_url, &settings.api_key)),
        ProviderKind::Gemini => Arc::new(GeminiProvider::new(client, base_url, &settings.api_key)),
    };
    Ok(provider)
}
