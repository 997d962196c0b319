//! Configuration loading from TOML files

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use docex_core::RetryPolicy;
use docex_providers::ProviderKind;
use serde::Deserialize;

/// Global configuration for docex
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct Config {
    pub output: OutputConfig,
    pub defaults: DefaultsConfig,
    pub retry: RetryConfig,
    pub shutdown: ShutdownConfig,
    pub openai: OpenAiConfig,
    pub gemini: GeminiConfig,
    pub http: HttpConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    /// Home of result tables and progress files
    pub dir: PathBuf,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            dir: PathBuf::from("./outputs"),
        }
    }
}

#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(default)]
pub struct DefaultsConfig {
    pub concurrency: usize,
    pub retries: u32,
    pub checkpoint_every: usize,
}

impl Default for DefaultsConfig {
    fn default() -> Self {
        Self {
            concurrency: 3,
            retries: 3,
            checkpoint_every: docex_core::scheduler::DEFAULT_CHECKPOINT_EVERY,
        }
    }
}

#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(default)]
pub struct RetryConfig {
    pub base_ms: u64,
    pub cap_ms: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            base_ms: docex_core::retry::DEFAULT_BASE_DELAY.as_millis() as u64,
            cap_ms: docex_core::retry::DEFAULT_MAX_DELAY.as_millis() as u64,
        }
    }
}

impl RetryConfig {
    pub fn policy(&self, max_retries: u32) -> RetryPolicy {
        RetryPolicy::new(
            max_retries,
            Duration::from_millis(self.base_ms),
            Duration::from_millis(self.cap_ms),
        )
    }
}

#[derive(Debug, Clone, Copy, Deserialize, Default)]
#[serde(default)]
pub struct ShutdownConfig {
    /// Seconds an interrupted run waits for in-flight requests
    pub drain_timeout_secs: u64,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct OpenAiConfig {
    pub base_url: String,
    #[serde(deserialize_with = "deserialize_env_var")]
    pub api_key: Option<String>,
}

impl Default for OpenAiConfig {
    fn default() -> Self {
        Self {
            base_url: docex_providers::openai::DEFAULT_BASE_URL.to_string(),
            api_key: env_key("OPENAI_API_KEY"),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct GeminiConfig {
    pub base_url: String,
    #[serde(deserialize_with = "deserialize_env_var")]
    pub api_key: Option<String>,
}

impl Default for GeminiConfig {
    fn default() -> Self {
        Self {
            base_url: docex_providers::gemini::DEFAULT_BASE_URL.to_string(),
            api_key: env_key("GEMINI_API_KEY"),
        }
    }
}

#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(default)]
pub struct HttpConfig {
    pub request_timeout_secs: u64,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            request_timeout_secs: docex_providers::DEFAULT_REQUEST_TIMEOUT.as_secs(),
        }
    }
}

/// Credential from the environment; blank values count as unset
fn env_key(var: &str) -> Option<String> {
    std::env::var(var).ok().filter(|key| !key.trim().is_empty())
}

/// Deserialize a string that may be an environment variable reference like ${VAR}
fn deserialize_env_var<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let opt: Option<String> = Option::deserialize(deserializer)?;
    Ok(opt.and_then(|s| expand_env_var(&s)))
}

/// Expand ${VAR} to its value; blank values count as unset
fn expand_env_var(s: &str) -> Option<String> {
    let value = match s.strip_prefix("${").and_then(|s| s.strip_suffix('}')) {
        Some(var_name) => std::env::var(var_name).ok()?,
        None => s.to_string(),
    };
    (!value.trim().is_empty()).then_some(value)
}

impl Config {
    /// Load configuration from default locations
    ///
    /// Search order:
    /// 1. ./docex.toml (current directory)
    /// 2. ~/.config/docex/config.toml
    ///
    /// If no config file found, returns default config.
    pub fn load() -> Result<Self> {
        let local_config = PathBuf::from("docex.toml");
        if local_config.exists() {
            return Self::from_file(&local_config);
        }

        if let Some(config_dir) = directories::ProjectDirs::from("", "", "docex") {
            let user_config = config_dir.config_dir().join("config.toml");
            if user_config.exists() {
                return Self::from_file(&user_config);
            }
        }

        log::debug!("No config file found, using defaults");
        Ok(Self::default())
    }

    /// Load configuration from a specific file
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        log::debug!("Loaded config from {}", path.display());
        Ok(config)
    }

    pub fn api_key(&self, kind: ProviderKind) -> Option<&str> {
        match kind {
            ProviderKind::OpenAi => self.openai.api_key.as_deref(),
            ProviderKind::Gemini => self.gemini.api_key.as_deref(),
        }
    }

    pub fn base_url(&self, kind: ProviderKind) -> &str {
        match kind {
            ProviderKind::OpenAi => &self.openai.base_url,
            ProviderKind::Gemini => &self.gemini.base_url,
        }
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.http.request_timeout_secs)
    }

    pub fn drain_timeout(&self) -> Duration {
        Duration::from_secs(self.shutdown.drain_timeout_secs)
    }
}
