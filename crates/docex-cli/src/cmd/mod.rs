//! Subcommands and the flags they share

pub mod evaluate;
pub mod process;
pub mod sample;

use anyhow::{Context, Result};
use clap::ValueEnum;

use docex_core::ReasoningEffort;
use docex_providers::{ProviderKind, ProviderSettings};

use crate::config::Config;

#[derive(Clone, Copy, ValueEnum, Debug, PartialEq, Eq)]
pub enum ProviderArg {
    Openai,
    Gemini,
}

impl From<ProviderArg> for ProviderKind {
    fn from(p: ProviderArg) -> Self {
        match p {
            ProviderArg::Openai => ProviderKind::OpenAi,
            ProviderArg::Gemini => ProviderKind::Gemini,
        }
    }
}

#[derive(Clone, Copy, ValueEnum, Debug)]
pub enum EffortArg {
    Low,
    Medium,
    High,
}

impl From<EffortArg> for ReasoningEffort {
    fn from(e: EffortArg) -> Self {
        match e {
            EffortArg::Low => ReasoningEffort::Low,
            EffortArg::Medium => ReasoningEffort::Medium,
            EffortArg::High => ReasoningEffort::High,
        }
    }
}

fn parse_temperature(s: &str) -> Result<f64, String> {
    let value: f64 = s
        .trim()
        .parse()
        .map_err(|_| format!("Invalid temperature: {s}"))?;
    if !(0.0..=2.0).contains(&value) {
        return Err(format!("Temperature must be between 0.0 and 2.0, got {value}"));
    }
    Ok(value)
}

/// Provider settings from config; a missing credential is fatal
fn provider_settings(kind: ProviderKind, config: &Config) -> Result<ProviderSettings> {
    let api_key = config.api_key(kind).with_context(|| {
        format!(
            "{} not found; set {} or [{kind}] api_key in the config file",
            kind.api_key_env(),
            kind.api_key_env()
        )
    })?;
    Ok(ProviderSettings {
        kind,
        api_key: api_key.to_string(),
        base_url: Some(config.base_url(kind).to_string()),
        request_timeout: config.request_timeout(),
    })
}
