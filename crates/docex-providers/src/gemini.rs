//! Gemini generateContent client

use async_trait::async_trait;
use docex_core::{Extraction, ExtractionRequest, ModelProvider, ModelResponse};
use reqwest::Url;
use serde_json::{Value, json};

use crate::error::ProviderError;
use crate::files::{EncodedFile, encode_files};
use crate::http::{JsonReply, post_json};
use crate::openai::decode_extraction;
use crate::prompt::{DEVELOPER_PROMPT, USER_TEXT, gemini_response_schema};

pub const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";

pub struct GeminiProvider {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
}

impl GeminiProvider {
    pub fn new(client: reqwest::Client, base_url: &str, api_key: &str) -> Self {
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
        }
    }

    fn endpoint(&self, model: &str) -> Result<Url, ProviderError> {
        let url = format!("{}/models/{model}:generateContent", self.base_url);
        Url::parse_with_params(&url, &[("key", self.api_key.as_str())]).map_err(|e| {
            ProviderError::Http {
                status: None,
                message: format!("invalid endpoint for model {model}: {e}"),
            }
        })
    }

    async fn call(&self, request: &ExtractionRequest) -> Result<Extraction, ProviderError> {
        let files = encode_files(&request.files).await?;
        let body = build_body(request, &files);
        let url = self.endpoint(&request.model)?;
        let reply = post_json(self.client.post(url), &body).await?;
        parse_response(&reply)
    }
}

/// Request body: one content with prompt, user text and inline file parts
pub fn build_body(request: &ExtractionRequest, files: &[EncodedFile]) -> Value {
    let mut parts = vec![json!({"text": DEVELOPER_PROMPT}), json!({"text": USER_TEXT})];
    parts.extend(files.iter().map(|f| {
        json!({
            "inline_data": {"mime_type": f.mime_type, "data": f.data}
        })
    }));

    let mut generation_config = json!({
        "response_mime_type": "application/json",
        "response_schema": gemini_response_schema()
    });
    if let Some(temperature) = request.temperature {
        generation_config["temperature"] = json!(temperature);
    }

    json!({
        "contents": [{"parts": parts}],
        "generation_config": generation_config
    })
}

/// Validate the envelope and decode `candidates[0].content.parts[0].text`
pub fn parse_response(reply: &JsonReply) -> Result<Extraction, ProviderError> {
    if !reply.is_success() {
        return Err(ProviderError::Http {
            status: Some(reply.status),
            message: reply
                .error_message()
                .unwrap_or("Gemini API request failed")
                .to_string(),
        });
    }

    let candidate = reply
        .body
        .get("candidates")
        .and_then(Value::as_array)
        .and_then(|c| c.first())
        .ok_or_else(|| ProviderError::InvalidResponse("missing candidates array".to_string()))?;
    let first_part = candidate
        .get("content")
        .and_then(|c| c.get("parts"))
        .and_then(Value::as_array)
        .and_then(|p| p.first())
        .ok_or_else(|| ProviderError::InvalidResponse("missing content parts".to_string()))?;
    let text = first_part
        .get("text")
        .and_then(Value::as_str)
        .ok_or_else(|| {
            ProviderError::InvalidResponse("missing or invalid text content".to_string())
        })?;

    decode_extraction(text)
}

#[async_trait]
impl ModelProvider for GeminiProvider {
    fn name(&self) -> &'static str {
        "gemini"
    }

    async fn extract(&self, request: &ExtractionRequest) -> ModelResponse {
        self.call(request).await.into()
    }
}
