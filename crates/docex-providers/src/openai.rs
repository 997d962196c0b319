//! OpenAI chat completions client

use async_trait::async_trait;
use docex_core::{Extraction, ExtractionRequest, ModelProvider, ModelResponse};
use serde_json::{Value, json};

use crate::error::ProviderError;
use crate::files::{EncodedFile, encode_files};
use crate::http::{JsonReply, post_json};
use crate::prompt::{DEVELOPER_PROMPT, USER_TEXT, openai_response_format};

pub const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";

pub struct OpenAiProvider {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
}

impl OpenAiProvider {
    pub fn new(client: reqwest::Client, base_url: &str, api_key: &str) -> Self {
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
        }
    }

    fn endpoint(&self) -> String {
        format!("{}/chat/completions", self.base_url)
    }

    async fn call(&self, request: &ExtractionRequest) -> Result<Extraction, ProviderError> {
        let files = encode_files(&request.files).await?;
        let body = build_body(request, &files);
        let reply = post_json(
            self.client.post(self.endpoint()).bearer_auth(&self.api_key),
            &body,
        )
        .await?;
        parse_response(&reply)
    }
}

/// Request body. `temperature` is only sent to `gpt-` models and
/// `reasoning_effort` only to o3 models; others reject them.
pub fn build_body(request: &ExtractionRequest, files: &[EncodedFile]) -> Value {
    let mut content: Vec<Value> = files
        .iter()
        .map(|f| {
            json!({
                "type": "file",
                "file": {"filename": f.filename, "file_data": f.data_url()}
            })
        })
        .collect();
    content.push(json!({"type": "text", "text": USER_TEXT}));

    let mut body = json!({
        "model": request.model,
        "messages": [
            {"role": "developer", "content": [{"type": "text", "text": DEVELOPER_PROMPT}]},
            {"role": "user", "content": content}
        ],
        "response_format": openai_response_format(),
        "store": true
    });

    if let Some(temperature) = request.temperature {
        if request.model.starts_with("gpt-") {
            body["temperature"] = json!(temperature);
        }
    }
    if let Some(effort) = request.reasoning_effort {
        if request.model.contains("o3") {
            body["reasoning_effort"] = json!(effort.as_str());
        }
    }
    body
}

/// Validate the envelope and decode `choices[0].message.content`
pub fn parse_response(reply: &JsonReply) -> Result<Extraction, ProviderError> {
    if !reply.is_success() {
        return Err(ProviderError::Http {
            status: Some(reply.status),
            message: reply
                .error_message()
                .unwrap_or("OpenAI API request failed")
                .to_string(),
        });
    }

    let choice = reply
        .body
        .get("choices")
        .and_then(Value::as_array)
        .and_then(|choices| choices.first())
        .ok_or_else(|| ProviderError::InvalidResponse("missing choices array".to_string()))?;
    let content = choice
        .get("message")
        .and_then(|m| m.get("content"))
        .and_then(Value::as_str)
        .ok_or_else(|| ProviderError::InvalidResponse("missing message content".to_string()))?;

    decode_extraction(content)
}

/// Decode model output text into an [`Extraction`]
pub(crate) fn decode_extraction(content: &str) -> Result<Extraction, ProviderError> {
    if content.trim().is_empty() {
        return Err(ProviderError::Parse("Empty response content".to_string()));
    }
    serde_json::from_str(content)
        .map_err(|e| ProviderError::Parse(format!("Failed to parse JSON response: {e}")))
}

#[async_trait]
impl ModelProvider for OpenAiProvider {
    fn name(&self) -> &'static str {
        "openai"
    }

    async fn extract(&self, request: &ExtractionRequest) -> ModelResponse {
        self.call(request).await.into()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use docex_core::ReasoningEffort;
    use std::path::PathBuf;

    fn request(model: &str) -> ExtractionRequest {
        ExtractionRequest {
            files: vec![PathBuf::from("docs/report.pdf")],
            model: model.to_string(),
            temperature: Some(0.2),
            reasoning_effort: Some(ReasoningEffort::High),
        }
    }

    fn file() -> EncodedFile {
        EncodedFile {
            filename: "report.pdf".to_string(),
            mime_type: "application/pdf",
            data: "QUJD".to_string(),
        }
    }

    fn ok(body: Value) -> JsonReply {
        JsonReply { status: 200, body }
    }

    #[test]
    fn body_layout() {
        let body = build_body(&request("gpt-4.1"), &[file()]);
        assert_eq!(body["model"], "gpt-4.1");
        assert_eq!(body["store"], true);
        assert_eq!(body["messages"][0]["role"], "developer");
        assert_eq!(body["response_format"]["json_schema"]["name"], "extraction");

        let user = &body["messages"][1]["content"];
        assert_eq!(user[0]["type"], "file");
        assert_eq!(user[0]["file"]["filename"], "report.pdf");
        assert_eq!(
            user[0]["file"]["file_data"],
            "data:application/pdf;base64,QUJD"
        );
        assert_eq!(user[1]["text"], USER_TEXT);
    }

    #[test]
    fn temperature_only_for_gpt_models() {
        let gpt = build_body(&request("gpt-4.1"), &[file()]);
        assert_eq!(gpt["temperature"], 0.2);
        assert!(gpt.get("reasoning_effort").is_none());

        let o3 = build_body(&request("o3-mini"), &[file()]);
        assert!(o3.get("temperature").is_none());
        assert_eq!(o3["reasoning_effort"], "high");
    }

    #[test]
    fn parses_content() {
        let reply = ok(json!({
            "choices": [{"message": {"content": "{\"summary\":\"S\",\"topics\":[\"a\",\"b\"]}"}}]
        }));
        let extraction = parse_response(&reply).unwrap();
        assert_eq!(extraction.summary, "S");
        assert_eq!(extraction.topics, vec!["a", "b"]);
    }

    #[test]
    fn api_error_message() {
        let reply = JsonReply {
            status: 429,
            body: json!({"error": {"message": "Rate limit reached"}}),
        };
        assert_eq!(
            parse_response(&reply).unwrap_err().to_string(),
            "HTTP 429: Rate limit reached"
        );

        let bare = JsonReply {
            status: 500,
            body: Value::Null,
        };
        assert_eq!(
            parse_response(&bare).unwrap_err().to_string(),
            "HTTP 500: OpenAI API request failed"
        );
    }

    #[test]
    fn malformed_envelopes() {
        let cases = [
            (json!({}), "Invalid response structure: missing choices array"),
            (
                json!({"choices": []}),
                "Invalid response structure: missing choices array",
            ),
            (
                json!({"choices": [{"message": {"content": null}}]}),
                "Invalid response structure: missing message content",
            ),
            (
                json!({"choices": [{"message": {"content": "  "}}]}),
                "Empty response content",
            ),
        ];
        for (body, expected) in cases {
            assert_eq!(parse_response(&ok(body)).unwrap_err().to_string(), expected);
        }
    }

    #[test]
    fn content_not_an_extraction() {
        let reply = ok(json!({"choices": [{"message": {"content": "not json"}}]}));
        let err = parse_response(&reply).unwrap_err().to_string();
        assert!(err.starts_with("Failed to parse JSON response: "), "{err}");

        let reply = ok(json!({"choices": [{"message": {"content": "{\"summary\":\"S\"}"}}]}));
        assert!(parse_response(&reply).is_err());
    }
}
