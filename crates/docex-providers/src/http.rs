//! Shared HTTP plumbing for provider clients

use std::time::Duration;

use reqwest::header::CONTENT_TYPE;
use serde_json::Value;

use crate::error::ProviderError;

/// Connect timeout
const CONNECT_TIMEOUT: Duration = Duration::from_secs(30);

/// Whole-request timeout. Document uploads and long generations are slow.
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(300);

/// Build the pooled client shared by every request of a run
pub fn build_client(request_timeout: Duration) -> Result<reqwest::Client, ProviderError> {
    reqwest::Client::builder()
        .connect_timeout(CONNECT_TIMEOUT)
        .timeout(request_timeout)
        .pool_max_idle_per_host(8)
        .build()
        .map_err(ProviderError::from_reqwest)
}

/// Status and decoded body of one call
#[derive(Debug)]
pub struct JsonReply {
    pub status: u16,
    /// `Null` when the body is empty or not JSON
    pub body: Value,
}

impl JsonReply {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// `error.message` of an API error body, if any
    pub fn error_message(&self) -> Option<&str> {
        self.body
            .get("error")
            .and_then(|e| e.get("message"))
            .and_then(Value::as_str)
            .filter(|m| !m.trim().is_empty())
    }
}

/// POST a JSON body and read the reply as JSON
pub async fn post_json(
    request: reqwest::RequestBuilder,
    body: &Value,
) -> Result<JsonReply, ProviderError> {
    let payload =
        serde_json::to_vec(body).map_err(|e| ProviderError::Parse(format!("encode body: {e}")))?;
    let response = request
        .header(CONTENT_TYPE, "application/json")
        .body(payload)
        .send()
        .await
        .map_err(ProviderError::from_reqwest)?;

    let status = response.status().as_u16();
    let text = response.text().await.map_err(ProviderError::from_reqwest)?;
    let body = serde_json::from_str(&text).unwrap_or_else(|e| {
        if !text.trim().is_empty() {
            log::debug!("Non-JSON response body (HTTP {status}): {e}");
        }
        Value::Null
    });
    Ok(JsonReply { status, body })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn error_message_from_api_body() {
        let reply = JsonReply {
            status: 401,
            body: json!({"error": {"message": "Incorrect API key provided"}}),
        };
        assert!(!reply.is_success());
        assert_eq!(reply.error_message(), Some("Incorrect API key provided"));
    }

    #[test]
    fn error_message_absent() {
        let reply = JsonReply {
            status: 502,
            body: Value::Null,
        };
        assert_eq!(reply.error_message(), None);

        let blank = JsonReply {
            status: 500,
            body: json!({"error": {"message": "  "}}),
        };
        assert_eq!(blank.error_message(), None);
    }

    #[test]
    fn client_builds() {
        assert!(build_client(DEFAULT_REQUEST_TIMEOUT).is_ok());
    }
}
