//! Extraction prompt and response schemas

use serde_json::{Value, json};

pub const DEVELOPER_PROMPT: &str = "Extract a summary and a list of topics from the provided document.

Return **only** a valid JSON object that conforms exactly to the schema below.";

pub const USER_TEXT: &str = "Extract the requested information from the files provided.";

const SUMMARY_DESCRIPTION: &str = "A summary of the document.";
const TOPICS_DESCRIPTION: &str = "A list of topics covered in the document.";

/// OpenAI `response_format`: strict JSON schema named `extraction`
pub fn openai_response_format() -> Value {
    json!({
        "type": "json_schema",
        "json_schema": {
            "name": "extraction",
            "strict": true,
            "schema": {
                "type": "object",
                "properties": {
                    "summary": {"type": "string", "description": SUMMARY_DESCRIPTION},
                    "topics": {
                        "type": "array",
                        "items": {"type": "string"},
                        "description": TOPICS_DESCRIPTION
                    }
                },
                "required": ["summary", "topics"],
                "additionalProperties": false
            }
        }
    })
}

/// Gemini `response_schema` (OpenAPI subset with upper-case type names)
pub fn gemini_response_schema() -> Value {
    json!({
        "type": "OBJECT",
        "properties": {
            "summary": {"type": "STRING", "description": SUMMARY_DESCRIPTION},
            "topics": {
                "type": "ARRAY",
                "items": {"type": "STRING"},
                "description": TOPICS_DESCRIPTION
            }
        },
        "required": ["summary", "topics"]
    })
}
