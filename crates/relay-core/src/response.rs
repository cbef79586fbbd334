//! Target (OpenAI-compatible) response types.

use chrono::Utc;
use serde::{Deserialize, Serialize};

/// Object discriminator of a full completion
pub const COMPLETION_OBJECT: &str = "chat.completion";

/// Full chat completion response
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatCompletionResponse {
    /// Completion identifier
    pub id: String,
    /// Always `chat.completion`
    pub object: String,
    /// Creation time, Unix seconds
    pub created: i64,
    /// Model as requested by the client
    pub model: String,
    /// Completion choices
    pub choices: Vec<Choice>,
    /// Token usage; the upstream reports none, so every count is null
    pub usage: Usage,
}

impl ChatCompletionResponse {
    /// Text of the first choice, if any
    #[must_use]
    pub fn first_text(&self) -> Option<&str> {
        self.choices.first().map(|c| c.message.content.as_str())
    }
}

/// A single completion choice
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Choice {
    /// Choice index
    pub index: u32,
    /// Generated message
    pub message: ResponseMessage,
    /// Why generation stopped
    pub finish_reason: Option<String>,
}

/// Message inside a completion choice
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResponseMessage {
    /// Message role
    pub role: String,
    /// Message text
    pub content: String,
}

/// Token usage
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Usage {
    /// Prompt tokens
    pub prompt_tokens: Option<u32>,
    /// Completion tokens
    pub completion_tokens: Option<u32>,
    /// Total tokens
    pub total_tokens: Option<u32>,
}

/// Model entry in `/v1/models`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelObject {
    /// Model identifier
    pub id: String,
    /// Always `model`
    pub object: String,
    /// Creation time, Unix seconds
    pub created: i64,
    /// Owner
    pub owned_by: String,
}

impl ModelObject {
    /// Create a model entry stamped with the current time
    pub fn new(id: impl Into<String>, owned_by: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            object: "model".to_string(),
            created: unix_now(),
            owned_by: owned_by.into(),
        }
    }
}

/// Response of `/v1/models`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelsResponse {
    /// Always `list`
    pub object: String,
    /// Models
    pub data: Vec<ModelObject>,
}

impl ModelsResponse {
    /// Wrap a list of models
    #[must_use]
    pub fn new(data: Vec<ModelObject>) -> Self {
        Self {
            object: "list".to_string(),
            data,
        }
    }
}

/// Generate a completion identifier (`chatcmpl-<uuid>`)
#[must_use]
pub fn completion_id() -> String {
    format!("chatcmpl-{}", uuid::Uuid::new_v4().simple())
}

/// Current time in Unix seconds
#[must_use]
pub fn unix_now() -> i64 {
    Utc::now().timestamp()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_usage_serializes_as_nulls() {
        let json = serde_json::to_value(Usage::default()).expect("serialize");
        assert!(json["prompt_tokens"].is_null());
        assert!(json["completion_tokens"].is_null());
        assert!(json["total_tokens"].is_null());
        assert_eq!(json.as_object().map(serde_json::Map::len), Some(3));
    }

    #[test]
    fn test_completion_ids_are_unique() {
        let a = completion_id();
        let b = completion_id();
        assert!(a.starts_with("chatcmpl-"));
        assert_ne!(a, b);
    }

    #[test]
    fn test_models_response() {
        let response = ModelsResponse::new(vec![ModelObject::new("anthropic:claude", "system")]);
        let json = serde_json::to_value(&response).expect("serialize");
        assert_eq!(json["object"], "list");
        assert_eq!(json["data"][0]["object"], "model");
        assert_eq!(json["data"][0]["owned_by"], "system");
    }
}
