//! Request types for the relay.
//!
//! The inbound request follows the OpenAI chat-completions schema, where a
//! message's `content` is either a plain string or a list of typed parts.
//! [`ChatCompletionRequest::normalize`] resolves that union at the boundary so
//! everything past it only handles plain text.

use crate::error::{RelayError, RelayResult};
use serde::{Deserialize, Serialize};

/// Inbound OpenAI-compatible chat completion request
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatCompletionRequest {
    /// Requested model, possibly carrying a vendor prefix (`anthropic:...`)
    #[serde(default)]
    pub model: String,

    /// Conversation messages
    #[serde(default)]
    pub messages: Vec<InboundMessage>,

    /// Sampling temperature
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f64>,

    /// Enable streaming response
    #[serde(default)]
    pub stream: bool,

    /// Accepted for compatibility, not forwarded
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,

    /// Accepted for compatibility, not forwarded
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub top_p: Option<f64>,

    /// Accepted for compatibility, not forwarded
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user: Option<String>,
}

impl ChatCompletionRequest {
    /// Validate the request and flatten message content to text.
    ///
    /// # Errors
    /// Returns a validation error if the model is empty or there are no messages
    pub fn normalize(self) -> RelayResult<NormalizedRequest> {
        if self.model.trim().is_empty() {
            return Err(RelayError::validation(
                "Model is required",
                Some("model".to_string()),
            ));
        }

        if self.messages.is_empty() {
            return Err(RelayError::validation(
                "Messages are required",
                Some("messages".to_string()),
            ));
        }

        let messages = self
            .messages
            .into_iter()
            .map(|m| ChatMessage {
                role: m.role,
                content: m.content.into_text(),
            })
            .collect();

        Ok(NormalizedRequest {
            model: self.model,
            messages,
            temperature: self.temperature,
            stream: self.stream,
        })
    }
}

/// Message as received from the client
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InboundMessage {
    /// Message role
    pub role: String,
    /// Message content
    #[serde(default)]
    pub content: MessageContent,
}

/// Message content (text or typed parts)
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MessageContent {
    /// Simple text content
    Text(String),
    /// Content parts; only text parts carry meaning here
    Parts(Vec<ContentPart>),
}

impl Default for MessageContent {
    fn default() -> Self {
        Self::Text(String::new())
    }
}

impl MessageContent {
    /// Collapse the content into a single string.
    ///
    /// Text parts are concatenated in order; other parts are dropped.
    #[must_use]
    pub fn into_text(self) -> String {
        match self {
            Self::Text(text) => text,
            Self::Parts(parts) => parts.into_iter().filter_map(|p| p.text).collect(),
        }
    }
}

/// A single content part
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ContentPart {
    /// Part type (`text`, `image_url`, ...)
    #[serde(rename = "type", default)]
    pub part_type: String,
    /// Text of a text part
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
}

/// Normalized message with plain text content
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    /// Message role
    pub role: String,
    /// Message text
    pub content: String,
}

impl ChatMessage {
    /// Create a message with the given role
    pub fn new(role: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            role: role.into(),
            content: content.into(),
        }
    }

    /// Create a user message
    pub fn user(content: impl Into<String>) -> Self {
        Self::new("user", content)
    }

    /// Create a system message
    pub fn system(content: impl Into<String>) -> Self {
        Self::new("system", content)
    }
}

/// Request after boundary normalization
#[derive(Debug, Clone, PartialEq)]
pub struct NormalizedRequest {
    /// Model as requested by the client, prefix included
    pub model: String,
    /// Messages with text content
    pub messages: Vec<ChatMessage>,
    /// Sampling temperature
    pub temperature: Option<f64>,
    /// Streaming flag
    pub stream: bool,
}

impl NormalizedRequest {
    /// Model identifier to send upstream
    #[must_use]
    pub fn upstream_model(&self) -> &str {
        strip_vendor_prefix(&self.model)
    }
}

/// Remove a vendor namespace prefix such as `anthropic:` from a model id.
///
/// Everything up to and including the last `:` is dropped.
#[must_use]
pub fn strip_vendor_prefix(model: &str) -> &str {
    model.rsplit(':').next().unwrap_or(model)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strip_vendor_prefix() {
        assert_eq!(
            strip_vendor_prefix("anthropic:claude-sonnet-4@20250514"),
            "claude-sonnet-4@20250514"
        );
        assert_eq!(strip_vendor_prefix("claude-3-7-sonnet"), "claude-3-7-sonnet");
        assert_eq!(strip_vendor_prefix("a:b:c"), "c");
        assert_eq!(strip_vendor_prefix(""), "");
    }

    #[test]
    fn test_content_parts_are_concatenated() {
        let json = r#"{
            "model": "anthropic:claude-3-7-sonnet@20250219",
            "messages": [
                {"role": "system", "content": "Be brief."},
                {"role": "user", "content": [
                    {"type": "text", "text": "Hello, "},
                    {"type": "image_url", "image_url": {"url": "https://example.com/a.png"}},
                    {"type": "text", "text": "world"}
                ]}
            ],
            "stream": true
        }"#;

        let request: ChatCompletionRequest = serde_json::from_str(json).expect("parse");
        let normalized = request.normalize().expect("valid");

        assert_eq!(normalized.messages[0], ChatMessage::system("Be brief."));
        assert_eq!(normalized.messages[1], ChatMessage::user("Hello, world"));
        assert!(normalized.stream);
        assert_eq!(normalized.upstream_model(), "claude-3-7-sonnet@20250219");
        assert_eq!(normalized.model, "anthropic:claude-3-7-sonnet@20250219");
    }

    #[test]
    fn test_missing_model_is_rejected() {
        let request: ChatCompletionRequest =
            serde_json::from_str(r#"{"messages": [{"role": "user", "content": "hi"}]}"#)
                .expect("parse");

        match request.normalize() {
            Err(RelayError::Validation { field, .. }) => assert_eq!(field.as_deref(), Some("model")),
            other => panic!("expected validation error, got {other:?}"),
        }
    }

    #[test]
    fn test_empty_messages_are_rejected() {
        let request: ChatCompletionRequest =
            serde_json::from_str(r#"{"model": "m", "messages": []}"#).expect("parse");

        assert!(matches!(
            request.normalize(),
            Err(RelayError::Validation { .. })
        ));
    }

    #[test]
    fn test_temperature_passes_through() {
        let request: ChatCompletionRequest = serde_json::from_str(
            r#"{"model": "m", "temperature": 0.2, "messages": [{"role": "user", "content": "hi"}]}"#,
        )
        .expect("parse");

        let normalized = request.normalize().expect("valid");
        assert_eq!(normalized.temperature, Some(0.2));
        assert!(!normalized.stream);
    }
}
