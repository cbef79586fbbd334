//! Upstream gateway wire schema.
//!
//! Every response field is optional on the wire; missing values fall back to
//! their defaults so a sparse chunk still parses.

use relay_core::{ChatMessage, NormalizedRequest};
use serde::{Deserialize, Serialize};

/// Request body sent to the upstream
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UpstreamRequest {
    /// Conversation payload
    pub request_payload: RequestPayload,
    /// Routing attributes
    pub platform_attributes: PlatformAttributes,
}

impl UpstreamRequest {
    /// Build the upstream body, stripping any vendor prefix from the model
    #[must_use]
    pub fn from_normalized(request: &NormalizedRequest) -> Self {
        Self {
            request_payload: RequestPayload {
                messages: request.messages.clone(),
                temperature: request.temperature,
                stream: request.stream,
            },
            platform_attributes: PlatformAttributes {
                model: request.upstream_model().to_string(),
            },
        }
    }
}

/// Conversation payload
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RequestPayload {
    /// Messages
    pub messages: Vec<ChatMessage>,
    /// Sampling temperature
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f64>,
    /// Streaming flag, omitted when false
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub stream: bool,
}

/// Routing attributes
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlatformAttributes {
    /// Model identifier without vendor prefix
    #[serde(default)]
    pub model: String,
}

/// Full (non-streaming) upstream response
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpstreamResponse {
    /// Response payload
    #[serde(default)]
    pub response_payload: ResponsePayload,
    /// Routing attributes echoed back
    #[serde(default)]
    pub platform_attributes: PlatformAttributes,
}

/// One streamed upstream record
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpstreamChunk {
    /// Response payload
    #[serde(default)]
    pub response_payload: ResponsePayload,
}

/// Shared payload of full responses and chunks
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ResponsePayload {
    /// Response identifier
    #[serde(default)]
    pub id: String,
    /// Creation time, Unix seconds
    #[serde(default)]
    pub created: i64,
    /// Choices
    #[serde(default)]
    pub choices: Vec<UpstreamChoice>,
}

/// Upstream choice
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpstreamChoice {
    /// Choice index
    #[serde(default)]
    pub index: u32,
    /// Message (full responses) or delta (some streamed records)
    #[serde(default, alias = "delta")]
    pub message: UpstreamMessage,
    /// Why generation stopped
    #[serde(default)]
    pub finish_reason: Option<String>,
}

/// Upstream message
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpstreamMessage {
    /// Message role
    #[serde(default)]
    pub role: String,
    /// Content fragments
    #[serde(default)]
    pub content: Option<Vec<ContentElement>>,
}

impl UpstreamMessage {
    /// Text of the first content fragment, if any
    #[must_use]
    pub fn first_text(&self) -> Option<&str> {
        self.content
            .as_deref()
            .and_then(<[ContentElement]>::first)
            .map(|c| c.text.as_str())
    }

    /// Consume the message, returning the first fragment's text
    #[must_use]
    pub fn into_first_text(self) -> Option<String> {
        self.content
            .and_then(|content| content.into_iter().next())
            .map(|c| c.text)
    }
}

/// A content fragment
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ContentElement {
    /// Fragment text
    #[serde(default)]
    pub text: String,
}
