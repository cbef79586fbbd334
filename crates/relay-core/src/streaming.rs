//! Streaming chunk types (OpenAI `chat.completion.chunk`).

use serde::{Deserialize, Serialize};

/// Object discriminator of a streamed chunk
pub const CHUNK_OBJECT: &str = "chat.completion.chunk";

/// A streamed completion chunk
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatCompletionChunk {
    /// Completion identifier
    pub id: String,
    /// Always `chat.completion.chunk`
    pub object: String,
    /// Creation time, Unix seconds
    pub created: i64,
    /// Model as requested by the client
    pub model: String,
    /// Chunk choices
    pub choices: Vec<ChunkChoice>,
}

impl ChatCompletionChunk {
    /// Content delta of the first choice, or `""`
    #[must_use]
    pub fn content(&self) -> &str {
        self.choices
            .first()
            .and_then(|c| c.delta.content.as_deref())
            .unwrap_or("")
    }
}

/// A choice in a streamed chunk
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChunkChoice {
    /// Choice index
    pub index: u32,
    /// Incremental message delta
    pub delta: ChunkDelta,
    /// Why generation stopped, on the final chunk
    pub finish_reason: Option<String>,
}

impl ChunkChoice {
    /// Whether the choice carries a role, content or a finish reason
    #[must_use]
    pub fn is_meaningful(&self) -> bool {
        !self.delta.is_empty() || self.finish_reason.is_some()
    }
}

/// Incremental message delta
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChunkDelta {
    /// Role, usually only on the first chunk
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
    /// Content fragment
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
}

impl ChunkDelta {
    /// Whether neither role nor content is set
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.role.as_deref().map_or(true, str::is_empty)
            && self.content.as_deref().map_or(true, str::is_empty)
    }
}
