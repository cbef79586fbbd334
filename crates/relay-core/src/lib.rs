//! # Relay Core
//!
//! Core types and error handling for the Atlas relay.
//!
//! This crate provides the foundational types shared by every other crate:
//! - Inbound (OpenAI-compatible) request types and their normalized form
//! - Target response and streaming chunk types
//! - The credential type used by the upstream pool
//! - The error taxonomy

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod credential;
pub mod error;
pub mod request;
pub mod response;
pub mod streaming;

// Re-export commonly used types
pub use credential::Credential;
pub use error::{RelayError, RelayResult};
pub use request::{
    strip_vendor_prefix, ChatCompletionRequest, ChatMessage, ContentPart, InboundMessage,
    MessageContent, NormalizedRequest,
};
pub use response::{
    ChatCompletionResponse, Choice, ModelObject, ModelsResponse, ResponseMessage, Usage,
};
pub use streaming::{ChatCompletionChunk, ChunkChoice, ChunkDelta};
