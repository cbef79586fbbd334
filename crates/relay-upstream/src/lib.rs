//! # Relay Upstream
//!
//! Everything that talks to, or interprets, the upstream AI gateway:
//! - Credential pool with reload-on-demand
//! - Failover client rotating credentials with bounded exponential backoff
//! - Blank-line delimited event stream decoder with backpressure
//! - Translation of upstream records into OpenAI-compatible chunks

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod auth;
pub mod client;
pub mod credentials;
pub mod decoder;
pub mod transport;
pub mod translate;
pub mod wire;

// Re-export main types
pub use client::UpstreamClient;
pub use credentials::{CredentialPool, CredentialSource, FileCredentials, StaticCredentials};
pub use decoder::{RecordStream, StreamDecoder};
pub use transport::{HttpTransport, Transport, DEFAULT_ENDPOINT};
pub use translate::{FormatTranslator, DONE_FRAME};
pub use wire::UpstreamRequest;
