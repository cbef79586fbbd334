//! # Relay Server
//!
//! HTTP surface of the Atlas relay.
//!
//! This crate provides:
//! - Axum router with OpenAI-compatible chat and model endpoints
//! - The dispatcher joining the upstream client, decoder and translator
//! - Bearer API key checks and a credential reload endpoint
//! - Graceful shutdown on Ctrl+C and SIGTERM

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod dispatcher;
pub mod error;
pub mod extractors;
pub mod handlers;
pub mod routes;
pub mod server;
pub mod shutdown;
pub mod state;

// Re-export main types
pub use dispatcher::{Dispatched, Dispatcher};
pub use error::ApiError;
pub use routes::create_router;
pub use server::{Server, ServerConfig, ServerError};
pub use state::{AppState, AppStateBuilder};
