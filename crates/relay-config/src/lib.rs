//! # Relay Config
//!
//! Configuration for the Atlas relay: a serde model with defaults for every
//! field, loaded from YAML or TOML and overridden by `RELAY_*` environment
//! variables.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod config;
pub mod error;
pub mod loader;

pub use config::{
    AuthSettings, CredentialSettings, LoggingSettings, RelayConfig, ServerSettings,
    UpstreamSettings, DEFAULT_MODELS,
};
pub use error::{ConfigError, Result};
pub use loader::{load_config, ConfigLoader};
