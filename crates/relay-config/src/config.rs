//! Configuration model.

use relay_core::Credential;
use relay_resilience::BackoffConfig;
use relay_upstream::decoder::DEFAULT_CAPACITY;
use relay_upstream::transport::{DEFAULT_ENDPOINT, DEFAULT_MAX_REDIRECTS};
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use std::path::PathBuf;
use url::Url;
use validator::{Validate, ValidationError};

use crate::error::{ConfigError, Result};

/// Model ids advertised by `/v1/models`
pub const DEFAULT_MODELS: &[&str] = &[
    "anthropic:claude-3-5-sonnet-v2@20241022",
    "anthropic:claude-3-7-sonnet@20250219",
    "anthropic:claude-sonnet-4@20250514",
];

/// Root relay configuration
#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(default)]
pub struct RelayConfig {
    /// Listener settings
    #[validate(nested)]
    pub server: ServerSettings,

    /// Upstream gateway settings
    #[validate(nested)]
    pub upstream: UpstreamSettings,

    /// Credential pool settings
    pub credentials: CredentialSettings,

    /// Inbound API key settings
    pub auth: AuthSettings,

    /// Models listed by `/v1/models`
    #[validate(length(min = 1))]
    pub models: Vec<String>,

    /// Log output settings
    pub logging: LoggingSettings,
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            server: ServerSettings::default(),
            upstream: UpstreamSettings::default(),
            credentials: CredentialSettings::default(),
            auth: AuthSettings::default(),
            models: DEFAULT_MODELS.iter().map(|m| (*m).to_string()).collect(),
            logging: LoggingSettings::default(),
        }
    }
}

/// Listener settings
#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(default)]
pub struct ServerSettings {
    /// Bind address
    #[validate(length(min = 1))]
    pub host: String,

    /// Bind port
    #[validate(range(min = 1))]
    pub port: u16,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8000,
        }
    }
}

/// Upstream gateway settings
#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(default)]
pub struct UpstreamSettings {
    /// Chat endpoint
    #[validate(url)]
    pub endpoint: String,

    /// Redirect hops followed per request
    #[validate(range(max = 50))]
    pub max_redirects: usize,

    /// Records buffered between stream reader and translator
    #[validate(range(min = 1, max = 1024))]
    pub stream_buffer: usize,

    /// Delay schedule between failover attempts
    #[validate(custom(function = "validate_backoff"))]
    pub backoff: BackoffConfig,
}

impl Default for UpstreamSettings {
    fn default() -> Self {
        Self {
            endpoint: DEFAULT_ENDPOINT.to_string(),
            max_redirects: DEFAULT_MAX_REDIRECTS,
            stream_buffer: DEFAULT_CAPACITY,
            backoff: BackoffConfig::default(),
        }
    }
}

impl UpstreamSettings {
    /// Parsed endpoint URL
    ///
    /// # Errors
    /// Returns error if the endpoint is not an absolute URL
    pub fn endpoint_url(&self) -> Result<Url> {
        Url::parse(&self.endpoint).map_err(|source| ConfigError::InvalidUrl {
            value: self.endpoint.clone(),
            source,
        })
    }
}

fn validate_backoff(backoff: &BackoffConfig) -> std::result::Result<(), ValidationError> {
    if backoff.initial.is_zero() {
        return Err(ValidationError::new("backoff_initial_zero"));
    }
    if backoff.max < backoff.initial {
        return Err(ValidationError::new("backoff_max_below_initial"));
    }
    if backoff.multiplier == 0 {
        return Err(ValidationError::new("backoff_multiplier_zero"));
    }
    Ok(())
}

/// Credential pool settings.
///
/// When `file` is set it is the pool's source and is re-read on every reload;
/// otherwise `entries` is used as a fixed list.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct CredentialSettings {
    /// JSON or YAML file holding `[{email, token}, ...]`
    pub file: Option<PathBuf>,

    /// Inline credentials, in rotation order
    pub entries: Vec<Credential>,
}

/// Inbound API key settings
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct AuthSettings {
    /// Accepted bearer keys; empty disables the check
    pub api_keys: Vec<SecretString>,
}

impl AuthSettings {
    /// Whether inbound requests must carry a key
    #[must_use]
    pub fn is_enabled(&self) -> bool {
        !self.api_keys.is_empty()
    }

    /// Whether `key` is one of the accepted keys
    #[must_use]
    pub fn accepts(&self, key: &str) -> bool {
        self.api_keys.iter().any(|k| k.expose_secret() == key)
    }
}

/// Log output settings
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LoggingSettings {
    /// Default filter directive, overridden by `RUST_LOG`
    pub level: String,

    /// Emit JSON lines instead of human-readable output
    pub json: bool,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json: false,
        }
    }
}
