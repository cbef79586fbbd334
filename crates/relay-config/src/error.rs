//! Configuration errors.

use std::path::PathBuf;
use thiserror::Error;

/// Configuration loading error
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The configuration file could not be read
    #[error("Failed to read {path}: {source}")]
    Io {
        /// File path
        path: PathBuf,
        /// Underlying error
        #[source]
        source: std::io::Error,
    },

    /// The file extension is not a supported format
    #[error("Unsupported configuration format for {path} (expected .yaml, .yml or .toml)")]
    UnsupportedFormat {
        /// File path
        path: PathBuf,
    },

    /// YAML parse failure
    #[error("Invalid YAML in {path}: {source}")]
    Yaml {
        /// File path
        path: PathBuf,
        /// Underlying error
        #[source]
        source: serde_yaml::Error,
    },

    /// TOML parse failure
    #[error("Invalid TOML in {path}: {source}")]
    Toml {
        /// File path
        path: PathBuf,
        /// Underlying error
        #[source]
        source: toml::de::Error,
    },

    /// An environment override has an invalid value
    #[error("Invalid value for {name}: {message}")]
    Env {
        /// Variable name
        name: String,
        /// What was wrong
        message: String,
    },

    /// The upstream endpoint is not an absolute URL
    #[error("Invalid upstream endpoint {value}: {source}")]
    InvalidUrl {
        /// Offending value
        value: String,
        /// Parser error
        #[source]
        source: url::ParseError,
    },

    /// Field-level validation failed
    #[error("Invalid configuration: {0}")]
    Validation(#[from] validator::ValidationErrors),
}

/// Result alias for configuration loading
pub type Result<T> = std::result::Result<T, ConfigError>;
