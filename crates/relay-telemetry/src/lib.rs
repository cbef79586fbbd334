//! # Relay Telemetry
//!
//! Structured logging setup for the Atlas relay.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod logging;

pub use logging::{init_logging, LoggingConfig, LoggingError};
