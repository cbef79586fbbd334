//! # Relay Resilience
//!
//! Failure-handling primitives for the Atlas relay:
//! - Exponential backoff schedule with a hard ceiling
//! - Backoff sleeps that abort when the governing call is cancelled

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod backoff;

// Re-export main types
pub use backoff::{sleep_or_cancel, Backoff, BackoffConfig};
