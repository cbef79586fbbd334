//! Upstream credential type.

use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use std::fmt;

/// An upstream identity: account email plus API token.
///
/// The token is kept behind [`SecretString`] so it never shows up in `Debug`
/// output or logs.
#[derive(Clone, Deserialize)]
pub struct Credential {
    /// Account email
    pub email: String,
    /// API token
    pub token: SecretString,
}

impl Credential {
    /// Create a credential
    pub fn new(email: impl Into<String>, token: impl Into<String>) -> Self {
        Self {
            email: email.into(),
            token: SecretString::new(token.into()),
        }
    }

    /// Expose the token for header construction
    #[must_use]
    pub fn token(&self) -> &str {
        self.token.expose_secret()
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credential")
            .field("email", &self.email)
            .field("token", &"[REDACTED]")
            .finish()
    }
}
