//! Per-attempt authorization headers.

use base64::{engine::general_purpose::STANDARD, Engine as _};
use relay_core::{Credential, RelayError, RelayResult};
use reqwest::header::{HeaderMap, HeaderName, HeaderValue, ACCEPT, AUTHORIZATION, CONTENT_TYPE};

/// Header carrying the bare base64 token alongside `Authorization`
pub const ENCODED_TOKEN_HEADER: &str = "x-atlassian-encodedtoken";

/// Base64 of `email:token`
#[must_use]
pub fn encode_credential(credential: &Credential) -> String {
    STANDARD.encode(format!("{}:{}", credential.email, credential.token()))
}

/// Build the header set for one attempt with the given credential.
///
/// # Errors
/// Returns a configuration error if the credential contains bytes that
/// cannot appear in a header value
pub fn auth_headers(credential: &Credential) -> RelayResult<HeaderMap> {
    let encoded = encode_credential(credential);

    let mut basic = HeaderValue::from_str(&format!("Basic {encoded}")).map_err(|e| {
        RelayError::configuration(format!(
            "Invalid credential for {}: {e}",
            credential.email
        ))
    })?;
    basic.set_sensitive(true);

    let mut token = HeaderValue::from_str(&encoded)
        .map_err(|e| RelayError::configuration(format!("Invalid encoded token: {e}")))?;
    token.set_sensitive(true);

    let mut headers = HeaderMap::with_capacity(4);
    headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
    headers.insert(ACCEPT, HeaderValue::from_static("application/json"));
    headers.insert(AUTHORIZATION, basic);
    headers.insert(HeaderName::from_static(ENCODED_TOKEN_HEADER), token);

    Ok(headers)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_basic_auth_encoding() {
        let credential = Credential::new("dev@example.com", "tok-123");
        let headers = auth_headers(&credential).expect("headers");

        // base64("dev@example.com:tok-123")
        let expected = "ZGV2QGV4YW1wbGUuY29tOnRvay0xMjM=";
        assert_eq!(
            headers.get(AUTHORIZATION).and_then(|v| v.to_str().ok()),
            Some(format!("Basic {expected}").as_str())
        );
        assert_eq!(
            headers
                .get(ENCODED_TOKEN_HEADER)
                .and_then(|v| v.to_str().ok()),
            Some(expected)
        );
        assert_eq!(
            headers.get(CONTENT_TYPE).and_then(|v| v.to_str().ok()),
            Some("application/json")
        );
        assert_eq!(
            headers.get(ACCEPT).and_then(|v| v.to_str().ok()),
            Some("application/json")
        );
    }

    #[test]
    fn test_headers_are_sensitive() {
        let headers = auth_headers(&Credential::new("a@b.c", "t")).expect("headers");
        assert!(headers.get(AUTHORIZATION).is_some_and(HeaderValue::is_sensitive));
    }
}
