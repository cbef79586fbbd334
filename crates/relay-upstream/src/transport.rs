//! HTTP transport to the upstream gateway.
//!
//! [`Transport`] is the seam between the failover loop and the network: the
//! client decides what to send and with which credential, the transport only
//! performs one POST.

use async_trait::async_trait;
use relay_core::{RelayError, RelayResult};
use reqwest::header::HeaderMap;
use reqwest::{redirect, Client, Response};
use tracing::trace;
use url::Url;

use crate::wire::UpstreamRequest;

/// Default upstream chat endpoint
pub const DEFAULT_ENDPOINT: &str = "https://api.atlassian.com/rovodev/v2/proxy/ai/v2/beta/chat";

/// Default maximum number of redirects to follow
pub const DEFAULT_MAX_REDIRECTS: usize = 10;

/// One-shot POST to the upstream
#[async_trait]
pub trait Transport: Send + Sync {
    /// Send `body` with `headers`, returning the raw response.
    ///
    /// Non-2xx statuses are returned as `Ok`; only failures to obtain a
    /// response at all are errors.
    async fn send(&self, headers: HeaderMap, body: &UpstreamRequest) -> RelayResult<Response>;
}

/// `reqwest`-backed transport
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: Client,
    endpoint: Url,
}

impl HttpTransport {
    /// Create a transport posting to `endpoint`.
    ///
    /// No request timeout is set because streamed bodies may stay open for
    /// the whole generation.
    ///
    /// # Errors
    /// Returns error if the HTTP client cannot be created
    pub fn new(endpoint: Url, max_redirects: usize) -> RelayResult<Self> {
        let client = Client::builder()
            .redirect(redirect::Policy::limited(max_redirects))
            .pool_max_idle_per_host(100)
            .build()
            .map_err(|e| RelayError::internal(format!("Failed to create HTTP client: {e}")))?;

        Ok(Self { client, endpoint })
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn send(&self, headers: HeaderMap, body: &UpstreamRequest) -> RelayResult<Response> {
        trace!(url = %self.endpoint, "POST upstream");

        self.client
            .post(self.endpoint.clone())
            .headers(headers)
            .json(body)
            .send()
            .await
            .map_err(|e| RelayError::transport(format!("Request failed: {e}")))
    }
}
