//! Failover client.
//!
//! One call walks the credential snapshot in order, at most once per
//! credential. Transport errors, 401, 403 and 5xx rotate to the next
//! credential after a backoff sleep; any other 4xx ends the call at once.

use relay_core::{Credential, RelayError, RelayResult};
use relay_resilience::{sleep_or_cancel, BackoffConfig};
use reqwest::Response;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, warn};
use url::Url;

use crate::auth::auth_headers;
use crate::transport::{HttpTransport, Transport};
use crate::wire::UpstreamRequest;

/// Longest upstream error body kept in a non-retryable error
const MAX_ERROR_BODY: usize = 512;

/// Upstream client with credential failover
#[derive(Debug, Clone)]
pub struct UpstreamClient<T = HttpTransport> {
    transport: T,
    backoff: BackoffConfig,
}

impl UpstreamClient<HttpTransport> {
    /// Create a client posting to `endpoint` over HTTP
    ///
    /// # Errors
    /// Returns error if the HTTP client cannot be created
    pub fn http(endpoint: Url, max_redirects: usize, backoff: BackoffConfig) -> RelayResult<Self> {
        Ok(Self::new(HttpTransport::new(endpoint, max_redirects)?, backoff))
    }
}

impl<T: Transport> UpstreamClient<T> {
    /// Create a client over an arbitrary transport
    pub fn new(transport: T, backoff: BackoffConfig) -> Self {
        Self { transport, backoff }
    }

    /// Deliver `request`, rotating through `credentials` on retryable failures.
    ///
    /// # Errors
    /// - [`RelayError::NoCredentials`] if `credentials` is empty
    /// - [`RelayError::NonRetryableStatus`] on an ordinary 4xx
    /// - [`RelayError::PoolExhausted`] once every credential has failed
    /// - [`RelayError::Cancelled`] if `cancel` fires while sending or waiting
    pub async fn send(
        &self,
        request: &UpstreamRequest,
        credentials: &[Credential],
        cancel: &CancellationToken,
    ) -> RelayResult<Response> {
        let pool_size = credentials.len();
        if pool_size == 0 {
            return Err(RelayError::NoCredentials);
        }

        let mut backoff = self.backoff.schedule();
        let mut attempts = 0;

        while attempts < pool_size {
            let index = attempts % pool_size;
            let credential = &credentials[index];
            let headers = auth_headers(credential)?;

            debug!(
                credential = index,
                email = %credential.email,
                attempt = attempts + 1,
                pool_size = pool_size,
                "Sending upstream request"
            );

            let outcome = tokio::select! {
                biased;
                () = cancel.cancelled() => return Err(RelayError::Cancelled),
                outcome = self.transport.send(headers, request) => outcome,
            };

            let failure = match outcome {
                Ok(response) => {
                    let status = response.status().as_u16();
                    match RelayError::from_status(status, "") {
                        None => return Ok(response),
                        Some(err) if err.is_retryable() => err,
                        Some(_) => {
                            let body = error_body(response).await;
                            warn!(
                                credential = index,
                                status = status,
                                body = %body,
                                "Upstream rejected request"
                            );
                            return Err(RelayError::NonRetryableStatus { status, body });
                        }
                    }
                }
                Err(err) if err.is_retryable() => err,
                Err(err) => return Err(err),
            };

            let delay = backoff.next_delay();
            warn!(
                credential = index,
                email = %credential.email,
                attempt = attempts + 1,
                delay_ms = delay.as_millis() as u64,
                error = %failure,
                "Upstream attempt failed, rotating credential"
            );

            sleep_or_cancel(delay, cancel).await?;
            attempts += 1;
        }

        error!(attempts = attempts, "All upstream credentials exhausted");
        Err(RelayError::PoolExhausted { attempts })
    }
}

async fn error_body(response: Response) -> String {
    let mut body = response.text().await.unwrap_or_default();
    if body.len() > MAX_ERROR_BODY {
        let mut cut = MAX_ERROR_BODY;
        while !body.is_char_boundary(cut) {
            cut -= 1;
        }
        body.truncate(cut);
    }
    body
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use reqwest::header::{HeaderMap, AUTHORIZATION};
    use std::sync::Mutex;
    use std::time::Duration;
    use tokio::time::Instant;

    /// Transport answering from a script, recording each call
    struct ScriptedTransport {
        script: Mutex<Vec<Result<u16, RelayError>>>,
        calls: Mutex<Vec<(Instant, String)>>,
    }

    impl ScriptedTransport {
        fn new(mut script: Vec<Result<u16, RelayError>>) -> Self {
            script.reverse();
            Self {
                script: Mutex::new(script),
                calls: Mutex::new(Vec::new()),
            }
        }

        fn repeat(status: u16, times: usize) -> Self {
            Self::new((0..times).map(|_| Ok(status)).collect())
        }

        fn calls(&self) -> Vec<(Instant, String)> {
            self.calls.lock().expect("lock").clone()
        }
    }

    #[async_trait]
    impl Transport for ScriptedTransport {
        async fn send(&self, headers: HeaderMap, _body: &UpstreamRequest) -> RelayResult<Response> {
            let auth = headers
                .get(AUTHORIZATION)
                .and_then(|v| v.to_str().ok())
                .unwrap_or_default()
                .to_string();
            self.calls.lock().expect("lock").push((Instant::now(), auth));

            let next = self.script.lock().expect("lock").pop().unwrap_or(Ok(200));
            next.map(|status| {
                Response::from(
                    http::Response::builder()
                        .status(status)
                        .body("upstream body")
                        .expect("response"),
                )
            })
        }
    }

    fn pool(n: usize) -> Vec<Credential> {
        (0..n)
            .map(|i| Credential::new(format!("user{i}@example.com"), format!("token-{i}")))
            .collect()
    }

    fn request() -> UpstreamRequest {
        UpstreamRequest::from_normalized(&relay_core::NormalizedRequest {
            model: "anthropic:claude".to_string(),
            messages: vec![relay_core::ChatMessage::user("hi")],
            temperature: None,
            stream: false,
        })
    }

    fn gaps(calls: &[(Instant, String)], end: Instant) -> Vec<u64> {
        let mut stamps: Vec<Instant> = calls.iter().map(|(at, _)| *at).collect();
        stamps.push(end);
        stamps
            .windows(2)
            .map(|w| (w[1] - w[0]).as_millis() as u64)
            .collect()
    }

    #[tokio::test(start_paused = true)]
    async fn test_all_500_exhausts_pool_with_backoff() {
        let client = UpstreamClient::new(ScriptedTransport::repeat(500, 6), BackoffConfig::default());
        let credentials = pool(6);

        let result = client
            .send(&request(), &credentials, &CancellationToken::new())
            .await;
        let end = Instant::now();

        assert!(matches!(result, Err(RelayError::PoolExhausted { attempts: 6 })));

        let calls = client.transport.calls();
        assert_eq!(calls.len(), 6);
        assert_eq!(
            gaps(&calls, end),
            vec![500, 1_000, 2_000, 4_000, 8_000, 16_000]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_delay_is_capped_at_ceiling() {
        let client = UpstreamClient::new(ScriptedTransport::repeat(503, 8), BackoffConfig::default());
        let credentials = pool(8);

        let result = client
            .send(&request(), &credentials, &CancellationToken::new())
            .await;
        let end = Instant::now();

        assert!(matches!(result, Err(RelayError::PoolExhausted { attempts: 8 })));
        let delays = gaps(&client.transport.calls(), end);
        assert_eq!(&delays[5..], &[16_000, 16_000, 16_000]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_credentials_rotate_in_order() {
        let client = UpstreamClient::new(
            ScriptedTransport::new(vec![Ok(401), Ok(403), Ok(200)]),
            BackoffConfig::default(),
        );
        let credentials = pool(3);

        let response = client
            .send(&request(), &credentials, &CancellationToken::new())
            .await
            .expect("third credential succeeds");
        assert_eq!(response.status().as_u16(), 200);

        let expected: Vec<String> = credentials
            .iter()
            .map(|c| format!("Basic {}", crate::auth::encode_credential(c)))
            .collect();
        let seen: Vec<String> = client.transport.calls().into_iter().map(|(_, a)| a).collect();
        assert_eq!(seen, expected);
    }

    #[tokio::test(start_paused = true)]
    async fn test_client_error_is_not_retried() {
        let client = UpstreamClient::new(
            ScriptedTransport::new(vec![Ok(400), Ok(200)]),
            BackoffConfig::default(),
        );
        let start = Instant::now();

        let result = client
            .send(&request(), &pool(3), &CancellationToken::new())
            .await;

        match result {
            Err(RelayError::NonRetryableStatus { status, body }) => {
                assert_eq!(status, 400);
                assert_eq!(body, "upstream body");
            }
            other => panic!("expected non-retryable status, got {other:?}"),
        }
        assert_eq!(client.transport.calls().len(), 1);
        assert_eq!(start.elapsed(), Duration::ZERO);
    }

    #[tokio::test(start_paused = true)]
    async fn test_transport_error_is_retried() {
        let client = UpstreamClient::new(
            ScriptedTransport::new(vec![Err(RelayError::transport("connection refused")), Ok(204)]),
            BackoffConfig::default(),
        );

        let response = client
            .send(&request(), &pool(2), &CancellationToken::new())
            .await
            .expect("second attempt succeeds");
        assert_eq!(response.status().as_u16(), 204);
        assert_eq!(client.transport.calls().len(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_redirect_class_status_is_success() {
        let client = UpstreamClient::new(ScriptedTransport::repeat(302, 1), BackoffConfig::default());

        let response = client
            .send(&request(), &pool(1), &CancellationToken::new())
            .await
            .expect("status below 400");
        assert_eq!(response.status().as_u16(), 302);
    }

    #[tokio::test]
    async fn test_empty_pool() {
        let client = UpstreamClient::new(ScriptedTransport::repeat(200, 1), BackoffConfig::default());

        let result = client.send(&request(), &[], &CancellationToken::new()).await;
        assert!(matches!(result, Err(RelayError::NoCredentials)));
        assert!(client.transport.calls().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_during_backoff() {
        let client = UpstreamClient::new(ScriptedTransport::repeat(500, 3), BackoffConfig::default());
        let cancel = CancellationToken::new();
        let trigger = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(200)).await;
            trigger.cancel();
        });

        let result = client.send(&request(), &pool(3), &cancel).await;

        assert!(matches!(result, Err(RelayError::Cancelled)));
        assert_eq!(client.transport.calls().len(), 1);
    }

    #[tokio::test]
    async fn test_already_cancelled_sends_nothing() {
        let client = UpstreamClient::new(ScriptedTransport::repeat(200, 1), BackoffConfig::default());
        let cancel = CancellationToken::new();
        cancel.cancel();

        let result = client.send(&request(), &pool(2), &cancel).await;
        assert!(matches!(result, Err(RelayError::Cancelled)));
    }
}
