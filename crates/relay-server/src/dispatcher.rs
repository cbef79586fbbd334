//! One chat completion, end to end.
//!
//! The dispatcher normalizes the inbound request, hands it to the failover
//! client with a fresh credential snapshot, then either re-frames the
//! upstream event stream or translates the buffered body.

use bytes::Bytes;
use futures::stream::{BoxStream, Stream, StreamExt};
use relay_core::{ChatCompletionRequest, ChatCompletionResponse, RelayError, RelayResult};
use relay_upstream::{CredentialPool, FormatTranslator, StreamDecoder, UpstreamClient, UpstreamRequest};
use std::sync::Arc;
use tokio_util::sync::{CancellationToken, DropGuard};
use tracing::{debug, info, warn};

/// Result of a successful dispatch
pub enum Dispatched {
    /// SSE frames, each to be written and flushed on its own
    Stream(BoxStream<'static, Bytes>),
    /// Buffered completion
    Complete(ChatCompletionResponse),
}

impl std::fmt::Debug for Dispatched {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Stream(_) => f.write_str("Dispatched::Stream"),
            Self::Complete(response) => f.debug_tuple("Dispatched::Complete").field(response).finish(),
        }
    }
}

/// Wires the upstream client, decoder and translator together
#[derive(Debug)]
pub struct Dispatcher {
    client: UpstreamClient,
    pool: Arc<CredentialPool>,
    decoder: StreamDecoder,
}

impl Dispatcher {
    /// Create a dispatcher
    pub fn new(client: UpstreamClient, pool: Arc<CredentialPool>, decoder: StreamDecoder) -> Self {
        Self {
            client,
            pool,
            decoder,
        }
    }

    /// Credential pool
    #[must_use]
    pub fn pool(&self) -> &Arc<CredentialPool> {
        &self.pool
    }

    /// Run one request.
    ///
    /// `cancel` is cancelled when the returned stream is dropped, or when this
    /// future is dropped before it completes.
    ///
    /// # Errors
    /// Returns validation errors, upstream failures and, for buffered calls,
    /// body read or parse failures
    pub async fn dispatch(
        &self,
        request: ChatCompletionRequest,
        cancel: CancellationToken,
    ) -> RelayResult<Dispatched> {
        let guard = cancel.clone().drop_guard();

        let request = request.normalize()?;
        let upstream = UpstreamRequest::from_normalized(&request);
        let credentials = self.pool.snapshot();

        debug!(
            model = %request.model,
            upstream_model = %upstream.platform_attributes.model,
            stream = request.stream,
            messages = request.messages.len(),
            pool_size = credentials.len(),
            "Dispatching chat completion"
        );

        let response = self.client.send(&upstream, &credentials, &cancel).await?;
        let translator = FormatTranslator::new(request.model.clone());

        if request.stream {
            info!(model = %request.model, "Streaming upstream response");
            let records = self.decoder.decode(response.bytes_stream(), cancel);
            let frames = translator.translate_stream(records);
            return Ok(Dispatched::Stream(with_inline_errors(frames, guard).boxed()));
        }

        let body = tokio::select! {
            biased;
            () = cancel.cancelled() => return Err(RelayError::Cancelled),
            body = response.bytes() => body.map_err(|e| RelayError::stream(format!("Failed to read upstream body: {e}")))?,
        };

        let completion = translator.translate_response(&body)?;
        info!(
            model = %request.model,
            choices = completion.choices.len(),
            "Completed chat completion"
        );
        Ok(Dispatched::Complete(completion))
    }
}

/// Turn a mid-stream error into one inline error frame and end the stream.
///
/// The guard lives as long as the stream, so a client disconnect cancels the
/// decoder.
fn with_inline_errors<S>(frames: S, guard: DropGuard) -> impl Stream<Item = Bytes> + Send
where
    S: Stream<Item = RelayResult<Bytes>> + Send + 'static,
{
    async_stream::stream! {
        let _guard = guard;
        let mut frames = Box::pin(frames);

        while let Some(frame) = frames.next().await {
            match frame {
                Ok(frame) => yield frame,
                Err(e) => {
                    warn!(error = %e, "Upstream stream failed");
                    yield error_frame(&e);
                    break;
                }
            }
        }
    }
}

/// `data: {"error": {...}}` frame for a mid-stream failure
pub fn error_frame(err: &RelayError) -> Bytes {
    let payload = serde_json::json!({
        "error": {
            "message": err.to_string(),
            "type": "stream_error",
        }
    });
    Bytes::from(format!("data: {payload}\n\n"))
}
