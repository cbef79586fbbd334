//! Upstream to OpenAI-compatible translation.

use bytes::Bytes;
use futures::{Stream, StreamExt};
use relay_core::response::{completion_id, unix_now, COMPLETION_OBJECT};
use relay_core::streaming::CHUNK_OBJECT;
use relay_core::{
    ChatCompletionChunk, ChatCompletionResponse, Choice, ChunkChoice, ChunkDelta, RelayError,
    RelayResult, ResponseMessage, Usage,
};
use tracing::{trace, warn};

use crate::wire::{UpstreamChunk, UpstreamResponse};

/// Terminal frame closing every successful stream
pub const DONE_FRAME: &[u8] = b"data: [DONE]\n\n";

const DATA_PREFIX: &str = "data:";
const DONE_SENTINEL: &str = "[DONE]";
const LOG_PAYLOAD_LIMIT: usize = 100;

/// Maps upstream records and bodies into the OpenAI schema for one call
#[derive(Debug, Clone)]
pub struct FormatTranslator {
    model: String,
}

impl FormatTranslator {
    /// Translator stamping `model` (as the client requested it) on output
    pub fn new(model: impl Into<String>) -> Self {
        Self {
            model: model.into(),
        }
    }

    /// Translate one streamed record.
    ///
    /// Returns `None` for non-data lines, the upstream `[DONE]` sentinel,
    /// malformed JSON, chunks without choices and all-empty deltas.
    #[must_use]
    pub fn translate_record(&self, record: &[u8]) -> Option<ChatCompletionChunk> {
        let text = String::from_utf8_lossy(record);
        let Some(payload) = text.strip_prefix(DATA_PREFIX) else {
            trace!("Ignoring non-data record");
            return None;
        };

        let payload = payload.trim();
        if payload == DONE_SENTINEL {
            return None;
        }

        let chunk: UpstreamChunk = match serde_json::from_str(payload) {
            Ok(chunk) => chunk,
            Err(e) => {
                let decode = RelayError::record_decode(e.to_string());
                warn!(
                    error = %decode,
                    payload = %truncate(payload, LOG_PAYLOAD_LIMIT),
                    "Skipping malformed upstream record"
                );
                return None;
            }
        };

        let payload = chunk.response_payload;
        let choice = payload.choices.into_iter().next()?;

        let role = Some(choice.message.role.clone()).filter(|r| !r.is_empty());
        let content = choice.message.into_first_text().filter(|c| !c.is_empty());

        let choice = ChunkChoice {
            index: choice.index,
            delta: ChunkDelta { role, content },
            finish_reason: choice.finish_reason,
        };

        if !choice.is_meaningful() {
            return None;
        }

        Some(ChatCompletionChunk {
            id: id_or_synthesized(payload.id),
            object: CHUNK_OBJECT.to_string(),
            created: created_or_now(payload.created),
            model: self.model.clone(),
            choices: vec![choice],
        })
    }

    /// Serialize a chunk as one SSE frame
    ///
    /// # Errors
    /// Returns error if the chunk cannot be serialized
    pub fn frame(chunk: &ChatCompletionChunk) -> RelayResult<Bytes> {
        let json = serde_json::to_vec(chunk)?;
        let mut frame = Vec::with_capacity(json.len() + 8);
        frame.extend_from_slice(b"data: ");
        frame.extend_from_slice(&json);
        frame.extend_from_slice(b"\n\n");
        Ok(Bytes::from(frame))
    }

    /// Translate a record stream into SSE frames.
    ///
    /// A normal end of `records` produces exactly one [`DONE_FRAME`]. An error
    /// item is passed through and ends the stream without it.
    pub fn translate_stream<S>(self, records: S) -> impl Stream<Item = RelayResult<Bytes>> + Send
    where
        S: Stream<Item = RelayResult<Bytes>> + Send + Unpin + 'static,
    {
        async_stream::stream! {
            let mut records = records;

            while let Some(record) = records.next().await {
                match record {
                    Ok(record) => {
                        if let Some(chunk) = self.translate_record(&record) {
                            match Self::frame(&chunk) {
                                Ok(frame) => yield Ok(frame),
                                Err(e) => {
                                    yield Err(e);
                                    return;
                                }
                            }
                        }
                    }
                    Err(e) => {
                        yield Err(e);
                        return;
                    }
                }
            }

            yield Ok(Bytes::from_static(DONE_FRAME));
        }
    }

    /// Translate a buffered (non-streaming) upstream body.
    ///
    /// Id, created time and roles are passed through as the upstream sent
    /// them; only streamed chunks get synthesized values.
    ///
    /// # Errors
    /// Returns [`RelayError::ResponseParse`] if the body is not a valid
    /// upstream response
    pub fn translate_response(&self, body: &[u8]) -> RelayResult<ChatCompletionResponse> {
        let response: UpstreamResponse = serde_json::from_slice(body)
            .map_err(|e| RelayError::response_parse(e.to_string()))?;
        let payload = response.response_payload;

        let choices = payload
            .choices
            .into_iter()
            .map(|choice| Choice {
                index: choice.index,
                message: ResponseMessage {
                    role: choice.message.role.clone(),
                    content: choice.message.into_first_text().unwrap_or_default(),
                },
                finish_reason: choice.finish_reason,
            })
            .collect();

        Ok(ChatCompletionResponse {
            id: payload.id,
            object: COMPLETION_OBJECT.to_string(),
            created: payload.created,
            model: self.model.clone(),
            choices,
            usage: Usage::default(),
        })
    }
}

fn id_or_synthesized(id: String) -> String {
    if id.is_empty() {
        completion_id()
    } else {
        id
    }
}

fn created_or_now(created: i64) -> i64 {
    if created == 0 {
        unix_now()
    } else {
        created
    }
}

fn truncate(s: &str, limit: usize) -> &str {
    match s.char_indices().nth(limit) {
        Some((at, _)) => &s[..at],
        None => s,
    }
}
