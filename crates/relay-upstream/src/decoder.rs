//! Blank-line delimited record decoder.
//!
//! A background task reads the upstream body, splits it on `\n\n` and pushes
//! each non-empty record into a bounded channel. When the consumer stops
//! reading, the channel fills and the task stops pulling from the network.
//! Bytes left after the last delimiter when the body ends are discarded.

use bytes::{Buf, Bytes, BytesMut};
use futures::{Stream, StreamExt};
use relay_core::{RelayError, RelayResult};
use std::fmt::Display;
use std::pin::Pin;
use std::task::{Context, Poll};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, trace};

/// Default number of records buffered between the reader and the consumer
pub const DEFAULT_CAPACITY: usize = 10;

const DELIMITER: &[u8] = b"\n\n";

/// Spawns the reader task for one upstream body
#[derive(Debug, Clone, Copy)]
pub struct StreamDecoder {
    capacity: usize,
}

impl Default for StreamDecoder {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

impl StreamDecoder {
    /// Decoder buffering at most `capacity` records (minimum 1)
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
        }
    }

    /// Channel capacity
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Start decoding `source`.
    ///
    /// The returned stream yields records without their delimiter. It ends
    /// after the source ends, after the first read error (yielded as
    /// [`RelayError::Stream`]), or after `cancel` fires (yielded as
    /// [`RelayError::Cancelled`]). The source is dropped exactly once, when
    /// the reader task exits.
    pub fn decode<S, E>(&self, source: S, cancel: CancellationToken) -> RecordStream
    where
        S: Stream<Item = Result<Bytes, E>> + Send + 'static,
        E: Display + Send + 'static,
    {
        let (tx, rx) = mpsc::channel(self.capacity);
        tokio::spawn(pump(Box::pin(source), tx, cancel.clone()));
        RecordStream {
            rx,
            cancel,
            finished: false,
        }
    }
}

async fn pump<S, E>(
    mut source: Pin<Box<S>>,
    tx: mpsc::Sender<RelayResult<Bytes>>,
    cancel: CancellationToken,
) where
    S: Stream<Item = Result<Bytes, E>> + Send + ?Sized,
    E: Display,
{
    let mut buffer = BytesMut::with_capacity(4096);

    loop {
        while let Some(record) = split_record(&mut buffer) {
            if record.is_empty() {
                continue;
            }

            if !deliver(&tx, &cancel, Ok(record)).await {
                return;
            }
        }

        let next = tokio::select! {
            biased;
            () = cancel.cancelled() => {
                trace!("Decoder cancelled while reading");
                return;
            }
            next = source.next() => next,
        };

        match next {
            Some(Ok(bytes)) => buffer.extend_from_slice(&bytes),
            Some(Err(e)) => {
                deliver(&tx, &cancel, Err(RelayError::stream(e.to_string()))).await;
                return;
            }
            None => {
                if !buffer.is_empty() {
                    debug!(
                        bytes = buffer.len(),
                        "Discarding unterminated trailing record"
                    );
                }
                return;
            }
        }
    }
}

/// Send one item, giving up on cancellation or a dropped consumer.
///
/// Returns whether the reader should keep going. Cancellation itself is
/// reported by [`RecordStream`], which holds the same token.
async fn deliver(
    tx: &mpsc::Sender<RelayResult<Bytes>>,
    cancel: &CancellationToken,
    item: RelayResult<Bytes>,
) -> bool {
    tokio::select! {
        biased;
        () = cancel.cancelled() => {
            trace!("Decoder cancelled while the queue was full");
            false
        }
        sent = tx.send(item) => {
            if sent.is_err() {
                trace!("Record consumer dropped, stopping reader");
            }
            sent.is_ok()
        }
    }
}

/// Remove the first complete record from `buffer`, dropping its delimiter
fn split_record(buffer: &mut BytesMut) -> Option<Bytes> {
    let at = buffer
        .windows(DELIMITER.len())
        .position(|window| window == DELIMITER)?;

    let record = buffer.split_to(at).freeze();
    buffer.advance(DELIMITER.len());
    Some(record)
}

/// Records produced by [`StreamDecoder::decode`].
///
/// Once the token fires the stream yields [`RelayError::Cancelled`] and ends,
/// even if records were still queued.
#[derive(Debug)]
pub struct RecordStream {
    rx: mpsc::Receiver<RelayResult<Bytes>>,
    cancel: CancellationToken,
    finished: bool,
}

impl RecordStream {
    fn cancelled(&mut self) -> Poll<Option<RelayResult<Bytes>>> {
        self.finished = true;
        self.rx.close();
        Poll::Ready(Some(Err(RelayError::Cancelled)))
    }
}

impl Stream for RecordStream {
    type Item = RelayResult<Bytes>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        if self.finished {
            return Poll::Ready(None);
        }
        if self.cancel.is_cancelled() {
            return self.cancelled();
        }

        match self.rx.poll_recv(cx) {
            Poll::Ready(Some(item)) => {
                self.finished = item.is_err();
                Poll::Ready(Some(item))
            }
            // The reader drops its sender when it stops on cancellation.
            Poll::Ready(None) if self.cancel.is_cancelled() => self.cancelled(),
            Poll::Ready(None) => {
                self.finished = true;
                Poll::Ready(None)
            }
            Poll::Pending => Poll::Pending,
        }
    }
}
