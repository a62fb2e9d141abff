//! Streaming types and cancellation plumbing.
//!
//! A client stream is driven by one producer task that pulls from the
//! backend and pushes into a bounded queue. Every suspension point in the
//! producer is raced against the stream's cancellation token and the
//! per-request deadline, so an abandoned or canceled stream never leaks its
//! producer.

use std::pin::Pin;

use futures::Stream;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::error::LlmError;

/// Queue depth between the producer task and the consumer.
const STREAM_BUFFER: usize = 16;

/// One increment of a streamed response.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct StreamChunk {
    /// Partial content.
    #[serde(default)]
    pub content: String,
    /// True if this is the final chunk.
    #[serde(default)]
    pub done: bool,
}

impl StreamChunk {
    /// A content-bearing chunk.
    pub fn delta(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            done: false,
        }
    }

    /// The terminal marker chunk.
    pub fn finished() -> Self {
        Self {
            content: String::new(),
            done: true,
        }
    }
}

/// A pinned, boxed stream of response chunks.
///
/// An `Err` item is always the last item produced.
pub type ChatStream = Pin<Box<dyn Stream<Item = Result<StreamChunk, LlmError>> + Send>>;

/// A handle that can be used to request cancellation of a stream.
#[derive(Clone, Debug)]
pub struct CancelHandle {
    token: CancellationToken,
}

impl CancelHandle {
    pub(crate) fn new() -> Self {
        Self {
            token: CancellationToken::new(),
        }
    }

    /// Request cancellation. The producer task stops within one scheduling
    /// step; the consumer observes at most one final error item.
    pub fn cancel(&self) {
        self.token.cancel();
    }

    /// Check if cancellation was requested.
    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }
}

/// A chat stream paired with its cancellation handle.
pub struct ChatStreamHandle {
    pub stream: ChatStream,
    pub cancel: CancelHandle,
}

impl std::fmt::Debug for ChatStreamHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChatStreamHandle").finish_non_exhaustive()
    }
}


/// Bridge a backend stream to a consumer through a bounded queue, bounded by
/// `deadline` and cancellable through the returned handle.
///
/// Dropping the consumer side cancels the token, so the producer also exits
/// when the caller stops reading early.
pub(crate) fn forward_stream(inner: ChatStream, deadline: tokio::time::Instant) -> ChatStreamHandle {
    let cancel = CancelHandle::new();
    let token = cancel.token.clone();
    let (tx, mut rx) = mpsc::channel::<Result<StreamChunk, LlmError>>(STREAM_BUFFER);

    tokio::spawn(produce(inner, tx, token.clone(), deadline));

    let consumer_token = token.clone();
    let guard = token.drop_guard();
    let consumer = async_stream::stream! {
        let _guard = guard;
        let mut terminated = false;
        while let Some(item) = rx.recv().await {
            terminated = item.is_err() || matches!(&item, Ok(chunk) if chunk.done);
            yield item;
        }
        // The producer's terminal item may have been dropped against a full
        // queue; reconstruct it here so the signal always reaches the caller.
        if !terminated {
            if consumer_token.is_cancelled() {
                yield Err(LlmError::Canceled);
            } else if tokio::time::Instant::now() >= deadline {
                yield Err(LlmError::Timeout);
            }
        }
    };

    ChatStreamHandle {
        stream: Box::pin(consumer),
        cancel,
    }
}

async fn produce(
    mut inner: ChatStream,
    tx: mpsc::Sender<Result<StreamChunk, LlmError>>,
    token: CancellationToken,
    deadline: tokio::time::Instant,
) {
    use futures_util::StreamExt;

    loop {
        tokio::select! {
            _ = token.cancelled() => {
                // Best effort: the consumer may already be gone or backed up.
                let _ = tx.try_send(Err(LlmError::Canceled));
                return;
            }
            () = tokio::time::sleep_until(deadline) => {
                let _ = tx.try_send(Err(LlmError::Timeout));
                return;
            }
            item = inner.next() => {
                let Some(item) = item else { return };
                let is_last = matches!(&item, Ok(chunk) if chunk.done) || item.is_err();
                // A full queue must not make the producer deaf to cancellation.
                tokio::select! {
                    _ = token.cancelled() => return,
                    sent = tx.send(item) => {
                        if sent.is_err() || is_last {
                            return;
                        }
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures_util::StreamExt;
    use std::time::Duration;

    fn far_deadline() -> tokio::time::Instant {
        tokio::time::Instant::now() + Duration::from_secs(60)
    }

    #[tokio::test]
    async fn forwards_chunks_in_order_until_done() {
        let inner: ChatStream = Box::pin(futures_util::stream::iter(vec![
            Ok(StreamChunk::delta("a")),
            Ok(StreamChunk::delta("b")),
            Ok(StreamChunk::finished()),
        ]));
        let handle = forward_stream(inner, far_deadline());
        let items: Vec<_> = handle.stream.collect().await;

        assert_eq!(items.len(), 3);
        assert_eq!(items[0].as_ref().unwrap().content, "a");
        assert_eq!(items[1].as_ref().unwrap().content, "b");
        assert!(items[2].as_ref().unwrap().done);
    }

    #[tokio::test]
    async fn error_item_terminates_the_stream() {
        let inner: ChatStream = Box::pin(futures_util::stream::iter(vec![
            Ok(StreamChunk::delta("a")),
            Err(LlmError::RateLimited("429".into())),
            Ok(StreamChunk::delta("never delivered")),
        ]));
        let handle = forward_stream(inner, far_deadline());
        let items: Vec<_> = handle.stream.collect().await;

        assert_eq!(items.len(), 2);
        assert!(items[1].is_err());
    }

    #[tokio::test]
    async fn cancel_wakes_a_pending_stream() {
        let inner: ChatStream = Box::pin(futures_util::stream::pending());
        let handle = forward_stream(inner, far_deadline());
        let cancel = handle.cancel.clone();
        let mut stream = handle.stream;

        let waiter = tokio::spawn(async move { stream.next().await });
        tokio::task::yield_now().await;
        cancel.cancel();

        let out = tokio::time::timeout(Duration::from_millis(200), waiter)
            .await
            .expect("cancel should wake the waiting consumer")
            .expect("task ok");
        match out {
            Some(Err(LlmError::Canceled)) | None => {}
            other => panic!("unexpected item: {other:?}"),
        }
    }

    #[tokio::test]
    async fn deadline_surfaces_as_final_timeout_item() {
        tokio::time::pause();
        let inner: ChatStream = Box::pin(futures_util::stream::pending());
        let deadline = tokio::time::Instant::now() + Duration::from_millis(50);
        let handle = forward_stream(inner, deadline);
        let items: Vec<_> = handle.stream.collect().await;

        assert_eq!(items.len(), 1);
        assert_eq!(items[0], Err(LlmError::Timeout));
    }

    #[tokio::test]
    async fn cancel_against_a_full_queue_still_delivers_the_terminal_item() {
        // More chunks than the queue holds, and a consumer that reads nothing
        // until after cancellation.
        let chunks: Vec<_> = (0..STREAM_BUFFER * 4)
            .map(|_| Ok(StreamChunk::delta("x")))
            .collect();
        let inner: ChatStream = Box::pin(futures_util::stream::iter(chunks));
        let handle = forward_stream(inner, far_deadline());

        // Let the producer fill the queue and block on the send.
        tokio::task::yield_now().await;
        handle.cancel.cancel();

        let items: Vec<_> = handle.stream.collect().await;
        assert_eq!(items.last(), Some(&Err(LlmError::Canceled)));
        assert!(
            items[..items.len() - 1].iter().all(Result::is_ok),
            "only the final item may be an error"
        );
    }

    #[tokio::test]
    async fn deadline_against_a_full_queue_still_delivers_the_terminal_item() {
        let inner: ChatStream = Box::pin(async_stream::stream! {
            loop {
                yield Ok(StreamChunk::delta("x"));
            }
        });
        let deadline = tokio::time::Instant::now() + Duration::from_millis(20);
        let handle = forward_stream(inner, deadline);

        // Queue fills immediately; nothing is read until well past the deadline.
        tokio::time::sleep(Duration::from_millis(60)).await;

        let items: Vec<_> = handle.stream.collect().await;
        assert_eq!(items.last(), Some(&Err(LlmError::Timeout)));
    }

    #[tokio::test]
    async fn dropping_the_consumer_stops_the_producer() {
        // A stream that counts how far it was polled and never ends.
        let inner: ChatStream = Box::pin(async_stream::stream! {
            loop {
                yield Ok(StreamChunk::delta("x"));
                tokio::task::yield_now().await;
            }
        });
        let handle = forward_stream(inner, far_deadline());
        let mut stream = handle.stream;
        let first = stream.next().await;
        assert!(first.is_some());
        drop(stream);

        // The drop guard cancels the token; the producer must observe it.
        tokio::time::timeout(Duration::from_millis(200), async {
            while !handle.cancel.is_cancelled() {
                tokio::task::yield_now().await;
            }
        })
        .await
        .expect("consumer drop should cancel the producer token");
    }
}
