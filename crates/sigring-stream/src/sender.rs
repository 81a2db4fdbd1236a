//! Async sender implementing `futures::Sink`.

use crate::error::StreamError;
use crate::pipeline::Shared;
use futures_core::Future;
use futures_sink::Sink;
use sigring::{Fault, PublishError};
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

/// Producer endpoint of a pipeline.
///
/// Wraps the buffer's publish side with asynchronous backpressure: when the
/// buffer is full, [`send`](Self::send) (and the `Sink` machinery) wait for
/// the receiver to free space instead of surfacing the backpressure
/// violation to the caller.
///
/// # Note
///
/// `SignalSender` does NOT implement `Clone`: the underlying buffer admits
/// exactly one producer, and the type system enforces it here.
///
/// Dropping the sender publishes completion, so a consumer loop always
/// terminates; an earlier explicit [`complete`](Self::complete) or
/// [`fail`](Self::fail) wins, since only the first terminal counts.
pub struct SignalSender<T> {
    shared: Arc<Shared<T>>,
    /// Item accepted by `start_send` while the buffer was full.
    pending: Option<T>,
    /// Registered wait for space, kept across polls so a wakeup between
    /// a failed publish and the next poll is not lost.
    space_wait: Option<Pin<Box<dyn Future<Output = ()> + Send + Sync>>>,
}

// The sender is always treated as unpinned: every `Sink` method immediately
// calls `get_mut`, and the heap-pinned `space_wait` future is pinned
// independently of the struct. The `pending: Option<T>` field would otherwise
// make `SignalSender<T>` only conditionally `Unpin`.
impl<T> Unpin for SignalSender<T> {}

impl<T: Send + 'static> SignalSender<T> {
    pub(crate) fn new(shared: Arc<Shared<T>>) -> Self {
        Self {
            shared,
            pending: None,
            space_wait: None,
        }
    }

    /// Attempts to publish without waiting.
    ///
    /// Returns `Err(item)` if the buffer is full or released; the item is
    /// handed back either way.
    pub fn try_send(&self, item: T) -> Result<(), T> {
        match self.shared.buffer.publish_value(item) {
            Ok(()) => {
                self.shared.data_notify.notify_one();
                Ok(())
            }
            Err(err) => Err(err.into_inner()),
        }
    }

    /// Publishes a value, waiting for space when the buffer is full.
    pub async fn send(&self, item: T) -> Result<(), StreamError> {
        let mut value = item;
        loop {
            // Register interest in space before attempting, so a
            // notification racing the failed attempt cannot be lost.
            let space = self.shared.space_notify.notified();
            tokio::pin!(space);
            space.as_mut().enable();

            match self.shared.buffer.publish_value(value) {
                Ok(()) => {
                    self.shared.data_notify.notify_one();
                    return Ok(());
                }
                Err(PublishError::MissingBackpressure(v)) => {
                    value = v;
                    space.await;
                }
                Err(PublishError::Released(_)) => return Err(StreamError::Released),
            }
        }
    }

    /// Publishes normal completion. Later terminals are no-ops.
    pub fn complete(&self) {
        self.shared.buffer.publish_completed();
        self.shared.data_notify.notify_one();
    }

    /// Publishes a failure. Later terminals are no-ops.
    pub fn fail(&self, cause: impl Into<Fault>) {
        self.shared.buffer.publish_error(cause);
        self.shared.data_notify.notify_one();
    }

    /// Returns `true` once the buffer has been released (receiver dropped
    /// or released explicitly).
    pub fn is_released(&self) -> bool {
        self.shared.buffer.is_released()
    }

    /// Flushes the pending `start_send` item, registering for a space
    /// wakeup while the buffer stays full.
    fn poll_flush_pending(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), StreamError>> {
        loop {
            let Some(item) = self.pending.take() else {
                self.space_wait = None;
                return Poll::Ready(Ok(()));
            };

            match self.shared.buffer.publish_value(item) {
                Ok(()) => {
                    self.shared.data_notify.notify_one();
                    self.space_wait = None;
                    return Poll::Ready(Ok(()));
                }
                Err(PublishError::MissingBackpressure(v)) => {
                    self.pending = Some(v);
                    let was_registered = self.space_wait.is_some();
                    let shared = Arc::clone(&self.shared);
                    let wait = self
                        .space_wait
                        .get_or_insert_with(|| {
                            Box::pin(async move { shared.space_notify.notified().await })
                        });
                    match wait.as_mut().poll(cx) {
                        // Space may have been freed; retry immediately.
                        Poll::Ready(()) => self.space_wait = None,
                        Poll::Pending if was_registered => return Poll::Pending,
                        // Freshly registered: retry once so a notification
                        // sent before the registration is not lost.
                        Poll::Pending => {}
                    }
                }
                Err(PublishError::Released(_)) => {
                    self.space_wait = None;
                    return Poll::Ready(Err(StreamError::Released));
                }
            }
        }
    }
}

impl<T: Send + 'static> Sink<T> for SignalSender<T> {
    type Error = StreamError;

    /// Ready once no previously accepted item is waiting for space.
    fn poll_ready(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.get_mut().poll_flush_pending(cx)
    }

    /// Accepts an item; a full buffer parks it until the next flush.
    fn start_send(self: Pin<&mut Self>, item: T) -> Result<(), Self::Error> {
        let this = self.get_mut();
        if this.shared.buffer.is_released() {
            return Err(StreamError::Released);
        }

        match this.shared.buffer.publish_value(item) {
            Ok(()) => {
                this.shared.data_notify.notify_one();
                Ok(())
            }
            Err(PublishError::MissingBackpressure(v)) => {
                // Sink contract: poll_ready said yes, so pending is free.
                this.pending = Some(v);
                Ok(())
            }
            Err(PublishError::Released(_)) => Err(StreamError::Released),
        }
    }

    fn poll_flush(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.get_mut().poll_flush_pending(cx)
    }

    /// Flushes, then publishes completion: closing the sink ends the
    /// stream.
    fn poll_close(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        let this = self.get_mut();
        match this.poll_flush_pending(cx) {
            Poll::Ready(Ok(())) => {
                this.complete();
                Poll::Ready(Ok(()))
            }
            other => other,
        }
    }
}

impl<T> Drop for SignalSender<T> {
    fn drop(&mut self) {
        // A vanished producer ends the stream; an explicit complete()/
        // fail() before the drop already claimed the terminal slot.
        self.shared.buffer.publish_completed();
        self.shared.data_notify.notify_one();
    }
}
