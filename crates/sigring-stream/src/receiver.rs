//! Async receiver implementing `futures::Stream`.

use crate::config::StreamConfig;
use crate::pipeline::Shared;
use futures_core::{Future, Stream};
use sigring::{Fault, Signal};
use std::collections::VecDeque;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};
use tokio::time::{interval, Interval};

/// Consumer endpoint of a pipeline.
///
/// Implements `futures::Stream` with a hybrid wakeup strategy: the sender's
/// data notification drives the common case, and a configurable poll
/// interval acts as a safety net for notifications that race past an
/// unregistered waker.
///
/// # Items
///
/// Values arrive as `Ok(value)`. A completion terminal ends the stream
/// (`None`); an error terminal yields one final `Err(cause)` and then ends
/// the stream. Terminals are observed only after every buffered value, and
/// exactly once, inherited from the buffer's ordering contract.
///
/// # Backpressure
///
/// After draining tokens the receiver wakes blocked senders through the
/// space notification.
///
/// # Release
///
/// Dropping the receiver (or calling [`release`](Self::release)) releases
/// the underlying buffer: pooled backends go back to their pool and the
/// sender starts failing with `StreamError::Released`.
pub struct SignalReceiver<T> {
    shared: Arc<Shared<T>>,
    config: StreamConfig,
    poll_timer: Interval,
    batch: VecDeque<Result<T, Fault>>,
    done: bool,
}

// The receiver is always treated as unpinned: the `Stream` impl immediately
// calls `get_mut`. The `batch: VecDeque<Result<T, Fault>>` field would
// otherwise make `SignalReceiver<T>` only conditionally `Unpin`.
impl<T> Unpin for SignalReceiver<T> {}

impl<T: Send + 'static> SignalReceiver<T> {
    pub(crate) fn new(shared: Arc<Shared<T>>, config: StreamConfig) -> Self {
        Self {
            shared,
            poll_timer: interval(config.poll_interval),
            batch: VecDeque::with_capacity(config.batch_hint),
            config,
            done: false,
        }
    }

    /// Releases the underlying buffer immediately.
    ///
    /// Undelivered values are discarded, blocked senders are woken so they
    /// can observe the released state, and the stream ends.
    pub fn release(&mut self) {
        self.done = true;
        self.batch.clear();
        self.shared.buffer.release();
        self.shared.space_notify.notify_waiters();
    }

    /// Returns `true` once the underlying buffer has been released.
    pub fn is_released(&self) -> bool {
        self.shared.buffer.is_released()
    }

    /// Returns the number of already-drained items waiting to be yielded.
    pub fn buffered_count(&self) -> usize {
        self.batch.len()
    }

    /// Drains up to the batch hint worth of tokens out of the buffer.
    /// Returns how many tokens were taken (terminal included).
    fn drain_batch(&mut self) -> usize {
        let limit = self.config.batch_hint.saturating_sub(self.batch.len());
        let mut drained = 0;
        while drained < limit {
            match self.shared.buffer.poll() {
                Some(Signal::Value(value)) => {
                    self.batch.push_back(Ok(value));
                    drained += 1;
                }
                Some(Signal::Completed) => {
                    self.done = true;
                    drained += 1;
                    break;
                }
                Some(Signal::Error(cause)) => {
                    self.batch.push_back(Err(cause));
                    self.done = true;
                    drained += 1;
                    break;
                }
                None => break,
            }
        }
        drained
    }
}

impl<T: Send + 'static> Stream for SignalReceiver<T> {
    type Item = Result<T, Fault>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let this = self.get_mut();

        // Yield anything already drained
        if let Some(item) = this.batch.pop_front() {
            return Poll::Ready(Some(item));
        }
        if this.done {
            return Poll::Ready(None);
        }

        // Drain whatever is buffered right now
        if this.drain_batch() > 0 {
            this.shared.space_notify.notify_waiters();
            if let Some(item) = this.batch.pop_front() {
                return Poll::Ready(Some(item));
            }
            if this.done {
                // Bare completion with no values left
                return Poll::Ready(None);
            }
        }

        // Register for the sender's data notification. Hold the registration
        // against a cloned Arc so `this` stays free for the mutable calls
        // below; both point at the same `Notify`.
        let shared = Arc::clone(&this.shared);
        let notified = shared.data_notify.notified();
        tokio::pin!(notified);
        if notified.poll(cx).is_ready() {
            // Data arrived while we were registering; take another pass.
            cx.waker().wake_by_ref();
            return Poll::Pending;
        }

        // Timer safety net for notifications that raced the registration
        if this.poll_timer.poll_tick(cx).is_ready() {
            let drained = this.drain_batch();
            if drained > 0 {
                this.shared.space_notify.notify_waiters();
            }
            // Arm the next tick before we park
            while this.poll_timer.poll_tick(cx).is_ready() {}
            if let Some(item) = this.batch.pop_front() {
                return Poll::Ready(Some(item));
            }
            if this.done {
                return Poll::Ready(None);
            }
        }

        Poll::Pending
    }
}

impl<T> Drop for SignalReceiver<T> {
    fn drop(&mut self) {
        self.shared.buffer.release();
        self.shared.space_notify.notify_waiters();
    }
}
