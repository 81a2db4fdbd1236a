//! The signal buffer core.
//!
//! [`SignalBuffer`] is the hand-off point between a producer of value /
//! completion / error events and a consumer that may be slower. Values are
//! encoded as [`Signal`] tokens and stored in a fixed-capacity queue
//! backend; the single terminal token lives out-of-band in a write-once
//! cell so it is always delivered after every buffered value, never
//! interleaved and never lost.
//!
//! Capacity is a hard contract: a producer that publishes into a full
//! buffer has ignored demand signaling, and `publish_value` reports that as
//! [`PublishError::MissingBackpressure`] instead of blocking or dropping.

use crate::invariants::debug_assert_terminal_transition;
use crate::metrics::{Metrics, MetricsSnapshot};
use crate::pool::QueuePool;
use crate::queue::{fast_path_available, BackendKind, QueueBackend};
use crate::signal::{Fault, Observer, Signal};
use crate::Config;
use crossbeam_utils::{Backoff, CachePadded};
use std::cell::UnsafeCell;
use std::sync::atomic::{AtomicBool, AtomicU8, AtomicUsize, Ordering};
use std::sync::Arc;
use thiserror::Error;

/// Error returned by [`SignalBuffer::publish_value`].
///
/// Both variants hand the rejected value back so callers can retry or
/// surface it without cloning.
#[derive(Debug, Error)]
pub enum PublishError<T> {
    /// The backend was full: the producer published more values than the
    /// consumer had room for. The buffer never retries; tearing the
    /// pipeline down (or fixing demand accounting upstream) is the
    /// caller's job.
    #[error("missing backpressure: producer published into a full buffer")]
    MissingBackpressure(T),

    /// The buffer was released; publishing values afterwards is a usage
    /// error.
    #[error("buffer has been released and no longer accepts values")]
    Released(T),
}

impl<T> PublishError<T> {
    /// Recovers the rejected value.
    pub fn into_inner(self) -> T {
        match self {
            Self::MissingBackpressure(value) | Self::Released(value) => value,
        }
    }
}

// ---------------------------------------------------------------------
// Terminal cell
// ---------------------------------------------------------------------

const TERMINAL_EMPTY: u8 = 0;
const TERMINAL_WRITING: u8 = 1;
const TERMINAL_SET: u8 = 2;
const TERMINAL_TAKEN: u8 = 3;

/// Write-once, take-once cell holding the terminal token.
///
/// The state machine EMPTY -> WRITING -> SET -> TAKEN only ever moves
/// forward. The EMPTY -> WRITING edge is claimed by CAS so the first
/// terminal publish wins and later ones are no-ops; the SET -> TAKEN edge
/// is claimed by CAS so exactly one polling thread obtains the token even
/// with multiple consumers. The Release store of SET publishes the token
/// (and everything the producer inserted before it) to whichever thread
/// later takes it with Acquire.
struct TerminalCell<T> {
    state: AtomicU8,
    slot: UnsafeCell<Option<Signal<T>>>,
}

// Safety: the slot is only touched by the thread holding the WRITING or
// TAKEN edge, and those edges are handed out once each by CAS.
unsafe impl<T: Send> Send for TerminalCell<T> {}
unsafe impl<T: Send> Sync for TerminalCell<T> {}

impl<T> TerminalCell<T> {
    fn new() -> Self {
        Self {
            state: AtomicU8::new(TERMINAL_EMPTY),
            slot: UnsafeCell::new(None),
        }
    }

    /// Stores the terminal token if none was stored before. Returns whether
    /// this call won the first-terminal race.
    fn set(&self, token: Signal<T>) -> bool {
        if self
            .state
            .compare_exchange(
                TERMINAL_EMPTY,
                TERMINAL_WRITING,
                Ordering::Acquire,
                Ordering::Relaxed,
            )
            .is_err()
        {
            // A terminal token already exists (or existed); ignore.
            return false;
        }
        debug_assert_terminal_transition!(TERMINAL_EMPTY, TERMINAL_WRITING);

        // SAFETY: the EMPTY -> WRITING edge is granted to exactly one
        // thread, which owns the slot until the Release store below.
        unsafe {
            *self.slot.get() = Some(token);
        }

        debug_assert_terminal_transition!(TERMINAL_WRITING, TERMINAL_SET);
        self.state.store(TERMINAL_SET, Ordering::Release);
        true
    }

    /// Takes the terminal token, at most once per cell lifetime.
    fn take(&self) -> Option<Signal<T>> {
        if self.state.load(Ordering::Acquire) != TERMINAL_SET {
            return None;
        }
        if self
            .state
            .compare_exchange(
                TERMINAL_SET,
                TERMINAL_TAKEN,
                Ordering::AcqRel,
                Ordering::Relaxed,
            )
            .is_err()
        {
            // Another poller claimed it between our load and CAS.
            return None;
        }
        debug_assert_terminal_transition!(TERMINAL_SET, TERMINAL_TAKEN);

        // SAFETY: the SET -> TAKEN edge is granted to exactly one thread,
        // and the Acquire in the CAS synchronizes with the writer's Release
        // store of SET.
        unsafe { (*self.slot.get()).take() }
    }
}

// ---------------------------------------------------------------------
// SignalBuffer
// ---------------------------------------------------------------------

/// Bounded, pooled, backpressure-enforcing signal buffer.
///
/// One logical producer calls [`publish_value`](Self::publish_value) per
/// item and [`publish_completed`](Self::publish_completed) /
/// [`publish_error`](Self::publish_error) at most once in total; consumers
/// call [`poll`](Self::poll). How many threads may poll concurrently is
/// decided by the backend variant chosen at construction (see
/// [`SignalPools`]); the buffer itself does not police it.
///
/// # Ordering
///
/// `poll` drains the backend to empty before it ever considers the terminal
/// cell, so the terminal token is observed strictly after every value that
/// was inserted before the terminal publish. This holds under all
/// interleavings; it is the buffer's central invariant.
///
/// # Release
///
/// [`release`](Self::release) is the cancellation primitive: idempotent,
/// callable from any thread, and deliberately lenient toward racing
/// readers. A released buffer stays inert (`count() == 0`,
/// `poll() == None`) rather than failing, because callers legitimately race
/// a final drain against a release; only `publish_value` treats the
/// released state as a hard error.
///
/// Release must not clear the backend while a racing `publish_value` or
/// `poll` is inside it, so each side counts its in-flight entry in a guard:
/// an operation increments its guard (SeqCst) and re-checks `released`; the
/// releaser flips `released` (SeqCst) and waits for both guards to drain
/// before touching the backend. The SeqCst pairing rules out the
/// store-buffer interleaving where an operation misses the flag while the
/// releaser misses the guard. Operations are non-blocking, so the drain is
/// bounded to a few instructions.
pub struct SignalBuffer<T> {
    backend: Arc<QueueBackend<Signal<T>>>,
    pool: Option<Arc<QueuePool<Signal<T>>>>,
    released: AtomicBool,
    /// In-flight `publish_value` calls (producer side)
    publish_guard: CachePadded<AtomicUsize>,
    /// In-flight `poll` calls (consumer side)
    poll_guard: CachePadded<AtomicUsize>,
    terminal: TerminalCell<T>,
    metrics: Metrics,
    config: Config,
    capacity: usize,
}

impl<T> SignalBuffer<T> {
    /// Borrows a backend from `pool` for this buffer's lifetime. The
    /// backend goes back to the pool on [`release`](Self::release).
    pub fn from_pool(pool: Arc<QueuePool<Signal<T>>>) -> Self {
        let backend = pool.acquire();
        let config = pool.config();
        Self {
            capacity: backend.capacity(),
            backend,
            pool: Some(pool),
            released: AtomicBool::new(false),
            publish_guard: CachePadded::new(AtomicUsize::new(0)),
            poll_guard: CachePadded::new(AtomicUsize::new(0)),
            terminal: TerminalCell::new(),
            metrics: Metrics::new(),
            config,
        }
    }

    /// Wraps a caller-supplied backend. No pool interaction on release.
    pub fn with_backend(backend: QueueBackend<Signal<T>>, config: Config) -> Self {
        Self {
            capacity: backend.capacity(),
            backend: Arc::new(backend),
            pool: None,
            released: AtomicBool::new(false),
            publish_guard: CachePadded::new(AtomicUsize::new(0)),
            poll_guard: CachePadded::new(AtomicUsize::new(0)),
            terminal: TerminalCell::new(),
            metrics: Metrics::new(),
            config,
        }
    }

    /// Builds a buffer over a private universally-safe backend. Handy for
    /// tests and for platforms without the lock-free fast path.
    pub fn unpooled(config: Config) -> Self {
        Self::with_backend(QueueBackend::fallback(config.capacity()), config)
    }

    // ---------------------------------------------------------------------
    // PRODUCER API
    // ---------------------------------------------------------------------

    /// Encodes `value` and inserts it, non-blocking.
    ///
    /// A full backend means the producer overran the consumer's demand;
    /// the value comes back inside
    /// [`PublishError::MissingBackpressure`] and nothing is retried.
    pub fn publish_value(&self, value: T) -> Result<(), PublishError<T>> {
        self.publish_guard.fetch_add(1, Ordering::SeqCst);
        // Re-check after entering the guard; see the release protocol note
        // on the type.
        if self.released.load(Ordering::SeqCst) {
            self.publish_guard.fetch_sub(1, Ordering::Release);
            return Err(PublishError::Released(value));
        }

        let result = match self.backend.try_insert(Signal::value(value)) {
            Ok(()) => {
                if self.config.enable_metrics {
                    self.metrics.add_value_published();
                }
                Ok(())
            }
            Err(Signal::Value(value)) => {
                if self.config.enable_metrics {
                    self.metrics.add_backpressure_rejection();
                }
                Err(PublishError::MissingBackpressure(value))
            }
            // A rejected insert hands back exactly the token it was given,
            // and we only ever insert value tokens.
            Err(_) => unreachable!("backend rejected a token it was not given"),
        };

        self.publish_guard.fetch_sub(1, Ordering::Release);
        result
    }

    /// Records normal completion. Only the first terminal publish (of
    /// either kind) takes effect; the rest are silent no-ops.
    pub fn publish_completed(&self) {
        if self.terminal.set(Signal::completed()) && self.config.enable_metrics {
            self.metrics.add_terminal_published();
        }
    }

    /// Records upstream failure. Only the first terminal publish (of
    /// either kind) takes effect; the rest are silent no-ops.
    pub fn publish_error(&self, cause: impl Into<Fault>) {
        if self.terminal.set(Signal::error(cause)) && self.config.enable_metrics {
            self.metrics.add_terminal_published();
        }
    }

    // ---------------------------------------------------------------------
    // CONSUMER API
    // ---------------------------------------------------------------------

    /// Removes the next token, non-blocking.
    ///
    /// Values come out first, in publish order. Once the backend is empty
    /// the pending terminal token (if any) is returned exactly once; after
    /// that, and whenever there is simply nothing buffered, `poll` returns
    /// `None`. A released buffer always returns `None`.
    pub fn poll(&self) -> Option<Signal<T>> {
        self.poll_guard.fetch_add(1, Ordering::SeqCst);
        // Re-check after entering the guard; see the release protocol note
        // on the type.
        if self.released.load(Ordering::SeqCst) {
            self.poll_guard.fetch_sub(1, Ordering::Release);
            return None;
        }

        let token = self
            .backend
            .try_remove()
            .or_else(|| self.terminal.take());
        if token.is_some() && self.config.enable_metrics {
            self.metrics.add_signal_polled();
        }

        self.poll_guard.fetch_sub(1, Ordering::Release);
        token
    }

    /// Returns the number of buffered value tokens (0 once released).
    /// Advisory under concurrent producers: no lock is taken.
    pub fn count(&self) -> usize {
        if self.released.load(Ordering::Acquire) {
            return 0;
        }
        self.backend.len()
    }

    /// Returns how many more values fit right now. Advisory, like
    /// [`count`](Self::count).
    pub fn available(&self) -> usize {
        self.capacity - self.count()
    }

    /// Returns the fixed capacity.
    #[inline]
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Returns `true` once [`release`](Self::release) has run.
    pub fn is_released(&self) -> bool {
        self.released.load(Ordering::Acquire)
    }

    // ---------------------------------------------------------------------
    // LIFECYCLE
    // ---------------------------------------------------------------------

    /// Detaches the backend: clears its contents and, for pooled buffers,
    /// returns it to the pool for reuse.
    ///
    /// Idempotent and callable from any thread; the atomic swap guarantees
    /// the backend goes back to the pool at most once. Afterwards the
    /// buffer is inert: `count()` is 0, `poll()` is `None`, and
    /// `publish_value` fails with [`PublishError::Released`].
    pub fn release(&self) {
        if self.released.swap(true, Ordering::SeqCst) {
            return;
        }

        // Wait for racing publishes/polls that entered before the flag
        // flipped; anything later bails on the flag. The in-flight work is
        // non-blocking, so this drains within a few instructions.
        let backoff = Backoff::new();
        while self.publish_guard.load(Ordering::SeqCst) != 0
            || self.poll_guard.load(Ordering::SeqCst) != 0
        {
            backoff.snooze();
        }

        match &self.pool {
            Some(pool) => pool.recycle(Arc::clone(&self.backend)),
            None => self.backend.clear(),
        }
    }

    /// Returns a metrics snapshot (zeros unless `Config::enable_metrics`).
    pub fn metrics(&self) -> MetricsSnapshot {
        if self.config.enable_metrics {
            self.metrics.snapshot()
        } else {
            MetricsSnapshot::default()
        }
    }

    // ---------------------------------------------------------------------
    // CLASSIFICATION PASSTHROUGHS
    // ---------------------------------------------------------------------
    //
    // Thin delegations to the signal codec so dispatch loops can stay on
    // one receiver type; no buffer state is involved.

    /// Returns `true` if `token` is the completion marker.
    pub fn is_completed(&self, token: &Signal<T>) -> bool {
        token.is_completed()
    }

    /// Returns `true` if `token` carries a failure.
    pub fn is_error(&self, token: &Signal<T>) -> bool {
        token.is_error()
    }

    /// Routes `token` to `observer`; returns `true` if it was terminal.
    pub fn dispatch<O: Observer<T> + ?Sized>(&self, token: Signal<T>, observer: &mut O) -> bool {
        token.dispatch(observer)
    }

    /// Decodes the cause out of an error token.
    pub fn extract_error(&self, token: Signal<T>) -> Option<Fault> {
        token.into_error()
    }
}

impl<T> Drop for SignalBuffer<T> {
    fn drop(&mut self) {
        self.release();
    }
}

// ---------------------------------------------------------------------
// SignalPools
// ---------------------------------------------------------------------

/// Composition root owning one backend pool per lock-free variant.
///
/// Build one of these where the pipeline is wired together and hand out
/// buffers from it; every buffer released back recycles its backend for
/// the next one. On targets without the lock-free fast path the factories
/// silently produce buffers over private universally-safe backends, with
/// an identical behavioral contract.
pub struct SignalPools<T> {
    spsc: Arc<QueuePool<Signal<T>>>,
    spmc: Arc<QueuePool<Signal<T>>>,
}

impl<T> SignalPools<T> {
    /// Creates both pools with the given configuration and the default
    /// freelist size.
    pub fn new(config: Config) -> Self {
        Self {
            spsc: Arc::new(QueuePool::with_defaults(BackendKind::Spsc, config)),
            spmc: Arc::new(QueuePool::with_defaults(BackendKind::Spmc, config)),
        }
    }

    /// Builds a buffer for exactly one polling thread (the lighter
    /// variant).
    pub fn spsc_buffer(&self) -> SignalBuffer<T> {
        if fast_path_available() {
            SignalBuffer::from_pool(Arc::clone(&self.spsc))
        } else {
            SignalBuffer::unpooled(self.spsc.config())
        }
    }

    /// Builds a buffer safe for any number of polling threads.
    pub fn spmc_buffer(&self) -> SignalBuffer<T> {
        if fast_path_available() {
            SignalBuffer::from_pool(Arc::clone(&self.spmc))
        } else {
            SignalBuffer::unpooled(self.spmc.config())
        }
    }

    /// Idle backends currently held by the single-consumer pool.
    pub fn spsc_idle_count(&self) -> usize {
        self.spsc.idle_count()
    }

    /// Idle backends currently held by the multi-consumer pool.
    pub fn spmc_idle_count(&self) -> usize {
        self.spmc.idle_count()
    }
}

impl<T> Default for SignalPools<T> {
    fn default() -> Self {
        Self::new(Config::default())
    }
}
