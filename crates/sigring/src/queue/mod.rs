//! Queue backends: the fixed-capacity token storage behind a signal buffer.
//!
//! Three variants with different concurrency guarantees, selected once at
//! buffer construction and never inspected again:
//!
//! - [`SpscQueue`]: one inserting thread, one removing thread. Lightest.
//! - [`SpmcQueue`]: one inserting thread, any number of removing threads.
//! - [`SyncQueue`]: any thread combination, mutex-guarded. The safe
//!   fallback when [`fast_path_available`] reports the lock-free variants
//!   unusable on the current target.
//!
//! All variants share the same non-blocking contract: `try_insert` hands
//! the token back on a full queue, `try_remove` returns `None` on an empty
//! one, and `len` is advisory under concurrency.

mod fallback;
mod spmc;
mod spsc;

pub use fallback::SyncQueue;
pub use spmc::SpmcQueue;
pub use spsc::SpscQueue;

/// Which concurrency contract a backend provides.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackendKind {
    /// Single producer, single consumer.
    Spsc,
    /// Single producer, multiple consumers.
    Spmc,
    /// Any thread combination (mutex-guarded).
    Fallback,
}

/// Reports whether the lock-free backends are usable on this target.
///
/// Consulted once per buffer construction; when `false` the factories build
/// a private [`SyncQueue`] instead of borrowing a pooled lock-free backend.
#[inline]
pub fn fast_path_available() -> bool {
    cfg!(target_has_atomic = "64") && cfg!(target_has_atomic = "ptr")
}

/// A queue backend of one of the three variants.
///
/// The buffer is written against this type only; nothing downstream of
/// construction ever matches on the concrete variant.
pub enum QueueBackend<T> {
    Spsc(SpscQueue<T>),
    Spmc(SpmcQueue<T>),
    Fallback(SyncQueue<T>),
}

impl<T> QueueBackend<T> {
    /// Builds a single-producer single-consumer backend.
    pub fn spsc(capacity: usize) -> Self {
        Self::Spsc(SpscQueue::new(capacity))
    }

    /// Builds a single-producer multi-consumer backend.
    pub fn spmc(capacity: usize) -> Self {
        Self::Spmc(SpmcQueue::new(capacity))
    }

    /// Builds the universally safe backend.
    pub fn fallback(capacity: usize) -> Self {
        Self::Fallback(SyncQueue::new(capacity))
    }

    /// Builds a backend of the given kind.
    pub fn of_kind(kind: BackendKind, capacity: usize) -> Self {
        match kind {
            BackendKind::Spsc => Self::spsc(capacity),
            BackendKind::Spmc => Self::spmc(capacity),
            BackendKind::Fallback => Self::fallback(capacity),
        }
    }

    /// Returns this backend's concurrency contract.
    pub fn kind(&self) -> BackendKind {
        match self {
            Self::Spsc(_) => BackendKind::Spsc,
            Self::Spmc(_) => BackendKind::Spmc,
            Self::Fallback(_) => BackendKind::Fallback,
        }
    }

    /// Returns the number of slots.
    #[inline]
    pub fn capacity(&self) -> usize {
        match self {
            Self::Spsc(q) => q.capacity(),
            Self::Spmc(q) => q.capacity(),
            Self::Fallback(q) => q.capacity(),
        }
    }

    /// Non-blocking insert. Returns the token back on a full queue.
    #[inline]
    pub fn try_insert(&self, token: T) -> Result<(), T> {
        match self {
            Self::Spsc(q) => q.try_insert(token),
            Self::Spmc(q) => q.try_insert(token),
            Self::Fallback(q) => q.try_insert(token),
        }
    }

    /// Non-blocking remove. Returns `None` on an empty queue.
    #[inline]
    pub fn try_remove(&self) -> Option<T> {
        match self {
            Self::Spsc(q) => q.try_remove(),
            Self::Spmc(q) => q.try_remove(),
            Self::Fallback(q) => q.try_remove(),
        }
    }

    /// Returns the current number of stored tokens. Advisory under
    /// concurrency.
    #[inline]
    pub fn len(&self) -> usize {
        match self {
            Self::Spsc(q) => q.len(),
            Self::Spmc(q) => q.len(),
            Self::Fallback(q) => q.len(),
        }
    }

    /// Returns `true` if the backend holds no tokens.
    #[inline]
    pub fn is_empty(&self) -> bool {
        match self {
            Self::Spsc(q) => q.is_empty(),
            Self::Spmc(q) => q.is_empty(),
            Self::Fallback(q) => q.is_empty(),
        }
    }

    /// Drops all stored tokens.
    pub fn clear(&self) {
        match self {
            Self::Spsc(q) => q.clear(),
            Self::Spmc(q) => q.clear(),
            Self::Fallback(q) => q.clear(),
        }
    }
}
