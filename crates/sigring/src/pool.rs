//! Reuse pool for queue backends.
//!
//! Creating a lock-free backend allocates its full slot array up front, so
//! short-lived buffers would spend most of their lifetime in the allocator.
//! The pool amortizes that cost: released buffers clear their backend and
//! push it onto a bounded lock-free freelist, and the next buffer of the
//! same kind pops it back off instead of allocating.

use crate::invariants::debug_assert_clean_recycle;
use crate::queue::{BackendKind, QueueBackend};
use crate::Config;
use crossbeam_queue::ArrayQueue;
use std::sync::Arc;

/// Default number of idle backends a pool keeps around.
pub const DEFAULT_POOL_SIZE: usize = 16;

/// Reuse pool for [`QueueBackend`]s of one kind and one fixed capacity.
///
/// Backends are handed out behind `Arc` so a buffer can keep its backend
/// alive across a racing `release()` while the pool takes ownership back
/// for the next borrower.
pub struct QueuePool<T> {
    kind: BackendKind,
    config: Config,
    freelist: ArrayQueue<Arc<QueueBackend<T>>>,
}

impl<T> QueuePool<T> {
    /// Creates a pool producing backends of `kind` with `config.capacity()`
    /// slots, keeping at most `max_idle` idle backends.
    pub fn new(kind: BackendKind, config: Config, max_idle: usize) -> Self {
        Self {
            kind,
            config,
            freelist: ArrayQueue::new(max_idle.max(1)),
        }
    }

    /// Creates a pool with the default freelist size.
    pub fn with_defaults(kind: BackendKind, config: Config) -> Self {
        Self::new(kind, config, DEFAULT_POOL_SIZE)
    }

    /// Returns the kind of backend this pool produces.
    pub fn kind(&self) -> BackendKind {
        self.kind
    }

    /// Returns the slot capacity of every backend this pool produces.
    pub fn slot_capacity(&self) -> usize {
        self.config.capacity()
    }

    /// Returns the pool's configuration.
    pub fn config(&self) -> Config {
        self.config
    }

    /// Returns the number of idle backends currently pooled.
    pub fn idle_count(&self) -> usize {
        self.freelist.len()
    }

    /// Checks a backend out of the pool, building a fresh one when the
    /// freelist is empty. Checked-out backends are always empty.
    pub fn acquire(&self) -> Arc<QueueBackend<T>> {
        match self.freelist.pop() {
            Some(backend) => {
                debug_assert_clean_recycle!(backend.len());
                backend
            }
            None => Arc::new(QueueBackend::of_kind(self.kind, self.config.capacity())),
        }
    }

    /// Returns a backend to the pool for reuse.
    ///
    /// The backend is cleared first so no tokens leak into the next
    /// borrower. When the freelist is full the backend is simply dropped.
    pub fn recycle(&self, backend: Arc<QueueBackend<T>>) {
        backend.clear();
        debug_assert_clean_recycle!(backend.len());
        let _ = self.freelist.push(backend);
    }
}
