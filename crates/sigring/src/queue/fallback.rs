use std::collections::VecDeque;
use std::sync::{Mutex, PoisonError};

/// Mutex-guarded bounded queue.
///
/// The universally safe backend: correct under any combination of inserting
/// and removing threads, at the cost of a lock per operation. Used when the
/// platform cannot provide the lock-free variants, and as the private
/// backend for explicit construction.
pub struct SyncQueue<T> {
    inner: Mutex<VecDeque<T>>,
    capacity: usize,
}

impl<T> SyncQueue<T> {
    /// Creates a queue bounded at `capacity` tokens.
    pub fn new(capacity: usize) -> Self {
        Self {
            inner: Mutex::new(VecDeque::with_capacity(capacity)),
            capacity,
        }
    }

    /// Returns the number of slots.
    #[inline]
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, VecDeque<T>> {
        // A poisoned queue is still structurally valid; keep serving it.
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Non-blocking insert. Returns the token back on a full queue.
    pub fn try_insert(&self, token: T) -> Result<(), T> {
        let mut queue = self.lock();
        if queue.len() >= self.capacity {
            return Err(token);
        }
        queue.push_back(token);
        Ok(())
    }

    /// Non-blocking remove. Returns `None` on an empty queue.
    pub fn try_remove(&self) -> Option<T> {
        self.lock().pop_front()
    }

    /// Returns the current number of stored tokens.
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    /// Returns `true` if the queue holds no tokens.
    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    /// Drops all stored tokens.
    pub fn clear(&self) {
        self.lock().clear();
    }
}
