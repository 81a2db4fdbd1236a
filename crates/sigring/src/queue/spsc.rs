use crate::invariants::{
    debug_assert_bounded_count, debug_assert_initialized_read, debug_assert_monotonic,
};
use crossbeam_utils::CachePadded;
use std::cell::UnsafeCell;
use std::mem::MaybeUninit;
use std::ptr;
use std::sync::atomic::{AtomicU64, Ordering};

// =============================================================================
// MEMORY ORDERING & SYNCHRONIZATION STRATEGY
// =============================================================================
//
// Classic single-producer single-consumer protocol over unbounded u64
// sequence numbers (slot index is `sequence & mask`, so wrap-around of the
// array never aliases live slots; wrap-around of the u64 itself is not a
// practical concern).
//
// **Producer (insert path):**
// 1. Load `tail` with Relaxed (only the producer writes tail)
// 2. Load `cached_head` with no ordering (UnsafeCell, single-writer)
// 3. If the cache says full: Load `head` with Acquire (synchronizes with the
//    consumer's Release store) and refresh the cache
// 4. Write the token into the slot (protected by the protocol)
// 5. Store `tail` with Release (publishes the write to the consumer)
//
// **Consumer (remove path):**
// 1. Load `head` with Relaxed (only the consumer writes head)
// 2. Load `cached_tail` with no ordering (UnsafeCell, single-writer)
// 3. If the cache says empty: Load `tail` with Acquire and refresh the cache
// 4. Move the token out of the slot
// 5. Store `head` with Release (publishes consumption to the producer)
//
// The cached indices have exactly one writer each (producer writes
// `cached_head`, consumer writes `cached_tail`), which is what makes the
// unsynchronized UnsafeCell accesses sound. One inserting thread and one
// removing thread at a time is the caller's contract.
//
// =============================================================================

/// Single-producer single-consumer array queue.
///
/// The lightweight backend: lock-free, cache-aligned hot fields, cached
/// sequence numbers to keep cross-core traffic off the fast path. Safe for
/// exactly one inserting thread and exactly one removing thread at a time.
pub struct SpscQueue<T> {
    // === PRODUCER HOT ===
    /// Tail sequence (written by producer, read by consumer)
    tail: CachePadded<AtomicU64>,
    /// Producer's cached view of head (avoids cross-core reads)
    cached_head: CachePadded<UnsafeCell<u64>>,

    // === CONSUMER HOT ===
    /// Head sequence (written by consumer, read by producer)
    head: CachePadded<AtomicU64>,
    /// Consumer's cached view of tail (avoids cross-core reads)
    cached_tail: CachePadded<UnsafeCell<u64>>,

    // === DATA ===
    /// Fixed-size slot storage. `Box<[T]>` rather than `Vec<T>`: the size
    /// never changes after construction.
    slots: UnsafeCell<Box<[MaybeUninit<T>]>>,
    capacity: usize,
}

// Safety: the sequence protocol above hands each slot to exactly one thread
// at a time, so the queue is Send + Sync whenever the tokens are Send.
unsafe impl<T: Send> Send for SpscQueue<T> {}
unsafe impl<T: Send> Sync for SpscQueue<T> {}

impl<T> SpscQueue<T> {
    /// Creates a queue with `capacity` slots. Capacity must be a power of
    /// two so sequence masking works.
    pub fn new(capacity: usize) -> Self {
        assert!(capacity.is_power_of_two(), "capacity must be a power of two");

        let mut slots = Vec::with_capacity(capacity);
        slots.resize_with(capacity, MaybeUninit::uninit);

        Self {
            tail: CachePadded::new(AtomicU64::new(0)),
            cached_head: CachePadded::new(UnsafeCell::new(0)),
            head: CachePadded::new(AtomicU64::new(0)),
            cached_tail: CachePadded::new(UnsafeCell::new(0)),
            slots: UnsafeCell::new(slots.into_boxed_slice()),
            capacity,
        }
    }

    /// Returns the number of slots.
    #[inline]
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    #[inline]
    fn mask(&self) -> usize {
        self.capacity - 1
    }

    /// Returns the current number of stored tokens. Advisory under
    /// concurrency: both loads are Relaxed.
    #[inline]
    pub fn len(&self) -> usize {
        let tail = self.tail.load(Ordering::Relaxed);
        let head = self.head.load(Ordering::Relaxed);
        tail.wrapping_sub(head) as usize
    }

    /// Returns `true` if the queue holds no tokens.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.tail.load(Ordering::Relaxed) == self.head.load(Ordering::Relaxed)
    }

    /// Non-blocking insert. Returns the token back on a full queue.
    ///
    /// Fast path checks the producer's cached head; the slow path refreshes
    /// it from the shared head only when the cache says full.
    pub fn try_insert(&self, token: T) -> Result<(), T> {
        let tail = self.tail.load(Ordering::Relaxed);

        // SAFETY: cached_head is only written by the producer (this code
        // path). No other thread writes it, so the unsynchronized read is
        // sound.
        let mut head = unsafe { *self.cached_head.get() };

        if tail.wrapping_sub(head) as usize >= self.capacity {
            // Slow path: refresh the cache. The Acquire load synchronizes
            // with the consumer's Release store to head.
            head = self.head.load(Ordering::Acquire);
            // SAFETY: single-writer, as above.
            unsafe {
                *self.cached_head.get() = head;
            }
            if tail.wrapping_sub(head) as usize >= self.capacity {
                return Err(token);
            }
        }

        let idx = (tail as usize) & self.mask();
        // SAFETY: slot `idx` is outside the live range [head, tail) so the
        // consumer does not touch it; only the producer writes between the
        // full-check and the Release store below.
        unsafe {
            let slots = &mut *self.slots.get();
            slots[idx].write(token);
        }

        let new_tail = tail.wrapping_add(1);
        debug_assert_bounded_count!(new_tail.wrapping_sub(head) as usize, self.capacity);
        debug_assert_monotonic!("tail", tail, new_tail);
        self.tail.store(new_tail, Ordering::Release);
        Ok(())
    }

    /// Non-blocking remove. Returns `None` on an empty queue.
    pub fn try_remove(&self) -> Option<T> {
        let head = self.head.load(Ordering::Relaxed);

        // SAFETY: cached_tail is only written by the consumer (this code
        // path), so the unsynchronized read is sound.
        let mut tail = unsafe { *self.cached_tail.get() };

        if head == tail {
            // Slow path: refresh the cache. The Acquire load synchronizes
            // with the producer's Release store to tail.
            tail = self.tail.load(Ordering::Acquire);
            // SAFETY: single-writer, as above.
            unsafe {
                *self.cached_tail.get() = tail;
            }
            if head == tail {
                return None;
            }
        }

        debug_assert_initialized_read!(head, head, tail);

        let idx = (head as usize) & self.mask();
        // SAFETY: slot `idx` is inside [head, tail): the producer fully
        // wrote it before the Release store the Acquire above observed, and
        // the producer will not reuse it until head advances past it.
        // assume_init_read moves the token out; the slot is then logically
        // uninitialized again.
        let token = unsafe {
            let slots = &*self.slots.get();
            slots[idx].assume_init_read()
        };

        let new_head = head.wrapping_add(1);
        debug_assert_monotonic!("head", head, new_head);
        self.head.store(new_head, Ordering::Release);
        Some(token)
    }

    /// Drops all stored tokens.
    ///
    /// Runs on the consumer side of the protocol; callers must guarantee no
    /// concurrent remover, same as for `try_remove`.
    pub fn clear(&self) {
        while self.try_remove().is_some() {}
    }
}

impl<T> Drop for SpscQueue<T> {
    fn drop(&mut self) {
        // Drop every token still in the live range
        let head = self.head.load(Ordering::Relaxed);
        let tail = self.tail.load(Ordering::Relaxed);
        let count = tail.wrapping_sub(head) as usize;

        if count > 0 {
            let mask = self.mask();
            let slots = self.slots.get_mut();
            for i in 0..count {
                let idx = ((head as usize).wrapping_add(i)) & mask;
                // SAFETY: &mut self gives exclusive access; [head, tail) is
                // exactly the initialized range.
                unsafe {
                    ptr::drop_in_place(slots[idx].as_mut_ptr());
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_insert_remove_fifo() {
        let queue = SpscQueue::new(8);
        for i in 0..5u64 {
            queue.try_insert(i).unwrap();
        }
        assert_eq!(queue.len(), 5);
        for i in 0..5u64 {
            assert_eq!(queue.try_remove(), Some(i));
        }
        assert!(queue.is_empty());
        assert_eq!(queue.try_remove(), None);
    }

    #[test]
    fn test_full_returns_token() {
        let queue = SpscQueue::new(4);
        for i in 0..4u64 {
            queue.try_insert(i).unwrap();
        }
        assert_eq!(queue.try_insert(99), Err(99));
        assert_eq!(queue.len(), 4);

        // Freeing one slot makes the insert succeed
        assert_eq!(queue.try_remove(), Some(0));
        queue.try_insert(99).unwrap();
    }

    #[test]
    fn test_wrap_around() {
        let queue = SpscQueue::new(4);
        for round in 0..10u64 {
            for i in 0..4 {
                queue.try_insert(round * 10 + i).unwrap();
            }
            for i in 0..4 {
                assert_eq!(queue.try_remove(), Some(round * 10 + i));
            }
        }
        assert!(queue.is_empty());
    }

    #[test]
    fn test_clear_drops_tokens() {
        use std::sync::atomic::{AtomicUsize, Ordering};

        static DROPS: AtomicUsize = AtomicUsize::new(0);

        #[derive(Debug)]
        struct Tracked;
        impl Drop for Tracked {
            fn drop(&mut self) {
                DROPS.fetch_add(1, Ordering::SeqCst);
            }
        }

        DROPS.store(0, Ordering::SeqCst);
        let queue = SpscQueue::new(8);
        for _ in 0..3 {
            queue.try_insert(Tracked).unwrap();
        }
        queue.clear();
        assert_eq!(DROPS.load(Ordering::SeqCst), 3);
        assert!(queue.is_empty());
    }

    #[test]
    fn test_drop_releases_remaining() {
        use std::sync::atomic::{AtomicUsize, Ordering};

        static DROPS: AtomicUsize = AtomicUsize::new(0);

        #[derive(Debug)]
        struct Tracked;
        impl Drop for Tracked {
            fn drop(&mut self) {
                DROPS.fetch_add(1, Ordering::SeqCst);
            }
        }

        DROPS.store(0, Ordering::SeqCst);
        {
            let queue = SpscQueue::new(8);
            for _ in 0..5 {
                queue.try_insert(Tracked).unwrap();
            }
            let _ = queue.try_remove();
        }
        assert_eq!(DROPS.load(Ordering::SeqCst), 5);
    }

    #[test]
    fn test_threaded_handoff() {
        use std::sync::Arc;
        use std::thread;

        let queue = Arc::new(SpscQueue::new(64));
        let producer_queue = Arc::clone(&queue);

        let producer = thread::spawn(move || {
            let mut next = 0u64;
            while next < 10_000 {
                if producer_queue.try_insert(next).is_ok() {
                    next += 1;
                }
            }
        });

        let mut received = Vec::with_capacity(10_000);
        while received.len() < 10_000 {
            if let Some(v) = queue.try_remove() {
                received.push(v);
            }
        }
        producer.join().unwrap();

        for (i, v) in received.iter().enumerate() {
            assert_eq!(*v, i as u64);
        }
    }
}
