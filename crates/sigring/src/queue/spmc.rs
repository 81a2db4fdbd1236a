use crossbeam_utils::{Backoff, CachePadded};
use std::cell::UnsafeCell;
use std::mem::MaybeUninit;
use std::ptr;
use std::sync::atomic::{AtomicU64, Ordering};

// =============================================================================
// MEMORY ORDERING & SYNCHRONIZATION STRATEGY
// =============================================================================
//
// Single-producer multi-consumer array queue built on per-slot sequence
// stamps. Every slot carries an AtomicU64 stamp that encodes which lap of
// the ring the slot is in:
//
//   stamp == s            slot is free for the producer's insert at seq s
//   stamp == s + 1        slot holds the token inserted at seq s
//   stamp == s + capacity slot was consumed; free again at seq s + capacity
//
// **Producer (insert path):** reads the stamp with Acquire; when it equals
// the tail sequence the slot is free, so the token is written and published
// by storing `tail + 1` into the stamp with Release. The shared `tail`
// counter is advisory (len only) and stored Relaxed.
//
// **Consumers (remove path):** read the stamp with Acquire; when it equals
// `head + 1` the slot is published, so consumers race a CAS on the shared
// `head`. The winner moves the token out (the Acquire stamp load saw the
// producer's full write) and re-stamps the slot with `head + capacity`
// (Release) to hand it back to the producer for the next lap.
//
// A slot is therefore owned by exactly one thread between any two stamp
// stores, which is what makes the UnsafeCell accesses sound with any number
// of removing threads.
//
// =============================================================================

/// Slot with its lap stamp.
struct Slot<T> {
    stamp: AtomicU64,
    token: UnsafeCell<MaybeUninit<T>>,
}

/// Single-producer multi-consumer array queue.
///
/// Heavier than [`SpscQueue`](super::SpscQueue): every removal is a CAS on
/// the shared head, but any number of threads may remove concurrently.
/// Still exactly one inserting thread at a time.
pub struct SpmcQueue<T> {
    /// Tail sequence (written by the single producer; advisory for `len`)
    tail: CachePadded<AtomicU64>,
    /// Head sequence (CAS target raced by consumers)
    head: CachePadded<AtomicU64>,
    slots: Box<[Slot<T>]>,
    capacity: usize,
}

// Safety: slot ownership is serialized by the stamp protocol above.
unsafe impl<T: Send> Send for SpmcQueue<T> {}
unsafe impl<T: Send> Sync for SpmcQueue<T> {}

impl<T> SpmcQueue<T> {
    /// Creates a queue with `capacity` slots. Capacity must be a power of
    /// two so sequence masking works.
    pub fn new(capacity: usize) -> Self {
        assert!(capacity.is_power_of_two(), "capacity must be a power of two");

        let slots = (0..capacity as u64)
            .map(|seq| Slot {
                stamp: AtomicU64::new(seq),
                token: UnsafeCell::new(MaybeUninit::uninit()),
            })
            .collect::<Vec<_>>()
            .into_boxed_slice();

        Self {
            tail: CachePadded::new(AtomicU64::new(0)),
            head: CachePadded::new(AtomicU64::new(0)),
            slots,
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
        self.len() == 0
    }

    /// Non-blocking insert. Returns the token back on a full queue.
    pub fn try_insert(&self, token: T) -> Result<(), T> {
        let tail = self.tail.load(Ordering::Relaxed);
        let slot = &self.slots[(tail as usize) & self.mask()];
        let backoff = Backoff::new();

        loop {
            let stamp = slot.stamp.load(Ordering::Acquire);
            if stamp == tail {
                // SAFETY: stamp == tail means the slot is free for this lap
                // and no consumer touches it until the Release store below.
                unsafe {
                    (*slot.token.get()).write(token);
                }
                slot.stamp.store(tail.wrapping_add(1), Ordering::Release);
                self.tail.store(tail.wrapping_add(1), Ordering::Relaxed);
                return Ok(());
            }

            // Slot still stamped for the previous lap: either genuinely
            // unconsumed (queue full) or a consumer is between its head CAS
            // and its re-stamp. The head tells the two apart.
            let head = self.head.load(Ordering::Acquire);
            if tail.wrapping_sub(head) as usize >= self.capacity {
                return Err(token);
            }
            // Consumer mid-re-stamp; the flip is a few instructions away.
            backoff.spin();
        }
    }

    /// Non-blocking remove. Returns `None` on an empty queue. Safe to call
    /// from any number of threads concurrently.
    pub fn try_remove(&self) -> Option<T> {
        let backoff = Backoff::new();
        let mut head = self.head.load(Ordering::Relaxed);

        loop {
            let slot = &self.slots[(head as usize) & self.mask()];
            let stamp = slot.stamp.load(Ordering::Acquire);

            if stamp == head.wrapping_add(1) {
                // Published for this lap; race the other consumers for it.
                match self.head.compare_exchange_weak(
                    head,
                    head.wrapping_add(1),
                    Ordering::AcqRel,
                    Ordering::Relaxed,
                ) {
                    Ok(_) => {
                        // SAFETY: winning the CAS grants exclusive ownership
                        // of this slot's token, and the Acquire stamp load
                        // observed the producer's complete write.
                        let token = unsafe { (*slot.token.get()).assume_init_read() };
                        // Hand the slot back to the producer for its next lap.
                        slot.stamp
                            .store(head.wrapping_add(self.capacity as u64), Ordering::Release);
                        return Some(token);
                    }
                    Err(current) => {
                        head = current;
                        backoff.spin();
                    }
                }
            } else if stamp == head {
                // Producer has not published this sequence yet: empty.
                return None;
            } else {
                // Stale head view (another consumer already claimed this
                // slot and re-stamped it). Refresh and retry.
                head = self.head.load(Ordering::Relaxed);
                backoff.spin();
            }
        }
    }

    /// Drops all stored tokens. Safe under the same rules as `try_remove`.
    pub fn clear(&self) {
        while self.try_remove().is_some() {}
    }
}

impl<T> Drop for SpmcQueue<T> {
    fn drop(&mut self) {
        // Drop every token still in the live range
        let head = self.head.load(Ordering::Relaxed);
        let tail = self.tail.load(Ordering::Relaxed);
        let count = tail.wrapping_sub(head) as usize;

        let mask = self.mask();
        for i in 0..count {
            let idx = ((head as usize).wrapping_add(i)) & mask;
            // SAFETY: &mut self gives exclusive access; [head, tail) is
            // exactly the initialized range.
            unsafe {
                ptr::drop_in_place((*self.slots[idx].token.get()).as_mut_ptr());
            }
        }
    }
}
