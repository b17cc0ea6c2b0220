// src/kernel/net/batch_queue.rs
//! Batching Queue
//!
//! Spinlock-guarded FIFO that collects a burst of items produced on one core
//! until a deferred drain on another core takes them all at once.
//!
//! # Burst Lifecycle
//!
//! ```text
//! EMPTY ──enqueue──► FILLING ──drain scheduled──► DRAINING ──grab_queue──► EMPTY
//!   ▲                   │                              │
//!   │                   └── enqueue (returns false) ◄──┘
//!   └── enqueue on EMPTY returns true: caller schedules the drain
//! ```
//!
//! The lock is held only for a push or a swap, so producers never wait on
//! the consumer's processing of a batch.

use alloc::vec::Vec;
use spin::Mutex;

/// Ownership-transferring FIFO with first-of-burst detection
pub struct BatchQueue<T> {
    /// Current burst
    queue: Mutex<Vec<T>>,
    /// Capacity reserved when a new burst starts
    reserve: usize,
}

impl<T> BatchQueue<T> {
    /// Create an empty queue without a capacity hint
    pub const fn new() -> Self {
        Self::with_reserve(0)
    }

    /// Create an empty queue that pre-sizes each new burst
    pub const fn with_reserve(reserve: usize) -> Self {
        Self {
            queue: Mutex::new(Vec::new()),
            reserve,
        }
    }

    /// Append an item, taking ownership of it
    ///
    /// Returns `true` if the queue was empty before this call, i.e. this
    /// item starts a new burst and the caller is responsible for scheduling
    /// a drain.
    pub fn enqueue(&self, item: T) -> bool {
        let mut queue = self.queue.lock();
        let first = queue.is_empty();
        if first && self.reserve > 0 {
            queue.reserve(self.reserve);
        }
        queue.push(item);
        first
    }

    /// Atomically take every queued item, leaving the queue empty
    ///
    /// Items enqueued after the swap land in the next burst.
    pub fn grab_queue(&self) -> Vec<T> {
        core::mem::take(&mut *self.queue.lock())
    }

    /// Number of queued items
    pub fn len(&self) -> usize {
        self.queue.lock().len()
    }

    /// Check if the queue is empty
    pub fn is_empty(&self) -> bool {
        self.queue.lock().is_empty()
    }

    /// Capacity reserved at the start of each burst
    #[inline]
    pub const fn reserve_hint(&self) -> usize {
        self.reserve
    }
}

impl<T> Default for BatchQueue<T> {
    fn default() -> Self {
        Self::new()
    }
}
