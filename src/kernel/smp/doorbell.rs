// src/kernel/smp/doorbell.rs
//! Per-CPU Doorbell
//!
//! The wake signal a remote CPU rings after queueing deferred work for this
//! CPU. On hardware the ring is backed by an IPI; the core's event loop either
//! polls the counter or awaits it.
//!
//! # Protocol
//!
//! ```text
//! Producer CPU                          Target CPU
//! ┌──────────────────────┐             ┌──────────────────────────┐
//! │ 1. Queue deferred    │             │                          │
//! │    work              │             │ 3. wait() resolves       │
//! │ 2. ring_doorbell()   │ ──────────► │ 4. check_and_clear()     │
//! │    (only if first)   │             │ 5. Process pending work  │
//! └──────────────────────┘             └──────────────────────────┘
//! ```

use core::future::Future;
use core::sync::atomic::{AtomicU32, AtomicU64, Ordering};
use core::task::Poll;

use futures_util::future::poll_fn;
use futures_util::task::AtomicWaker;

/// Wake signal for one CPU
pub struct Doorbell {
    /// Rings since the last `check_and_clear`
    ring: AtomicU32,

    /// Rings over the doorbell's lifetime
    total: AtomicU64,

    /// Core loop parked in `wait()`
    waker: AtomicWaker,
}

impl Doorbell {
    /// Create a doorbell that has never been rung
    pub const fn new() -> Self {
        Self {
            ring: AtomicU32::new(0),
            total: AtomicU64::new(0),
            waker: AtomicWaker::new(),
        }
    }

    /// Ring the doorbell (producer operation)
    #[inline]
    pub fn ring_doorbell(&self) {
        self.ring.fetch_add(1, Ordering::Release);
        self.total.fetch_add(1, Ordering::Relaxed);
        self.waker.wake();
    }

    /// Read and clear the ring counter (target CPU operation)
    ///
    /// Returns the number of rings since the last check.
    #[inline]
    pub fn check_and_clear(&self) -> u32 {
        self.ring.swap(0, Ordering::AcqRel)
    }

    /// Peek at the ring counter without clearing it
    #[inline]
    pub fn peek(&self) -> u32 {
        self.ring.load(Ordering::Acquire)
    }

    /// Lifetime ring count
    #[inline]
    pub fn total_rings(&self) -> u64 {
        self.total.load(Ordering::Relaxed)
    }

    /// Wait until the doorbell is rung
    ///
    /// Resolves with the number of rings consumed.
    pub fn wait(&self) -> impl Future<Output = u32> + '_ {
        poll_fn(move |cx| {
            let rings = self.check_and_clear();
            if rings > 0 {
                return Poll::Ready(rings);
            }

            self.waker.register(cx.waker());

            // A ring between the first check and register() must not be lost
            match self.check_and_clear() {
                0 => Poll::Pending,
                rings => Poll::Ready(rings),
            }
        })
    }
}

impl Default for Doorbell {
    fn default() -> Self {
        Self::new()
    }
}
