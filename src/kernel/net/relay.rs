// src/kernel/net/relay.rs
//! Transmit-Queue-Availability Relay
//!
//! The driver reports freed send-queue slots as an unsigned count produced by
//! a subtraction that can wrap. The relay defuses that value and keeps the
//! latest snapshot for the worker core, which feeds it to the stack's own
//! write backlog (`NetStack::process_writeq`), not to the outbound queue.
//!
//! At most one trigger is outstanding: notifications that arrive before the
//! worker runs only refresh the snapshot, whichever substrate carries the
//! trigger.

use core::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};

/// Clamp a possibly-wrapped slot count to zero
///
/// The count is a difference of two unsigned quantities; a negative result
/// shows up with the top bit set and is treated as "no free slots".
#[inline]
#[must_use]
pub const fn clamp_writeq_count(raw: usize) -> usize {
    if (raw as isize) < 0 { 0 } else { raw }
}

/// Latest free-slot snapshot handed from the driver core to the worker core
pub struct WriteqRelay {
    /// Clamped slot count from the most recent notification
    hint: AtomicUsize,
    /// A trigger is scheduled and has not taken the hint yet
    armed: AtomicBool,
    /// Notifications received
    notifications: AtomicU64,
    /// Notifications whose count had wrapped
    clamped: AtomicU64,
}

impl WriteqRelay {
    /// Create a relay with no pending hint
    pub const fn new() -> Self {
        Self {
            hint: AtomicUsize::new(0),
            armed: AtomicBool::new(false),
            notifications: AtomicU64::new(0),
            clamped: AtomicU64::new(0),
        }
    }

    /// Record a driver notification; returns the clamped count
    pub fn publish(&self, raw: usize) -> usize {
        let packets = clamp_writeq_count(raw);
        if packets != raw {
            self.clamped.fetch_add(1, Ordering::Relaxed);
            log::warn!("[NETSMP] write-queue count {:#x} wrapped, clamped to 0", raw);
        }
        self.notifications.fetch_add(1, Ordering::Relaxed);
        self.hint.store(packets, Ordering::SeqCst);
        packets
    }

    /// Claim the trigger after `publish()`
    ///
    /// Returns `true` if no trigger was outstanding, i.e. the caller must
    /// schedule one.
    pub fn arm(&self) -> bool {
        !self.armed.swap(true, Ordering::AcqRel)
    }

    /// Release the trigger and read the snapshot (worker core operation)
    ///
    /// Disarms before reading, so a notification racing with this call
    /// schedules a fresh trigger instead of being lost.
    pub fn take(&self) -> usize {
        self.armed.store(false, Ordering::SeqCst);
        self.hint.load(Ordering::SeqCst)
    }

    /// Slot count the worker core should process now
    #[inline]
    pub fn current(&self) -> usize {
        self.hint.load(Ordering::Acquire)
    }

    /// Notifications received so far
    pub fn notifications(&self) -> u64 {
        self.notifications.load(Ordering::Relaxed)
    }

    /// Notifications that needed clamping
    pub fn clamped(&self) -> u64 {
        self.clamped.load(Ordering::Relaxed)
    }
}

impl Default for WriteqRelay {
    fn default() -> Self {
        Self::new()
    }
}
