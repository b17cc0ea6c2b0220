// src/kernel/net/stats.rs
//! Dispatcher statistics

use core::sync::atomic::{AtomicU64, Ordering};

/// Packet direction through the dispatcher
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    /// Driver → stack, drained on the worker CPU
    Inbound,
    /// Stack → driver, drained on the origin CPU
    Outbound,
}

/// Live counters, updated from both CPUs
pub(crate) struct Counters {
    inbound_enqueued: AtomicU64,
    outbound_enqueued: AtomicU64,
    inbound_delivered: AtomicU64,
    outbound_delivered: AtomicU64,
    inbound_batches: AtomicU64,
    outbound_batches: AtomicU64,
    schedules: AtomicU64,
    signals: AtomicU64,
    writeq_triggers: AtomicU64,
}

impl Counters {
    pub(crate) const fn new() -> Self {
        Self {
            inbound_enqueued: AtomicU64::new(0),
            outbound_enqueued: AtomicU64::new(0),
            inbound_delivered: AtomicU64::new(0),
            outbound_delivered: AtomicU64::new(0),
            inbound_batches: AtomicU64::new(0),
            outbound_batches: AtomicU64::new(0),
            schedules: AtomicU64::new(0),
            signals: AtomicU64::new(0),
            writeq_triggers: AtomicU64::new(0),
        }
    }

    pub(crate) fn record_enqueue(&self, direction: Direction) {
        let counter = match direction {
            Direction::Inbound => &self.inbound_enqueued,
            Direction::Outbound => &self.outbound_enqueued,
        };
        counter.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_batch(&self, direction: Direction, packets: usize) {
        let (batches, delivered) = match direction {
            Direction::Inbound => (&self.inbound_batches, &self.inbound_delivered),
            Direction::Outbound => (&self.outbound_batches, &self.outbound_delivered),
        };
        batches.fetch_add(1, Ordering::Relaxed);
        delivered.fetch_add(packets as u64, Ordering::Relaxed);
    }

    pub(crate) fn record_schedule(&self, signalled: bool) {
        self.schedules.fetch_add(1, Ordering::Relaxed);
        if signalled {
            self.signals.fetch_add(1, Ordering::Relaxed);
        }
    }

    pub(crate) fn record_writeq_trigger(&self) {
        self.writeq_triggers.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn snapshot(&self, writeq_notifications: u64, writeq_clamped: u64) -> DispatcherStats {
        DispatcherStats {
            inbound_enqueued: self.inbound_enqueued.load(Ordering::Relaxed),
            outbound_enqueued: self.outbound_enqueued.load(Ordering::Relaxed),
            inbound_delivered: self.inbound_delivered.load(Ordering::Relaxed),
            outbound_delivered: self.outbound_delivered.load(Ordering::Relaxed),
            inbound_batches: self.inbound_batches.load(Ordering::Relaxed),
            outbound_batches: self.outbound_batches.load(Ordering::Relaxed),
            schedules: self.schedules.load(Ordering::Relaxed),
            signals: self.signals.load(Ordering::Relaxed),
            writeq_notifications,
            writeq_triggers: self.writeq_triggers.load(Ordering::Relaxed),
            writeq_clamped,
        }
    }
}

/// Dispatcher statistics
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DispatcherStats {
    /// Packets accepted from the driver
    pub inbound_enqueued: u64,
    /// Packets accepted from the stack
    pub outbound_enqueued: u64,
    /// Packets handed to the stack
    pub inbound_delivered: u64,
    /// Packets handed to the driver
    pub outbound_delivered: u64,
    /// Non-empty inbound drains
    pub inbound_batches: u64,
    /// Non-empty outbound drains
    pub outbound_batches: u64,
    /// Deferred work scheduled on a remote CPU
    pub schedules: u64,
    /// Wake signals sent
    pub signals: u64,
    /// Send-queue notifications from the driver
    pub writeq_notifications: u64,
    /// Write backlog runs on the worker CPU
    pub writeq_triggers: u64,
    /// Notifications whose count was clamped
    pub writeq_clamped: u64,
}

impl DispatcherStats {
    /// Packets accepted but not yet handed off, in both directions
    #[must_use]
    pub const fn in_flight(&self) -> u64 {
        // Counters are sampled one at a time while both CPUs run
        self.inbound_enqueued.saturating_sub(self.inbound_delivered)
            + self.outbound_enqueued.saturating_sub(self.outbound_delivered)
    }

    /// Average inbound batch size (x100)
    #[must_use]
    pub const fn avg_inbound_batch_x100(&self) -> u64 {
        if self.inbound_batches == 0 {
            0
        } else {
            self.inbound_delivered * 100 / self.inbound_batches
        }
    }
}
