// src/kernel/smp/events.rs
//! Per-CPU Events with Unicast Trigger
//!
//! Each CPU owns a small table of subscribed handlers and a pending bitmap.
//! Triggering an event sets its bit on the target CPU only (unicast); the
//! CPU's loop swaps the bitmap out and runs the handlers whose bits were set.
//!
//! An event that is already pending is not queued twice: repeated triggers
//! before the CPU gets to it coalesce into one handler run.
//!
//! # Pending Bitmap
//!
//! ```text
//! trigger(E2) ──► pending: 0b0100   prev == 0 → ring doorbell
//! trigger(E0) ──► pending: 0b0101   prev != 0 → no ring
//! trigger(E2) ──► pending: 0b0101   already set, coalesced
//! process()   ──► swap(0) = 0b0101 → run E0, E2
//! ```

use alloc::boxed::Box;
use alloc::vec::Vec;
use core::sync::atomic::{AtomicU64, Ordering};
use spin::RwLock;

use super::doorbell::Doorbell;
use super::substrate::{DeferredFn, Subscription, Substrate};
use crate::errors::SubstrateError;
use crate::kernel::core::types::CpuId;

/// Maximum subscribed events per CPU (one bit each in the pending bitmap)
pub const MAX_EVENTS: usize = 64;

/// One CPU's event table
struct CoreEvents {
    /// Subscribed handlers, indexed by event slot
    handlers: RwLock<Vec<DeferredFn>>,
    /// Pending event bits
    pending: AtomicU64,
    /// Wake signal
    doorbell: Doorbell,
}

impl CoreEvents {
    fn new() -> Self {
        Self {
            handlers: RwLock::new(Vec::new()),
            pending: AtomicU64::new(0),
            doorbell: Doorbell::new(),
        }
    }
}

/// Event-based substrate
pub struct EventSubstrate {
    cores: Box<[CoreEvents]>,
}

impl EventSubstrate {
    /// Create event tables for `cpu_count` CPUs
    pub fn new(cpu_count: usize) -> Self {
        log::debug!("[SMP] event substrate for {} CPUs", cpu_count);
        Self {
            cores: (0..cpu_count).map(|_| CoreEvents::new()).collect(),
        }
    }

    fn core(&self, cpu: CpuId) -> Option<&CoreEvents> {
        self.cores.get(cpu.index())
    }

    /// Raise the subscribed event on its CPU
    ///
    /// Returns `true` if no event was pending on that CPU before.
    pub fn trigger_unicast(&self, subscription: Subscription) -> bool {
        let Some(core) = self.core(subscription.cpu()) else {
            return false;
        };
        let bit = 1u64 << subscription.slot();
        let prev = core.pending.fetch_or(bit, Ordering::AcqRel);
        prev == 0
    }

    /// Number of events subscribed on `cpu`
    pub fn subscriptions(&self, cpu: CpuId) -> usize {
        self.core(cpu).map_or(0, |core| core.handlers.read().len())
    }
}

impl Substrate for EventSubstrate {
    fn cpu_count(&self) -> usize {
        self.cores.len()
    }

    fn subscribe(&self, cpu: CpuId, handler: DeferredFn) -> Result<Subscription, SubstrateError> {
        let core = self.core(cpu).ok_or(SubstrateError::CpuOutOfRange)?;
        let mut handlers = core.handlers.write();
        if handlers.len() >= MAX_EVENTS {
            return Err(SubstrateError::SubscriptionTableFull);
        }
        let slot = handlers.len() as u16;
        handlers.push(handler);

        log::debug!("[SMP] CPU {} subscribed event {}", cpu, slot);
        Ok(Subscription::new(cpu, slot))
    }

    fn schedule(&self, subscription: Subscription) -> bool {
        self.trigger_unicast(subscription)
    }

    fn process(&self, cpu: CpuId) -> usize {
        let Some(core) = self.core(cpu) else {
            return 0;
        };

        let mut ran = 0;
        loop {
            let mut bits = core.pending.swap(0, Ordering::AcqRel);
            if bits == 0 {
                break;
            }
            while bits != 0 {
                let slot = bits.trailing_zeros() as usize;
                bits &= bits - 1;

                // Clone out so a handler may subscribe without deadlocking
                let handler = core.handlers.read().get(slot).cloned();
                if let Some(handler) = handler {
                    handler(cpu);
                    ran += 1;
                }
            }
        }
        ran
    }

    fn has_pending(&self, cpu: CpuId) -> bool {
        self.core(cpu)
            .is_some_and(|core| core.pending.load(Ordering::Acquire) != 0)
    }

    fn doorbell(&self, cpu: CpuId) -> Option<&Doorbell> {
        self.core(cpu).map(|core| &core.doorbell)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloc::sync::Arc;
    use core::sync::atomic::AtomicUsize;

    fn counting_handler(counter: &Arc<AtomicUsize>) -> DeferredFn {
        let counter = Arc::clone(counter);
        Arc::new(move |_cpu: CpuId| {
            counter.fetch_add(1, Ordering::SeqCst);
        })
    }

    #[test]
    fn test_trigger_coalesces() {
        let events = EventSubstrate::new(2);
        let runs = Arc::new(AtomicUsize::new(0));
        let sub = events.subscribe(CpuId::new(1), counting_handler(&runs)).unwrap();

        assert!(events.schedule(sub));
        assert!(!events.schedule(sub));
        assert!(events.has_pending(CpuId::new(1)));
        assert!(!events.has_pending(CpuId::BSP));

        assert_eq!(events.process(CpuId::new(1)), 1);
        assert_eq!(runs.load(Ordering::SeqCst), 1);
        assert!(!events.has_pending(CpuId::new(1)));

        assert!(events.schedule(sub));
    }

    #[test]
    fn test_first_is_per_cpu() {
        let events = EventSubstrate::new(2);
        let runs = Arc::new(AtomicUsize::new(0));
        let a = events.subscribe(CpuId::new(1), counting_handler(&runs)).unwrap();
        let b = events.subscribe(CpuId::new(1), counting_handler(&runs)).unwrap();
        let c = events.subscribe(CpuId::BSP, counting_handler(&runs)).unwrap();

        assert!(events.schedule(a));
        assert!(!events.schedule(b));
        assert!(events.schedule(c));

        assert_eq!(events.process(CpuId::new(1)), 2);
        assert_eq!(events.process(CpuId::BSP), 1);
        assert_eq!(runs.load(Ordering::SeqCst), 3);
    }

    #[test]
    fn test_handler_sees_own_cpu() {
        let events = EventSubstrate::new(3);
        let seen = Arc::new(AtomicUsize::new(usize::MAX));
        let observed = Arc::clone(&seen);
        let sub = events
            .subscribe(
                CpuId::new(2),
                Arc::new(move |cpu: CpuId| observed.store(cpu.index(), Ordering::SeqCst)),
            )
            .unwrap();

        events.schedule(sub);
        events.process(CpuId::new(2));
        assert_eq!(seen.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_subscribe_limits() {
        let events = EventSubstrate::new(1);
        let runs = Arc::new(AtomicUsize::new(0));

        assert_eq!(
            events.subscribe(CpuId::new(1), counting_handler(&runs)),
            Err(SubstrateError::CpuOutOfRange)
        );

        for _ in 0..MAX_EVENTS {
            events.subscribe(CpuId::BSP, counting_handler(&runs)).unwrap();
        }
        assert_eq!(events.subscriptions(CpuId::BSP), MAX_EVENTS);
        assert_eq!(
            events.subscribe(CpuId::BSP, counting_handler(&runs)),
            Err(SubstrateError::SubscriptionTableFull)
        );
    }

    #[test]
    fn test_signal_rings_target_only() {
        let events = EventSubstrate::new(2);
        events.signal(CpuId::new(1));

        assert_eq!(events.doorbell(CpuId::new(1)).unwrap().total_rings(), 1);
        assert_eq!(events.doorbell(CpuId::BSP).unwrap().total_rings(), 0);
        assert!(events.doorbell(CpuId::new(5)).is_none());
    }
}
