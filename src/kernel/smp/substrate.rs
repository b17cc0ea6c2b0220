// src/kernel/smp/substrate.rs
//! Scheduling substrate
//!
//! The dispatcher never runs work on a remote CPU directly. It asks a
//! substrate to mark a pre-registered handler pending on that CPU and, when
//! the CPU had nothing pending yet, rings its doorbell. The CPU's own loop
//! later calls `process()`, which runs every pending handler.

use alloc::sync::Arc;

use super::doorbell::Doorbell;
use crate::errors::SubstrateError;
use crate::kernel::core::types::CpuId;

/// Deferred handler, invoked with the id of the CPU running it
pub type DeferredFn = Arc<dyn Fn(CpuId) + Send + Sync>;

/// Handle of a handler registered on one CPU
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Subscription {
    cpu: CpuId,
    slot: u16,
}

impl Subscription {
    pub(crate) const fn new(cpu: CpuId, slot: u16) -> Self {
        Self { cpu, slot }
    }

    /// CPU the handler runs on
    #[inline]
    pub const fn cpu(self) -> CpuId {
        self.cpu
    }

    /// Slot within that CPU's subscription table
    #[inline]
    pub const fn slot(self) -> usize {
        self.slot as usize
    }
}

/// Per-CPU deferred work with an explicit wake signal
pub trait Substrate: Send + Sync {
    /// Number of CPUs served
    fn cpu_count(&self) -> usize;

    /// Register `handler` to run on `cpu` whenever the returned subscription
    /// is scheduled
    ///
    /// # Errors
    ///
    /// - `SubstrateError::CpuOutOfRange` - `cpu` has no slot
    /// - `SubstrateError::SubscriptionTableFull` - `cpu` has no free slot
    fn subscribe(&self, cpu: CpuId, handler: DeferredFn) -> Result<Subscription, SubstrateError>;

    /// Mark the subscription pending on its CPU
    ///
    /// Returns `true` if the CPU had no deferred work pending before this
    /// call. Only then does the caller need to `signal()` it; otherwise a
    /// wake is already on its way.
    fn schedule(&self, subscription: Subscription) -> bool;

    /// Wake `cpu`
    fn signal(&self, cpu: CpuId) {
        if let Some(doorbell) = self.doorbell(cpu) {
            log::trace!("[SMP] signal CPU {}", cpu);
            doorbell.ring_doorbell();
        }
    }

    /// Run every handler pending on `cpu`; called by that CPU's loop
    ///
    /// Returns the number of handlers run.
    fn process(&self, cpu: CpuId) -> usize;

    /// Check whether `cpu` has deferred work pending
    fn has_pending(&self, cpu: CpuId) -> bool;

    /// Doorbell of `cpu`
    fn doorbell(&self, cpu: CpuId) -> Option<&Doorbell>;
}
