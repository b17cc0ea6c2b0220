// src/kernel/net/dispatcher.rs
//! Cross-Core Dispatcher
//!
//! Moves one interface's traffic between the boot CPU, which owns the
//! driver, and a worker CPU, which runs the stack's receive path:
//!
//! ```text
//!   origin CPU (driver)                        worker CPU (stack)
//!  ┌────────────────────┐   inbound queue    ┌────────────────────┐
//!  │ on_inbound hook    │ ─────────────────► │ drain → receive()  │
//!  │                    │                    │                    │
//!  │ drain → transmit() │ ◄───────────────── │ on_outbound hook   │
//!  │                    │   outbound queue   │                    │
//!  │ on_writeq hook     │ ─── relay hint ──► │ process_writeq(n)  │
//!  └────────────────────┘                    └────────────────────┘
//! ```
//!
//! # Wake-up Protocol
//!
//! A packet only causes scheduling when it starts a burst (its queue was
//! empty), and scheduling only causes a wake when the target CPU had no
//! deferred work pending. A burst of N packets therefore costs one
//! scheduling and at most one wake, and the drain delivers all N.
//!
//! A packet enqueued after the drain has swapped the queue out starts the
//! next burst, which schedules a fresh drain, so nothing is stranded.

use alloc::sync::{Arc, Weak};

use super::batch_queue::BatchQueue;
use super::packet::PacketPtr;
use super::relay::WriteqRelay;
use super::stats::{Counters, Direction, DispatcherStats};
use crate::config::{DispatcherConfig, SmpConfig};
use crate::errors::{BindError, Result};
use crate::kernel::core::traits::{Hooks, Inet};
use crate::kernel::core::types::{CpuId, InterfaceId};
use crate::kernel::smp::{Subscription, Substrate};

/// State shared with the deferred handlers on both CPUs
struct Shared {
    interface: InterfaceId,
    worker_cpu: CpuId,
    origin_cpu: CpuId,
    inet: Arc<dyn Inet>,
    inbound: BatchQueue<PacketPtr>,
    outbound: BatchQueue<PacketPtr>,
    writeq: WriteqRelay,
    counters: Counters,
}

impl Shared {
    /// Deferred on the worker CPU
    fn drain_inbound(&self, cpu: CpuId) {
        debug_assert_eq!(cpu, self.worker_cpu);
        let batch = self.inbound.grab_queue();
        if batch.is_empty() {
            return;
        }

        log::debug!("[NETSMP] {} CPU {} receive batch of {}", self.interface, cpu, batch.len());
        self.counters.record_batch(Direction::Inbound, batch.len());
        for packet in batch {
            self.inet.receive(packet);
        }
    }

    /// Deferred on the origin CPU
    fn drain_outbound(&self, cpu: CpuId) {
        debug_assert_eq!(cpu, self.origin_cpu);
        let batch = self.outbound.grab_queue();
        if batch.is_empty() {
            return;
        }

        log::debug!("[NETSMP] {} CPU {} transmit batch of {}", self.interface, cpu, batch.len());
        self.counters.record_batch(Direction::Outbound, batch.len());
        for packet in batch {
            self.inet.transmit(packet);
        }
    }

    /// Deferred on the worker CPU
    fn process_writeq(&self, cpu: CpuId) {
        assert_eq!(
            cpu, self.worker_cpu,
            "write backlog for {} must run on its worker CPU",
            self.interface
        );
        self.counters.record_writeq_trigger();
        self.inet.process_writeq(self.writeq.take());
    }
}

/// Per-interface, per-worker-CPU dispatcher
///
/// Bound for the life of the interface. Dropping it does not unbind: the
/// interface keeps its hooks (which then discard traffic) and the substrate
/// keeps the deferred handlers.
pub struct Dispatcher {
    shared: Arc<Shared>,
    substrate: Arc<dyn Substrate>,
    inbound_drain: Subscription,
    outbound_drain: Subscription,
    writeq_trigger: Subscription,
}

impl Dispatcher {
    /// Create a dispatcher and claim the interface's packet hooks
    ///
    /// # Errors
    ///
    /// - `ConfigError::WorkerOutOfRange` / `OriginOutOfRange` - CPU unknown
    ///   to the substrate
    /// - `BindError::HooksClaimed` - another sink already owns the hooks
    /// - `SubstrateError` - a deferred handler could not be subscribed
    pub fn bind(
        config: DispatcherConfig,
        inet: Arc<dyn Inet>,
        substrate: Arc<dyn Substrate>,
    ) -> Result<Arc<Self>> {
        config.validate(&SmpConfig::new(substrate.cpu_count()))?;
        if inet.installed_hooks().intersects(Hooks::all()) {
            return Err(BindError::HooksClaimed.into());
        }

        let shared = Arc::new(Shared {
            interface: config.interface,
            worker_cpu: config.worker_cpu,
            origin_cpu: config.origin_cpu,
            inet: Arc::clone(&inet),
            inbound: BatchQueue::with_reserve(config.inbound_reserve),
            outbound: BatchQueue::with_reserve(config.outbound_reserve),
            writeq: WriteqRelay::new(),
            counters: Counters::new(),
        });

        let inbound_drain = {
            let shared = Arc::clone(&shared);
            substrate.subscribe(config.worker_cpu, Arc::new(move |cpu: CpuId| shared.drain_inbound(cpu)))?
        };
        let outbound_drain = {
            let shared = Arc::clone(&shared);
            substrate.subscribe(config.origin_cpu, Arc::new(move |cpu: CpuId| shared.drain_outbound(cpu)))?
        };
        let writeq_trigger = {
            let shared = Arc::clone(&shared);
            substrate.subscribe(config.worker_cpu, Arc::new(move |cpu: CpuId| shared.process_writeq(cpu)))?
        };

        let dispatcher = Arc::new(Self {
            shared,
            substrate,
            inbound_drain,
            outbound_drain,
            writeq_trigger,
        });
        dispatcher.install_hooks(inet.as_ref());

        log::info!(
            "[NETSMP] {} bound: worker CPU {}, origin CPU {}",
            config.interface,
            config.worker_cpu,
            config.origin_cpu
        );
        Ok(dispatcher)
    }

    fn install_hooks(self: &Arc<Self>, inet: &dyn Inet) {
        let interface = self.shared.interface;

        let weak = Arc::downgrade(self);
        inet.on_inbound(Arc::new(move |packet: PacketPtr| match Weak::upgrade(&weak) {
            Some(dispatcher) => dispatcher.handle_inbound(packet),
            None => log::warn!("[NETSMP] {} inbound packet discarded, dispatcher dropped", interface),
        }));

        let weak = Arc::downgrade(self);
        inet.on_outbound(Arc::new(move |packet: PacketPtr| match Weak::upgrade(&weak) {
            Some(dispatcher) => dispatcher.handle_outbound(packet),
            None => log::warn!("[NETSMP] {} outbound packet discarded, dispatcher dropped", interface),
        }));

        let weak = Arc::downgrade(self);
        inet.on_writeq_available(Arc::new(move |raw: usize| match Weak::upgrade(&weak) {
            Some(dispatcher) => dispatcher.handle_writeq_available(raw),
            None => log::warn!("[NETSMP] {} write-queue notification discarded, dispatcher dropped", interface),
        }));
    }

    /// Driver → stack; called on the origin CPU
    pub fn handle_inbound(&self, packet: PacketPtr) {
        log::trace!("[NETSMP] {} inbound {} bytes", self.shared.interface, packet.size());
        self.shared.counters.record_enqueue(Direction::Inbound);
        if self.shared.inbound.enqueue(packet) {
            self.kick(self.inbound_drain);
        }
    }

    /// Stack → driver; called on the worker CPU
    pub fn handle_outbound(&self, packet: PacketPtr) {
        log::trace!("[NETSMP] {} outbound {} bytes", self.shared.interface, packet.size());
        self.shared.counters.record_enqueue(Direction::Outbound);
        if self.shared.outbound.enqueue(packet) {
            self.kick(self.outbound_drain);
        }
    }

    /// Driver reports freed send-queue slots; `raw` may have wrapped
    ///
    /// Notifications arriving while a trigger is outstanding only refresh
    /// the count it will read.
    pub fn handle_writeq_available(&self, raw: usize) {
        self.shared.writeq.publish(raw);
        if self.shared.writeq.arm() {
            self.kick(self.writeq_trigger);
        }
    }

    /// Schedule deferred work, waking its CPU only if it was idle
    fn kick(&self, subscription: Subscription) {
        let first = self.substrate.schedule(subscription);
        if first {
            self.substrate.signal(subscription.cpu());
        }
        self.shared.counters.record_schedule(first);
    }

    /// Interface served
    #[inline]
    pub fn interface(&self) -> InterfaceId {
        self.shared.interface
    }

    /// CPU running the receive path
    #[inline]
    pub fn worker_cpu(&self) -> CpuId {
        self.shared.worker_cpu
    }

    /// CPU owning the driver
    #[inline]
    pub fn origin_cpu(&self) -> CpuId {
        self.shared.origin_cpu
    }

    /// Inbound packets waiting for a drain
    pub fn pending_inbound(&self) -> usize {
        self.shared.inbound.len()
    }

    /// Outbound packets waiting for a drain
    pub fn pending_outbound(&self) -> usize {
        self.shared.outbound.len()
    }

    /// Statistics snapshot
    pub fn stats(&self) -> DispatcherStats {
        self.shared
            .counters
            .snapshot(self.shared.writeq.notifications(), self.shared.writeq.clamped())
    }
}
