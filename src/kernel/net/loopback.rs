// src/kernel/net/loopback.rs
//! Software interface
//!
//! Implements both sides the dispatcher binds to: the driver's hook points
//! and the stack's entry points. Frames "from the wire" and frames "from the
//! stack" go through the installed hooks, or straight to the stack on the
//! calling CPU when no hook is installed. Whatever reaches the stack or the
//! driver is recorded for inspection.

use alloc::vec::Vec;
use crossbeam_queue::SegQueue;
use spin::Mutex;

use super::packet::PacketPtr;
use super::relay::clamp_writeq_count;
use crate::kernel::core::traits::{Hooks, NetStack, PacketHandler, PacketHooks, WriteqHandler};
use crate::kernel::core::types::InterfaceId;

/// Loopback interface
pub struct LoopbackInterface {
    id: InterfaceId,
    inbound_hook: Mutex<Option<PacketHandler>>,
    outbound_hook: Mutex<Option<PacketHandler>>,
    writeq_hook: Mutex<Option<WriteqHandler>>,
    /// Packets handed to the stack
    received: SegQueue<PacketPtr>,
    /// Packets handed to the driver
    transmitted: SegQueue<PacketPtr>,
    /// Write backlog runs, by slot count
    writeq_calls: SegQueue<usize>,
}

impl LoopbackInterface {
    /// Create an interface with no hooks installed
    pub fn new(id: InterfaceId) -> Self {
        Self {
            id,
            inbound_hook: Mutex::new(None),
            outbound_hook: Mutex::new(None),
            writeq_hook: Mutex::new(None),
            received: SegQueue::new(),
            transmitted: SegQueue::new(),
            writeq_calls: SegQueue::new(),
        }
    }

    /// Interface id
    #[inline]
    pub fn id(&self) -> InterfaceId {
        self.id
    }

    /// Driver side: a frame arrived
    pub fn deliver_from_wire(&self, packet: PacketPtr) {
        let hook = self.inbound_hook.lock().clone();
        match hook {
            Some(hook) => hook(packet),
            None => self.receive(packet),
        }
    }

    /// Stack side: a frame is ready to send
    pub fn send_from_stack(&self, packet: PacketPtr) {
        let hook = self.outbound_hook.lock().clone();
        match hook {
            Some(hook) => hook(packet),
            None => self.transmit(packet),
        }
    }

    /// Driver side: send-queue slots were freed
    pub fn notify_writeq(&self, raw: usize) {
        let hook = self.writeq_hook.lock().clone();
        match hook {
            Some(hook) => hook(raw),
            None => self.process_writeq(clamp_writeq_count(raw)),
        }
    }

    /// Take every packet the stack received so far, in arrival order
    pub fn take_received(&self) -> Vec<PacketPtr> {
        drain(&self.received)
    }

    /// Take every packet the driver transmitted so far, in order
    pub fn take_transmitted(&self) -> Vec<PacketPtr> {
        drain(&self.transmitted)
    }

    /// Take the slot counts of every write backlog run so far
    pub fn take_writeq_calls(&self) -> Vec<usize> {
        drain(&self.writeq_calls)
    }

    /// Packets received and not yet taken
    pub fn received_len(&self) -> usize {
        self.received.len()
    }

    /// Packets transmitted and not yet taken
    pub fn transmitted_len(&self) -> usize {
        self.transmitted.len()
    }
}

fn drain<T>(queue: &SegQueue<T>) -> Vec<T> {
    let mut out = Vec::with_capacity(queue.len());
    while let Some(item) = queue.pop() {
        out.push(item);
    }
    out
}

impl PacketHooks for LoopbackInterface {
    fn on_inbound(&self, handler: PacketHandler) {
        *self.inbound_hook.lock() = Some(handler);
    }

    fn on_outbound(&self, handler: PacketHandler) {
        *self.outbound_hook.lock() = Some(handler);
    }

    fn on_writeq_available(&self, handler: WriteqHandler) {
        *self.writeq_hook.lock() = Some(handler);
    }

    fn installed_hooks(&self) -> Hooks {
        let mut hooks = Hooks::empty();
        hooks.set(Hooks::INBOUND, self.inbound_hook.lock().is_some());
        hooks.set(Hooks::OUTBOUND, self.outbound_hook.lock().is_some());
        hooks.set(Hooks::WRITEQ, self.writeq_hook.lock().is_some());
        hooks
    }
}

impl NetStack for LoopbackInterface {
    fn receive(&self, packet: PacketPtr) {
        self.received.push(packet);
    }

    fn transmit(&self, packet: PacketPtr) {
        self.transmitted.push(packet);
    }

    fn process_writeq(&self, packets: usize) {
        self.writeq_calls.push(packets);
    }
}
