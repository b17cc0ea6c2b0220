// src/kernel/net/mod.rs
//! Network dispatch layer
//!
//! Batches packets between the driver CPU and the stack's worker CPU.

pub mod batch_queue;
pub mod dispatcher;
pub mod loopback;
pub mod packet;
pub mod registry;
pub mod relay;
pub mod stats;

pub use batch_queue::BatchQueue;
pub use dispatcher::Dispatcher;
pub use loopback::LoopbackInterface;
pub use packet::{Packet, PacketPtr};
pub use registry::DispatcherRegistry;
pub use relay::{WriteqRelay, clamp_writeq_count};
pub use stats::{Direction, DispatcherStats};
