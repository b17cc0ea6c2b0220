// src/kernel/smp/mod.rs
//! SMP scheduling substrate
//!
//! Deferred per-CPU work, wake signals and the per-core loop.

pub mod doorbell;
pub mod events;
pub mod runner;
pub mod substrate;
pub mod task_queue;

pub use doorbell::Doorbell;
pub use events::EventSubstrate;
pub use runner::{CoreRunner, RunnerState, RunnerStats};
pub use substrate::{DeferredFn, Subscription, Substrate};
pub use task_queue::TaskQueueSubstrate;

use alloc::sync::Arc;

use crate::config::{SmpConfig, SubstrateKind};
use crate::errors::Result;

/// Build the configured substrate for a topology
pub fn substrate_for(kind: SubstrateKind, smp: &SmpConfig) -> Result<Arc<dyn Substrate>> {
    smp.validate()?;
    let substrate: Arc<dyn Substrate> = match kind {
        SubstrateKind::Events => Arc::new(EventSubstrate::new(smp.cpu_count)),
        SubstrateKind::TaskQueue => Arc::new(TaskQueueSubstrate::new(smp.cpu_count)),
    };
    Ok(substrate)
}
