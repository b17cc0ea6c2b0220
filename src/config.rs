// src/config.rs
//! Topology and dispatcher configuration

use crate::errors::ConfigError;
use crate::kernel::core::types::{CpuId, InterfaceId};

/// Upper bound on CPUs a substrate is sized for
pub const MAX_CPUS: usize = 256;

/// Default capacity reserved per inbound burst
pub const DEFAULT_INBOUND_RESERVE: usize = 256;

/// Default capacity reserved per outbound burst
pub const DEFAULT_OUTBOUND_RESERVE: usize = 64;

/// SMP topology
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SmpConfig {
    /// Number of CPUs brought up
    pub cpu_count: usize,
    /// Boot CPU
    pub bsp: CpuId,
}

impl SmpConfig {
    /// Topology with `cpu_count` CPUs booted from CPU 0
    pub const fn new(cpu_count: usize) -> Self {
        Self {
            cpu_count,
            bsp: CpuId::BSP,
        }
    }

    /// Check whether `cpu` is part of the topology
    #[inline]
    pub const fn contains(&self, cpu: CpuId) -> bool {
        cpu.index() < self.cpu_count
    }

    /// Validate the topology
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.cpu_count == 0 {
            return Err(ConfigError::NoCpus);
        }
        if self.cpu_count > MAX_CPUS {
            return Err(ConfigError::TooManyCpus);
        }
        if !self.contains(self.bsp) {
            return Err(ConfigError::BspOutOfRange);
        }
        Ok(())
    }
}

impl Default for SmpConfig {
    fn default() -> Self {
        Self::new(2)
    }
}

/// Placement of one interface's dispatcher
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DispatcherConfig {
    /// Interface served
    pub interface: InterfaceId,
    /// CPU running the inbound path and the write backlog
    pub worker_cpu: CpuId,
    /// CPU owning the driver; runs the outbound path
    pub origin_cpu: CpuId,
    /// Capacity reserved at the start of each inbound burst
    pub inbound_reserve: usize,
    /// Capacity reserved at the start of each outbound burst
    pub outbound_reserve: usize,
}

impl DispatcherConfig {
    /// Serve `interface` on `worker_cpu`, with the driver on the boot CPU
    pub const fn new(interface: InterfaceId, worker_cpu: CpuId) -> Self {
        Self {
            interface,
            worker_cpu,
            origin_cpu: CpuId::BSP,
            inbound_reserve: DEFAULT_INBOUND_RESERVE,
            outbound_reserve: DEFAULT_OUTBOUND_RESERVE,
        }
    }

    /// Override the driver CPU
    pub const fn with_origin(mut self, origin_cpu: CpuId) -> Self {
        self.origin_cpu = origin_cpu;
        self
    }

    /// Override the per-burst reserves
    pub const fn with_reserves(mut self, inbound: usize, outbound: usize) -> Self {
        self.inbound_reserve = inbound;
        self.outbound_reserve = outbound;
        self
    }

    /// Validate the placement against a topology
    ///
    /// A worker equal to the origin is accepted: every hop then lands on the
    /// same CPU, which still works but gains nothing.
    pub fn validate(&self, smp: &SmpConfig) -> Result<(), ConfigError> {
        if !smp.contains(self.worker_cpu) {
            return Err(ConfigError::WorkerOutOfRange);
        }
        if !smp.contains(self.origin_cpu) {
            return Err(ConfigError::OriginOutOfRange);
        }
        if self.worker_cpu == self.origin_cpu {
            log::warn!(
                "[NETSMP] {} worker CPU {} is also the origin CPU",
                self.interface,
                self.worker_cpu
            );
        }
        Ok(())
    }
}

impl Default for DispatcherConfig {
    fn default() -> Self {
        Self::new(InterfaceId::new(0), CpuId::new(1))
    }
}

/// Scheduling substrate implementation
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SubstrateKind {
    /// Per-CPU events with unicast trigger
    #[default]
    Events,
    /// Per-CPU deferred task queue
    TaskQueue,
}

/// Service configuration
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ServiceConfig {
    /// Topology
    pub smp: SmpConfig,
    /// Dispatcher placement
    pub dispatcher: DispatcherConfig,
    /// Substrate to build
    pub substrate: SubstrateKind,
}

impl ServiceConfig {
    /// Validate the whole configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.smp.validate()?;
        self.dispatcher.validate(&self.smp)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = ServiceConfig::default();
        assert_eq!(config.smp.cpu_count, 2);
        assert_eq!(config.dispatcher.interface, InterfaceId::new(0));
        assert_eq!(config.dispatcher.worker_cpu, CpuId::new(1));
        assert_eq!(config.dispatcher.origin_cpu, CpuId::BSP);
        assert!(config.dispatcher.inbound_reserve > config.dispatcher.outbound_reserve);
        assert_eq!(config.substrate, SubstrateKind::Events);
        assert_eq!(config.validate(), Ok(()));
    }

    #[test]
    fn test_smp_validation() {
        assert_eq!(SmpConfig::new(0).validate(), Err(ConfigError::NoCpus));
        assert_eq!(SmpConfig::new(MAX_CPUS + 1).validate(), Err(ConfigError::TooManyCpus));

        let mut smp = SmpConfig::new(4);
        smp.bsp = CpuId::new(4);
        assert_eq!(smp.validate(), Err(ConfigError::BspOutOfRange));
    }

    #[test]
    fn test_dispatcher_validation() {
        let smp = SmpConfig::new(2);
        let config = DispatcherConfig::new(InterfaceId::new(0), CpuId::new(2));
        assert_eq!(config.validate(&smp), Err(ConfigError::WorkerOutOfRange));

        let config = DispatcherConfig::new(InterfaceId::new(0), CpuId::new(1))
            .with_origin(CpuId::new(3));
        assert_eq!(config.validate(&smp), Err(ConfigError::OriginOutOfRange));

        let single = DispatcherConfig::new(InterfaceId::new(0), CpuId::BSP);
        assert_eq!(single.validate(&SmpConfig::new(1)), Ok(()));
    }
}
