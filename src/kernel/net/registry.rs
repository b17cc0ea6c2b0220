// src/kernel/net/registry.rs
//! Dispatcher registry
//!
//! Keeps at most one dispatcher per (interface, worker CPU) pair.

use alloc::collections::BTreeMap;
use alloc::sync::Arc;
use alloc::vec::Vec;
use spin::Mutex;

use super::dispatcher::Dispatcher;
use crate::config::DispatcherConfig;
use crate::errors::{BindError, Result};
use crate::kernel::core::traits::Inet;
use crate::kernel::core::types::{CpuId, InterfaceId};
use crate::kernel::smp::Substrate;

/// Bound dispatchers keyed by (interface, worker CPU)
pub struct DispatcherRegistry {
    dispatchers: Mutex<BTreeMap<(InterfaceId, CpuId), Arc<Dispatcher>>>,
}

impl DispatcherRegistry {
    /// Create an empty registry
    pub const fn new() -> Self {
        Self {
            dispatchers: Mutex::new(BTreeMap::new()),
        }
    }

    /// Bind a dispatcher unless the pair is already served
    pub fn bind(
        &self,
        config: DispatcherConfig,
        inet: Arc<dyn Inet>,
        substrate: Arc<dyn Substrate>,
    ) -> Result<Arc<Dispatcher>> {
        let key = (config.interface, config.worker_cpu);
        let mut dispatchers = self.dispatchers.lock();
        if dispatchers.contains_key(&key) {
            return Err(BindError::AlreadyBound.into());
        }

        let dispatcher = Dispatcher::bind(config, inet, substrate)?;
        dispatchers.insert(key, Arc::clone(&dispatcher));
        Ok(dispatcher)
    }

    /// Dispatcher serving `interface` on `worker_cpu`
    pub fn get(&self, interface: InterfaceId, worker_cpu: CpuId) -> Option<Arc<Dispatcher>> {
        self.dispatchers.lock().get(&(interface, worker_cpu)).cloned()
    }

    /// Every dispatcher serving `interface`
    pub fn for_interface(&self, interface: InterfaceId) -> Vec<Arc<Dispatcher>> {
        self.dispatchers
            .lock()
            .iter()
            .filter(|((iface, _), _)| *iface == interface)
            .map(|(_, dispatcher)| Arc::clone(dispatcher))
            .collect()
    }

    /// Number of bound dispatchers
    pub fn len(&self) -> usize {
        self.dispatchers.lock().len()
    }

    /// Check if nothing is bound
    pub fn is_empty(&self) -> bool {
        self.dispatchers.lock().is_empty()
    }
}

impl Default for DispatcherRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::NetSmpError;
    use crate::kernel::net::loopback::LoopbackInterface;
    use crate::kernel::smp::EventSubstrate;
    use crate::kernel::core::traits::PacketHooks;

    #[test]
    fn test_duplicate_pair_rejected() {
        let registry = DispatcherRegistry::new();
        let substrate: Arc<dyn Substrate> = Arc::new(EventSubstrate::new(2));
        let config = DispatcherConfig::new(InterfaceId::new(0), CpuId::new(1));

        let first = Arc::new(LoopbackInterface::new(InterfaceId::new(0)));
        registry
            .bind(config, first as Arc<dyn Inet>, Arc::clone(&substrate))
            .unwrap();

        let second = Arc::new(LoopbackInterface::new(InterfaceId::new(0)));
        let err = registry
            .bind(config, Arc::clone(&second) as Arc<dyn Inet>, substrate)
            .err();
        assert_eq!(err, Some(NetSmpError::Bind(BindError::AlreadyBound)));
        assert!(second.installed_hooks().is_empty());
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_lookup() {
        let registry = DispatcherRegistry::new();
        let substrate: Arc<dyn Substrate> = Arc::new(EventSubstrate::new(3));

        for iface in 0..2 {
            let lo = Arc::new(LoopbackInterface::new(InterfaceId::new(iface)));
            registry
                .bind(
                    DispatcherConfig::new(InterfaceId::new(iface), CpuId::new(iface + 1)),
                    lo as Arc<dyn Inet>,
                    Arc::clone(&substrate),
                )
                .unwrap();
        }

        let eth1 = registry.get(InterfaceId::new(1), CpuId::new(2)).unwrap();
        assert_eq!(eth1.worker_cpu(), CpuId::new(2));
        assert!(registry.get(InterfaceId::new(1), CpuId::new(1)).is_none());
        assert_eq!(registry.for_interface(InterfaceId::new(0)).len(), 1);
        assert!(!registry.is_empty());
    }
}
