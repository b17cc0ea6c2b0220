// src/service.rs
//! Service bring-up
//!
//! Builds the configured substrate, binds the interface's dispatcher on its
//! worker CPU and hands out per-core runners to the embedding kernel.

use alloc::sync::Arc;
use core::fmt;

use crate::config::ServiceConfig;
use crate::errors::Result;
use crate::kernel::core::traits::Inet;
use crate::kernel::core::types::CpuId;
use crate::kernel::net::{Dispatcher, DispatcherRegistry};
use crate::kernel::smp::{CoreRunner, Substrate, substrate_for};

/// Running dispatch service
pub struct Service {
    config: ServiceConfig,
    substrate: Arc<dyn Substrate>,
    registry: DispatcherRegistry,
}

impl Service {
    /// Validate the configuration and build the substrate
    pub fn new(config: ServiceConfig) -> Result<Self> {
        config.validate()?;
        let substrate = substrate_for(config.substrate, &config.smp)?;
        Ok(Self {
            config,
            substrate,
            registry: DispatcherRegistry::new(),
        })
    }

    /// Bind the configured dispatcher to `inet`
    pub fn start(&self, inet: Arc<dyn Inet>) -> Result<Arc<Dispatcher>> {
        let dispatcher = self
            .registry
            .bind(self.config.dispatcher, inet, Arc::clone(&self.substrate))?;
        log::info!(
            "[SERVICE] {} CPUs, {:?} substrate, {} on CPU {}",
            self.config.smp.cpu_count,
            self.config.substrate,
            dispatcher.interface(),
            dispatcher.worker_cpu()
        );
        Ok(dispatcher)
    }

    /// Event loop for `cpu`
    pub fn runner(&self, cpu: CpuId) -> Result<CoreRunner> {
        Ok(CoreRunner::new(Arc::clone(&self.substrate), cpu)?)
    }

    /// Shared substrate
    pub fn substrate(&self) -> &Arc<dyn Substrate> {
        &self.substrate
    }

    /// Bound dispatchers
    pub fn registry(&self) -> &DispatcherRegistry {
        &self.registry
    }

    /// Active configuration
    pub fn config(&self) -> &ServiceConfig {
        &self.config
    }
}

const NANOS_PER_SEC: u64 = 1_000_000_000;

/// Byte counter for one connection
///
/// Timestamps come from the caller's clock, in nanoseconds.
#[derive(Debug, Clone, Copy, Default)]
pub struct ThroughputMeter {
    bytes: u64,
    started_ns: Option<u64>,
}

impl ThroughputMeter {
    /// Create an idle meter
    pub const fn new() -> Self {
        Self {
            bytes: 0,
            started_ns: None,
        }
    }

    /// Start timing at `now_ns` if not already started
    pub fn start(&mut self, now_ns: u64) {
        if self.started_ns.is_none() {
            self.started_ns = Some(now_ns);
        }
    }

    /// Count `bytes` received at `now_ns`
    pub fn record(&mut self, bytes: usize, now_ns: u64) {
        self.start(now_ns);
        self.bytes = self.bytes.saturating_add(bytes as u64);
    }

    /// Bytes counted so far
    pub fn bytes(&self) -> u64 {
        self.bytes
    }

    /// Throughput up to `now_ns`
    pub fn report(&self, now_ns: u64) -> ThroughputReport {
        let elapsed_ns = self
            .started_ns
            .map_or(0, |start| now_ns.saturating_sub(start));
        ThroughputReport::new(self.bytes, elapsed_ns)
    }

    /// Log the throughput as seen on `cpu` and reset the counter
    pub fn finish(&mut self, cpu: CpuId, now_ns: u64) -> ThroughputReport {
        let report = self.report(now_ns);
        log::info!("[SERVICE] CPU {}: {}", cpu, report);
        *self = Self::new();
        report
    }
}

/// Throughput summary
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ThroughputReport {
    /// Bytes transferred
    pub bytes: u64,
    /// Elapsed time
    pub elapsed_ns: u64,
}

impl ThroughputReport {
    /// Summarise `bytes` transferred over `elapsed_ns`
    pub const fn new(bytes: u64, elapsed_ns: u64) -> Self {
        Self { bytes, elapsed_ns }
    }

    /// Elapsed seconds
    pub fn secs(&self) -> f64 {
        self.elapsed_ns as f64 / NANOS_PER_SEC as f64
    }

    /// Megabytes (2^20 bytes) per second; zero when no time elapsed
    pub fn mbytes_per_sec(&self) -> f64 {
        if self.elapsed_ns == 0 {
            return 0.0;
        }
        self.bytes as f64 / (1024.0 * 1024.0) / self.secs()
    }

    /// Megabits per second, on the same 2^20 base as `mbytes_per_sec`
    pub fn mbits_per_sec(&self) -> f64 {
        self.mbytes_per_sec() * 8.0
    }
}

impl fmt::Display for ThroughputReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} bytes in {:.3} s ({:.2} MB/s, {:.2} Mbit/s)",
            self.bytes,
            self.secs(),
            self.mbytes_per_sec(),
            self.mbits_per_sec()
        )
    }
}
