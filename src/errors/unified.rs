// src/errors/unified.rs

//! Unified error types for the dispatch layer
//!
//! Nothing on the packet hot path can fail. These errors only surface while
//! wiring things together: validating the topology, subscribing deferred
//! handlers on a core, and binding a dispatcher to an interface.

use core::fmt;

/// Top-level error type
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NetSmpError {
    /// Configuration rejected
    Config(ConfigError),
    /// Scheduling substrate error
    Substrate(SubstrateError),
    /// Dispatcher binding error
    Bind(BindError),
}

impl fmt::Display for NetSmpError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Config(e) => write!(f, "Config error: {e}"),
            Self::Substrate(e) => write!(f, "Substrate error: {e}"),
            Self::Bind(e) => write!(f, "Bind error: {e}"),
        }
    }
}

/// Configuration errors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigError {
    /// Topology declares zero CPUs
    NoCpus,
    /// Topology declares more CPUs than supported
    TooManyCpus,
    /// Boot CPU is not part of the topology
    BspOutOfRange,
    /// Worker CPU is not part of the topology
    WorkerOutOfRange,
    /// Origin CPU is not part of the topology
    OriginOutOfRange,
}

impl ConfigError {
    /// Returns a string representation of the configuration error.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::NoCpus => "no CPUs",
            Self::TooManyCpus => "too many CPUs",
            Self::BspOutOfRange => "boot CPU out of range",
            Self::WorkerOutOfRange => "worker CPU out of range",
            Self::OriginOutOfRange => "origin CPU out of range",
        }
    }
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<ConfigError> for NetSmpError {
    fn from(err: ConfigError) -> Self {
        Self::Config(err)
    }
}

/// Scheduling substrate errors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubstrateError {
    /// CPU id has no per-core slot in the substrate
    CpuOutOfRange,
    /// No free subscription slot left on the CPU
    SubscriptionTableFull,
}

impl SubstrateError {
    /// Returns a string representation of the substrate error.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::CpuOutOfRange => "CPU out of range",
            Self::SubscriptionTableFull => "subscription table full",
        }
    }
}

impl fmt::Display for SubstrateError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<SubstrateError> for NetSmpError {
    fn from(err: SubstrateError) -> Self {
        Self::Substrate(err)
    }
}

/// Dispatcher binding errors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BindError {
    /// A dispatcher already serves this (interface, worker CPU) pair
    AlreadyBound,
    /// The interface's packet hooks are already installed
    HooksClaimed,
}

impl BindError {
    /// Returns a string representation of the binding error.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::AlreadyBound => "already bound",
            Self::HooksClaimed => "hooks already claimed",
        }
    }
}

impl fmt::Display for BindError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<BindError> for NetSmpError {
    fn from(err: BindError) -> Self {
        Self::Bind(err)
    }
}

/// Result type alias for dispatch-layer operations
pub type Result<T> = core::result::Result<T, NetSmpError>;

/// Helper trait for error context
pub trait ErrorContext {
    /// Get a detailed description of the error
    fn context(&self) -> &'static str;
}

impl ErrorContext for NetSmpError {
    fn context(&self) -> &'static str {
        match self {
            Self::Config(_) => "Error occurred while validating the configuration",
            Self::Substrate(_) => "Error occurred in the scheduling substrate",
            Self::Bind(_) => "Error occurred while binding a dispatcher",
        }
    }
}

impl ErrorContext for ConfigError {
    fn context(&self) -> &'static str {
        match self {
            Self::NoCpus => "The SMP topology must contain at least the boot CPU",
            Self::TooManyCpus => "The SMP topology exceeds MAX_CPUS",
            Self::BspOutOfRange => "The boot CPU id must be below the CPU count",
            Self::WorkerOutOfRange => "The worker CPU id must be below the CPU count",
            Self::OriginOutOfRange => "The origin CPU id must be below the CPU count",
        }
    }
}

impl ErrorContext for SubstrateError {
    fn context(&self) -> &'static str {
        match self {
            Self::CpuOutOfRange => "Deferred work can only target CPUs known to the substrate",
            Self::SubscriptionTableFull => "Each CPU supports a bounded number of subscriptions",
        }
    }
}

impl ErrorContext for BindError {
    fn context(&self) -> &'static str {
        match self {
            Self::AlreadyBound => "Only one dispatcher may serve an interface on a given worker CPU",
            Self::HooksClaimed => "The interface already routes its packets through another sink",
        }
    }
}
