// src/errors/mod.rs

//! Unified error handling module

pub mod unified;

pub use unified::{BindError, ConfigError, ErrorContext, NetSmpError, Result, SubstrateError};
