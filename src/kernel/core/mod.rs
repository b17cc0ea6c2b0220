// src/kernel/core/mod.rs
//! カーネルコア
//!
//! 共通型と外部コンポーネントとの境界 trait

pub mod prelude;
pub mod traits;
pub mod types;
