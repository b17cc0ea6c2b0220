// src/kernel/mod.rs
//! カーネル抽象化
//!
//! このモジュールは、CPU 間パケット分配で使用する基本的な trait、型、
//! スケジューリング基盤、ネットワーク分配層を提供します。

pub mod core;
pub mod net;
pub mod smp;
