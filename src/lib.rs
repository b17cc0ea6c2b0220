// src/lib.rs
//! netsmp - CPU 間パケット分配層
//!
//! 1 つのネットワークインターフェースの受信・送信パスを、ドライバが動作する
//! ブート CPU とスタックが動作するワーカー CPU の間で受け渡します。
//!
//! - [`kernel::net::BatchQueue`]: バースト先頭検出付きのスピンロック FIFO
//! - [`kernel::net::Dispatcher`]: バーストごとに 1 回だけ遅延処理を予約する分配器
//! - [`kernel::smp`]: CPU ごとの遅延処理とドアベル
//! - [`service`]: 起動処理とスループット計測

#![no_std]
#![deny(unsafe_op_in_unsafe_fn)]
#![warn(missing_docs)]

extern crate alloc;

pub mod config;
pub mod errors;
pub mod kernel;
pub mod service;

pub use config::{DispatcherConfig, ServiceConfig, SmpConfig, SubstrateKind};
pub use errors::{NetSmpError, Result};
pub use kernel::core::prelude::*;
pub use kernel::net::{BatchQueue, Dispatcher, DispatcherStats, LoopbackInterface, Packet, PacketPtr};
pub use kernel::smp::{CoreRunner, EventSubstrate, Substrate, TaskQueueSubstrate};
pub use service::{Service, ThroughputMeter, ThroughputReport};
