//! カーネルコア prelude
//!
//! `use crate::kernel::core::prelude::*;` でよく使う型と trait をインポート

pub use super::traits::{Hooks, Inet, NetStack, PacketHandler, PacketHooks, WriteqHandler};
pub use super::types::{CpuId, InterfaceId};
