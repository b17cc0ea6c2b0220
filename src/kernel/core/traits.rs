// src/kernel/core/traits.rs
//! カーネルコア trait 定義
//!
//! ネットワークスタックとインターフェースドライバは外部コンポーネントであり、
//! ここではディスパッチャが必要とする境界だけを trait として定義します。

use alloc::sync::Arc;
use bitflags::bitflags;

use crate::kernel::net::packet::PacketPtr;

/// パケットを受け取るフック
pub type PacketHandler = Arc<dyn Fn(PacketPtr) + Send + Sync>;

/// 送信キューの空き通知を受け取るフック（引数は空きパケット数）
pub type WriteqHandler = Arc<dyn Fn(usize) + Send + Sync>;

bitflags! {
    /// インターフェースに設置済みのフック
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct Hooks: u8 {
        /// IP → TCP 受信パス
        const INBOUND = 1 << 0;
        /// TCP → IP 送信パス
        const OUTBOUND = 1 << 1;
        /// 送信キュー空き通知
        const WRITEQ = 1 << 2;
    }
}

/// インターフェースの登録ポイント
///
/// フックが設置されていない場合、インターフェースはパケットを
/// 同じ CPU 上で直接スタックへ渡します。
pub trait PacketHooks: Send + Sync {
    /// 受信パケットのシンクを設定
    fn on_inbound(&self, handler: PacketHandler);

    /// 送信パケットのシンクを設定
    fn on_outbound(&self, handler: PacketHandler);

    /// 送信キュー空き通知のシンクを設定
    fn on_writeq_available(&self, handler: WriteqHandler);

    /// 現在設置されているフック
    fn installed_hooks(&self) -> Hooks;
}

/// スタックとドライバのエントリポイント
///
/// 各メソッドは方向ごとに常に同じ CPU から呼ばれます。
pub trait NetStack: Send + Sync {
    /// 受信パケットを TCP へ渡す
    fn receive(&self, packet: PacketPtr);

    /// 送信パケットをドライバへ渡す
    fn transmit(&self, packet: PacketPtr);

    /// 保留中の書き込みを最大 `packets` 個分処理する
    fn process_writeq(&self, packets: usize);
}

/// ディスパッチャが束縛できるインターフェース
pub trait Inet: PacketHooks + NetStack {}

impl<T: PacketHooks + NetStack + ?Sized> Inet for T {}
