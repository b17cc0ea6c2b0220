// src/kernel/core/types.rs
//! カーネル共通型定義

use core::fmt;

/// CPU ID（0 から始まる論理番号）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[repr(transparent)]
pub struct CpuId(pub u32);

impl CpuId {
    /// ブートプロセッサ（BSP）。ドライバはこの CPU で動作する
    pub const BSP: Self = Self(0);

    /// 新しい CPU ID を作成
    #[inline]
    #[must_use]
    pub const fn new(id: u32) -> Self {
        Self(id)
    }

    /// ID を取得
    #[inline]
    #[must_use]
    pub const fn get(self) -> u32 {
        self.0
    }

    /// per-CPU 配列のインデックスとして使用
    #[inline]
    #[must_use]
    pub const fn index(self) -> usize {
        self.0 as usize
    }

    /// BSP かどうかをチェック
    #[inline]
    #[must_use]
    pub const fn is_bsp(self) -> bool {
        self.0 == Self::BSP.0
    }
}

impl fmt::Display for CpuId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// ネットワークインターフェース ID
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[repr(transparent)]
pub struct InterfaceId(pub u32);

impl InterfaceId {
    /// 新しいインターフェース ID を作成
    #[inline]
    #[must_use]
    pub const fn new(id: u32) -> Self {
        Self(id)
    }

    /// ID を取得
    #[inline]
    #[must_use]
    pub const fn get(self) -> u32 {
        self.0
    }
}

impl fmt::Display for InterfaceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "eth{}", self.0)
    }
}
