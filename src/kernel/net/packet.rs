// src/kernel/net/packet.rs
//! Packet buffers
//!
//! A packet handle is uniquely owned and move-only: there is no `Clone`,
//! so once a handle is moved into a queue the producer can no longer touch it.

use alloc::boxed::Box;
use alloc::vec::Vec;
use core::fmt;

/// Network buffer
pub struct Packet {
    data: Vec<u8>,
}

/// Owned packet handle passed between cores
pub type PacketPtr = Box<Packet>;

impl Packet {
    /// Wrap an owned buffer
    #[must_use]
    pub fn new(data: Vec<u8>) -> PacketPtr {
        Box::new(Self { data })
    }

    /// Copy a frame into a fresh buffer
    #[must_use]
    pub fn from_slice(frame: &[u8]) -> PacketPtr {
        Self::new(frame.to_vec())
    }

    /// Payload size in bytes
    #[inline]
    #[must_use]
    pub fn size(&self) -> usize {
        self.data.len()
    }

    /// Check whether the buffer is empty
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Borrow the payload
    #[inline]
    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }

    /// Release the buffer
    #[must_use]
    pub fn into_bytes(self) -> Vec<u8> {
        self.data
    }
}

impl fmt::Debug for Packet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Packet").field("size", &self.data.len()).finish()
    }
}
