use std::{
    fmt,
    ops::{Deref, DerefMut},
};

use crate::{buffer_pool::Lease, global::ByteBuf, global::byte_pool};

/// Byte memory backing a buffer.
///
/// Bytes always come from the global recycler. Memory acquired from a
/// [`BufferPool`](crate::BufferPool) also carries a lease that frees a pool
/// slot when the memory is dropped.
pub struct Memory {
    bytes: ByteBuf,
    lease: Option<Lease>,
}

impl Memory {
    /// Zero-filled memory of `len` bytes.
    #[must_use]
    pub fn zeroed(len: usize) -> Self {
        Self::from_buf(byte_pool().get_with(|b| b.resize(len, 0)))
    }

    /// Copy of `data`.
    #[must_use]
    pub fn from_slice(data: &[u8]) -> Self {
        Self::from_buf(byte_pool().get_with(|b| b.extend_from_slice(data)))
    }

    /// Wrap recycled bytes without a pool lease.
    #[must_use]
    pub fn from_buf(bytes: ByteBuf) -> Self {
        Self {
            bytes,
            lease: None,
        }
    }

    pub(crate) fn leased(bytes: ByteBuf, lease: Lease) -> Self {
        Self {
            bytes,
            lease: Some(lease),
        }
    }

    /// Whether this memory holds a [`BufferPool`](crate::BufferPool) slot.
    #[must_use]
    pub fn is_leased(&self) -> bool {
        self.lease.is_some()
    }

    /// Shrink to `len` bytes. No-op when already shorter.
    pub fn truncate(&mut self, len: usize) {
        self.bytes.truncate(len);
    }

    /// Resize, zero-filling any new tail.
    pub fn resize(&mut self, len: usize) {
        self.bytes.resize(len, 0);
    }

    /// Mutable access to the backing vector.
    pub fn as_vec_mut(&mut self) -> &mut Vec<u8> {
        &mut self.bytes
    }
}

impl Deref for Memory {
    type Target = [u8];

    fn deref(&self) -> &[u8] {
        &self.bytes
    }
}

impl DerefMut for Memory {
    fn deref_mut(&mut self) -> &mut [u8] {
        &mut self.bytes
    }
}

impl fmt::Debug for Memory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Memory")
            .field("len", &self.bytes.len())
            .field("leased", &self.lease.is_some())
            .finish()
    }
}

impl PartialEq for Memory {
    fn eq(&self, other: &Self) -> bool {
        self.bytes[..] == other.bytes[..]
    }
}
