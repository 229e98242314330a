use std::{
    fmt,
    sync::{Arc, OnceLock},
};

use crate::{global::byte_pool, memory::Memory};

/// Extra layout requirements for allocated memory.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct AllocationParams {
    /// Required alignment minus one, as a mask. Advisory for byte memory.
    pub align: usize,
    /// Bytes reserved in front of the data.
    pub prefix: usize,
    /// Bytes reserved after the data.
    pub padding: usize,
}

/// Source of memory when no buffer pool is in use.
pub trait Allocator: Send + Sync + fmt::Debug {
    fn name(&self) -> &str;

    /// Allocate `size` bytes; `None` when the allocator is exhausted.
    fn alloc(&self, size: usize, params: &AllocationParams) -> Option<Memory>;
}

/// Allocator backed by the global byte recycler.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemAllocator;

impl Allocator for SystemAllocator {
    fn name(&self) -> &str {
        "system"
    }

    fn alloc(&self, size: usize, params: &AllocationParams) -> Option<Memory> {
        let reserve = params.prefix + size + params.padding;
        let bytes = byte_pool().get_with(|b| {
            b.reserve(reserve);
            b.resize(size, 0);
        });
        Some(Memory::from_buf(bytes))
    }
}

static DEFAULT_ALLOCATOR: OnceLock<Arc<dyn Allocator>> = OnceLock::new();

/// Shared handle to the [`SystemAllocator`].
pub fn default_allocator() -> Arc<dyn Allocator> {
    Arc::clone(DEFAULT_ALLOCATOR.get_or_init(|| Arc::new(SystemAllocator)))
}
