use std::sync::OnceLock;

use crate::pool::{Pooled, SharedPool};

/// Byte recycler type used across the workspace.
pub type BytePool = SharedPool<32, Vec<u8>>;

/// Recycled byte vector from the global [`byte_pool`].
pub type ByteBuf = Pooled<32, Vec<u8>>;

// 32 shards, 1024 idle buffers, trimmed to 256 KiB
static GLOBAL_BYTE_POOL: OnceLock<BytePool> = OnceLock::new();

/// Global byte recycler, lazily created.
pub fn byte_pool() -> &'static BytePool {
    GLOBAL_BYTE_POOL.get_or_init(|| BytePool::new(1024, 256 * 1024))
}
