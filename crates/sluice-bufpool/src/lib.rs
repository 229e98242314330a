//! Memory management for sluice sources.
//!
//! Three layers:
//!
//! - [`SharedPool`]: sharded recycler. Values go back to a per-thread shard on
//!   drop so hot producer loops do not hit the global allocator.
//! - [`BufferPool`]: fixed-size buffer pool with an active/flushing lifecycle.
//!   `acquire` blocks while `max_buffers` are outstanding and is released by
//!   flushing.
//! - [`Allocator`]: fallback when no pool was negotiated. [`SystemAllocator`]
//!   hands out memory from the global [`byte_pool`].
//!
//! ## Example
//!
//! ```
//! use sluice_bufpool::{BufferPool, BufferPoolConfig};
//!
//! let pool = BufferPool::new(BufferPoolConfig::new(4096, 0, 8));
//! pool.set_active(true).unwrap();
//! let mem = pool.acquire().unwrap();
//! assert_eq!(mem.len(), 4096);
//! ```

#![forbid(unsafe_code)]

mod allocator;
mod buffer_pool;
mod error;
mod global;
mod memory;
mod pool;

pub use allocator::{AllocationParams, Allocator, SystemAllocator, default_allocator};
pub use buffer_pool::{BufferPool, BufferPoolConfig};
pub use error::{PoolError, PoolResult};
pub use global::{ByteBuf, BytePool, byte_pool};
pub use memory::Memory;
pub use pool::{Pooled, Reuse, SharedPool};
