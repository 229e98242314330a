use std::sync::{
    Arc,
    atomic::{AtomicU64, Ordering},
};

use sluice_platform::{Condvar, Mutex};
use tracing::{debug, trace};

use crate::{
    error::{PoolError, PoolResult},
    global::byte_pool,
    memory::Memory,
};

static NEXT_POOL_ID: AtomicU64 = AtomicU64::new(1);

/// Geometry of a [`BufferPool`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct BufferPoolConfig {
    /// Bytes per buffer.
    pub size: usize,
    /// Buffers the pool promises to keep around.
    pub min_buffers: usize,
    /// Upper bound on outstanding buffers; `0` means unbounded.
    pub max_buffers: usize,
}

impl BufferPoolConfig {
    #[must_use]
    pub fn new(size: usize, min_buffers: usize, max_buffers: usize) -> Self {
        Self {
            size,
            min_buffers,
            max_buffers,
        }
    }

    /// Check the geometry is consistent.
    pub fn validate(&self) -> PoolResult<()> {
        if self.max_buffers != 0 && self.min_buffers > self.max_buffers {
            return Err(PoolError::InvalidConfig("min_buffers exceeds max_buffers"));
        }
        Ok(())
    }
}

impl Default for BufferPoolConfig {
    fn default() -> Self {
        Self::new(4096, 0, 0)
    }
}

struct PoolState {
    config: BufferPoolConfig,
    active: bool,
    flushing: bool,
    outstanding: usize,
}

pub(crate) struct PoolShared {
    id: u64,
    state: Mutex<PoolState>,
    cond: Condvar,
}

impl PoolShared {
    fn release(&self) {
        let mut state = self.state.lock();
        state.outstanding = state.outstanding.saturating_sub(1);
        drop(state);
        self.cond.notify_one();
    }
}

/// Slot held by memory acquired from a pool.
pub(crate) struct Lease {
    pool: Arc<PoolShared>,
}

impl Drop for Lease {
    fn drop(&mut self) {
        self.pool.release();
    }
}

/// Pool of equally sized buffers with an active/flushing lifecycle.
///
/// Clones share the same pool. Flushing wakes every blocked `acquire` and
/// makes it fail with [`PoolError::Flushing`] until flushing is cleared.
#[derive(Clone)]
pub struct BufferPool {
    shared: Arc<PoolShared>,
}

impl BufferPool {
    #[must_use]
    pub fn new(config: BufferPoolConfig) -> Self {
        Self {
            shared: Arc::new(PoolShared {
                id: NEXT_POOL_ID.fetch_add(1, Ordering::Relaxed),
                state: Mutex::new(PoolState {
                    config,
                    active: false,
                    flushing: false,
                    outstanding: 0,
                }),
                cond: Condvar::new(),
            }),
        }
    }

    /// Unique pool id, stable across clones.
    #[must_use]
    pub fn id(&self) -> u64 {
        self.shared.id
    }

    /// Whether `other` is a handle to the same pool.
    #[must_use]
    pub fn same_pool(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.shared, &other.shared)
    }

    #[must_use]
    pub fn config(&self) -> BufferPoolConfig {
        self.shared.state.lock().config
    }

    /// Replace the configuration. Only allowed while inactive.
    pub fn set_config(&self, config: BufferPoolConfig) -> PoolResult<()> {
        config.validate()?;
        let mut state = self.shared.state.lock();
        if state.active {
            return Err(PoolError::Busy);
        }
        state.config = config;
        Ok(())
    }

    pub fn set_active(&self, active: bool) -> PoolResult<()> {
        let mut state = self.shared.state.lock();
        if state.active == active {
            return Ok(());
        }
        if active {
            state.config.validate()?;
            state.flushing = false;
        }
        state.active = active;
        debug!(size = state.config.size, id = self.shared.id, active, "buffer pool activation");
        drop(state);
        self.shared.cond.notify_all();
        Ok(())
    }

    #[must_use]
    pub fn is_active(&self) -> bool {
        self.shared.state.lock().active
    }

    pub fn set_flushing(&self, flushing: bool) {
        let mut state = self.shared.state.lock();
        if state.flushing == flushing {
            return;
        }
        state.flushing = flushing;
        trace!(id = self.shared.id, flushing, "buffer pool flushing");
        drop(state);
        self.shared.cond.notify_all();
    }

    #[must_use]
    pub fn is_flushing(&self) -> bool {
        self.shared.state.lock().flushing
    }

    /// Buffers currently handed out.
    #[must_use]
    pub fn outstanding(&self) -> usize {
        self.shared.state.lock().outstanding
    }

    /// Take a zero-filled buffer of the configured size.
    ///
    /// Blocks while `max_buffers` buffers are outstanding.
    pub fn acquire(&self) -> PoolResult<Memory> {
        let mut state = self.shared.state.lock();
        loop {
            if state.flushing {
                return Err(PoolError::Flushing);
            }
            if !state.active {
                return Err(PoolError::Inactive);
            }
            let max = state.config.max_buffers;
            if max == 0 || state.outstanding < max {
                break;
            }
            self.shared.cond.wait(&mut state);
        }
        state.outstanding += 1;
        let size = state.config.size;
        drop(state);

        let bytes = byte_pool().get_with(|b| b.resize(size, 0));
        Ok(Memory::leased(
            bytes,
            Lease {
                pool: Arc::clone(&self.shared),
            },
        ))
    }
}

impl std::fmt::Debug for BufferPool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.shared.state.lock();
        f.debug_struct("BufferPool")
            .field("id", &self.shared.id)
            .field("config", &state.config)
            .field("active", &state.active)
            .field("flushing", &state.flushing)
            .field("outstanding", &state.outstanding)
            .finish()
    }
}
