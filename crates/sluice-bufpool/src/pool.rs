use std::{
    fmt,
    hash::{Hash, Hasher},
    ops::{Deref, DerefMut},
    sync::Arc,
};

use parking_lot::Mutex;

/// Values that can be reset and handed out again.
pub trait Reuse {
    /// Clear the value and shrink it to at most `trim` capacity.
    ///
    /// Returns `false` when nothing is left worth keeping.
    fn reuse(&mut self, trim: usize) -> bool;
}

impl<T> Reuse for Vec<T> {
    fn reuse(&mut self, trim: usize) -> bool {
        self.clear();
        self.shrink_to(trim);
        self.capacity() > 0
    }
}

struct Shard<T> {
    free: Vec<T>,
    limit: usize,
}

struct Shards<const N: usize, T> {
    slots: [Mutex<Shard<T>>; N],
    trim: usize,
}

impl<const N: usize, T: Reuse> Shards<N, T> {
    fn home(&self) -> usize {
        let mut hasher = std::collections::hash_map::DefaultHasher::new();
        std::thread::current().id().hash(&mut hasher);
        #[expect(
            clippy::cast_possible_truncation,
            reason = "modulo N keeps the index in range"
        )]
        let idx = (hasher.finish() as usize) % N;
        idx
    }

    fn take(&self, home: usize) -> Option<T> {
        (0..N).find_map(|i| self.slots[(home + i) % N].lock().free.pop())
    }

    fn give_back(&self, mut value: T, shard: usize) {
        let mut slot = self.slots[shard].lock();
        if slot.free.len() < slot.limit && value.reuse(self.trim) {
            slot.free.push(value);
        }
    }

    fn idle(&self) -> usize {
        self.slots.iter().map(|s| s.lock().free.len()).sum()
    }
}

/// Sharded, cloneable recycler.
///
/// `SHARDS` is fixed at compile time; each thread hashes to a home shard and
/// falls back to the others before allocating.
pub struct SharedPool<const SHARDS: usize, T: Reuse>(Arc<Shards<SHARDS, T>>);

impl<const SHARDS: usize, T: Reuse + Default> SharedPool<SHARDS, T> {
    /// Create a pool keeping at most `max_idle` recycled values, each trimmed
    /// to `trim_capacity`.
    ///
    /// # Panics
    ///
    /// Panics if `SHARDS` is zero.
    #[must_use]
    pub fn new(max_idle: usize, trim_capacity: usize) -> Self {
        assert!(SHARDS > 0, "pool needs at least one shard");
        let per_shard = max_idle / SHARDS;
        Self(Arc::new(Shards {
            slots: std::array::from_fn(|_| {
                Mutex::new(Shard {
                    free: Vec::new(),
                    limit: per_shard,
                })
            }),
            trim: trim_capacity,
        }))
    }

    #[must_use]
    pub fn get(&self) -> Pooled<SHARDS, T> {
        self.get_with(|_| {})
    }

    /// Take a value (recycled or fresh) and run `init` on it.
    pub fn get_with<F: FnOnce(&mut T)>(&self, init: F) -> Pooled<SHARDS, T> {
        let shard = self.0.home();
        let mut value = self.0.take(shard).unwrap_or_default();
        init(&mut value);
        Pooled {
            value,
            home: Arc::clone(&self.0),
            shard,
        }
    }

    /// Hand a value back without wrapping it first.
    pub fn recycle(&self, value: T) {
        self.0.give_back(value, self.0.home());
    }

    /// Wrap an outside value so it lands in this pool on drop.
    pub fn attach(&self, value: T) -> Pooled<SHARDS, T> {
        Pooled {
            value,
            home: Arc::clone(&self.0),
            shard: self.0.home(),
        }
    }

    /// Number of values parked across all shards.
    #[must_use]
    pub fn idle(&self) -> usize {
        self.0.idle()
    }
}

impl<const SHARDS: usize, T: Reuse> Clone for SharedPool<SHARDS, T> {
    fn clone(&self) -> Self {
        Self(Arc::clone(&self.0))
    }
}

/// Value on loan from a [`SharedPool`]; returns itself on drop.
pub struct Pooled<const SHARDS: usize, T: Reuse + Default> {
    value: T,
    home: Arc<Shards<SHARDS, T>>,
    shard: usize,
}

impl<const SHARDS: usize, T: Reuse + Default> Pooled<SHARDS, T> {
    /// Detach the value; it will not be recycled.
    pub fn into_inner(mut self) -> T {
        std::mem::take(&mut self.value)
    }
}

impl<const SHARDS: usize, T: Reuse + Default> Drop for Pooled<SHARDS, T> {
    fn drop(&mut self) {
        let value = std::mem::take(&mut self.value);
        self.home.give_back(value, self.shard);
    }
}

impl<const SHARDS: usize, T: Reuse + Default> Deref for Pooled<SHARDS, T> {
    type Target = T;

    fn deref(&self) -> &T {
        &self.value
    }
}

impl<const SHARDS: usize, T: Reuse + Default> DerefMut for Pooled<SHARDS, T> {
    fn deref_mut(&mut self) -> &mut T {
        &mut self.value
    }
}

impl<const SHARDS: usize, T: Reuse + Default + fmt::Debug> fmt::Debug for Pooled<SHARDS, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(&self.value, f)
    }
}

impl<const SHARDS: usize, T: Reuse + Default + Clone> Clone for Pooled<SHARDS, T> {
    fn clone(&self) -> Self {
        Self {
            value: self.value.clone(),
            home: Arc::clone(&self.home),
            shard: self.shard,
        }
    }
}

impl<const SHARDS: usize, T: Reuse + Default + PartialEq> PartialEq for Pooled<SHARDS, T> {
    fn eq(&self, other: &Self) -> bool {
        self.value == other.value
    }
}
