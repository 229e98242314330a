//! Caps negotiation and buffer allocation with the downstream peer.

use std::sync::{Arc, atomic::Ordering};

use sluice_bufpool::{
    AllocationParams, Allocator, BufferPool, BufferPoolConfig, PoolError, default_allocator,
};
use tracing::{debug, trace, warn};

use crate::{
    buffer::Buffer,
    caps::Caps,
    element::SourceElement,
    error::{FlowError, FlowResult},
    event::StreamEvent,
    hooks::CreateSuccess,
    query::{AllocationQuery, AllocatorProposal, PoolProposal, Query},
};

impl SourceElement {
    /// Renegotiate caps and allocation now.
    ///
    /// Safe to call from [`SourceImpl::create`](crate::SourceImpl::create);
    /// it does not take the stream lock.
    pub fn negotiate(&self) -> bool {
        self.inner.need_reconfigure.swap(false, Ordering::AcqRel);
        self.negotiate_unlocked()
    }

    /// Re-marks the reconfigure request on failure.
    pub(crate) fn negotiate_unlocked(&self) -> bool {
        let negotiated = self.inner.imp.negotiate(self) && self.prepare_allocation();
        if !negotiated {
            debug!(name = %self.inner.name, "negotiation failed");
            self.mark_reconfigure();
        }
        negotiated
    }

    /// Default [`SourceImpl::get_caps`](crate::SourceImpl::get_caps): the
    /// template caps, narrowed by `filter`.
    #[must_use]
    pub fn default_get_caps(&self, filter: Option<&Caps>) -> Option<Caps> {
        let template = self.inner.imp.template_caps();
        Some(match filter {
            Some(filter) => filter.intersect(&template),
            None => template,
        })
    }

    /// Default [`SourceImpl::negotiate`](crate::SourceImpl::negotiate).
    pub fn default_negotiate(&self) -> bool {
        let ours = match self.inner.imp.get_caps(self, None) {
            None => {
                debug!(name = %self.inner.name, "no caps, nothing to negotiate");
                return true;
            }
            Some(caps) if caps.is_any() => {
                debug!(name = %self.inner.name, "any caps, nothing to negotiate");
                return true;
            }
            Some(caps) if caps.is_empty() => {
                warn!(name = %self.inner.name, "source produces no caps");
                return false;
            }
            Some(caps) => caps,
        };

        let mut query = Query::caps(Some(ours.clone()));
        let peer = match (self.inner.downstream.peer_query(&mut query), query) {
            (true, Query::Caps { result: Some(peer), .. }) => Some(peer),
            _ => None,
        };
        trace!(name = %self.inner.name, %ours, peer = ?peer, "negotiating");

        let caps = match peer {
            Some(peer) => ours.intersect(&peer),
            None => ours,
        };
        if caps.is_empty() {
            debug!(name = %self.inner.name, "no common caps with peer");
            return false;
        }
        let caps = self.inner.imp.fixate(self, caps);
        if caps.is_any() {
            return true;
        }
        if !caps.is_fixed() {
            debug!(name = %self.inner.name, %caps, "caps did not fixate");
            return false;
        }
        self.set_caps(&caps)
    }

    /// Configure the output caps and announce them downstream.
    ///
    /// Skipped when equal to the current caps.
    pub fn set_caps(&self, caps: &Caps) -> bool {
        if self.current_caps().as_ref() == Some(caps) {
            trace!(name = %self.inner.name, %caps, "caps unchanged");
            return true;
        }
        self.push_stream_start();
        if !self.inner.imp.set_caps(self, caps) {
            debug!(name = %self.inner.name, %caps, "source refused caps");
            return false;
        }
        self.inner.object.lock().caps = Some(caps.clone());
        debug!(name = %self.inner.name, %caps, "caps set");
        self.push_downstream_event(StreamEvent::Caps(caps.clone()))
    }

    fn prepare_allocation(&self) -> bool {
        let caps = self.current_caps();
        let mut query = Query::Allocation(AllocationQuery::new(caps.clone(), true));
        if !self.inner.downstream.peer_query(&mut query) {
            trace!(name = %self.inner.name, "peer did not answer allocation query");
        }
        let mut allocation = match query {
            Query::Allocation(allocation) => allocation,
            _ => AllocationQuery::new(caps, true),
        };

        if !self.inner.imp.decide_allocation(self, &mut allocation) {
            debug!(name = %self.inner.name, "allocation refused");
            return false;
        }
        let pool = allocation.pools.first().and_then(|p| p.pool.clone());
        let (allocator, params) = allocation
            .allocators
            .first()
            .map_or((None, AllocationParams::default()), |a| (a.allocator.clone(), a.params));
        self.set_allocation(pool, allocator, params)
    }

    /// Default [`SourceImpl::decide_allocation`](crate::SourceImpl::decide_allocation).
    ///
    /// Takes the peer's pool proposal, or creates a pool sized to the
    /// blocksize, and falls back to the default allocator.
    pub fn default_decide_allocation(&self, query: &mut AllocationQuery) -> bool {
        let blocksize = self.blocksize() as usize;
        let (pool, size, min_buffers, max_buffers) = match query.pools.first() {
            Some(p) => (p.pool.clone(), p.size, p.min_buffers, p.max_buffers),
            None => (None, 0, 0, 0),
        };
        let size = if size == 0 { blocksize } else { size };
        let config = BufferPoolConfig::new(size, min_buffers, max_buffers);

        let pool = match pool {
            Some(pool) => {
                match pool.set_config(config) {
                    Ok(()) => {}
                    Err(PoolError::Busy) => {
                        debug!(name = %self.inner.name, "peer pool already active, keeping its config");
                    }
                    Err(e) => {
                        warn!(name = %self.inner.name, error = %e, "invalid pool config");
                        return false;
                    }
                }
                pool
            }
            None if query.need_pool => {
                if let Err(e) = config.validate() {
                    warn!(name = %self.inner.name, error = %e, "invalid pool config");
                    return false;
                }
                BufferPool::new(config)
            }
            None => {
                query.pools.clear();
                self.ensure_allocator(query);
                return true;
            }
        };

        let proposal = PoolProposal {
            pool: Some(pool),
            size,
            min_buffers,
            max_buffers,
        };
        if query.pools.is_empty() {
            query.pools.push(proposal);
        } else {
            query.pools[0] = proposal;
        }
        self.ensure_allocator(query);
        true
    }

    fn ensure_allocator(&self, query: &mut AllocationQuery) {
        match query.allocators.first_mut() {
            Some(proposal) => {
                if proposal.allocator.is_none() {
                    proposal.allocator = Some(default_allocator());
                }
            }
            None => query.allocators.push(AllocatorProposal {
                allocator: Some(default_allocator()),
                params: AllocationParams::default(),
            }),
        }
    }

    /// Swap in a new pool and allocator.
    ///
    /// The new pool is activated first; the old one is deactivated unless
    /// it is the same pool.
    pub(crate) fn set_allocation(
        &self,
        pool: Option<BufferPool>,
        allocator: Option<Arc<dyn Allocator>>,
        params: AllocationParams,
    ) -> bool {
        if let Some(pool) = &pool {
            if let Err(e) = pool.set_active(true) {
                warn!(name = %self.inner.name, error = %e, "failed to activate pool");
                return false;
            }
        }
        let old = {
            let mut obj = self.inner.object.lock();
            obj.allocator = allocator;
            obj.params = params;
            std::mem::replace(&mut obj.pool, pool.clone())
        };
        if let Some(old) = old {
            let replaced = pool.as_ref().is_none_or(|new| !new.same_pool(&old));
            if replaced {
                debug!(name = %self.inner.name, id = old.id(), "deactivating old pool");
                if let Err(e) = old.set_active(false) {
                    warn!(name = %self.inner.name, error = %e, "failed to deactivate pool");
                }
            }
        }
        true
    }

    /// Default [`SourceImpl::alloc`](crate::SourceImpl::alloc): a pool buffer
    /// when a pool is set, otherwise the allocator's memory.
    pub fn default_alloc(&self, _offset: u64, size: usize) -> FlowResult<Buffer> {
        let (pool, allocator, params) = {
            let obj = self.inner.object.lock();
            (obj.pool.clone(), obj.allocator.clone(), obj.params)
        };
        if let Some(pool) = pool {
            let memory = pool.acquire()?;
            let mut buffer = Buffer::new(memory);
            buffer.set_size(size);
            return Ok(buffer);
        }
        let allocator = allocator.unwrap_or_else(default_allocator);
        match allocator.alloc(size, &params) {
            Some(memory) => Ok(Buffer::new(memory)),
            None => {
                warn!(name = %self.inner.name, allocator = allocator.name(), size, "allocation failed");
                Err(FlowError::Error)
            }
        }
    }

    /// Default [`SourceImpl::create`](crate::SourceImpl::create): `alloc`
    /// then `fill`.
    pub fn default_create(&self, offset: u64, size: usize) -> FlowResult<CreateSuccess> {
        let mut buffer = self.inner.imp.alloc(self, offset, size)?;
        self.inner.imp.fill(self, offset, size, &mut buffer)?;
        Ok(CreateSuccess::NewBuffer(buffer))
    }
}
