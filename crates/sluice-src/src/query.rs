//! Queries answered by a source or forwarded to its peer.
//!
//! A query carries its request fields and empty answer fields; the handler
//! fills in the answers and returns `true` when it did.

use std::sync::Arc;

use sluice_bufpool::{AllocationParams, Allocator, BufferPool};
use sluice_platform::ClockTime;

use crate::{caps::Caps, format::Format};

/// Buffer pool offered or chosen during allocation negotiation.
#[derive(Debug, Clone)]
pub struct PoolProposal {
    pub pool: Option<BufferPool>,
    pub size: usize,
    pub min_buffers: usize,
    pub max_buffers: usize,
}

/// Allocator offered or chosen during allocation negotiation.
#[derive(Debug, Clone)]
pub struct AllocatorProposal {
    pub allocator: Option<Arc<dyn Allocator>>,
    pub params: AllocationParams,
}

/// Allocation negotiation between a source and its peer.
#[derive(Debug, Clone, Default)]
pub struct AllocationQuery {
    pub caps: Option<Caps>,
    pub need_pool: bool,
    pub pools: Vec<PoolProposal>,
    pub allocators: Vec<AllocatorProposal>,
}

impl AllocationQuery {
    #[must_use]
    pub fn new(caps: Option<Caps>, need_pool: bool) -> Self {
        Self {
            caps,
            need_pool,
            pools: Vec::new(),
            allocators: Vec::new(),
        }
    }
}

#[derive(Debug, Clone)]
pub enum Query {
    Position {
        format: Format,
        position: Option<u64>,
    },
    Duration {
        format: Format,
        duration: Option<u64>,
    },
    Segment {
        format: Format,
        rate: f64,
        start: Option<u64>,
        stop: Option<u64>,
    },
    Seeking {
        format: Format,
        seekable: bool,
        start: Option<u64>,
        end: Option<u64>,
    },
    Formats(Vec<Format>),
    Convert {
        src_format: Format,
        src_value: u64,
        dest_format: Format,
        dest_value: Option<u64>,
    },
    Latency {
        live: bool,
        min: ClockTime,
        max: Option<ClockTime>,
    },
    Jitter,
    Rate,
    Buffering {
        format: Format,
        percent: u8,
        start: Option<u64>,
        stop: Option<u64>,
        estimated_total: Option<u64>,
    },
    Caps {
        filter: Option<Caps>,
        result: Option<Caps>,
    },
    Uri(Option<String>),
    Allocation(AllocationQuery),
}

impl Query {
    #[must_use]
    pub fn position(format: Format) -> Self {
        Self::Position {
            format,
            position: None,
        }
    }

    #[must_use]
    pub fn duration(format: Format) -> Self {
        Self::Duration {
            format,
            duration: None,
        }
    }

    #[must_use]
    pub fn segment(format: Format) -> Self {
        Self::Segment {
            format,
            rate: 1.0,
            start: None,
            stop: None,
        }
    }

    #[must_use]
    pub fn seeking(format: Format) -> Self {
        Self::Seeking {
            format,
            seekable: false,
            start: None,
            end: None,
        }
    }

    #[must_use]
    pub fn convert(src_format: Format, src_value: u64, dest_format: Format) -> Self {
        Self::Convert {
            src_format,
            src_value,
            dest_format,
            dest_value: None,
        }
    }

    #[must_use]
    pub fn latency() -> Self {
        Self::Latency {
            live: false,
            min: 0,
            max: None,
        }
    }

    #[must_use]
    pub fn buffering(format: Format) -> Self {
        Self::Buffering {
            format,
            percent: 0,
            start: None,
            stop: None,
            estimated_total: None,
        }
    }

    #[must_use]
    pub fn caps(filter: Option<Caps>) -> Self {
        Self::Caps {
            filter,
            result: None,
        }
    }

    /// Short name for logs.
    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            Self::Position { .. } => "position",
            Self::Duration { .. } => "duration",
            Self::Segment { .. } => "segment",
            Self::Seeking { .. } => "seeking",
            Self::Formats(_) => "formats",
            Self::Convert { .. } => "convert",
            Self::Latency { .. } => "latency",
            Self::Jitter => "jitter",
            Self::Rate => "rate",
            Self::Buffering { .. } => "buffering",
            Self::Caps { .. } => "caps",
            Self::Uri(_) => "uri",
            Self::Allocation(_) => "allocation",
        }
    }
}
