//! `sluice-src`
//!
//! A source stage that produces data for a downstream peer, either by
//! pushing from its own streaming thread or by answering pull requests.
//!
//! ## Design goals
//! - [`SourceElement`]: lifecycle, state changes, events, queries and seeks;
//!   everything source-specific lives behind [`SourceImpl`]
//! - Async start: `start()` may return before the source is ready and be
//!   completed later from any thread through a [`StartCompletion`]
//! - Flushing is the only cancellation: it releases the streaming thread
//!   wherever it blocks
//! - [`LiveGate`]: live sources only produce while playing
//!
//! ## Locking
//! Stream lock, then the live gate, then the general lock. Hooks run with
//! at most the stream lock held, so they must not call back into control
//! methods that take it (`stop`, `set_flushing(false)`, seeks).

#![forbid(unsafe_code)]
#![cfg_attr(test, allow(clippy::ignored_unit_patterns, clippy::allow_attributes))]

mod buffer;
mod caps;
mod config;
mod downstream;
mod element;
mod error;
mod event;
mod flush;
mod format;
mod handlers;
mod hooks;
mod live;
mod negotiate;
mod queries;
mod query;
mod seek;
mod segment;
mod start;
mod streaming;

#[cfg(any(test, feature = "test-utils"))]
pub mod mock;

pub use buffer::{Buffer, BufferFlags, BufferList};
pub use caps::Caps;
pub use config::{ActivationMode, DEFAULT_BLOCKSIZE, SourceConfig};
#[cfg(any(test, feature = "test-utils"))]
pub use downstream::MockDownstream;
pub use downstream::Downstream;
pub use element::{QosValues, SourceElement, StateChange, StateChangeSuccess};
pub use error::{FlowError, FlowResult, SourceError, SourceResult};
pub use event::{
    CustomEvent, CustomKind, QosEvent, SeekEvent, SeekFlags, SeekType, Seqnum, StreamEvent,
    next_group_id,
};
pub use format::{Format, PERCENT_MAX};
pub use hooks::{CreateSuccess, SourceImpl};
pub use live::{ClockWait, LiveGate, LiveState};
pub use query::{AllocationQuery, AllocatorProposal, PoolProposal, Query};
pub use segment::{Segment, SegmentFlags};
pub use sluice_events::{
    ElementReceiver, ElementState, ErrorDomain, Event, EventBus, SourceEvent, StateEvent,
};
pub use start::{SourceFlags, StartCompletion, StartResult};
