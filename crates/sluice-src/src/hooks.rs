//! Behaviour a concrete source plugs into [`SourceElement`].
//!
//! Every hook has a default, most of them delegating to the matching
//! `SourceElement::default_*` method so an override can still fall back.
//! A source must override [`SourceImpl::create`] or [`SourceImpl::fill`].

use sluice_platform::ClockTime;

use crate::{
    buffer::Buffer,
    caps::Caps,
    element::SourceElement,
    error::{FlowError, FlowResult, SourceResult},
    event::{SeekEvent, StreamEvent},
    query::{AllocationQuery, Query},
    segment::Segment,
};

/// Result of a successful [`SourceImpl::create`].
#[derive(Debug)]
pub enum CreateSuccess {
    NewBuffer(Buffer),
    /// The source called [`SourceElement::submit_buffer_list`] instead of
    /// returning a single buffer.
    BufferListSubmitted,
}

pub trait SourceImpl: Send + Sync + 'static {
    /// Caps this source can ever produce.
    fn template_caps(&self) -> Caps {
        Caps::Any
    }

    fn get_caps(&self, src: &SourceElement, filter: Option<&Caps>) -> Option<Caps> {
        src.default_get_caps(filter)
    }

    /// Agree on caps with downstream.
    fn negotiate(&self, src: &SourceElement) -> bool {
        src.default_negotiate()
    }

    fn fixate(&self, _src: &SourceElement, caps: Caps) -> Caps {
        caps.fixate()
    }

    /// Caps were chosen; configure the output.
    fn set_caps(&self, _src: &SourceElement, _caps: &Caps) -> bool {
        true
    }

    fn decide_allocation(&self, src: &SourceElement, query: &mut AllocationQuery) -> bool {
        src.default_decide_allocation(query)
    }

    /// Open resources. With async start enabled, return early and finish
    /// through a [`StartCompletion`](crate::StartCompletion).
    fn start(&self, _src: &SourceElement) -> SourceResult<()> {
        Ok(())
    }

    fn stop(&self, _src: &SourceElement) -> SourceResult<()> {
        Ok(())
    }

    /// Running-time window `(start, end)` in which `buffer` should be
    /// pushed. Live sources returning a start are synced to the clock.
    fn get_times(&self, _src: &SourceElement, _buffer: &Buffer) -> (Option<ClockTime>, Option<ClockTime>) {
        (None, None)
    }

    /// Total size in bytes, if known.
    fn get_size(&self, _src: &SourceElement) -> Option<u64> {
        None
    }

    fn is_seekable(&self, _src: &SourceElement) -> bool {
        false
    }

    /// Translate a seek event into a target segment.
    fn prepare_seek_segment(&self, src: &SourceElement, seek: &SeekEvent, segment: &mut Segment) -> bool {
        src.default_prepare_seek_segment(seek, segment)
    }

    /// Reposition the source to `segment`.
    fn do_seek(&self, src: &SourceElement, segment: &mut Segment) -> bool {
        src.default_do_seek(segment)
    }

    /// Make a blocking `create`/`fill` return [`FlowError::Flushing`] promptly.
    fn unlock(&self, _src: &SourceElement) -> bool {
        true
    }

    /// Clear whatever [`SourceImpl::unlock`] set.
    fn unlock_stop(&self, _src: &SourceElement) -> bool {
        true
    }

    fn query(&self, src: &SourceElement, query: &mut Query) -> bool {
        src.default_query(query)
    }

    /// Handle an event arriving from downstream.
    fn event(&self, src: &SourceElement, event: &StreamEvent) -> bool {
        src.default_event(event)
    }

    /// Produce `size` bytes at `offset`.
    fn create(&self, src: &SourceElement, offset: u64, size: usize) -> FlowResult<CreateSuccess> {
        src.default_create(offset, size)
    }

    /// Allocate the buffer that [`SourceImpl::fill`] will write into.
    fn alloc(&self, src: &SourceElement, offset: u64, size: usize) -> FlowResult<Buffer> {
        src.default_alloc(offset, size)
    }

    fn fill(&self, _src: &SourceElement, _offset: u64, _size: usize, _buffer: &mut Buffer) -> FlowResult<()> {
        Err(FlowError::NotSupported)
    }

    /// URI this source reads from, for URI queries.
    fn uri(&self) -> Option<String> {
        None
    }
}
