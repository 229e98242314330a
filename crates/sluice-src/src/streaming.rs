//! The streaming task: one iteration produces and pushes one unit.
//!
//! Every iteration runs with the stream lock held. The only places it may
//! block for long are the play gate, the clock wait and the source's own
//! `create`, all of which give up when flushing starts.

use std::sync::atomic::Ordering;

use sluice_events::{ErrorDomain, SourceEvent};
use sluice_worker::TaskFlow;
use tracing::{debug, trace, warn};

use crate::{
    buffer::{Buffer, BufferFlags, BufferList},
    config::ActivationMode,
    element::{SourceElement, StreamState},
    error::{FlowError, FlowResult},
    event::{StreamEvent, next_group_id},
    format::Format,
    hooks::CreateSuccess,
    live::ClockWait,
    segment::SegmentFlags,
};

/// What one `create` call produced.
enum Produced {
    Buffer(Buffer),
    List(BufferList),
}

impl Produced {
    fn mark_discont(&mut self) {
        match self {
            Self::Buffer(buffer) => buffer.set_flag(BufferFlags::DISCONT),
            Self::List(list) => {
                if let Some(first) = list.first_mut() {
                    first.set_flag(BufferFlags::DISCONT);
                }
            }
        }
    }

    fn units(&self) -> u64 {
        match self {
            Self::Buffer(_) => 1,
            Self::List(list) => list.len() as u64,
        }
    }
}

impl SourceElement {
    /// Body of the streaming task.
    pub(crate) fn stream_iteration(&self) -> TaskFlow {
        let mut stream = self.inner.stream.lock();
        match self.iterate(&mut stream) {
            Ok(()) => {
                stream.last_flow = Ok(());
                TaskFlow::Continue
            }
            Err(flow) => {
                stream.last_flow = Err(flow);
                self.pause_streaming(flow);
                TaskFlow::Pause
            }
        }
    }

    fn iterate(&self, stream: &mut StreamState) -> FlowResult<()> {
        self.push_stream_start();

        match self.inner.live.wait_playing() {
            Ok(()) | Err(FlowError::Eos) => {}
            Err(e) => return Err(e),
        }
        if self.eos_requested() {
            return Err(FlowError::Eos);
        }
        if self.inner.live.is_flushing() {
            return Err(FlowError::Flushing);
        }

        if self.inner.need_reconfigure.swap(false, Ordering::AcqRel) && !self.negotiate_unlocked() {
            return Err(if self.inner.live.is_flushing() {
                FlowError::Flushing
            } else {
                FlowError::NotNegotiated
            });
        }

        self.push_pending_events();

        let (pending, position, blocksize, format, stop) = {
            let mut obj = self.inner.object.lock();
            (
                obj.pending_list.take(),
                obj.segment.position,
                obj.blocksize,
                obj.segment.format,
                obj.segment.stop,
            )
        };
        let mut produced = match pending {
            Some(list) => Produced::List(list),
            None => {
                if format != Format::Bytes && stop.is_some_and(|stop| position >= stop) {
                    debug!(name = %self.inner.name, position, "reached segment stop");
                    return Err(FlowError::Eos);
                }
                self.get_range_locked(stream, position, blocksize)?
            }
        };

        {
            let mut obj = self.inner.object.lock();
            if std::mem::take(&mut obj.discont) {
                produced.mark_discont();
            }
            let segment = &mut obj.segment;
            match (&produced, segment.format) {
                (Produced::Buffer(buffer), Format::Bytes) => {
                    segment.position = buffer
                        .offset_end
                        .unwrap_or(position.saturating_add(buffer.len() as u64));
                }
                (Produced::List(list), Format::Bytes) => {
                    segment.position = position.saturating_add(list.total_size() as u64);
                }
                (Produced::Buffer(buffer), Format::Time) => {
                    if let Some(pts) = buffer.pts {
                        segment.position = pts.saturating_add(buffer.duration.unwrap_or(0));
                    }
                }
                (Produced::Buffer(buffer), _) => {
                    if let Some(end) = buffer.offset_end {
                        segment.position = end;
                    }
                }
                (Produced::List(_), _) => {}
            }
        }
        stream.produced += produced.units();

        let pushed = match produced {
            Produced::Buffer(buffer) => {
                trace!(name = %self.inner.name, len = buffer.len(), offset = ?buffer.offset, "pushing buffer");
                self.inner.downstream.push(buffer)
            }
            Produced::List(list) => {
                trace!(name = %self.inner.name, buffers = list.len(), "pushing buffer list");
                self.inner.downstream.push_list(list)
            }
        };
        match pushed {
            Err(FlowError::NotNegotiated) if self.needs_reconfigure() => {
                debug!(name = %self.inner.name, "not negotiated, retrying after reconfigure");
                Ok(())
            }
            other => other,
        }
    }

    /// Pull a unit in pull mode.
    ///
    /// Fails with [`FlowError::Flushing`] when flushing or not started and
    /// with [`FlowError::Eos`] past the end of the data.
    pub fn get_range(&self, offset: u64, length: u32) -> FlowResult<Buffer> {
        if self.inner.object.lock().mode != Some(ActivationMode::Pull) {
            debug!(name = %self.inner.name, "get_range outside pull mode");
            return Err(FlowError::NotSupported);
        }
        let mut stream = self.inner.stream.lock();
        let produced = self.get_range_locked(&mut stream, offset, length)?;
        let mut buffer = match produced {
            Produced::Buffer(buffer) => buffer,
            Produced::List(_) => {
                warn!(name = %self.inner.name, "buffer lists cannot be pulled");
                return Err(FlowError::Error);
            }
        };
        if std::mem::take(&mut self.inner.object.lock().discont) {
            buffer.set_flag(BufferFlags::DISCONT);
        }
        stream.produced += 1;
        Ok(buffer)
    }

    fn get_range_locked(&self, _stream: &mut StreamState, offset: u64, length: u32) -> FlowResult<Produced> {
        if self.inner.live.is_flushing() {
            return Err(FlowError::Flushing);
        }
        match self.inner.live.wait_playing() {
            Ok(()) | Err(FlowError::Eos) => {}
            Err(e) => return Err(e),
        }
        {
            let obj = self.inner.object.lock();
            if !obj.start.is_started() {
                debug!(name = %self.inner.name, "not started");
                return Err(FlowError::Flushing);
            }
            if obj.mode == Some(ActivationMode::Pull) && self.inner.has_pending_eos.load(Ordering::Acquire) {
                return Err(FlowError::Eos);
            }
        }

        let length = self.clip_length(offset, u64::from(length))?;
        {
            let mut obj = self.inner.object.lock();
            if let Some(left) = obj.num_buffers_left.as_mut() {
                if *left == 0 {
                    debug!(name = %self.inner.name, "buffer budget exhausted");
                    return Err(FlowError::Eos);
                }
                *left -= 1;
            }
        }

        trace!(name = %self.inner.name, offset, length, "create");
        let size = usize::try_from(length).map_err(|_| FlowError::Error)?;
        let mut produced = match self.inner.imp.create(self, offset, size) {
            Ok(CreateSuccess::NewBuffer(buffer)) => Produced::Buffer(buffer),
            Ok(CreateSuccess::BufferListSubmitted) => match self.inner.object.lock().pending_list.take() {
                Some(list) => Produced::List(list),
                None => {
                    warn!(name = %self.inner.name, "source reported a buffer list but submitted none");
                    return Err(FlowError::Error);
                }
            },
            Err(e) => {
                debug!(name = %self.inner.name, error = %e, "create failed");
                return Err(e);
            }
        };
        if self.inner.live.is_flushing() {
            debug!(name = %self.inner.name, "flushing after create, dropping data");
            return Err(FlowError::Flushing);
        }

        if let Produced::Buffer(buffer) = &mut produced {
            self.stamp(buffer, offset);
            self.sync(buffer)?;
        }
        Ok(produced)
    }

    /// Apply automatic EOS to a byte request: EOS at or past the end,
    /// otherwise clip to the remaining bytes.
    fn clip_length(&self, offset: u64, length: u64) -> FlowResult<u64> {
        let (format, automatic_eos, dynamic) = {
            let obj = self.inner.object.lock();
            (obj.segment.format, obj.automatic_eos, obj.dynamic_size)
        };
        if format != Format::Bytes || !automatic_eos {
            return Ok(length);
        }

        let max_size = || {
            let obj = self.inner.object.lock();
            match (obj.segment.duration, obj.segment.stop) {
                (Some(size), Some(stop)) => Some(size.min(stop)),
                (size, stop) => size.or(stop),
            }
        };
        let mut max = max_size();
        if dynamic && max.is_none_or(|max| offset.saturating_add(length) >= max) {
            self.refresh_size();
            max = max_size();
        }
        let Some(max) = max else {
            return Ok(length);
        };
        if offset >= max {
            debug!(name = %self.inner.name, offset, size = max, "read past end");
            return Err(FlowError::Eos);
        }
        Ok(length.min(max - offset))
    }

    fn stamp(&self, buffer: &mut Buffer, offset: u64) {
        let (format, time, do_timestamp) = {
            let obj = self.inner.object.lock();
            (obj.segment.format, obj.segment.time, obj.do_timestamp)
        };
        if format == Format::Bytes {
            buffer.offset.get_or_insert(offset);
            if buffer.offset_end.is_none() {
                buffer.offset_end = buffer.offset.map(|o| o.saturating_add(buffer.len() as u64));
            }
        }
        if offset == 0 && time == 0 && buffer.dts.is_none() && !self.is_live() {
            buffer.dts = Some(0);
        }
        if do_timestamp && buffer.pts.is_none() {
            if let Some(running) = self.running_time() {
                buffer.pts = Some(running);
                buffer.dts.get_or_insert(running);
            }
        }
    }

    /// Hold a live buffer until its start time on the clock.
    fn sync(&self, buffer: &Buffer) -> FlowResult<()> {
        if !self.is_live() {
            return Ok(());
        }
        loop {
            let Some(base) = self.inner.object.lock().base_time else {
                return Ok(());
            };
            let (start, _) = self.inner.imp.get_times(self, buffer);
            let Some(start) = start else {
                return Ok(());
            };
            let deadline = self.inner.clock.instant_at(base.saturating_add(start));
            trace!(name = %self.inner.name, start, "waiting for clock");
            match self.inner.live.wait_clock(deadline) {
                ClockWait::Ok => return Ok(()),
                ClockWait::Unscheduled | ClockWait::Paused => {
                    if self.inner.live.is_flushing() {
                        return Err(FlowError::Flushing);
                    }
                    trace!(name = %self.inner.name, "clock wait interrupted, resyncing");
                    self.inner.live.wait_playing()?;
                }
            }
        }
    }

    fn eos_requested(&self) -> bool {
        self.inner.has_pending_eos.load(Ordering::Acquire) || self.inner.live.lock().forced_eos
    }

    pub(crate) fn push_stream_start(&self) {
        let pending = std::mem::take(&mut self.inner.object.lock().stream_start_pending);
        if !pending {
            return;
        }
        let group_id = next_group_id();
        let stream_id = format!("{}/{group_id:08x}", self.inner.name);
        debug!(name = %self.inner.name, %stream_id, "stream start");
        self.push_downstream_event(StreamEvent::StreamStart { stream_id, group_id });
    }

    fn push_pending_events(&self) {
        let segment = {
            let mut obj = self.inner.object.lock();
            if std::mem::take(&mut obj.segment_pending) {
                Some(StreamEvent::Segment {
                    segment: obj.segment.clone(),
                    seqnum: obj.segment_seqnum,
                })
            } else {
                None
            }
        };
        if let Some(event) = segment {
            self.push_downstream_event(event);
        }

        if !self.inner.have_events.swap(false, Ordering::AcqRel) {
            return;
        }
        let events: Vec<_> = self.inner.object.lock().pending_events.drain(..).collect();
        for event in events {
            self.push_downstream_event(event);
        }
    }

    /// Resume the task, e.g. after a seek or flush-stop.
    /// Resume the streaming task unless the source stopped meanwhile.
    ///
    /// The task is started under the general lock, which `stop()` holds
    /// while it cancels the start cycle and stops the task.
    pub(crate) fn restart_task(&self) {
        let started = {
            let mut obj = self.inner.object.lock();
            if !obj.start.is_started() {
                debug!(name = %self.inner.name, "not restarting task, source stopped");
                return;
            }
            obj.last_pause = None;
            self.inner.task.start()
        };
        if let Err(e) = started {
            self.post_error(ErrorDomain::Core, "Failed to start streaming task", Some(e.to_string()));
        }
    }

    fn pause_streaming(&self, flow: FlowError) {
        self.inner.object.lock().last_pause = Some(flow);
        match flow {
            FlowError::Flushing => debug!(name = %self.inner.name, "pausing task, flushing"),
            FlowError::Eos => self.signal_eos(),
            fatal => {
                self.post_error(
                    ErrorDomain::Stream,
                    "Internal data stream error.",
                    Some(format!("streaming stopped, reason {fatal}")),
                );
                let seqnum = self.inner.object.lock().segment_seqnum;
                self.push_downstream_event(StreamEvent::Eos { seqnum });
            }
        }
    }

    fn signal_eos(&self) {
        let (pending, segment_done, format, position, seqnum) = {
            let mut live = self.inner.live.lock();
            live.forced_eos = false;
            let mut obj = self.inner.object.lock();
            self.inner.has_pending_eos.store(false, Ordering::Release);
            (
                obj.pending_eos.take(),
                obj.segment.flags.contains(SegmentFlags::SEGMENT),
                obj.segment.format,
                obj.segment.position,
                obj.segment_seqnum,
            )
        };

        if let Some(event) = pending {
            debug!(name = %self.inner.name, "pushing requested end of stream");
            self.push_downstream_event(event);
        } else if segment_done {
            debug!(name = %self.inner.name, position, "segment done");
            self.inner.bus.publish(SourceEvent::SegmentDone {
                element: self.inner.name.clone(),
                position,
            });
            self.push_downstream_event(StreamEvent::SegmentDone {
                format,
                position,
                seqnum,
            });
            return;
        } else {
            debug!(name = %self.inner.name, "end of stream");
            self.push_downstream_event(StreamEvent::Eos { seqnum });
        }
        self.inner.bus.publish(SourceEvent::EndOfStream {
            element: self.inner.name.clone(),
        });
    }
}
