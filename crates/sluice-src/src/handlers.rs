//! Events sent to the element by the application and by downstream.

use std::sync::atomic::Ordering;

use tracing::{debug, trace};

use crate::{
    config::ActivationMode,
    element::SourceElement,
    event::{CustomKind, StreamEvent},
};

impl SourceElement {
    /// Send an event into the element from the application.
    ///
    /// Flushes act right away. EOS is handed to the streaming task, which
    /// pushes it after the data in flight. Seeks before start are kept for
    /// the initial seek. Serialized events are queued and go out ahead of
    /// the next buffer; out-of-band custom events are pushed immediately.
    pub fn send_event(&self, event: StreamEvent) -> bool {
        debug!(name = %self.inner.name, event = event.name(), "send event");
        match event {
            StreamEvent::FlushStart { .. } => {
                let pushed = self.push_downstream_event(event);
                self.flush_start();
                pushed
            }
            StreamEvent::FlushStop { .. } => self.send_flush_stop(event),
            StreamEvent::Eos { .. } => {
                let mode = self.inner.object.lock().mode;
                match mode {
                    Some(ActivationMode::Pull) => self.send_eos_pull(event),
                    _ => self.send_eos_push(event),
                }
                true
            }
            StreamEvent::Seek(ref seek) => {
                let mut obj = self.inner.object.lock();
                if obj.start.is_started() {
                    drop(obj);
                    self.src_event(&event)
                } else {
                    debug!(name = %self.inner.name, "queueing seek until started");
                    obj.pending_seek = Some(seek.clone());
                    true
                }
            }
            StreamEvent::Segment { .. } => {
                debug!(name = %self.inner.name, "segment events cannot be sent to a source");
                false
            }
            StreamEvent::Tag(_)
            | StreamEvent::SinkMessage { .. }
            | StreamEvent::Protection { .. } => {
                self.queue_event(event);
                true
            }
            StreamEvent::Custom(ref custom) => match custom.kind {
                CustomKind::Downstream | CustomKind::Both => {
                    self.queue_event(event);
                    true
                }
                CustomKind::DownstreamOob | CustomKind::BothOob => self.push_downstream_event(event),
                CustomKind::Upstream => false,
            },
            _ => {
                debug!(name = %self.inner.name, event = event.name(), "event not handled");
                false
            }
        }
    }

    /// Handle an event arriving from downstream through [`SourceImpl::event`](crate::SourceImpl::event).
    pub fn src_event(&self, event: &StreamEvent) -> bool {
        trace!(name = %self.inner.name, event = event.name(), "src event");
        self.inner.imp.event(self, event)
    }

    /// Default [`SourceImpl::event`](crate::SourceImpl::event).
    pub fn default_event(&self, event: &StreamEvent) -> bool {
        match event {
            StreamEvent::Seek(seek) => {
                if !self.inner.imp.is_seekable(self) {
                    debug!(name = %self.inner.name, "source is not seekable");
                    return false;
                }
                self.perform_seek(seek, true)
            }
            StreamEvent::FlushStart { .. } => {
                self.set_flushing(true);
                true
            }
            StreamEvent::FlushStop { .. } => {
                self.set_flushing(false);
                true
            }
            StreamEvent::Qos(qos) => {
                let mut obj = self.inner.object.lock();
                obj.qos.proportion = qos.proportion;
                obj.qos.earliest_time = Some(qos.timestamp.saturating_add_signed(qos.diff));
                true
            }
            StreamEvent::Reconfigure => {
                self.mark_reconfigure();
                true
            }
            StreamEvent::Latency(_) => true,
            _ => false,
        }
    }

    fn send_flush_stop(&self, event: StreamEvent) -> bool {
        let mut stream = self.inner.stream.lock();
        self.flush_stop_locked(&mut stream);
        let pushed = self.push_downstream_event(event);

        let restart = {
            let live = self.inner.live.lock();
            let mut obj = self.inner.object.lock();
            obj.segment_pending = true;
            obj.mode == Some(ActivationMode::Push)
                && obj.start.is_started()
                && (!live.is_live || live.live_playing)
        };
        if restart {
            self.restart_task();
        }
        drop(stream);
        pushed
    }

    fn send_eos_push(&self, event: StreamEvent) {
        self.flush_start();
        let mut stream = self.inner.stream.lock();
        self.flush_stop_locked(&mut stream);
        let started = {
            let mut live = self.inner.live.lock();
            live.forced_eos = true;
            let mut obj = self.inner.object.lock();
            obj.pending_eos = Some(event);
            self.inner.has_pending_eos.store(true, Ordering::Release);
            obj.start.is_started()
        };
        self.inner.live.broadcast();
        if started {
            self.restart_task();
        }
    }

    fn send_eos_pull(&self, event: StreamEvent) {
        self.inner.object.lock().pending_eos = Some(event);
        self.inner.has_pending_eos.store(true, Ordering::Release);

        let pool = self.buffer_pool();
        if let Some(pool) = &pool {
            pool.set_flushing(true);
        }
        self.inner.imp.unlock(self);
        let stream = self.inner.stream.lock();
        self.inner.imp.unlock_stop(self);
        if let Some(pool) = &pool {
            pool.set_flushing(false);
        }
        drop(stream);
    }

    fn queue_event(&self, event: StreamEvent) {
        trace!(name = %self.inner.name, event = event.name(), "queueing serialized event");
        self.inner.object.lock().pending_events.push_back(event);
        self.inner.have_events.store(true, Ordering::Release);
    }
}
