//! Seeking: turn a seek event into a new segment and reposition the source.

use tracing::debug;

use crate::{
    config::ActivationMode,
    element::{SourceElement, StreamState},
    event::{SeekEvent, SeekFlags, Seqnum, StreamEvent},
    segment::Segment,
};

impl SourceElement {
    /// Default [`SourceImpl::prepare_seek_segment`](crate::SourceImpl::prepare_seek_segment):
    /// no format conversion, apply the seek to `segment`.
    pub fn default_prepare_seek_segment(&self, seek: &SeekEvent, segment: &mut Segment) -> bool {
        if seek.format != segment.format {
            debug!(
                name = %self.inner.name,
                seek = %seek.format,
                segment = %segment.format,
                "cannot convert seek format"
            );
            return false;
        }
        segment.do_seek(seek)
    }

    /// Default [`SourceImpl::do_seek`](crate::SourceImpl::do_seek): accept
    /// the segment as prepared.
    pub fn default_do_seek(&self, segment: &mut Segment) -> bool {
        segment.time = segment.start;
        true
    }

    /// Seek while streaming.
    ///
    /// Flushing seeks surround the reposition with flush-start/flush-stop
    /// downstream; other seeks pause the task. `unlock` also interrupts a
    /// blocked `create` for non-flushing seeks.
    pub(crate) fn perform_seek(&self, seek: &SeekEvent, unlock: bool) -> bool {
        let flush = seek.flags.contains(SeekFlags::FLUSH);
        debug!(name = %self.inner.name, ?seek, flush, "performing seek");

        if flush {
            self.push_downstream_event(StreamEvent::FlushStart { seqnum: seek.seqnum });
        } else if let Err(e) = self.inner.task.pause() {
            debug!(name = %self.inner.name, error = %e, "could not pause task for seek");
        }
        if flush || unlock {
            self.flush_start();
        }

        let mut stream = self.inner.stream.lock();
        if flush || unlock {
            self.flush_stop_locked(&mut stream);
        }
        let ok = self.seek_locked(&mut stream, Some(seek));
        if flush {
            self.push_downstream_event(StreamEvent::FlushStop {
                reset_time: true,
                seqnum: seek.seqnum,
            });
        }

        let restart = {
            let obj = self.inner.object.lock();
            obj.mode == Some(ActivationMode::Push) && obj.start.is_started()
        };
        if restart {
            self.restart_task();
        }
        drop(stream);
        ok
    }

    /// Reposition to `seek`, or to the current segment when `None`.
    pub(crate) fn seek_locked(&self, _stream: &mut StreamState, seek: Option<&SeekEvent>) -> bool {
        let mut segment = self.segment();
        if let Some(seek) = seek {
            if !self.inner.imp.prepare_seek_segment(self, seek, &mut segment) {
                debug!(name = %self.inner.name, "preparing seek segment failed");
                return false;
            }
        }
        if !self.inner.imp.do_seek(self, &mut segment) {
            debug!(name = %self.inner.name, "source refused seek");
            return false;
        }

        debug!(
            name = %self.inner.name,
            start = segment.start,
            stop = ?segment.stop,
            "seek done"
        );
        let mut obj = self.inner.object.lock();
        obj.segment = segment;
        obj.segment_pending = true;
        obj.segment_seqnum = seek.map_or_else(Seqnum::next, |s| s.seqnum);
        obj.discont = true;
        true
    }
}
