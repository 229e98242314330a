//! Flushing: the one way to make a blocked streaming thread give up.
//!
//! Flush-start marks the gate flushing, cancels clock waits, flushes the
//! buffer pool and asks the source to unlock. Flush-stop reverses all of
//! that, and runs under the stream lock so the loop only resumes once
//! everything is clear.

use std::sync::atomic::Ordering;

use tracing::debug;

use crate::{
    element::{SourceElement, StreamState},
    live::LiveGate,
};

impl SourceElement {
    /// Enter or leave flushing.
    ///
    /// Entering wakes a thread blocked in `create`, a clock wait, the play
    /// gate or a pool acquire. Leaving waits for the current iteration to end.
    pub fn set_flushing(&self, flushing: bool) {
        if flushing {
            self.flush_start();
        } else {
            let mut stream = self.inner.stream.lock();
            self.flush_stop_locked(&mut stream);
        }
    }

    #[must_use]
    pub fn is_flushing(&self) -> bool {
        self.inner.live.is_flushing()
    }

    pub(crate) fn flush_start(&self) {
        debug!(name = %self.inner.name, "flush start");
        if let Some(pool) = self.buffer_pool() {
            pool.set_flushing(true);
        }
        self.inner.imp.unlock(self);
        {
            let mut live = self.inner.live.lock();
            live.flushing = true;
            live.forced_eos = false;
            LiveGate::unschedule_locked(&mut live);
            self.inner.object.lock().pending_eos = None;
            self.inner.has_pending_eos.store(false, Ordering::Release);
        }
        self.inner.live.broadcast();
    }

    pub(crate) fn flush_stop_locked(&self, _stream: &mut StreamState) {
        debug!(name = %self.inner.name, "flush stop");
        {
            let mut live = self.inner.live.lock();
            live.flushing = false;
            let mut obj = self.inner.object.lock();
            if let Some(pool) = &obj.pool {
                pool.set_flushing(false);
            }
            obj.pending_events.clear();
            self.inner.have_events.store(false, Ordering::Release);
        }
        self.inner.live.broadcast();
        self.inner.imp.unlock_stop(self);
    }
}
