//! Play/pause and flush gate for live sources.
//!
//! The gate has its own lock, separate from the element's general lock, so
//! a streaming thread blocked here never holds state other threads need.
//! Lock order: stream lock, then this gate, then the general lock.

use std::time::Instant;

use sluice_platform::{Condvar, Mutex, MutexGuard};
use tracing::trace;

use crate::error::{FlowError, FlowResult};

/// State guarded by the gate lock.
#[derive(Debug, Default)]
pub struct LiveState {
    pub is_live: bool,
    /// Live source may produce (element is playing).
    pub live_playing: bool,
    pub flushing: bool,
    /// EOS was forced while the loop was blocked.
    pub forced_eos: bool,
    clock_epoch: u64,
}

/// Outcome of a clock wait.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClockWait {
    /// The deadline passed.
    Ok,
    /// Cancelled by flushing or an explicit unschedule.
    Unscheduled,
    /// Playback paused during the wait.
    Paused,
}

#[derive(Debug, Default)]
pub struct LiveGate {
    state: Mutex<LiveState>,
    cond: Condvar,
}

impl LiveGate {
    #[must_use]
    pub fn new(is_live: bool) -> Self {
        Self {
            state: Mutex::new(LiveState {
                is_live,
                ..LiveState::default()
            }),
            cond: Condvar::new(),
        }
    }

    pub fn lock(&self) -> MutexGuard<'_, LiveState> {
        self.state.lock()
    }

    /// Wake every waiter so it re-checks the state.
    pub fn broadcast(&self) {
        self.cond.notify_all();
    }

    #[must_use]
    pub fn is_live(&self) -> bool {
        self.state.lock().is_live
    }

    pub fn set_live(&self, is_live: bool) {
        self.state.lock().is_live = is_live;
        self.broadcast();
    }

    #[must_use]
    pub fn is_flushing(&self) -> bool {
        self.state.lock().flushing
    }

    #[must_use]
    pub fn is_playing(&self) -> bool {
        self.state.lock().live_playing
    }

    /// Block until a live source may produce.
    ///
    /// Returns at once for non-live sources. Fails with
    /// [`FlowError::Flushing`] when flushing starts first and with
    /// [`FlowError::Eos`] when end of stream was forced.
    pub fn wait_playing(&self) -> FlowResult<()> {
        let mut state = self.state.lock();
        Self::wait_playing_locked(&self.cond, &mut state)
    }

    fn wait_playing_locked(cond: &Condvar, state: &mut MutexGuard<'_, LiveState>) -> FlowResult<()> {
        if !state.is_live {
            return Ok(());
        }
        loop {
            if state.flushing {
                return Err(FlowError::Flushing);
            }
            if state.forced_eos {
                return Err(FlowError::Eos);
            }
            if state.live_playing {
                return Ok(());
            }
            trace!("live source waiting for playing");
            cond.wait(state);
        }
    }

    /// Open or close the play gate.
    pub fn set_playing(&self, playing: bool) {
        let mut state = self.state.lock();
        state.live_playing = playing;
        drop(state);
        self.broadcast();
    }

    /// Cancel clock waits in progress.
    pub fn unschedule(&self) {
        self.state.lock().clock_epoch += 1;
        self.broadcast();
    }

    pub(crate) fn unschedule_locked(state: &mut LiveState) {
        state.clock_epoch += 1;
    }

    /// Wait until `deadline` unless flushing, unscheduled or paused first.
    pub fn wait_clock(&self, deadline: Instant) -> ClockWait {
        let mut state = self.state.lock();
        let epoch = state.clock_epoch;
        loop {
            if state.flushing || state.clock_epoch != epoch {
                return ClockWait::Unscheduled;
            }
            if state.is_live && !state.live_playing {
                return ClockWait::Paused;
            }
            if Instant::now() >= deadline {
                return ClockWait::Ok;
            }
            let _ = self.cond.wait_until(&mut state, deadline);
        }
    }
}
