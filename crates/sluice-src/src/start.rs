//! Asynchronous start handshake.
//!
//! `start()` opens a cycle tagged with a generation. The cycle is resolved
//! exactly once: by a completion (from any thread), by a synchronous start
//! failure, or by `stop()`. Completions carrying an older generation are
//! ignored, so a late answer to a cancelled start can never resurrect it.

use bitflags::bitflags;
use tracing::debug;

use crate::element::WeakSourceElement;

bitflags! {
    /// Lifecycle flags guarded by the general lock.
    #[repr(transparent)]
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct SourceFlags: u8 {
        const STARTING = 0b0000_0001;
        const STARTED = 0b0000_0010;
    }
}

/// Outcome of a start cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StartResult {
    /// The cycle is in flight.
    Pending,
    Ok,
    /// Cancelled, or no cycle has run yet.
    Flushing,
    Error,
}

#[derive(Debug)]
pub(crate) struct StartState {
    pub(crate) flags: SourceFlags,
    pub(crate) result: StartResult,
    generation: u64,
}

impl Default for StartState {
    fn default() -> Self {
        Self {
            flags: SourceFlags::empty(),
            result: StartResult::Flushing,
            generation: 0,
        }
    }
}

impl StartState {
    pub(crate) fn is_active(&self) -> bool {
        self.flags
            .intersects(SourceFlags::STARTING | SourceFlags::STARTED)
    }

    pub(crate) fn is_starting(&self) -> bool {
        self.flags.contains(SourceFlags::STARTING)
    }

    pub(crate) fn is_started(&self) -> bool {
        self.flags.contains(SourceFlags::STARTED)
    }

    pub(crate) fn generation(&self) -> u64 {
        self.generation
    }

    /// Open a new cycle and return its generation.
    pub(crate) fn begin(&mut self) -> u64 {
        self.generation += 1;
        self.flags = SourceFlags::STARTING;
        self.result = StartResult::Pending;
        self.generation
    }

    /// Whether a completion for `generation` (`None`: the current cycle)
    /// may still resolve the cycle.
    pub(crate) fn accepts(&self, generation: Option<u64>) -> bool {
        self.is_starting() && generation.is_none_or(|g| g == self.generation)
    }

    pub(crate) fn resolve(&mut self, result: StartResult) {
        self.flags.remove(SourceFlags::STARTING);
        if result == StartResult::Ok {
            self.flags.insert(SourceFlags::STARTED);
        }
        self.result = result;
    }

    /// Drop back to stopped. Returns whether anything was active.
    pub(crate) fn cancel(&mut self) -> bool {
        let was_active = self.is_active();
        self.flags = SourceFlags::empty();
        self.result = StartResult::Flushing;
        was_active
    }
}

/// One-shot handle completing the start cycle it was issued for.
///
/// Obtained from [`SourceElement::start_completion`](crate::SourceElement::start_completion)
/// inside [`SourceImpl::start`](crate::SourceImpl::start), moved to whatever
/// thread finishes the work, and consumed by [`StartCompletion::complete`].
#[derive(Debug)]
pub struct StartCompletion {
    element: WeakSourceElement,
    generation: u64,
}

impl StartCompletion {
    pub(crate) fn new(element: WeakSourceElement, generation: u64) -> Self {
        Self {
            element,
            generation,
        }
    }

    #[must_use]
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Deliver the result. Ignored when the cycle was already resolved or
    /// the element is gone.
    pub fn complete(self, result: StartResult) {
        match self.element.upgrade() {
            Some(element) => element.complete_start(Some(self.generation), result),
            None => debug!(generation = self.generation, "start completion for dropped element"),
        }
    }
}
