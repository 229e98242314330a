#![forbid(unsafe_code)]

use crate::{SourceEvent, StateEvent};

/// Message posted on the [`EventBus`](crate::EventBus).
#[derive(Clone, Debug, PartialEq)]
pub enum Event {
    /// Streaming messages from source elements.
    Source(SourceEvent),
    /// Element state transitions.
    State(StateEvent),
}

impl From<SourceEvent> for Event {
    fn from(e: SourceEvent) -> Self {
        Self::Source(e)
    }
}

impl From<StateEvent> for Event {
    fn from(e: StateEvent) -> Self {
        Self::State(e)
    }
}

impl Event {
    /// Name of the element that posted this event.
    #[must_use]
    pub fn element(&self) -> &str {
        match self {
            Self::Source(e) => e.element(),
            Self::State(StateEvent::Changed { element, .. }) => element,
        }
    }
}
