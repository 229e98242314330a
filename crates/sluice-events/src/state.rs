#![forbid(unsafe_code)]

use std::fmt;

/// Element states, in activation order.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ElementState {
    #[default]
    Null,
    Ready,
    Paused,
    Playing,
}

impl ElementState {
    /// Neighbouring state one step towards `target`, or `None` when already there.
    #[must_use]
    pub fn step_towards(self, target: Self) -> Option<Self> {
        use ElementState::{Null, Paused, Playing, Ready};
        match self.cmp(&target) {
            std::cmp::Ordering::Equal => None,
            std::cmp::Ordering::Less => Some(match self {
                Null => Ready,
                Ready => Paused,
                Paused | Playing => Playing,
            }),
            std::cmp::Ordering::Greater => Some(match self {
                Playing => Paused,
                Paused => Ready,
                Ready | Null => Null,
            }),
        }
    }
}

impl fmt::Display for ElementState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Null => "NULL",
            Self::Ready => "READY",
            Self::Paused => "PAUSED",
            Self::Playing => "PLAYING",
        })
    }
}

/// State transitions reported by elements.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum StateEvent {
    Changed {
        element: String,
        old: ElementState,
        new: ElementState,
    },
}
