#![forbid(unsafe_code)]

//! Event bus for sluice pipelines.
//!
//! Elements never return fatal streaming failures to a caller: they post them
//! here. Applications subscribe once and see errors, warnings, state changes
//! and segment completion from every element sharing the bus.

mod bus;
mod event;
mod source;
mod state;

pub use bus::{ElementReceiver, EventBus};
pub use event::Event;
pub use source::{ErrorDomain, SourceEvent};
pub use state::{ElementState, StateEvent};
