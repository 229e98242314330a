#[cfg(any(test, feature = "test-utils"))]
use mockall::automock;

use crate::{
    buffer::{Buffer, BufferList},
    error::FlowResult,
    event::StreamEvent,
    query::Query,
};

/// Peer receiving what a source produces.
///
/// Called from the streaming thread for data and serialized events, and
/// from control threads for flush events and out-of-band events.
#[cfg_attr(any(test, feature = "test-utils"), automock)]
pub trait Downstream: Send + Sync {
    fn push(&self, buffer: Buffer) -> FlowResult<()>;

    fn push_list(&self, list: BufferList) -> FlowResult<()>;

    /// Returns whether the peer accepted the event.
    fn push_event(&self, event: StreamEvent) -> bool;

    /// Ask the peer a question, e.g. caps or allocation.
    fn peer_query(&self, query: &mut Query) -> bool;
}
