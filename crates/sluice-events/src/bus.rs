#![forbid(unsafe_code)]

use tokio::sync::broadcast::{
    self,
    error::{RecvError, TryRecvError},
};

use crate::Event;

/// Pipeline-wide message bus.
///
/// Cloned into every element. `publish()` is synchronous, so streaming
/// threads post without a runtime. Events are dropped when nobody listens.
#[derive(Clone, Debug)]
pub struct EventBus {
    tx: broadcast::Sender<Event>,
}

impl EventBus {
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity.max(1));
        Self { tx }
    }

    /// Post anything convertible into [`Event`], e.g. a [`SourceEvent`](crate::SourceEvent).
    ///
    /// Returns how many subscribers will see it; `0` means it was dropped.
    pub fn publish<E: Into<Event>>(&self, event: E) -> usize {
        self.tx.send(event.into()).unwrap_or(0)
    }

    /// Subscribe to events posted from now on, by every element.
    ///
    /// Slow subscribers get `RecvError::Lagged(n)`; producers never block.
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<Event> {
        self.tx.subscribe()
    }

    /// Subscribe to events posted by the element named `element` only.
    #[must_use]
    pub fn subscribe_element(&self, element: impl Into<String>) -> ElementReceiver {
        ElementReceiver {
            rx: self.tx.subscribe(),
            element: element.into(),
        }
    }

    #[must_use]
    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(64)
    }
}

/// Bus receiver skipping messages from other elements.
#[derive(Debug)]
pub struct ElementReceiver {
    rx: broadcast::Receiver<Event>,
    element: String,
}

impl ElementReceiver {
    #[must_use]
    pub fn element(&self) -> &str {
        &self.element
    }

    /// Next message from the element. Lag is reported as on the raw bus.
    pub async fn recv(&mut self) -> Result<Event, RecvError> {
        loop {
            let event = self.rx.recv().await?;
            if event.element() == self.element {
                return Ok(event);
            }
        }
    }

    /// Next queued message from the element, without waiting.
    pub fn try_recv(&mut self) -> Result<Event, TryRecvError> {
        loop {
            let event = self.rx.try_recv()?;
            if event.element() == self.element {
                return Ok(event);
            }
        }
    }
}
