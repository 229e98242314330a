// Common fixtures and utilities for integration tests

pub mod fixtures;

use std::{
    sync::Arc,
    thread,
    time::{Duration, Instant},
};

use sluice_src::{
    ElementReceiver, ElementState, Event, SourceConfig, SourceElement, SourceEvent, SourceImpl,
    mock::{Item, PatternSource, Probe, RecordingDownstream},
};

/// Upper bound for anything a test waits on.
pub const TIMEOUT: Duration = Duration::from_secs(5);

/// Time given to a thread to reach a blocking point it should stay in.
pub const SETTLE: Duration = Duration::from_millis(50);

/// A source element wired to a recording peer, with a bus subscription.
pub struct Harness {
    pub src: SourceElement,
    pub sink: Arc<RecordingDownstream>,
    pub probe: Arc<Probe>,
    events: ElementReceiver,
}

impl Harness {
    pub fn new(config: SourceConfig, source: PatternSource) -> Self {
        let probe = source.probe();
        Self::build(config, source, probe)
    }

    /// Harness around a test-local source; its probe stays untouched.
    pub fn with_impl<S: SourceImpl>(config: SourceConfig, source: S) -> Self {
        Self::build(config, source, Arc::new(Probe::default()))
    }

    fn build<S: SourceImpl>(mut config: SourceConfig, source: S, probe: Arc<Probe>) -> Self {
        config.event_channel_capacity = 256;
        let sink = RecordingDownstream::new();
        let src = SourceElement::new(config, source, Arc::clone(&sink) as _);
        let events = src.bus().subscribe_element(src.name());
        Self {
            src,
            sink,
            probe,
            events,
        }
    }

    /// Bus messages posted so far.
    pub fn bus(&mut self) -> Vec<Event> {
        let mut events = Vec::new();
        while let Ok(event) = self.events.try_recv() {
            events.push(event);
        }
        events
    }

    /// Poll the bus until `pred` matches a message.
    pub fn wait_bus<F>(&mut self, mut pred: F) -> Option<Event>
    where
        F: FnMut(&Event) -> bool,
    {
        let deadline = Instant::now() + TIMEOUT;
        while Instant::now() < deadline {
            if let Some(event) = self.bus().into_iter().find(|e| pred(e)) {
                return Some(event);
            }
            thread::sleep(Duration::from_millis(5));
        }
        None
    }

    /// Element errors posted so far.
    pub fn errors(&mut self) -> Vec<SourceEvent> {
        self.bus()
            .into_iter()
            .filter_map(|event| match event {
                Event::Source(e) if e.is_error() => Some(e),
                _ => None,
            })
            .collect()
    }
}

impl Drop for Harness {
    fn drop(&mut self) {
        let _ = self.src.set_state(ElementState::Null);
    }
}

/// Poll `cond` until it holds or [`TIMEOUT`] passes.
pub fn wait_until<F: FnMut() -> bool>(mut cond: F) -> bool {
    let deadline = Instant::now() + TIMEOUT;
    while Instant::now() < deadline {
        if cond() {
            return true;
        }
        thread::sleep(Duration::from_millis(5));
    }
    cond()
}

/// Payload sizes of the buffers among `items`.
pub fn buffer_sizes(items: &[Item]) -> Vec<usize> {
    items
        .iter()
        .filter_map(|item| match item {
            Item::Buffer(buffer) => Some(buffer.len()),
            _ => None,
        })
        .collect()
}

/// Names of the events among `items`, in order.
pub fn event_names(items: &[Item]) -> Vec<&'static str> {
    items.iter().filter_map(Item::event_name).collect()
}
