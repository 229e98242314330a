//! Test doubles for sources and downstream peers.
//!
//! Available under `#[cfg(test)]` and via the `test-utils` feature.

use std::{
    sync::{
        Arc,
        atomic::{AtomicUsize, Ordering},
    },
    time::Duration,
};

use sluice_platform::{Condvar, Mutex};

use crate::{
    buffer::{Buffer, BufferList},
    caps::Caps,
    downstream::Downstream,
    element::SourceElement,
    error::{FlowError, FlowResult, SourceError, SourceResult},
    event::StreamEvent,
    hooks::{CreateSuccess, SourceImpl},
    query::{PoolProposal, Query},
    start::StartCompletion,
};

/// Something a [`RecordingDownstream`] received.
#[derive(Debug, Clone)]
pub enum Item {
    Buffer(Buffer),
    List(BufferList),
    Event(StreamEvent),
}

impl Item {
    #[must_use]
    pub fn event_name(&self) -> Option<&'static str> {
        match self {
            Self::Event(event) => Some(event.name()),
            _ => None,
        }
    }

    #[must_use]
    pub fn is_eos(&self) -> bool {
        matches!(self, Self::Event(StreamEvent::Eos { .. }))
    }
}

/// Downstream peer that records everything pushed into it.
pub struct RecordingDownstream {
    tx: kanal::Sender<Item>,
    rx: kanal::Receiver<Item>,
    push_result: Mutex<FlowResult<()>>,
    peer_caps: Mutex<Option<Caps>>,
    pool: Mutex<Option<PoolProposal>>,
    push_delay: Mutex<Option<Duration>>,
    pushed: AtomicUsize,
}

impl RecordingDownstream {
    #[must_use]
    pub fn new() -> Arc<Self> {
        let (tx, rx) = kanal::unbounded();
        Arc::new(Self {
            tx,
            rx,
            push_result: Mutex::new(Ok(())),
            peer_caps: Mutex::new(None),
            pool: Mutex::new(None),
            push_delay: Mutex::new(None),
            pushed: AtomicUsize::new(0),
        })
    }

    /// Result returned by every later push.
    pub fn set_push_result(&self, result: FlowResult<()>) {
        *self.push_result.lock() = result;
    }

    /// Slow every later buffer push down by `delay`.
    pub fn set_push_delay(&self, delay: Duration) {
        *self.push_delay.lock() = Some(delay);
    }

    /// Answer caps queries with `caps`.
    pub fn set_peer_caps(&self, caps: Caps) {
        *self.peer_caps.lock() = Some(caps);
    }

    /// Answer allocation queries with this pool proposal.
    pub fn propose_pool(&self, proposal: PoolProposal) {
        *self.pool.lock() = Some(proposal);
    }

    /// Buffers pushed so far, lists counted per buffer.
    #[must_use]
    pub fn pushed(&self) -> usize {
        self.pushed.load(Ordering::SeqCst)
    }

    #[must_use]
    pub fn next(&self, timeout: Duration) -> Option<Item> {
        self.rx.recv_timeout(timeout).ok()
    }

    /// Next buffer, skipping events.
    #[must_use]
    pub fn next_buffer(&self, timeout: Duration) -> Option<Buffer> {
        while let Some(item) = self.next(timeout) {
            if let Item::Buffer(buffer) = item {
                return Some(buffer);
            }
        }
        None
    }

    /// Items up to and including the first event named `name`.
    #[must_use]
    pub fn until_event(&self, name: &str, timeout: Duration) -> Vec<Item> {
        let mut items = Vec::new();
        while let Some(item) = self.next(timeout) {
            let done = item.event_name() == Some(name);
            items.push(item);
            if done {
                break;
            }
        }
        items
    }

    /// Everything received and not yet taken.
    #[must_use]
    pub fn drain(&self) -> Vec<Item> {
        let mut items = Vec::new();
        while let Ok(Some(item)) = self.rx.try_recv() {
            items.push(item);
        }
        items
    }

    fn record(&self, item: Item) {
        let _ = self.tx.send(item);
    }

    fn delay(&self) {
        let delay = *self.push_delay.lock();
        if let Some(delay) = delay {
            std::thread::sleep(delay);
        }
    }
}

impl Downstream for RecordingDownstream {
    fn push(&self, buffer: Buffer) -> FlowResult<()> {
        self.delay();
        self.pushed.fetch_add(1, Ordering::SeqCst);
        self.record(Item::Buffer(buffer));
        *self.push_result.lock()
    }

    fn push_list(&self, list: BufferList) -> FlowResult<()> {
        self.pushed.fetch_add(list.len(), Ordering::SeqCst);
        self.record(Item::List(list));
        *self.push_result.lock()
    }

    fn push_event(&self, event: StreamEvent) -> bool {
        self.record(Item::Event(event));
        true
    }

    fn peer_query(&self, query: &mut Query) -> bool {
        match query {
            Query::Caps { result, .. } => {
                *result = self.peer_caps.lock().clone();
                result.is_some()
            }
            Query::Allocation(allocation) => match self.pool.lock().clone() {
                Some(proposal) => {
                    allocation.pools.push(proposal);
                    true
                }
                None => false,
            },
            _ => false,
        }
    }
}

/// Observation points shared between a [`PatternSource`] and the test.
#[derive(Default)]
pub struct Probe {
    starts: AtomicUsize,
    stops: AtomicUsize,
    unlocks: AtomicUsize,
    unlock_stops: AtomicUsize,
    completion: Mutex<Option<StartCompletion>>,
    unlocked: Mutex<bool>,
    unlocked_cond: Condvar,
    creates: Mutex<usize>,
    creates_cond: Condvar,
}

impl Probe {
    #[must_use]
    pub fn starts(&self) -> usize {
        self.starts.load(Ordering::SeqCst)
    }

    #[must_use]
    pub fn stops(&self) -> usize {
        self.stops.load(Ordering::SeqCst)
    }

    #[must_use]
    pub fn unlocks(&self) -> usize {
        self.unlocks.load(Ordering::SeqCst)
    }

    #[must_use]
    pub fn unlock_stops(&self) -> usize {
        self.unlock_stops.load(Ordering::SeqCst)
    }

    #[must_use]
    pub fn creates(&self) -> usize {
        *self.creates.lock()
    }

    /// Completion captured by a deferred start.
    #[must_use]
    pub fn take_completion(&self) -> Option<StartCompletion> {
        self.completion.lock().take()
    }

    /// Wait until `create` has been entered at least `n` times.
    #[must_use]
    pub fn wait_created(&self, n: usize, timeout: Duration) -> bool {
        let mut creates = self.creates.lock();
        while *creates < n {
            if self.creates_cond.wait_for(&mut creates, timeout).timed_out() {
                return *creates >= n;
            }
        }
        true
    }

    fn enter_create(&self) {
        *self.creates.lock() += 1;
        self.creates_cond.notify_all();
    }

    /// Block until unlocked.
    fn block(&self) {
        let mut unlocked = self.unlocked.lock();
        while !*unlocked {
            self.unlocked_cond.wait(&mut unlocked);
        }
    }

    fn set_unlocked(&self, unlocked: bool) {
        *self.unlocked.lock() = unlocked;
        self.unlocked_cond.notify_all();
    }
}

/// Byte source producing `(offset + i) as u8` patterns.
pub struct PatternSource {
    size: Option<u64>,
    seekable: bool,
    fail_start: bool,
    async_start: bool,
    block_create: bool,
    caps: Caps,
    probe: Arc<Probe>,
}

impl PatternSource {
    #[must_use]
    pub fn new(size: Option<u64>) -> Self {
        Self {
            size,
            seekable: true,
            fail_start: false,
            async_start: false,
            block_create: false,
            caps: Caps::Any,
            probe: Arc::new(Probe::default()),
        }
    }

    #[must_use]
    pub fn seekable(mut self, seekable: bool) -> Self {
        self.seekable = seekable;
        self
    }

    #[must_use]
    pub fn failing_start(mut self) -> Self {
        self.fail_start = true;
        self
    }

    /// Keep the start completion in the probe instead of completing.
    #[must_use]
    pub fn deferred_start(mut self) -> Self {
        self.async_start = true;
        self
    }

    /// Make `create` block until the element unlocks the source.
    #[must_use]
    pub fn blocking(mut self) -> Self {
        self.block_create = true;
        self
    }

    #[must_use]
    pub fn with_caps(mut self, caps: Caps) -> Self {
        self.caps = caps;
        self
    }

    #[must_use]
    pub fn probe(&self) -> Arc<Probe> {
        Arc::clone(&self.probe)
    }
}

impl SourceImpl for PatternSource {
    fn template_caps(&self) -> Caps {
        self.caps.clone()
    }

    fn start(&self, src: &SourceElement) -> SourceResult<()> {
        self.probe.starts.fetch_add(1, Ordering::SeqCst);
        if self.fail_start {
            return Err(SourceError::Resource("cannot open pattern".into()));
        }
        if self.async_start {
            *self.probe.completion.lock() = Some(src.start_completion());
        }
        Ok(())
    }

    fn stop(&self, _src: &SourceElement) -> SourceResult<()> {
        self.probe.stops.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn get_size(&self, _src: &SourceElement) -> Option<u64> {
        self.size
    }

    fn is_seekable(&self, _src: &SourceElement) -> bool {
        self.seekable
    }

    fn unlock(&self, _src: &SourceElement) -> bool {
        self.probe.unlocks.fetch_add(1, Ordering::SeqCst);
        self.probe.set_unlocked(true);
        true
    }

    fn unlock_stop(&self, _src: &SourceElement) -> bool {
        self.probe.unlock_stops.fetch_add(1, Ordering::SeqCst);
        self.probe.set_unlocked(false);
        true
    }

    fn create(&self, src: &SourceElement, offset: u64, size: usize) -> FlowResult<CreateSuccess> {
        self.probe.enter_create();
        if self.block_create {
            self.probe.block();
            return Err(FlowError::Flushing);
        }
        src.default_create(offset, size)
    }

    fn fill(&self, _src: &SourceElement, offset: u64, size: usize, buffer: &mut Buffer) -> FlowResult<()> {
        buffer.set_size(size);
        for (i, byte) in buffer.data_mut().iter_mut().enumerate() {
            *byte = (offset + i as u64) as u8;
        }
        Ok(())
    }
}
