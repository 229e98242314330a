//! The source element: lifecycle, configuration and state changes.
//!
//! Three locks guard the element, always taken in this order:
//!
//! 1. the stream lock (`Inner::stream`), held by the streaming task for a
//!    whole iteration and by any control path that must exclude it (seeks,
//!    flush-stop, start completion);
//! 2. the [`LiveGate`] lock;
//! 3. the general lock (`Inner::object`) for plain state.
//!
//! No path takes an earlier lock while holding a later one. Hooks are never
//! called with the gate or general lock held.

use std::{
    collections::VecDeque,
    fmt,
    sync::{
        Arc, Weak,
        atomic::{AtomicBool, Ordering},
    },
};

use sluice_bufpool::{AllocationParams, Allocator, BufferPool};
use sluice_events::{ElementState, ErrorDomain, EventBus, SourceEvent, StateEvent};
use sluice_platform::{ClockTime, Condvar, Mutex, SystemClock, system_clock};
use sluice_worker::{Task, TaskError, TaskFlow};
use tracing::{debug, error, trace, warn};

use crate::{
    buffer::BufferList,
    caps::Caps,
    config::{ActivationMode, SourceConfig},
    downstream::Downstream,
    error::{FlowError, FlowResult, SourceError, SourceResult},
    event::{SeekEvent, Seqnum, StreamEvent},
    format::Format,
    hooks::SourceImpl,
    live::LiveGate,
    segment::Segment,
    start::{StartCompletion, StartResult, StartState},
};

/// State transition requested from the element.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StateChange {
    NullToReady,
    ReadyToPaused,
    PausedToPlaying,
    PlayingToPaused,
    PausedToReady,
    ReadyToNull,
}

impl StateChange {
    /// Transition between two adjacent states.
    #[must_use]
    pub fn between(from: ElementState, to: ElementState) -> Option<Self> {
        use ElementState::{Null, Paused, Playing, Ready};
        Some(match (from, to) {
            (Null, Ready) => Self::NullToReady,
            (Ready, Paused) => Self::ReadyToPaused,
            (Paused, Playing) => Self::PausedToPlaying,
            (Playing, Paused) => Self::PlayingToPaused,
            (Paused, Ready) => Self::PausedToReady,
            (Ready, Null) => Self::ReadyToNull,
            _ => return None,
        })
    }

    #[must_use]
    pub fn states(self) -> (ElementState, ElementState) {
        use ElementState::{Null, Paused, Playing, Ready};
        match self {
            Self::NullToReady => (Null, Ready),
            Self::ReadyToPaused => (Ready, Paused),
            Self::PausedToPlaying => (Paused, Playing),
            Self::PlayingToPaused => (Playing, Paused),
            Self::PausedToReady => (Paused, Ready),
            Self::ReadyToNull => (Ready, Null),
        }
    }
}

/// Successful outcome of a state change.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StateChangeSuccess {
    Success,
    /// The start is still completing in the background.
    Async,
    /// Live source: no data until playing.
    NoPreroll,
}

/// Latest quality-of-service feedback from downstream.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct QosValues {
    pub proportion: f64,
    pub earliest_time: Option<ClockTime>,
}

impl Default for QosValues {
    fn default() -> Self {
        Self {
            proportion: 1.0,
            earliest_time: None,
        }
    }
}

/// Guarded by the stream lock.
#[derive(Debug)]
pub(crate) struct StreamState {
    /// Units produced since the last start.
    pub(crate) produced: u64,
    pub(crate) last_flow: FlowResult<()>,
}

/// Guarded by the general lock.
pub(crate) struct ObjectState {
    pub(crate) start: StartState,
    pub(crate) configured_mode: ActivationMode,
    /// Mode the element is activated in, if any.
    pub(crate) mode: Option<ActivationMode>,
    pub(crate) state: ElementState,
    pub(crate) segment: Segment,
    pub(crate) segment_pending: bool,
    pub(crate) segment_seqnum: Seqnum,
    pub(crate) stream_start_pending: bool,
    pub(crate) discont: bool,
    pub(crate) pending_seek: Option<SeekEvent>,
    pub(crate) pending_eos: Option<StreamEvent>,
    pub(crate) pending_events: VecDeque<StreamEvent>,
    pub(crate) pending_list: Option<BufferList>,
    pub(crate) pool: Option<BufferPool>,
    pub(crate) allocator: Option<Arc<dyn Allocator>>,
    pub(crate) params: AllocationParams,
    pub(crate) caps: Option<Caps>,
    pub(crate) blocksize: u32,
    pub(crate) num_buffers: Option<u32>,
    pub(crate) num_buffers_left: Option<u32>,
    pub(crate) do_timestamp: bool,
    pub(crate) async_start: bool,
    pub(crate) dynamic_size: bool,
    pub(crate) automatic_eos: bool,
    pub(crate) seekable: bool,
    pub(crate) random_access: bool,
    pub(crate) qos: QosValues,
    /// Clock time at which running time was zero, while playing.
    pub(crate) base_time: Option<ClockTime>,
    /// Running time reached when playback last paused.
    pub(crate) paused_running_time: ClockTime,
    /// Why the streaming task last parked itself.
    pub(crate) last_pause: Option<FlowError>,
}

pub(crate) struct Inner {
    pub(crate) name: String,
    pub(crate) imp: Box<dyn SourceImpl>,
    pub(crate) downstream: Arc<dyn Downstream>,
    pub(crate) bus: EventBus,
    pub(crate) stream: Mutex<StreamState>,
    pub(crate) live: LiveGate,
    pub(crate) object: Mutex<ObjectState>,
    /// Signalled whenever a start cycle resolves. Paired with `object`.
    pub(crate) async_cond: Condvar,
    pub(crate) task: Task,
    pub(crate) clock: &'static SystemClock,
    pub(crate) has_pending_eos: AtomicBool,
    pub(crate) have_events: AtomicBool,
    pub(crate) need_reconfigure: AtomicBool,
}

impl Drop for Inner {
    fn drop(&mut self) {
        self.task.stop();
        if let Err(e) = self.task.join() {
            debug!(name = %self.name, error = %e, "streaming task not joined on drop");
        }
    }
}

/// A pull-or-push source stage.
///
/// Cheap to clone; clones share the element. Control methods may be called
/// from any thread, but not from inside [`SourceImpl`] hooks unless
/// documented otherwise.
#[derive(Clone)]
pub struct SourceElement {
    pub(crate) inner: Arc<Inner>,
}

/// Non-owning handle, used by the streaming task and start completions.
#[derive(Clone)]
pub(crate) struct WeakSourceElement(Weak<Inner>);

impl WeakSourceElement {
    pub(crate) fn upgrade(&self) -> Option<SourceElement> {
        self.0.upgrade().map(|inner| SourceElement { inner })
    }
}

impl fmt::Debug for WeakSourceElement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("WeakSourceElement")
    }
}

impl SourceElement {
    pub fn new<S: SourceImpl>(config: SourceConfig, imp: S, downstream: Arc<dyn Downstream>) -> Self {
        let bus = config
            .bus
            .clone()
            .unwrap_or_else(|| EventBus::new(config.event_channel_capacity));

        let inner = Arc::new_cyclic(|weak: &Weak<Inner>| {
            let weak = WeakSourceElement(weak.clone());
            let task = Task::new(format!("{}:src", config.name), move || match weak.upgrade() {
                Some(src) => src.stream_iteration(),
                None => TaskFlow::Pause,
            });

            Inner {
                name: config.name.clone(),
                imp: Box::new(imp),
                downstream,
                bus,
                stream: Mutex::new(StreamState {
                    produced: 0,
                    last_flow: Ok(()),
                }),
                live: LiveGate::new(config.is_live),
                object: Mutex::new(ObjectState {
                    start: StartState::default(),
                    configured_mode: config.mode,
                    mode: None,
                    state: ElementState::Null,
                    segment: Segment::new(config.format),
                    segment_pending: false,
                    segment_seqnum: Seqnum::next(),
                    stream_start_pending: false,
                    discont: false,
                    pending_seek: None,
                    pending_eos: None,
                    pending_events: VecDeque::new(),
                    pending_list: None,
                    pool: None,
                    allocator: None,
                    params: AllocationParams::default(),
                    caps: None,
                    blocksize: config.blocksize,
                    num_buffers: config.num_buffers,
                    num_buffers_left: config.num_buffers,
                    do_timestamp: config.do_timestamp,
                    async_start: config.async_start,
                    dynamic_size: config.dynamic_size,
                    automatic_eos: config.automatic_eos,
                    seekable: false,
                    random_access: false,
                    qos: QosValues::default(),
                    base_time: None,
                    paused_running_time: 0,
                    last_pause: None,
                }),
                async_cond: Condvar::new(),
                task,
                clock: system_clock(),
                has_pending_eos: AtomicBool::new(false),
                have_events: AtomicBool::new(false),
                need_reconfigure: AtomicBool::new(true),
            }
        });
        debug!(name = %config.name, mode = ?config.mode, live = config.is_live, "source created");
        Self { inner }
    }

    pub(crate) fn downgrade(&self) -> WeakSourceElement {
        WeakSourceElement(Arc::downgrade(&self.inner))
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.inner.name
    }

    #[must_use]
    pub fn bus(&self) -> &EventBus {
        &self.inner.bus
    }

    #[must_use]
    pub fn is_live(&self) -> bool {
        self.inner.live.is_live()
    }

    /// Live sources only produce while playing and cannot preroll.
    pub fn set_live(&self, live: bool) {
        self.inner.live.set_live(live);
    }

    #[must_use]
    pub fn format(&self) -> Format {
        self.inner.object.lock().segment.format
    }

    /// Change the segment format. Refused once started.
    pub fn set_format(&self, format: Format) -> SourceResult<()> {
        let mut obj = self.inner.object.lock();
        if obj.start.is_active() {
            return Err(SourceError::Usage("format cannot change after start"));
        }
        obj.segment = Segment::new(format);
        Ok(())
    }

    #[must_use]
    pub fn blocksize(&self) -> u32 {
        self.inner.object.lock().blocksize
    }

    pub fn set_blocksize(&self, blocksize: u32) {
        self.inner.object.lock().blocksize = blocksize;
    }

    #[must_use]
    pub fn do_timestamp(&self) -> bool {
        self.inner.object.lock().do_timestamp
    }

    /// Stamp outgoing buffers with the running time. Enabling it on a
    /// stopped element also switches the segment to [`Format::Time`].
    pub fn set_do_timestamp(&self, do_timestamp: bool) {
        let mut obj = self.inner.object.lock();
        obj.do_timestamp = do_timestamp;
        if do_timestamp && !obj.start.is_active() && obj.segment.format != Format::Time {
            obj.segment = Segment::new(Format::Time);
        }
    }

    #[must_use]
    pub fn is_async(&self) -> bool {
        self.inner.object.lock().async_start
    }

    pub fn set_async(&self, async_start: bool) {
        self.inner.object.lock().async_start = async_start;
    }

    pub fn set_dynamic_size(&self, dynamic: bool) {
        self.inner.object.lock().dynamic_size = dynamic;
    }

    pub fn set_automatic_eos(&self, automatic_eos: bool) {
        self.inner.object.lock().automatic_eos = automatic_eos;
    }

    #[must_use]
    pub fn num_buffers(&self) -> Option<u32> {
        self.inner.object.lock().num_buffers
    }

    /// Buffer budget applied from the next start.
    pub fn set_num_buffers(&self, num_buffers: Option<u32>) {
        self.inner.object.lock().num_buffers = num_buffers;
    }

    #[must_use]
    pub fn is_started(&self) -> bool {
        self.inner.object.lock().start.is_started()
    }

    #[must_use]
    pub fn is_starting(&self) -> bool {
        self.inner.object.lock().start.is_starting()
    }

    /// Current element state.
    #[must_use]
    pub fn state(&self) -> ElementState {
        self.inner.object.lock().state
    }

    #[must_use]
    pub fn segment(&self) -> Segment {
        self.inner.object.lock().segment.clone()
    }

    /// Caps last configured with [`SourceElement::set_caps`].
    #[must_use]
    pub fn current_caps(&self) -> Option<Caps> {
        self.inner.object.lock().caps.clone()
    }

    #[must_use]
    pub fn buffer_pool(&self) -> Option<BufferPool> {
        self.inner.object.lock().pool.clone()
    }

    #[must_use]
    pub fn allocator(&self) -> (Option<Arc<dyn Allocator>>, AllocationParams) {
        let obj = self.inner.object.lock();
        (obj.allocator.clone(), obj.params)
    }

    #[must_use]
    pub fn qos_values(&self) -> QosValues {
        self.inner.object.lock().qos
    }

    /// Request renegotiation before the next buffer.
    pub fn mark_reconfigure(&self) {
        self.inner.need_reconfigure.store(true, Ordering::Release);
    }

    #[must_use]
    pub fn needs_reconfigure(&self) -> bool {
        self.inner.need_reconfigure.load(Ordering::Acquire)
    }

    /// Block until a live source may produce. See [`LiveGate::wait_playing`].
    pub fn wait_playing(&self) -> FlowResult<()> {
        self.inner.live.wait_playing()
    }

    /// Running time now, if the element is playing.
    #[must_use]
    pub fn running_time(&self) -> Option<ClockTime> {
        let base = self.inner.object.lock().base_time?;
        Some(self.inner.clock.now().saturating_sub(base))
    }

    /// Open a start cycle and run [`SourceImpl::start`].
    ///
    /// No-op when already starting or started. Synchronous sources are
    /// completed right away and the final result is returned. Async sources
    /// return `Ok` and finish through [`SourceElement::start_complete`] or a
    /// [`StartCompletion`]; use [`SourceElement::start_wait`] for the result.
    pub fn start(&self) -> SourceResult<()> {
        let generation = {
            let mut live = self.inner.live.lock();
            let mut obj = self.inner.object.lock();
            if obj.start.is_active() {
                debug!(name = %self.inner.name, "already started");
                return Ok(());
            }
            let generation = obj.start.begin();
            let format = obj.segment.format;
            obj.segment = Segment::new(format);
            obj.num_buffers_left = obj.num_buffers;
            obj.segment_pending = false;
            obj.segment_seqnum = Seqnum::next();
            obj.stream_start_pending = true;
            live.forced_eos = false;
            generation
        };
        self.inner.stream.lock().produced = 0;
        debug!(name = %self.inner.name, generation, "starting");

        if let Err(e) = self.inner.imp.start(self) {
            error!(name = %self.inner.name, error = %e, "start failed");
            self.post_error(ErrorDomain::Resource, "Failed to start", Some(e.to_string()));
            self.resolve_start(generation, StartResult::Error);
            return Err(e);
        }

        if self.is_async() {
            return Ok(());
        }
        self.complete_start(Some(generation), StartResult::Ok);
        match self.start_wait() {
            StartResult::Ok => Ok(()),
            StartResult::Flushing => Err(SourceError::Flushing),
            result => Err(SourceError::StateChange(format!("start finished with {result:?}"))),
        }
    }

    /// Token completing the start cycle currently in flight.
    ///
    /// Call from [`SourceImpl::start`]. Outside a cycle the token refers to
    /// the last generation and its completion is ignored.
    #[must_use]
    pub fn start_completion(&self) -> StartCompletion {
        let generation = self.inner.object.lock().start.generation();
        StartCompletion::new(self.downgrade(), generation)
    }

    /// Complete the start cycle in flight. Ignored if there is none.
    pub fn start_complete(&self, result: StartResult) {
        self.complete_start(None, result);
    }

    /// Wait for the start cycle to resolve and return its result.
    ///
    /// Returns immediately once resolved; `Flushing` if no cycle ran or it
    /// was cancelled by [`SourceElement::stop`].
    pub fn start_wait(&self) -> StartResult {
        let mut obj = self.inner.object.lock();
        while obj.start.is_starting() {
            trace!(name = %self.inner.name, "waiting for start to complete");
            self.inner.async_cond.wait(&mut obj);
        }
        obj.start.result
    }

    pub(crate) fn complete_start(&self, generation: Option<u64>, result: StartResult) {
        let (generation, format, mode) = {
            let obj = self.inner.object.lock();
            if !obj.start.accepts(generation) {
                debug!(
                    name = %self.inner.name,
                    ?generation,
                    current = obj.start.generation(),
                    "ignoring stale start completion"
                );
                return;
            }
            (obj.start.generation(), obj.segment.format, obj.mode)
        };

        if result != StartResult::Ok {
            debug!(name = %self.inner.name, generation, ?result, "start completed without success");
            self.resolve_start(generation, result);
            return;
        }

        let size = if format == Format::Bytes {
            self.inner.imp.get_size(self)
        } else {
            None
        };
        let seekable = self.inner.imp.is_seekable(self);
        let random_access = seekable && format == Format::Bytes;

        // The hooks above ran unlocked; stop() may have resolved the cycle.
        let mut stream = self.inner.stream.lock();
        {
            let live = self.inner.live.lock();
            let mut obj = self.inner.object.lock();
            if !obj.start.accepts(Some(generation)) {
                debug!(name = %self.inner.name, generation, "start cancelled while completing");
                return;
            }
            if live.flushing {
                drop(obj);
                drop(live);
                drop(stream);
                debug!(name = %self.inner.name, "flushing while completing start");
                self.resolve_start(generation, StartResult::Flushing);
                return;
            }
            if format == Format::Bytes {
                obj.segment.duration = size;
            }
            obj.seekable = seekable;
            obj.random_access = random_access;
        }
        debug!(name = %self.inner.name, ?size, seekable, random_access, "start completing");
        self.mark_reconfigure();

        match mode {
            Some(ActivationMode::Push) => {
                let seek = self.inner.object.lock().pending_seek.take();
                if !self.seek_locked(&mut stream, seek.as_ref()) {
                    drop(stream);
                    self.fail_start(generation, ErrorDomain::Stream, "Failed to perform initial seek");
                    return;
                }
            }
            Some(ActivationMode::Pull) => {
                if !random_access {
                    drop(stream);
                    self.fail_start(generation, ErrorDomain::Core, "Source cannot operate in pull mode");
                    return;
                }
            }
            None => {
                drop(stream);
                self.fail_start(generation, ErrorDomain::Core, "Source pad not activated yet");
                return;
            }
        }

        let mut obj = self.inner.object.lock();
        if !obj.start.accepts(Some(generation)) {
            debug!(name = %self.inner.name, generation, "start cancelled while completing");
            return;
        }
        let spawned = match mode {
            Some(ActivationMode::Push) => self.inner.task.start(),
            _ => Ok(()),
        };
        obj.start.resolve(if spawned.is_ok() {
            StartResult::Ok
        } else {
            StartResult::Error
        });
        self.inner.async_cond.notify_all();
        drop(obj);
        drop(stream);

        match spawned {
            Err(e) => self.post_error(ErrorDomain::Core, "Failed to start streaming task", Some(e.to_string())),
            Ok(()) => debug!(name = %self.inner.name, generation, "started"),
        }
    }

    fn resolve_start(&self, generation: u64, result: StartResult) {
        let mut obj = self.inner.object.lock();
        if obj.start.accepts(Some(generation)) {
            obj.start.resolve(result);
        }
        self.inner.async_cond.notify_all();
    }

    fn fail_start(&self, generation: u64, domain: ErrorDomain, message: &str) {
        error!(name = %self.inner.name, generation, message, "start failed");
        if let Err(e) = self.stop() {
            warn!(name = %self.inner.name, error = %e, "stop after failed start");
        }
        self.post_error(domain, message, None);
        let mut obj = self.inner.object.lock();
        if obj.start.generation() == generation && !obj.start.is_active() {
            obj.start.result = StartResult::Error;
        }
        self.inner.async_cond.notify_all();
    }

    /// Stop streaming and release resources. Idempotent.
    ///
    /// Resolves a start in flight with `Flushing`, joins the streaming task
    /// and calls [`SourceImpl::stop`] if the source was started or starting.
    pub fn stop(&self) -> SourceResult<()> {
        debug!(name = %self.inner.name, "stopping");
        self.set_flushing(true);
        let was_active = {
            let mut obj = self.inner.object.lock();
            let was_active = obj.start.cancel();
            self.inner.task.stop();
            self.inner.async_cond.notify_all();
            was_active
        };

        match self.inner.task.join() {
            Ok(()) => {}
            Err(TaskError::JoinSelf) => debug!(name = %self.inner.name, "stop from the streaming thread"),
            Err(e) => warn!(name = %self.inner.name, error = %e, "streaming task ended badly"),
        }
        {
            let mut stream = self.inner.stream.lock();
            debug!(
                name = %self.inner.name,
                produced = stream.produced,
                last_flow = ?stream.last_flow,
                "streaming finished"
            );
            self.flush_stop_locked(&mut stream);
        }

        if !was_active {
            return Ok(());
        }
        let result = self.inner.imp.stop(self);
        self.inner.object.lock().pending_list = None;
        self.set_allocation(None, None, AllocationParams::default());
        debug!(name = %self.inner.name, "stopped");
        result
    }

    /// Perform one state transition.
    pub fn change_state(&self, transition: StateChange) -> SourceResult<StateChangeSuccess> {
        let mut success = StateChangeSuccess::Success;
        match transition {
            StateChange::NullToReady | StateChange::ReadyToNull => {}
            StateChange::ReadyToPaused => {
                let live = self.is_live();
                self.activate()?;
                if live {
                    success = StateChangeSuccess::NoPreroll;
                } else if self.is_starting() {
                    success = StateChangeSuccess::Async;
                }
            }
            StateChange::PausedToPlaying => {
                let resume = {
                    let mut obj = self.inner.object.lock();
                    let now = self.inner.clock.now();
                    obj.base_time = Some(now.saturating_sub(obj.paused_running_time));
                    obj.mode == Some(ActivationMode::Push)
                        && obj.start.is_started()
                        && obj.last_pause == Some(FlowError::Flushing)
                };
                if self.is_live() {
                    self.inner.live.set_playing(true);
                    // A flush-stop while paused leaves the task parked.
                    if resume {
                        self.restart_task();
                    }
                }
            }
            StateChange::PlayingToPaused => {
                {
                    let mut obj = self.inner.object.lock();
                    if let Some(base) = obj.base_time.take() {
                        obj.paused_running_time = self.inner.clock.now().saturating_sub(base);
                    }
                }
                if self.is_live() {
                    self.inner.live.set_playing(false);
                    success = StateChangeSuccess::NoPreroll;
                }
            }
            StateChange::PausedToReady => {
                self.deactivate()?;
                let mut obj = self.inner.object.lock();
                obj.pending_eos = None;
                obj.pending_seek = None;
                obj.base_time = None;
                obj.paused_running_time = 0;
                self.inner.has_pending_eos.store(false, Ordering::Release);
            }
        }

        let (old, new) = transition.states();
        self.inner.object.lock().state = new;
        debug!(name = %self.inner.name, %old, %new, ?success, "state changed");
        self.inner.bus.publish(StateEvent::Changed {
            element: self.inner.name.clone(),
            old,
            new,
        });
        Ok(success)
    }

    /// Walk through every intermediate transition up to `target`.
    pub fn set_state(&self, target: ElementState) -> SourceResult<StateChangeSuccess> {
        let mut last = StateChangeSuccess::Success;
        let mut current = self.state();
        while let Some(next) = current.step_towards(target) {
            let Some(transition) = StateChange::between(current, next) else {
                return Err(SourceError::StateChange(format!("no transition {current} -> {next}")));
            };
            last = self.change_state(transition)?;
            current = next;
        }
        Ok(last)
    }

    fn activate(&self) -> SourceResult<()> {
        let mode = {
            let mut obj = self.inner.object.lock();
            let mode = obj.configured_mode;
            obj.mode = Some(mode);
            mode
        };
        debug!(name = %self.inner.name, ?mode, "activating");
        if let Err(e) = self.start() {
            self.inner.object.lock().mode = None;
            return Err(SourceError::StateChange(format!("failed to activate in {mode:?} mode: {e}")));
        }
        Ok(())
    }

    fn deactivate(&self) -> SourceResult<()> {
        debug!(name = %self.inner.name, "deactivating");
        let result = self.stop();
        self.inner.object.lock().mode = None;
        result
    }

    /// Replace the segment, e.g. from inside `create` after a format-specific
    /// reposition. Refused when the format differs or is undefined.
    pub fn new_segment(&self, segment: Segment) -> bool {
        let mut obj = self.inner.object.lock();
        if obj.segment.format == Format::Undefined || obj.segment.format != segment.format {
            warn!(
                name = %self.inner.name,
                current = %obj.segment.format,
                requested = %segment.format,
                "refusing segment in another format"
            );
            return false;
        }
        obj.segment = segment;
        obj.segment_pending = true;
        obj.segment_seqnum = Seqnum::next();
        true
    }

    /// Continue playback seamlessly at `[start, stop)` with stream time `time`.
    pub fn new_seamless_segment(&self, start: u64, stop: Option<u64>, time: u64) -> bool {
        let mut obj = self.inner.object.lock();
        let segment = &mut obj.segment;
        if let Some(running) = segment.to_running_time(segment.position) {
            segment.base = running;
        }
        segment.start = start;
        segment.stop = stop;
        segment.time = time;
        segment.position = start;
        obj.segment_pending = true;
        obj.segment_seqnum = Seqnum::next();
        obj.discont = true;
        true
    }

    /// Hand over a batch of buffers to push instead of a single `create` result.
    ///
    /// At most one batch may be pending at a time.
    pub fn submit_buffer_list(&self, list: BufferList) -> SourceResult<()> {
        let mut obj = self.inner.object.lock();
        if obj.pending_list.is_some() {
            return Err(SourceError::Usage("buffer list already pending"));
        }
        trace!(name = %self.inner.name, buffers = list.len(), "buffer list submitted");
        obj.pending_list = Some(list);
        Ok(())
    }

    /// Post an element error on the bus.
    pub fn post_error(&self, domain: ErrorDomain, message: &str, detail: Option<String>) {
        error!(name = %self.inner.name, %domain, message, ?detail, "element error");
        let listeners = self.inner.bus.publish(SourceEvent::Error {
            element: self.inner.name.clone(),
            domain,
            message: message.to_owned(),
            debug: detail,
        });
        if listeners == 0 {
            debug!(name = %self.inner.name, "nobody listens for element errors");
        }
    }

    /// Post a warning on the bus.
    pub fn post_warning(&self, message: &str) {
        warn!(name = %self.inner.name, message, "element warning");
        self.inner.bus.publish(SourceEvent::Warning {
            element: self.inner.name.clone(),
            message: message.to_owned(),
        });
    }

    pub(crate) fn push_downstream_event(&self, event: StreamEvent) -> bool {
        trace!(name = %self.inner.name, event = event.name(), "pushing event");
        self.inner.downstream.push_event(event)
    }
}

impl fmt::Debug for SourceElement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SourceElement")
            .field("name", &self.inner.name)
            .finish_non_exhaustive()
    }
}
