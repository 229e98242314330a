use sluice_events::EventBus;

use crate::format::Format;

/// Default bytes requested per `create` call.
pub const DEFAULT_BLOCKSIZE: u32 = 4096;

/// How the element is scheduled once started.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ActivationMode {
    /// The element runs its own streaming task and pushes downstream.
    #[default]
    Push,
    /// Downstream pulls ranges with `get_range`.
    Pull,
}

/// Configuration of a [`SourceElement`](crate::SourceElement).
#[derive(Clone, Debug)]
pub struct SourceConfig {
    /// Element name, used in logs, thread names and bus messages.
    pub name: String,
    /// Bytes requested per `create` call.
    pub blocksize: u32,
    /// Live sources produce only while playing and cannot preroll.
    pub is_live: bool,
    /// Stamp buffers without a pts with the current running time.
    pub do_timestamp: bool,
    /// Segment format. Immutable once the element has started.
    pub format: Format,
    /// Stop with EOS after this many buffers.
    pub num_buffers: Option<u32>,
    /// `start` returns before the source is ready; completion arrives later.
    pub async_start: bool,
    /// Re-query the size when reading past the last known end.
    pub dynamic_size: bool,
    /// Clip reads to the known size and stop with EOS at the end.
    pub automatic_eos: bool,
    pub mode: ActivationMode,
    /// Event bus (optional; one is created when absent).
    pub bus: Option<EventBus>,
    /// Capacity of the internally created bus.
    pub event_channel_capacity: usize,
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self::new("source")
    }
}

impl SourceConfig {
    #[must_use]
    pub fn new<S: Into<String>>(name: S) -> Self {
        Self {
            name: name.into(),
            blocksize: DEFAULT_BLOCKSIZE,
            is_live: false,
            do_timestamp: false,
            format: Format::Bytes,
            num_buffers: None,
            async_start: false,
            dynamic_size: false,
            automatic_eos: true,
            mode: ActivationMode::Push,
            bus: None,
            event_channel_capacity: 16,
        }
    }

    #[must_use]
    pub fn with_blocksize(mut self, blocksize: u32) -> Self {
        self.blocksize = blocksize;
        self
    }

    #[must_use]
    pub fn with_live(mut self, is_live: bool) -> Self {
        self.is_live = is_live;
        self
    }

    /// Enable timestamping. Switches the segment to [`Format::Time`].
    #[must_use]
    pub fn with_do_timestamp(mut self, do_timestamp: bool) -> Self {
        self.do_timestamp = do_timestamp;
        if do_timestamp {
            self.format = Format::Time;
        }
        self
    }

    #[must_use]
    pub fn with_format(mut self, format: Format) -> Self {
        self.format = format;
        self
    }

    #[must_use]
    pub fn with_num_buffers(mut self, num_buffers: u32) -> Self {
        self.num_buffers = Some(num_buffers);
        self
    }

    #[must_use]
    pub fn with_async_start(mut self, async_start: bool) -> Self {
        self.async_start = async_start;
        self
    }

    #[must_use]
    pub fn with_dynamic_size(mut self, dynamic_size: bool) -> Self {
        self.dynamic_size = dynamic_size;
        self
    }

    #[must_use]
    pub fn with_automatic_eos(mut self, automatic_eos: bool) -> Self {
        self.automatic_eos = automatic_eos;
        self
    }

    #[must_use]
    pub fn with_mode(mut self, mode: ActivationMode) -> Self {
        self.mode = mode;
        self
    }

    #[must_use]
    pub fn with_bus(mut self, bus: EventBus) -> Self {
        self.bus = Some(bus);
        self
    }

    #[must_use]
    pub fn with_event_channel_capacity(mut self, capacity: usize) -> Self {
        self.event_channel_capacity = capacity;
        self
    }
}
