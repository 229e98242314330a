//! Events flowing between a source and its downstream peer.

use std::sync::atomic::{AtomicU32, Ordering};

use bitflags::bitflags;
use bytes::Bytes;
use sluice_platform::ClockTime;

use crate::{caps::Caps, format::Format, segment::Segment};

static NEXT_SEQNUM: AtomicU32 = AtomicU32::new(1);
static NEXT_GROUP_ID: AtomicU32 = AtomicU32::new(1);

/// Sequence number tying related events together, e.g. a seek and the
/// flush and segment events it causes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Seqnum(u32);

impl Seqnum {
    /// Allocate a fresh, never-zero sequence number.
    pub fn next() -> Self {
        let mut value = NEXT_SEQNUM.fetch_add(1, Ordering::Relaxed);
        if value == 0 {
            value = NEXT_SEQNUM.fetch_add(1, Ordering::Relaxed);
        }
        Self(value)
    }

    #[must_use]
    pub fn get(self) -> u32 {
        self.0
    }
}

/// Allocate a stream group id.
pub fn next_group_id() -> u32 {
    NEXT_GROUP_ID.fetch_add(1, Ordering::Relaxed)
}

bitflags! {
    #[repr(transparent)]
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct SeekFlags: u8 {
        /// Discard queued data and restart running time.
        const FLUSH = 0b0000_0001;
        const ACCURATE = 0b0000_0010;
        const KEY_UNIT = 0b0000_0100;
        /// Post segment-done instead of EOS when the range is finished.
        const SEGMENT = 0b0000_1000;
    }
}

/// How a seek boundary is interpreted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SeekType {
    /// Keep the current value.
    None,
    /// Absolute position.
    #[default]
    Set,
    /// Distance back from the end of the stream.
    End,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SeekEvent {
    pub rate: f64,
    pub format: Format,
    pub flags: SeekFlags,
    pub start_type: SeekType,
    pub start: u64,
    pub stop_type: SeekType,
    pub stop: Option<u64>,
    pub seqnum: Seqnum,
}

impl SeekEvent {
    /// Forward seek to `[start, stop)` at normal rate.
    #[must_use]
    pub fn new(format: Format, flags: SeekFlags, start: u64, stop: Option<u64>) -> Self {
        Self {
            rate: 1.0,
            format,
            flags,
            start_type: SeekType::Set,
            start,
            stop_type: SeekType::Set,
            stop,
            seqnum: Seqnum::next(),
        }
    }

    #[must_use]
    pub fn with_rate(mut self, rate: f64) -> Self {
        self.rate = rate;
        self
    }
}

/// Quality-of-service feedback from downstream.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct QosEvent {
    pub proportion: f64,
    /// Lateness of the buffer at `timestamp`, negative when early.
    pub diff: i64,
    pub timestamp: ClockTime,
}

/// Kind of an application-defined event; decides how a source forwards it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CustomKind {
    /// Serialized with data, travelling downstream.
    Downstream,
    /// Pushed downstream immediately, bypassing data.
    DownstreamOob,
    /// Serialized, travelling in both directions.
    Both,
    /// Immediate, travelling in both directions.
    BothOob,
    /// Travelling upstream only.
    Upstream,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CustomEvent {
    pub kind: CustomKind,
    pub name: String,
    pub data: Bytes,
}

/// Event exchanged with the downstream peer.
#[derive(Debug, Clone, PartialEq)]
pub enum StreamEvent {
    StreamStart { stream_id: String, group_id: u32 },
    Caps(Caps),
    Segment { segment: Segment, seqnum: Seqnum },
    Tag(Vec<(String, String)>),
    Eos { seqnum: Seqnum },
    FlushStart { seqnum: Seqnum },
    FlushStop { reset_time: bool, seqnum: Seqnum },
    Seek(SeekEvent),
    Qos(QosEvent),
    Reconfigure,
    Latency(ClockTime),
    Custom(CustomEvent),
    Protection { system_id: String, data: Bytes },
    SinkMessage { name: String, data: Bytes },
    SegmentDone { format: Format, position: u64, seqnum: Seqnum },
    Navigation(String),
    BufferSize { format: Format, min: u64, max: u64 },
}

impl StreamEvent {
    #[must_use]
    pub fn eos() -> Self {
        Self::Eos {
            seqnum: Seqnum::next(),
        }
    }

    #[must_use]
    pub fn flush_start() -> Self {
        Self::FlushStart {
            seqnum: Seqnum::next(),
        }
    }

    #[must_use]
    pub fn flush_stop(reset_time: bool) -> Self {
        Self::FlushStop {
            reset_time,
            seqnum: Seqnum::next(),
        }
    }

    #[must_use]
    pub fn custom(kind: CustomKind, name: impl Into<String>, data: impl Into<Bytes>) -> Self {
        Self::Custom(CustomEvent {
            kind,
            name: name.into(),
            data: data.into(),
        })
    }

    /// Short name for logs.
    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            Self::StreamStart { .. } => "stream-start",
            Self::Caps(_) => "caps",
            Self::Segment { .. } => "segment",
            Self::Tag(_) => "tag",
            Self::Eos { .. } => "eos",
            Self::FlushStart { .. } => "flush-start",
            Self::FlushStop { .. } => "flush-stop",
            Self::Seek(_) => "seek",
            Self::Qos(_) => "qos",
            Self::Reconfigure => "reconfigure",
            Self::Latency(_) => "latency",
            Self::Custom(_) => "custom",
            Self::Protection { .. } => "protection",
            Self::SinkMessage { .. } => "sink-message",
            Self::SegmentDone { .. } => "segment-done",
            Self::Navigation(_) => "navigation",
            Self::BufferSize { .. } => "buffer-size",
        }
    }

    #[must_use]
    pub fn seqnum(&self) -> Option<Seqnum> {
        match self {
            Self::Segment { seqnum, .. }
            | Self::Eos { seqnum }
            | Self::FlushStart { seqnum }
            | Self::FlushStop { seqnum, .. }
            | Self::SegmentDone { seqnum, .. } => Some(*seqnum),
            Self::Seek(seek) => Some(seek.seqnum),
            _ => None,
        }
    }
}
