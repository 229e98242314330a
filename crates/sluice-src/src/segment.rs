use bitflags::bitflags;

use crate::{
    event::{SeekEvent, SeekFlags, SeekType},
    format::Format,
};

bitflags! {
    /// Segment properties carried downstream.
    #[repr(transparent)]
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct SegmentFlags: u8 {
        /// Segment came from a flushing seek; running time restarts at zero.
        const RESET = 0b0000_0001;
        /// Segment seek: finishing the range posts segment-done instead of EOS.
        const SEGMENT = 0b0000_0010;
    }
}

/// Portion of the media timeline currently being produced.
///
/// All positions are in `format` units. `stop` and `duration` are `None`
/// when unknown.
#[derive(Debug, Clone, PartialEq)]
pub struct Segment {
    pub flags: SegmentFlags,
    pub rate: f64,
    pub applied_rate: f64,
    pub format: Format,
    /// Running time at `start`.
    pub base: u64,
    pub start: u64,
    pub stop: Option<u64>,
    /// Stream time at `start`.
    pub time: u64,
    pub position: u64,
    pub duration: Option<u64>,
}

impl Segment {
    #[must_use]
    pub fn new(format: Format) -> Self {
        Self {
            flags: SegmentFlags::empty(),
            rate: 1.0,
            applied_rate: 1.0,
            format,
            base: 0,
            start: 0,
            stop: None,
            time: 0,
            position: 0,
            duration: None,
        }
    }

    /// Apply a seek to this segment.
    ///
    /// Returns `false`, leaving the segment untouched, when the seek is in a
    /// different format, has a zero rate, refers to an unknown duration or
    /// produces an inverted range. `SeekType::End` values count back from
    /// the end of the stream.
    pub fn do_seek(&mut self, seek: &SeekEvent) -> bool {
        if seek.format != self.format || seek.rate == 0.0 {
            return false;
        }

        let start = match seek.start_type {
            SeekType::None => self.start,
            SeekType::Set => seek.start,
            SeekType::End => match self.duration {
                Some(d) => d.saturating_sub(seek.start),
                None => return false,
            },
        };
        let stop = match seek.stop_type {
            SeekType::None => self.stop,
            SeekType::Set => seek.stop,
            SeekType::End => match self.duration {
                Some(d) => Some(d.saturating_sub(seek.stop.unwrap_or(0))),
                None => return false,
            },
        };
        if stop.is_some_and(|stop| start > stop) {
            return false;
        }

        self.base = if seek.flags.contains(SeekFlags::FLUSH) {
            0
        } else {
            self.to_running_time(self.position).unwrap_or(self.base)
        };
        self.rate = seek.rate;
        self.applied_rate = 1.0;
        self.start = start;
        self.stop = stop;
        self.time = start;
        self.position = if seek.rate > 0.0 {
            start
        } else {
            stop.unwrap_or(start)
        };
        self.flags
            .set(SegmentFlags::SEGMENT, seek.flags.contains(SeekFlags::SEGMENT));
        self.flags
            .set(SegmentFlags::RESET, seek.flags.contains(SeekFlags::FLUSH));
        true
    }

    /// Running time of `position`, or `None` outside the segment.
    #[must_use]
    pub fn to_running_time(&self, position: u64) -> Option<u64> {
        if position < self.start || self.stop.is_some_and(|stop| position > stop) {
            return None;
        }
        let delta = if self.rate > 0.0 {
            position - self.start
        } else {
            self.stop? - position
        };
        Some(self.base.saturating_add(scale(delta, self.rate.abs())))
    }

    /// Stream time of `position`, or `None` outside the segment.
    #[must_use]
    pub fn to_stream_time(&self, position: u64) -> Option<u64> {
        if position < self.start || self.stop.is_some_and(|stop| position > stop) {
            return None;
        }
        let delta = position - self.start;
        let abs = self.applied_rate.abs();
        let scaled = if (abs - 1.0).abs() < f64::EPSILON {
            delta
        } else {
            (delta as f64 * abs) as u64
        };
        Some(self.time.saturating_add(scaled))
    }

    /// Position at which the segment ends, if bounded by `stop` or `duration`.
    #[must_use]
    pub fn end(&self) -> Option<u64> {
        match (self.stop, self.duration) {
            (Some(stop), Some(duration)) => Some(stop.min(duration)),
            (stop, duration) => stop.or(duration),
        }
    }
}

impl Default for Segment {
    fn default() -> Self {
        Self::new(Format::default())
    }
}

fn scale(delta: u64, rate: f64) -> u64 {
    if (rate - 1.0).abs() < f64::EPSILON {
        delta
    } else {
        (delta as f64 / rate) as u64
    }
}
