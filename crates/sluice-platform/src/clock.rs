use std::{
    sync::OnceLock,
    time::{Duration, Instant},
};

/// Time value in nanoseconds.
pub type ClockTime = u64;

pub const SECOND: ClockTime = 1_000_000_000;
pub const MSECOND: ClockTime = 1_000_000;
pub const USECOND: ClockTime = 1_000;

/// Monotonic clock counting nanoseconds from its creation.
#[derive(Clone, Copy, Debug)]
pub struct SystemClock {
    epoch: Instant,
}

impl SystemClock {
    #[must_use]
    pub fn new() -> Self {
        Self {
            epoch: Instant::now(),
        }
    }

    /// Current time on this clock.
    #[must_use]
    pub fn now(&self) -> ClockTime {
        duration_to_clock(self.epoch.elapsed())
    }

    /// Instant at which this clock reads `time`.
    #[must_use]
    pub fn instant_at(&self, time: ClockTime) -> Instant {
        self.epoch + Duration::from_nanos(time)
    }
}

impl Default for SystemClock {
    fn default() -> Self {
        Self::new()
    }
}

fn duration_to_clock(d: Duration) -> ClockTime {
    u64::try_from(d.as_nanos()).unwrap_or(ClockTime::MAX)
}

static GLOBAL_CLOCK: OnceLock<SystemClock> = OnceLock::new();

/// Process-wide pipeline clock.
///
/// Lazily initialized on first call; every element syncs against the same
/// epoch so running times are comparable across elements.
pub fn system_clock() -> &'static SystemClock {
    GLOBAL_CLOCK.get_or_init(SystemClock::new)
}
