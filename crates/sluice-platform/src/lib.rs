//! Platform primitives shared by the sluice workspace.
//!
//! # Synchronization
//!
//! Re-exports [`parking_lot`] types directly. Every lock in the pipeline is a
//! `parking_lot` mutex: no poisoning, and guards can be waited on with the
//! matching [`Condvar`] without an extra `Result` layer.
//!
//! # Time
//!
//! [`ClockTime`] is a nanosecond count. [`SystemClock`] maps it onto the
//! monotonic [`std::time::Instant`] clock so timed waits can be expressed as
//! absolute deadlines.

#![forbid(unsafe_code)]

mod clock;

pub use clock::{ClockTime, MSECOND, SECOND, SystemClock, USECOND, system_clock};
pub use parking_lot::{Condvar, Mutex, MutexGuard, WaitTimeoutResult};
