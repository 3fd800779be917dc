//! Clock sources for the scheduler.
//!
//! A scheduler compares timer fire times against "now" from exactly one
//! [`TimeSource`]. Fire times passed to
//! [`Scheduler::add_timer`](crate::Scheduler::add_timer) must be expressed on
//! that same clock.

use crate::types::Time;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};

#[inline]
fn duration_to_nanos_saturating(duration: Duration) -> u64 {
    duration.as_nanos().min(u128::from(u64::MAX)) as u64
}

/// Time source abstraction for getting the current time.
///
/// This trait allows the scheduler to work with wall clock time, a
/// process-local monotonic clock, or virtual time in tests.
pub trait TimeSource: Send + Sync + std::fmt::Debug {
    /// Returns the current time.
    fn now(&self) -> Time;
}

/// Wall clock measured from the UNIX epoch.
///
/// This is the default clock: fire times are seconds since 1970, the same
/// representation callers get from `SystemTime`. The reading never goes
/// backwards even if the system clock is stepped back; it holds at the
/// highest value observed until real time catches up.
#[derive(Debug, Default)]
pub struct SystemClock {
    high_water: AtomicU64,
}

impl SystemClock {
    /// Creates a new system clock.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl TimeSource for SystemClock {
    fn now(&self) -> Time {
        let sample = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map_or(0, duration_to_nanos_saturating);
        let previous = self.high_water.fetch_max(sample, Ordering::AcqRel);
        Time::from_nanos(previous.max(sample))
    }
}

/// Monotonic clock measured from its own creation.
///
/// Uses `std::time::Instant` internally. The epoch is the instant this clock
/// was created, so fire times must be derived from [`TimeSource::now`].
#[derive(Debug)]
pub struct MonotonicClock {
    epoch: Instant,
}

impl MonotonicClock {
    /// Creates a new monotonic clock starting at zero.
    #[must_use]
    pub fn new() -> Self {
        Self {
            epoch: Instant::now(),
        }
    }
}

impl Default for MonotonicClock {
    fn default() -> Self {
        Self::new()
    }
}

impl TimeSource for MonotonicClock {
    fn now(&self) -> Time {
        Time::from_nanos(duration_to_nanos_saturating(self.epoch.elapsed()))
    }
}

/// Manually driven clock.
///
/// Reads whatever the test last set, starting from a chosen instant. The
/// scheduler still waits in real time between cycles, so after moving a
/// virtual clock call [`Scheduler::wake`](crate::Scheduler::wake) to make the
/// dispatch thread look again. Moving it never goes backwards.
///
/// # Example
///
/// ```
/// use std::time::Duration;
/// use timer_queue::time::{TimeSource, VirtualClock};
/// use timer_queue::types::Time;
///
/// let clock = VirtualClock::new();
/// assert_eq!(clock.now(), Time::ZERO);
///
/// clock.advance_by(Duration::from_secs(1));
/// assert_eq!(clock.now(), Time::from_secs(1));
/// ```
#[derive(Debug, Default)]
pub struct VirtualClock {
    nanos: AtomicU64,
}

impl VirtualClock {
    /// Creates a virtual clock reading [`Time::ZERO`].
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a virtual clock reading `time`.
    #[must_use]
    pub const fn starting_at(time: Time) -> Self {
        Self {
            nanos: AtomicU64::new(time.as_nanos()),
        }
    }

    /// Moves the clock forward by `nanos`, stopping at [`Time::MAX`].
    pub fn advance(&self, nanos: u64) {
        let _ = self
            .nanos
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |current| {
                Some(current.saturating_add(nanos))
            });
    }

    /// Moves the clock forward by `duration`, stopping at [`Time::MAX`].
    pub fn advance_by(&self, duration: Duration) {
        self.advance(duration_to_nanos_saturating(duration));
    }

    /// Moves the clock to `time` unless it already reads later.
    pub fn advance_to(&self, time: Time) {
        self.nanos.fetch_max(time.as_nanos(), Ordering::AcqRel);
    }
}

impl TimeSource for VirtualClock {
    fn now(&self) -> Time {
        Time::from_nanos(self.nanos.load(Ordering::Acquire))
    }
}
