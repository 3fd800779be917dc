//! Time sources used by the scheduler.

mod clock;

pub use clock::{MonotonicClock, SystemClock, TimeSource, VirtualClock};
