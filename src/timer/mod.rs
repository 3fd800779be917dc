//! Timer handles and the ordered timer queue.
//!
//! - [`handle`]: [`TimerHandle`] and the scheduler-owned [`TimerEntry`]
//! - [`queue`]: [`TimerQueue`], the ordered active set with in-flight
//!   cancellation

pub mod handle;
pub mod queue;

pub use handle::{Callback, TimerEntry, TimerHandle};
pub use queue::{Removal, Settled, TimerQueue};
