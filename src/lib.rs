//! timer-queue: a thread-safe, in-process timer queue.
//!
//! # Overview
//!
//! Many producers register one-shot or periodic callbacks to fire at future
//! instants. A single background dispatch thread per [`Scheduler`] fires them
//! in deterministic order, survives panicking callbacks, and honours
//! cancellation even when the timer being cancelled is already on its way to
//! firing.
//!
//! # Guarantees
//!
//! - **Ordering**: timers fire in non-decreasing fire time; ties fire in
//!   identity (creation) order
//! - **Isolation**: a panicking callback is logged and counted; its siblings
//!   in the same cycle still run
//! - **Cancellation**: after [`Scheduler::remove_timer`] returns a timer fires
//!   at most once more, and a periodic timer is never rescheduled
//! - **Synchronous shutdown**: [`Scheduler::stop`] returns only after the
//!   dispatch thread has exited; nothing fires afterwards
//!
//! Not provided: persistence across restarts, distribution across processes,
//! or exact-time firing. Granularity is best-effort milliseconds.
//!
//! # Module Structure
//!
//! - [`types`]: Timer identities and timestamps
//! - [`time`]: Clock sources (`SystemClock`, `MonotonicClock`, `VirtualClock`)
//! - [`timer`]: Timer handles and the ordered [`TimerQueue`](timer::TimerQueue)
//! - [`scheduler`]: The [`Scheduler`] and its dispatch thread
//! - [`config`]: [`SchedulerConfig`]
//! - [`error`](mod@error): Error types

#![deny(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::doc_markdown)]
#![allow(clippy::cast_possible_truncation)]

pub mod config;
pub mod error;
pub mod scheduler;
pub mod time;
pub mod timer;
pub mod types;

mod tracing_compat;

#[cfg(any(test, feature = "test-internals"))]
pub mod test_utils;

pub use config::SchedulerConfig;
pub use error::{Error, ErrorKind, Result};
pub use scheduler::{Scheduler, SchedulerHandle, SchedulerStats, State};
pub use time::{MonotonicClock, SystemClock, TimeSource, VirtualClock};
pub use timer::{Removal, TimerHandle};
pub use types::{Time, TimerId};
