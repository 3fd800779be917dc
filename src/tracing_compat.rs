//! Optional tracing integration.
//!
//! With the `tracing-integration` feature the logging macros are the
//! `tracing` crate's own. Without it they expand to nothing, so call sites
//! stay unconditional and cost nothing.

#[cfg(feature = "tracing-integration")]
pub(crate) use tracing::{debug, info, trace, warn};

#[cfg(not(feature = "tracing-integration"))]
macro_rules! noop_log {
    ($($arg:tt)*) => {};
}

#[cfg(not(feature = "tracing-integration"))]
pub(crate) use noop_log as debug;
#[cfg(not(feature = "tracing-integration"))]
pub(crate) use noop_log as info;
#[cfg(not(feature = "tracing-integration"))]
pub(crate) use noop_log as trace;
#[cfg(not(feature = "tracing-integration"))]
pub(crate) use noop_log as warn;
