//! Helpers shared by unit and integration tests.
//!
//! ```ignore
//! use timer_queue::test_utils::init_test_logging;
//!
//! #[test]
//! fn my_test() {
//!     init_test_logging();
//!     timer_queue::test_phase!("my_test");
//!     // ...
//!     timer_queue::test_complete!("my_test");
//! }
//! ```
//!
//! Set `RUST_LOG` to change verbosity; the default shows this crate's debug
//! records.

use std::sync::Once;
use tracing_subscriber::EnvFilter;

static INIT: Once = Once::new();

/// Installs a test-friendly `tracing` subscriber once per process.
pub fn init_test_logging() {
    INIT.call_once(|| {
        let filter = EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new("timer_queue=debug"));
        let _ = tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_test_writer()
            .with_thread_names(true)
            .try_init();
    });
}

#[doc(hidden)]
pub fn log_phase(name: &str) {
    tracing::info!(test = name, "test phase start");
}

#[doc(hidden)]
pub fn log_complete(name: &str) {
    tracing::info!(test = name, "test complete");
}

#[doc(hidden)]
pub fn log_assertion(message: &str, expected: &str, actual: &str) {
    tracing::debug!(message, expected, actual, "assert");
}

/// Logs the start of a named test.
#[macro_export]
macro_rules! test_phase {
    ($name:expr) => {
        $crate::test_utils::log_phase($name)
    };
}

/// Logs the successful end of a named test.
#[macro_export]
macro_rules! test_complete {
    ($name:expr) => {
        $crate::test_utils::log_complete($name)
    };
}

/// Asserts `cond`, logging the expected and actual values first.
#[macro_export]
macro_rules! assert_with_log {
    ($cond:expr, $msg:expr, $expected:expr, $actual:expr) => {{
        let expected = &$expected;
        let actual = &$actual;
        $crate::test_utils::log_assertion(
            $msg,
            &format!("{expected:?}"),
            &format!("{actual:?}"),
        );
        assert!($cond, "{}: expected {:?}, got {:?}", $msg, expected, actual);
    }};
}
