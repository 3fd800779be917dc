//! Scheduler configuration.
//!
//! [`SchedulerConfig`] controls how the dispatch thread sleeps between
//! cycles and how it is named. Defaults suit most uses; with the
//! `config-file` feature the same settings can be read from TOML:
//!
//! ```toml
//! min_sleep_ms = 20
//! idle_poll_ms = 1000
//! thread_name = "refresh-timers"
//! ```

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Default floor on the dispatch thread's sleep.
pub const DEFAULT_MIN_SLEEP: Duration = Duration::from_millis(20);

/// Default wait when no timer is pending.
pub const DEFAULT_IDLE_POLL: Duration = Duration::from_secs(1);

/// Default name of the dispatch thread.
pub const DEFAULT_THREAD_NAME: &str = "timer-queue-dispatch";

/// Settings for a [`Scheduler`](crate::Scheduler).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SchedulerConfig {
    /// Minimum time the dispatch thread waits between cycles, applied when
    /// the earliest timer is already due or due very soon.
    #[serde(rename = "min_sleep_ms", with = "millis")]
    pub min_sleep: Duration,
    /// Wait used when nothing is pending. Wakeups from `add_timer` cut it
    /// short, so this only matters if a wakeup is ever missed.
    #[serde(rename = "idle_poll_ms", with = "millis")]
    pub idle_poll: Duration,
    /// Name given to the dispatch thread.
    pub thread_name: String,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            min_sleep: DEFAULT_MIN_SLEEP,
            idle_poll: DEFAULT_IDLE_POLL,
            thread_name: DEFAULT_THREAD_NAME.to_string(),
        }
    }
}

impl SchedulerConfig {
    /// Creates the default configuration.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the minimum sleep between dispatch cycles.
    #[must_use]
    pub fn with_min_sleep(mut self, min_sleep: Duration) -> Self {
        self.min_sleep = min_sleep;
        self
    }

    /// Sets the idle poll interval.
    #[must_use]
    pub fn with_idle_poll(mut self, idle_poll: Duration) -> Self {
        self.idle_poll = idle_poll;
        self
    }

    /// Sets the dispatch thread name.
    #[must_use]
    pub fn with_thread_name(mut self, name: impl Into<String>) -> Self {
        self.thread_name = name.into();
        self
    }

    /// Checks that the settings are usable.
    pub fn validate(&self) -> Result<()> {
        if self.idle_poll.is_zero() {
            return Err(Error::config("idle_poll must be non-zero"));
        }
        if self.min_sleep > self.idle_poll {
            return Err(Error::config(format!(
                "min_sleep ({:?}) exceeds idle_poll ({:?})",
                self.min_sleep, self.idle_poll
            )));
        }
        if self.thread_name.contains('\0') {
            return Err(Error::config("thread_name must not contain NUL bytes"));
        }
        Ok(())
    }

    /// How long the dispatch thread waits given the time until the next
    /// deadline (`None` when nothing is pending).
    #[must_use]
    pub fn sleep_for(&self, until_next: Option<Duration>) -> Duration {
        until_next.map_or(self.idle_poll, |d| d.max(self.min_sleep))
    }

    /// Parses and validates a TOML configuration.
    #[cfg(feature = "config-file")]
    pub fn from_toml_str(source: &str) -> Result<Self> {
        let config: Self = toml::from_str(source).map_err(|e| Error::config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Reads, parses and validates a TOML configuration file.
    #[cfg(feature = "config-file")]
    pub fn from_toml_file(path: impl AsRef<std::path::Path>) -> Result<Self> {
        let path = path.as_ref();
        let source = std::fs::read_to_string(path)
            .map_err(|e| Error::config(format!("{}: {e}", path.display())))?;
        Self::from_toml_str(&source)
    }
}

mod millis {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub(super) fn serialize<S>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_u64(value.as_millis().min(u128::from(u64::MAX)) as u64)
    }

    pub(super) fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        u64::deserialize(deserializer).map(Duration::from_millis)
    }
}
