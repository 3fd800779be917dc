//! Error types for the timer queue.
//!
//! Registering and removing timers never fails; misuse such as removing an
//! unknown handle is tolerated silently. Errors only come from setting a
//! scheduler up: spawning its dispatch thread or loading its configuration.

use thiserror::Error as ThisError;

/// The kind of a scheduler error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// The dispatch thread could not be spawned.
    Spawn,
    /// The configuration is malformed or inconsistent.
    Config,
}

/// An error from scheduler setup.
#[derive(Debug, ThisError)]
pub enum Error {
    /// The OS refused to create the dispatch thread.
    #[error("failed to spawn dispatch thread `{name}`")]
    Spawn {
        /// Name the thread was given.
        name: String,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },
    /// The configuration could not be parsed or failed validation.
    #[error("invalid scheduler configuration: {0}")]
    Config(String),
}

impl Error {
    /// Creates a configuration error with the given context.
    #[must_use]
    pub fn config(context: impl Into<String>) -> Self {
        Self::Config(context.into())
    }

    /// Returns the error kind.
    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::Spawn { .. } => ErrorKind::Spawn,
            Self::Config(_) => ErrorKind::Config,
        }
    }

    /// Returns `true` if this is a configuration error.
    #[must_use]
    pub const fn is_config(&self) -> bool {
        matches!(self, Self::Config(_))
    }
}

/// Result type for scheduler setup.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error as _;

    #[test]
    fn spawn_error_keeps_source() {
        let err = Error::Spawn {
            name: "dispatch".to_string(),
            source: std::io::Error::other("out of threads"),
        };
        assert_eq!(err.kind(), ErrorKind::Spawn);
        assert!(!err.is_config());
        assert!(err.to_string().contains("dispatch"));
        let source = err.source().expect("source");
        assert!(source.to_string().contains("out of threads"));
    }

    #[test]
    fn config_error_display() {
        let err = Error::config("idle_poll must be non-zero");
        assert_eq!(err.kind(), ErrorKind::Config);
        assert!(err.is_config());
        assert_eq!(
            err.to_string(),
            "invalid scheduler configuration: idle_poll must be non-zero"
        );
    }
}
