//! Wakeup channel between producers and the dispatch thread.
//!
//! A one-slot `crossbeam-channel`: producers post "something changed" without
//! blocking and coalesce with a wakeup already waiting; `stop` posts the
//! teardown token. The dispatch thread waits on it with a timeout.

use crossbeam_channel::{Receiver, RecvTimeoutError, Sender, TrySendError, bounded};
use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Signal {
    Changed,
    Teardown,
}

/// Why [`Wakeup::wait`] returned.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Wake {
    /// A timer was added or removed.
    Changed,
    /// The scheduler is stopping.
    Teardown,
    /// The wait ran its full length.
    Timeout,
}

#[derive(Debug)]
pub(crate) struct Wakeup {
    tx: Sender<Signal>,
    rx: Receiver<Signal>,
}

impl Wakeup {
    pub(crate) fn new() -> Self {
        let (tx, rx) = bounded(1);
        Self { tx, rx }
    }

    /// Posts a change notification. Never blocks.
    pub(crate) fn notify(&self) {
        self.post(Signal::Changed);
    }

    /// Posts the teardown token. Never blocks.
    ///
    /// If the slot already holds a change notification the token is dropped;
    /// the dispatch thread rechecks the scheduler state on every wakeup, so
    /// the pending notification is enough to make it exit.
    pub(crate) fn teardown(&self) {
        self.post(Signal::Teardown);
    }

    fn post(&self, signal: Signal) {
        match self.tx.try_send(signal) {
            Ok(()) | Err(TrySendError::Full(_)) => {}
            // Both ends live as long as `self`.
            Err(TrySendError::Disconnected(_)) => {}
        }
    }

    /// Blocks until a signal arrives or `timeout` elapses.
    pub(crate) fn wait(&self, timeout: Duration) -> Wake {
        match self.rx.recv_timeout(timeout) {
            Ok(Signal::Changed) => Wake::Changed,
            Ok(Signal::Teardown) | Err(RecvTimeoutError::Disconnected) => Wake::Teardown,
            Err(RecvTimeoutError::Timeout) => Wake::Timeout,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Instant;

    #[test]
    fn wait_times_out_without_signal() {
        let wakeup = Wakeup::new();
        let started = Instant::now();
        assert_eq!(wakeup.wait(Duration::from_millis(20)), Wake::Timeout);
        assert!(started.elapsed() >= Duration::from_millis(20));
    }

    #[test]
    fn notifications_coalesce() {
        let wakeup = Wakeup::new();
        wakeup.notify();
        wakeup.notify();
        wakeup.notify();
        assert_eq!(wakeup.wait(Duration::from_millis(10)), Wake::Changed);
        assert_eq!(wakeup.wait(Duration::from_millis(10)), Wake::Timeout);
    }

    #[test]
    fn teardown_is_distinguished() {
        let wakeup = Wakeup::new();
        wakeup.teardown();
        assert_eq!(wakeup.wait(Duration::from_secs(1)), Wake::Teardown);
    }

    #[test]
    fn notify_wakes_a_blocked_waiter_early() {
        let wakeup = std::sync::Arc::new(Wakeup::new());
        let waiter = std::sync::Arc::clone(&wakeup);
        let started = Instant::now();
        let join = std::thread::spawn(move || waiter.wait(Duration::from_secs(10)));
        std::thread::sleep(Duration::from_millis(20));
        wakeup.notify();
        assert_eq!(join.join().expect("waiter"), Wake::Changed);
        assert!(started.elapsed() < Duration::from_secs(5));
    }
}
