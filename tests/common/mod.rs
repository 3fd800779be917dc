//! Shared helpers for scheduler integration tests.

#![allow(dead_code)]

use parking_lot::Mutex;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::{Duration, Instant};
use timer_queue::test_utils::init_test_logging;
use timer_queue::{Scheduler, SchedulerConfig};

pub fn init_test(name: &str) {
    init_test_logging();
    timer_queue::test_phase!(name);
}

/// A scheduler that reacts quickly, for tests that measure real time.
pub fn fast_scheduler() -> Scheduler {
    Scheduler::with_config(
        SchedulerConfig::new()
            .with_min_sleep(Duration::from_millis(2))
            .with_idle_poll(Duration::from_millis(100)),
    )
    .expect("valid config")
}

/// Shared firing counter plus a callback that bumps it.
pub fn counter() -> (Arc<AtomicUsize>, impl FnMut() + Send + 'static) {
    let hits = Arc::new(AtomicUsize::new(0));
    let c = Arc::clone(&hits);
    (hits, move || {
        c.fetch_add(1, Ordering::SeqCst);
    })
}

/// Shared log of labels in firing order.
#[derive(Clone, Default)]
pub struct FireLog(Arc<Mutex<Vec<usize>>>);

impl FireLog {
    pub fn recorder(&self, label: usize) -> impl FnMut() + Send + 'static {
        let log = Arc::clone(&self.0);
        move || log.lock().push(label)
    }

    pub fn snapshot(&self) -> Vec<usize> {
        self.0.lock().clone()
    }

    pub fn len(&self) -> usize {
        self.0.lock().len()
    }
}

/// Polls `done` until it holds or `timeout` passes.
pub fn wait_until(timeout: Duration, mut done: impl FnMut() -> bool) -> bool {
    let deadline = Instant::now() + timeout;
    while Instant::now() < deadline {
        if done() {
            return true;
        }
        std::thread::sleep(Duration::from_millis(2));
    }
    done()
}
