//! The dispatch loop run by each scheduler's background thread.

use super::Inner;
use super::wakeup::Wake;
use crate::timer::TimerEntry;
use crate::tracing_compat::{debug, trace, warn};
use std::any::Any;
use std::panic::{self, AssertUnwindSafe};

/// Body of the dispatch thread. Returns once the scheduler is stopped.
pub(super) fn run(inner: &Inner) {
    inner.mark_dispatch_thread();
    debug!(thread = ?std::thread::current().name(), "dispatch thread started");

    loop {
        if inner.is_stopped() {
            break;
        }

        let now = inner.clock.now();
        let mut batch = inner.queue.lock().pop_expired(now);
        if !batch.is_empty() {
            trace!(count = batch.len(), now = %now, "firing expired timers");
            fire_batch(inner, &mut batch);
        }

        // A stop observed mid-batch abandons the batch rather than settling it.
        if inner.is_stopped() {
            break;
        }

        let until_next = inner.with_queue(|queue| {
            let settled = queue.settle(batch);
            inner.counters.record_settled(&settled);
            queue.time_until_next(inner.clock.now())
        });

        match inner.wakeup.wait(inner.config.sleep_for(until_next)) {
            Wake::Teardown => break,
            Wake::Changed | Wake::Timeout => {}
        }
    }

    inner.abandon_pending();
    debug!("dispatch thread exiting");
}

/// Runs each callback in order, isolating panics.
///
/// Stops early if the scheduler is stopped between two callbacks.
fn fire_batch(inner: &Inner, batch: &mut [TimerEntry]) {
    for entry in batch.iter_mut() {
        if inner.is_stopped() {
            break;
        }
        let id = entry.handle().id();
        match panic::catch_unwind(AssertUnwindSafe(|| entry.fire())) {
            Ok(()) => inner.counters.record_fired(),
            Err(payload) => {
                inner.counters.record_fault();
                warn!(
                    timer = %id,
                    panic = %panic_message(payload.as_ref()),
                    "timer callback panicked"
                );
            }
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&'static str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "non-string panic payload".to_string()
    }
}
