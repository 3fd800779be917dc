//! The timer scheduler.
//!
//! A [`Scheduler`] owns a [`TimerQueue`] behind a mutex and one background
//! dispatch thread. Any thread may add or remove timers; the dispatch thread
//! sleeps until the earliest deadline (or until woken by a change), fires
//! every due timer in `(when, id)` order with the lock released, then
//! reschedules periodic timers.
//!
//! # Lifecycle
//!
//! `Idle → Running → Stopped`. [`start`](Scheduler::start) and
//! [`stop`](Scheduler::stop) are idempotent and `Stopped` is terminal.
//! Timers added while `Idle` wait for `start`. Once stopped, pending timers
//! are dropped, `add_timer` returns a handle for a timer that is never
//! stored, and `remove_timer` does nothing.
//!
//! # Cancellation
//!
//! [`remove_timer`](Scheduler::remove_timer) is best effort: a timer that the
//! dispatch thread has already popped may still fire once after the call
//! returns, but a periodic timer removed that way is never rescheduled.
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//! use std::sync::atomic::{AtomicUsize, Ordering};
//! use std::time::Duration;
//! use timer_queue::Scheduler;
//!
//! let scheduler = Scheduler::new();
//! scheduler.start().expect("spawn dispatch thread");
//!
//! let ticks = Arc::new(AtomicUsize::new(0));
//! let counter = Arc::clone(&ticks);
//! let handle = scheduler.add_timer_after(
//!     move || {
//!         counter.fetch_add(1, Ordering::SeqCst);
//!     },
//!     Duration::from_millis(10),
//!     Duration::from_millis(10),
//! );
//!
//! std::thread::sleep(Duration::from_millis(100));
//! scheduler.remove_timer(&handle);
//! scheduler.stop();
//! assert!(ticks.load(Ordering::SeqCst) >= 1);
//! ```

mod dispatch;
mod wakeup;

use crate::config::SchedulerConfig;
use crate::error::{Error, Result};
use crate::time::{SystemClock, TimeSource};
use crate::timer::{Callback, Removal, Settled, TimerHandle, TimerQueue};
use crate::tracing_compat::{debug, info, warn};
use crate::types::{Time, TimerId};
use parking_lot::Mutex;
use serde::Serialize;
use std::sync::atomic::{AtomicU8, AtomicU64, Ordering};
use std::sync::{Arc, OnceLock};
use std::thread::{self, JoinHandle, ThreadId};
use std::time::Duration;
use wakeup::Wakeup;

/// Lifecycle state of a [`Scheduler`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[repr(u8)]
pub enum State {
    /// Constructed; timers are accepted but nothing fires yet.
    Idle = 0,
    /// The dispatch thread is running.
    Running = 1,
    /// Stopped for good.
    Stopped = 2,
}

impl State {
    const fn from_u8(value: u8) -> Self {
        match value {
            0 => Self::Idle,
            1 => Self::Running,
            _ => Self::Stopped,
        }
    }
}

/// Point-in-time counters for a scheduler.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SchedulerStats {
    /// Callbacks that ran to completion.
    pub fired: u64,
    /// Callbacks that panicked.
    pub faulted: u64,
    /// Periodic timers put back after firing.
    pub rescheduled: u64,
    /// One-shot timers retired after firing.
    pub completed: u64,
    /// Timers discarded because they were removed while in flight.
    pub cancelled_in_flight: u64,
    /// Timers waiting in the active set.
    pub pending: usize,
}

#[derive(Debug, Default)]
struct Counters {
    fired: AtomicU64,
    faulted: AtomicU64,
    rescheduled: AtomicU64,
    completed: AtomicU64,
    cancelled_in_flight: AtomicU64,
}

impl Counters {
    fn record_fired(&self) {
        self.fired.fetch_add(1, Ordering::Relaxed);
    }

    fn record_fault(&self) {
        self.faulted.fetch_add(1, Ordering::Relaxed);
    }

    fn record_settled(&self, settled: &Settled) {
        for (counter, count) in [
            (&self.rescheduled, settled.rescheduled),
            (&self.completed, settled.completed),
            (&self.cancelled_in_flight, settled.cancelled),
        ] {
            if count > 0 {
                counter.fetch_add(count as u64, Ordering::Relaxed);
            }
        }
    }
}

/// State shared between the scheduler, its handles and the dispatch thread.
struct Inner {
    queue: Mutex<TimerQueue>,
    clock: Arc<dyn TimeSource>,
    config: SchedulerConfig,
    state: AtomicU8,
    wakeup: Wakeup,
    counters: Counters,
    dispatch_thread: OnceLock<ThreadId>,
}

impl Inner {
    fn state(&self) -> State {
        State::from_u8(self.state.load(Ordering::Acquire))
    }

    fn is_stopped(&self) -> bool {
        self.state() == State::Stopped
    }

    fn mark_dispatch_thread(&self) {
        let _ = self.dispatch_thread.set(thread::current().id());
    }

    fn on_dispatch_thread(&self) -> bool {
        self.dispatch_thread.get() == Some(&thread::current().id())
    }

    /// Runs `f` on the locked queue, then drops whatever it retired once the
    /// lock is released.
    fn with_queue<R>(&self, f: impl FnOnce(&mut TimerQueue) -> R) -> R {
        let mut queue = self.queue.lock();
        let result = f(&mut *queue);
        let retired = queue.take_retired();
        drop(queue);
        drop(retired);
        result
    }

    fn add(&self, id: TimerId, callback: Callback, when: Time, interval: Duration) -> TimerHandle {
        let pushed = self.with_queue(|queue| {
            // Checked under the lock so nothing lands after the final clear.
            if self.is_stopped() {
                Err(callback)
            } else {
                Ok(queue.push(id, when, interval, callback))
            }
        });
        match pushed {
            Ok(handle) => {
                self.wakeup.notify();
                handle
            }
            Err(callback) => {
                drop(callback);
                debug!(timer = %id, "scheduler stopped; timer ignored");
                TimerHandle::new(id, when, interval)
            }
        }
    }

    fn remove(&self, handle: &TimerHandle) -> Removal {
        let removal = self.with_queue(|queue| {
            if self.is_stopped() {
                Removal::Unknown
            } else {
                queue.remove(handle.id())
            }
        });
        if removal == Removal::Removed {
            self.wakeup.notify();
        }
        removal
    }

    fn abandon_pending(&self) {
        self.with_queue(TimerQueue::clear);
    }

    fn stats(&self) -> SchedulerStats {
        SchedulerStats {
            fired: self.counters.fired.load(Ordering::Relaxed),
            faulted: self.counters.faulted.load(Ordering::Relaxed),
            rescheduled: self.counters.rescheduled.load(Ordering::Relaxed),
            completed: self.counters.completed.load(Ordering::Relaxed),
            cancelled_in_flight: self.counters.cancelled_in_flight.load(Ordering::Relaxed),
            pending: self.queue.lock().len(),
        }
    }
}

/// Cloneable handle for registering and removing timers.
///
/// Handles let callbacks and other components reach a scheduler without
/// owning it. They cannot start or stop it. Once the scheduler stops, its
/// handles' operations become no-ops.
#[derive(Clone)]
pub struct SchedulerHandle {
    inner: Arc<Inner>,
}

impl std::fmt::Debug for SchedulerHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SchedulerHandle")
            .field("state", &self.inner.state())
            .finish_non_exhaustive()
    }
}

impl SchedulerHandle {
    /// Registers a timer that first fires at `when` and then every
    /// `interval` (never again if `interval` is zero).
    pub fn add_timer<F>(&self, callback: F, when: Time, interval: Duration) -> TimerHandle
    where
        F: FnMut() + Send + 'static,
    {
        self.inner.add(TimerId::next(), Box::new(callback), when, interval)
    }

    /// Registers a timer under a caller-chosen identity.
    ///
    /// A pending or in-flight timer with the same identity is replaced.
    pub fn add_timer_with_id<F>(
        &self,
        callback: F,
        when: Time,
        interval: Duration,
        id: TimerId,
    ) -> TimerHandle
    where
        F: FnMut() + Send + 'static,
    {
        self.inner.add(id, Box::new(callback), when, interval)
    }

    /// Registers a timer that first fires `delay` from now.
    pub fn add_timer_after<F>(
        &self,
        callback: F,
        delay: Duration,
        interval: Duration,
    ) -> TimerHandle
    where
        F: FnMut() + Send + 'static,
    {
        let when = self.inner.clock.now() + delay;
        self.add_timer(callback, when, interval)
    }

    /// Cancels a timer. Unknown handles are ignored.
    pub fn remove_timer(&self, handle: &TimerHandle) -> Removal {
        self.inner.remove(handle)
    }

    /// Nudges the dispatch thread to re-read the clock.
    pub fn wake(&self) {
        self.inner.wakeup.notify();
    }

    /// Returns the current time on the scheduler's clock.
    #[must_use]
    pub fn now(&self) -> Time {
        self.inner.clock.now()
    }

    /// Returns the lifecycle state.
    #[must_use]
    pub fn state(&self) -> State {
        self.inner.state()
    }

    /// Returns the number of pending timers.
    #[must_use]
    pub fn pending_count(&self) -> usize {
        self.inner.queue.lock().len()
    }

    /// Returns the earliest pending fire time, if any.
    #[must_use]
    pub fn next_deadline(&self) -> Option<Time> {
        self.inner.queue.lock().peek_deadline()
    }

    /// Returns a snapshot of the scheduler's counters.
    #[must_use]
    pub fn stats(&self) -> SchedulerStats {
        self.inner.stats()
    }
}

/// A timer queue with its own dispatch thread.
///
/// Dropping a scheduler stops it.
pub struct Scheduler {
    handle: SchedulerHandle,
    worker: Mutex<Option<JoinHandle<()>>>,
}

impl std::fmt::Debug for Scheduler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Scheduler")
            .field("state", &self.state())
            .field("pending", &self.pending_count())
            .field("config", &self.handle.inner.config)
            .finish_non_exhaustive()
    }
}

impl Default for Scheduler {
    fn default() -> Self {
        Self::new()
    }
}

impl Scheduler {
    /// Creates an idle scheduler on the system clock with default settings.
    #[must_use]
    pub fn new() -> Self {
        Self::build(SchedulerConfig::default(), Arc::new(SystemClock::new()))
    }

    /// Creates an idle scheduler on the system clock.
    pub fn with_config(config: SchedulerConfig) -> Result<Self> {
        Self::with_clock(config, Arc::new(SystemClock::new()))
    }

    /// Creates an idle scheduler on the given clock.
    pub fn with_clock(config: SchedulerConfig, clock: Arc<dyn TimeSource>) -> Result<Self> {
        config.validate()?;
        Ok(Self::build(config, clock))
    }

    fn build(config: SchedulerConfig, clock: Arc<dyn TimeSource>) -> Self {
        let inner = Inner {
            queue: Mutex::new(TimerQueue::new()),
            clock,
            config,
            state: AtomicU8::new(State::Idle as u8),
            wakeup: Wakeup::new(),
            counters: Counters::default(),
            dispatch_thread: OnceLock::new(),
        };
        Self {
            handle: SchedulerHandle {
                inner: Arc::new(inner),
            },
            worker: Mutex::new(None),
        }
    }

    /// Returns a cloneable handle for adding and removing timers.
    #[must_use]
    pub fn handle(&self) -> SchedulerHandle {
        self.handle.clone()
    }

    /// Returns the scheduler's configuration.
    #[must_use]
    pub fn config(&self) -> &SchedulerConfig {
        &self.handle.inner.config
    }

    /// Launches the dispatch thread.
    ///
    /// Only the first call on an idle scheduler does anything; later calls,
    /// and calls after [`stop`](Self::stop), return `Ok(())`.
    pub fn start(&self) -> Result<()> {
        let inner = &self.handle.inner;
        // Checked before locking `worker`, which `stop` holds while joining.
        if inner.state() != State::Idle {
            return Ok(());
        }
        let mut worker = self.worker.lock();
        if inner
            .state
            .compare_exchange(
                State::Idle as u8,
                State::Running as u8,
                Ordering::AcqRel,
                Ordering::Acquire,
            )
            .is_err()
        {
            return Ok(());
        }

        let name = inner.config.thread_name.clone();
        let shared = Arc::clone(inner);
        let spawned = thread::Builder::new()
            .name(name.clone())
            .spawn(move || dispatch::run(&shared));
        match spawned {
            Ok(join) => {
                *worker = Some(join);
                drop(worker);
                info!(thread = %name, pending = self.pending_count(), "scheduler started");
                Ok(())
            }
            Err(source) => {
                let _ = inner.state.compare_exchange(
                    State::Running as u8,
                    State::Idle as u8,
                    Ordering::AcqRel,
                    Ordering::Acquire,
                );
                Err(Error::Spawn { name, source })
            }
        }
    }

    /// Stops the scheduler and waits for the dispatch thread to exit.
    ///
    /// Pending timers are dropped without firing; nothing fires after this
    /// returns. Safe to call before [`start`](Self::start) and more than once.
    /// Called from inside a timer callback it cannot wait for its own thread,
    /// so it returns at once and the thread exits when the callback returns.
    pub fn stop(&self) {
        let inner = &self.handle.inner;
        let previous = State::from_u8(inner.state.swap(State::Stopped as u8, Ordering::AcqRel));
        match previous {
            State::Idle => {
                inner.abandon_pending();
                info!("scheduler stopped before it started");
                return;
            }
            State::Running => inner.wakeup.teardown(),
            State::Stopped => {}
        }

        if inner.on_dispatch_thread() {
            debug!("stop requested from a timer callback");
            return;
        }

        // Held across the join so a concurrent `stop` also waits.
        let mut worker = self.worker.lock();
        if let Some(join) = worker.take() {
            if join.join().is_err() {
                warn!("dispatch thread panicked");
            }
            inner.abandon_pending();
            info!(stats = ?inner.stats(), "scheduler stopped");
        }
    }

    /// Registers a timer that first fires at `when` and then every
    /// `interval` (never again if `interval` is zero).
    ///
    /// Always succeeds and returns the handle used to cancel the timer.
    pub fn add_timer<F>(&self, callback: F, when: Time, interval: Duration) -> TimerHandle
    where
        F: FnMut() + Send + 'static,
    {
        self.handle.add_timer(callback, when, interval)
    }

    /// Registers a timer under a caller-chosen identity.
    ///
    /// A pending or in-flight timer with the same identity is replaced.
    pub fn add_timer_with_id<F>(
        &self,
        callback: F,
        when: Time,
        interval: Duration,
        id: TimerId,
    ) -> TimerHandle
    where
        F: FnMut() + Send + 'static,
    {
        self.handle.add_timer_with_id(callback, when, interval, id)
    }

    /// Registers a timer that first fires `delay` from now.
    pub fn add_timer_after<F>(
        &self,
        callback: F,
        delay: Duration,
        interval: Duration,
    ) -> TimerHandle
    where
        F: FnMut() + Send + 'static,
    {
        self.handle.add_timer_after(callback, delay, interval)
    }

    /// Cancels a timer.
    ///
    /// If the timer already left the queue for firing it may run once more,
    /// but it will not be rescheduled. Unknown handles are ignored.
    pub fn remove_timer(&self, handle: &TimerHandle) -> Removal {
        self.handle.remove_timer(handle)
    }

    /// Nudges the dispatch thread to re-read the clock.
    pub fn wake(&self) {
        self.handle.wake();
    }

    /// Returns the current time on the scheduler's clock.
    #[must_use]
    pub fn now(&self) -> Time {
        self.handle.now()
    }

    /// Returns the lifecycle state.
    #[must_use]
    pub fn state(&self) -> State {
        self.handle.state()
    }

    /// Returns true while the dispatch thread is running.
    #[must_use]
    pub fn is_running(&self) -> bool {
        self.state() == State::Running
    }

    /// Returns the number of pending timers.
    #[must_use]
    pub fn pending_count(&self) -> usize {
        self.handle.pending_count()
    }

    /// Returns the earliest pending fire time, if any.
    #[must_use]
    pub fn next_deadline(&self) -> Option<Time> {
        self.handle.next_deadline()
    }

    /// Returns a snapshot of the scheduler's counters.
    #[must_use]
    pub fn stats(&self) -> SchedulerStats {
        self.handle.stats()
    }
}

impl Drop for Scheduler {
    fn drop(&mut self) {
        self.stop();
    }
}
