//! Timer handles and the entries the scheduler owns.
//!
//! A [`TimerHandle`] is the caller's token for a registered timer. The
//! scheduler keeps the callback and the mutable fire time in a separate
//! [`TimerEntry`]; the handle only remembers what the caller needs to cancel
//! the timer and to reason about it.

use crate::types::{Time, TimerId};
use core::fmt;
use std::cmp::Ordering;
use std::time::Duration;

/// Boxed unit of work run when a timer fires.
pub type Callback = Box<dyn FnMut() + Send + 'static>;

/// Caller-side handle to a registered timer.
///
/// Handles are cheap to copy and compare by `(when, id)`, the same order in
/// which the scheduler fires timers. `when` is the first fire time; periodic
/// timers are rescheduled internally without updating outstanding handles.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct TimerHandle {
    id: TimerId,
    when: Time,
    interval: Duration,
}

impl TimerHandle {
    pub(crate) const fn new(id: TimerId, when: Time, interval: Duration) -> Self {
        Self { id, when, interval }
    }

    /// Returns the timer's identity.
    #[inline]
    #[must_use]
    pub const fn id(&self) -> TimerId {
        self.id
    }

    /// Returns the first fire time.
    #[inline]
    #[must_use]
    pub const fn when(&self) -> Time {
        self.when
    }

    /// Returns the repeat interval (`Duration::ZERO` for one-shot timers).
    #[inline]
    #[must_use]
    pub const fn interval(&self) -> Duration {
        self.interval
    }

    /// Returns true if the timer reschedules itself after each firing.
    #[inline]
    #[must_use]
    pub const fn is_periodic(&self) -> bool {
        !self.interval.is_zero()
    }
}

impl Ord for TimerHandle {
    fn cmp(&self, other: &Self) -> Ordering {
        self.when
            .cmp(&other.when)
            .then_with(|| self.id.cmp(&other.id))
            .then_with(|| self.interval.cmp(&other.interval))
    }
}

impl PartialOrd for TimerHandle {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Debug for TimerHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TimerHandle")
            .field("id", &self.id)
            .field("when", &self.when)
            .field("interval", &self.interval)
            .finish()
    }
}

/// Position of an entry in the active set.
///
/// Field order gives the derived `Ord` its meaning: earliest `when` first,
/// ties broken by identity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub(crate) struct TimerKey {
    pub(crate) when: Time,
    pub(crate) id: TimerId,
}

/// A registered timer as owned by the scheduler.
///
/// Entries live in the [`TimerQueue`](super::TimerQueue) until they expire;
/// [`TimerQueue::pop_expired`](super::TimerQueue::pop_expired) hands them out
/// for firing and [`TimerQueue::settle`](super::TimerQueue::settle) takes them
/// back.
pub struct TimerEntry {
    pub(crate) id: TimerId,
    pub(crate) when: Time,
    pub(crate) interval: Duration,
    pub(crate) callback: Callback,
}

impl TimerEntry {
    pub(crate) fn new(id: TimerId, when: Time, interval: Duration, callback: Callback) -> Self {
        Self {
            id,
            when,
            interval,
            callback,
        }
    }

    pub(crate) const fn key(&self) -> TimerKey {
        TimerKey {
            when: self.when,
            id: self.id,
        }
    }

    /// Returns a caller-side handle describing this entry's current schedule.
    #[must_use]
    pub const fn handle(&self) -> TimerHandle {
        TimerHandle::new(self.id, self.when, self.interval)
    }

    pub(crate) const fn is_periodic(&self) -> bool {
        !self.interval.is_zero()
    }

    /// Advances `when` by one interval. Never moves it backwards.
    pub(crate) fn reschedule(&mut self) {
        self.when = self.when + self.interval;
    }

    /// Runs the callback once. Panics propagate to the caller.
    pub fn fire(&mut self) {
        (self.callback)();
    }
}

impl fmt::Debug for TimerEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TimerEntry")
            .field("id", &self.id)
            .field("when", &self.when)
            .field("interval", &self.interval)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn noop() -> Callback {
        Box::new(|| {})
    }

    #[test]
    fn handles_order_by_when_then_id() {
        let early = TimerHandle::new(TimerId::from_raw(9), Time::from_millis(100), Duration::ZERO);
        let late = TimerHandle::new(TimerId::from_raw(1), Time::from_millis(200), Duration::ZERO);
        let tie = TimerHandle::new(TimerId::from_raw(10), Time::from_millis(100), Duration::ZERO);

        assert!(early < late);
        assert!(early < tie);
        assert!(tie < late);
    }

    #[test]
    fn keys_order_by_when_then_id() {
        let a = TimerKey {
            when: Time::from_secs(1),
            id: TimerId::from_raw(5),
        };
        let b = TimerKey {
            when: Time::from_secs(1),
            id: TimerId::from_raw(6),
        };
        let c = TimerKey {
            when: Time::from_secs(2),
            id: TimerId::from_raw(1),
        };
        let mut keys = vec![c, b, a];
        keys.sort();
        assert_eq!(keys, vec![a, b, c]);
    }

    #[test]
    fn reschedule_advances_by_interval() {
        let mut entry = TimerEntry::new(
            TimerId::next(),
            Time::from_secs(1),
            Duration::from_millis(250),
            noop(),
        );
        assert!(entry.is_periodic());
        entry.reschedule();
        entry.reschedule();
        assert_eq!(entry.when, Time::from_millis(1500));
        assert_eq!(entry.key().when, Time::from_millis(1500));
    }

    #[test]
    fn fire_runs_callback() {
        use std::sync::Arc;
        use std::sync::atomic::{AtomicU32, Ordering as AtomicOrdering};

        let counter = Arc::new(AtomicU32::new(0));
        let c = Arc::clone(&counter);
        let mut entry = TimerEntry::new(
            TimerId::next(),
            Time::ZERO,
            Duration::ZERO,
            Box::new(move || {
                c.fetch_add(1, AtomicOrdering::SeqCst);
            }),
        );
        entry.fire();
        entry.fire();
        assert_eq!(counter.load(AtomicOrdering::SeqCst), 2);
        assert!(!entry.handle().is_periodic());
    }

    #[test]
    fn debug_omits_callback() {
        let entry = TimerEntry::new(TimerId::from_raw(77), Time::ZERO, Duration::ZERO, noop());
        let dbg = format!("{entry:?}");
        assert!(dbg.contains("TimerId(77)"), "{dbg}");
        assert!(dbg.contains(".."), "{dbg}");
    }
}
