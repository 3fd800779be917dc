//! Ordered set of pending timers with in-flight cancellation.
//!
//! [`TimerQueue`] holds the scheduler's mutable state: the active set ordered
//! by `(when, id)`, the identities currently popped for firing, and the
//! identities cancelled while in flight. It has no locking or threads of its
//! own; the scheduler wraps it in a mutex and drives it through a
//! pop, fire, settle cycle:
//!
//! 1. [`pop_expired`](TimerQueue::pop_expired) removes the due prefix and marks
//!    it in flight.
//! 2. The caller fires each entry with the queue unlocked.
//! 3. [`settle`](TimerQueue::settle) reinserts periodic entries and retires
//!    one-shots and anything cancelled meanwhile.
//!
//! Entries never get dropped inside the queue. Anything that leaves it
//! (removed, replaced, retired by `settle`, or cleared) waits in a retired list
//! until [`take_retired`](TimerQueue::take_retired). Dropping a callback runs
//! user `Drop` code, which may call back into the scheduler, so the caller
//! takes the list and drops it after releasing its lock.

use super::handle::{Callback, TimerEntry, TimerHandle, TimerKey};
use crate::types::{Time, TimerId};
use hashbrown::{HashMap, HashSet};
use std::collections::BTreeMap;
use std::mem;
use std::time::Duration;

/// What [`TimerQueue::remove`] did with an identity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Removal {
    /// The timer was pending and is gone.
    Removed,
    /// The timer is in flight; it will not be rescheduled.
    CancelledInFlight,
    /// The identity is not known (already removed, or a finished one-shot).
    Unknown,
}

/// Counts from one [`TimerQueue::settle`] pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Settled {
    /// Periodic entries put back into the active set.
    pub rescheduled: usize,
    /// One-shot entries retired after firing.
    pub completed: usize,
    /// Entries dropped because they were cancelled while in flight.
    pub cancelled: usize,
}

/// The scheduler's ordered timer state.
#[derive(Debug, Default)]
pub struct TimerQueue {
    active: BTreeMap<TimerKey, TimerEntry>,
    /// Current fire time of every entry in `active`, by identity.
    index: HashMap<TimerId, Time>,
    in_flight: HashSet<TimerId>,
    /// Always a subset of `in_flight`.
    cancelled: HashSet<TimerId>,
    retired: Vec<TimerEntry>,
}

impl TimerQueue {
    /// Creates an empty queue.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the number of pending (not in-flight) timers.
    #[must_use]
    pub fn len(&self) -> usize {
        self.active.len()
    }

    /// Returns true if no timers are pending.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.active.is_empty()
    }

    /// Returns the number of timers popped and not yet settled.
    #[must_use]
    pub fn in_flight_len(&self) -> usize {
        self.in_flight.len()
    }

    /// Returns true if `id` is pending in the active set.
    #[must_use]
    pub fn contains(&self, id: TimerId) -> bool {
        self.index.contains_key(&id)
    }

    /// Registers a timer and returns its handle.
    ///
    /// An identity that is already pending is replaced. An identity that is
    /// in flight gets its in-flight copy cancelled, so only the new
    /// registration survives settling.
    pub fn push(
        &mut self,
        id: TimerId,
        when: Time,
        interval: Duration,
        callback: Callback,
    ) -> TimerHandle {
        self.remove(id);
        let entry = TimerEntry::new(id, when, interval, callback);
        let handle = entry.handle();
        self.insert_entry(entry);
        handle
    }

    /// Removes a timer by identity.
    ///
    /// A pending timer is erased. A timer that has been popped for firing is
    /// recorded as cancelled so [`settle`](Self::settle) discards it. Unknown
    /// identities are ignored.
    pub fn remove(&mut self, id: TimerId) -> Removal {
        if let Some(when) = self.index.remove(&id) {
            if let Some(entry) = self.active.remove(&TimerKey { when, id }) {
                self.retired.push(entry);
            }
            Removal::Removed
        } else if self.in_flight.contains(&id) {
            self.cancelled.insert(id);
            Removal::CancelledInFlight
        } else {
            Removal::Unknown
        }
    }

    /// Returns the earliest pending fire time, if any.
    #[must_use]
    pub fn peek_deadline(&self) -> Option<Time> {
        self.active.first_key_value().map(|(key, _)| key.when)
    }

    /// Returns how long until the earliest pending timer is due.
    ///
    /// `Some(Duration::ZERO)` means a timer is already due; `None` means
    /// nothing is pending.
    #[must_use]
    pub fn time_until_next(&self, now: Time) -> Option<Duration> {
        self.peek_deadline().map(|when| when.duration_since(now))
    }

    /// Pops every timer whose fire time is `<= now`, in firing order.
    ///
    /// The active set is ordered, so this stops at the first entry that is
    /// not yet due. Popped identities are marked in flight until they are
    /// passed to [`settle`](Self::settle).
    pub fn pop_expired(&mut self, now: Time) -> Vec<TimerEntry> {
        let mut expired = Vec::new();
        while let Some(entry) = self.active.first_entry() {
            if entry.key().when > now {
                break;
            }
            let entry = entry.remove();
            self.index.remove(&entry.id);
            self.in_flight.insert(entry.id);
            expired.push(entry);
        }
        expired
    }

    /// Takes fired entries back after their callbacks ran.
    ///
    /// Entries cancelled while in flight and one-shot entries are retired.
    /// Periodic entries are advanced by one interval and reinserted.
    pub fn settle(&mut self, fired: impl IntoIterator<Item = TimerEntry>) -> Settled {
        let mut settled = Settled::default();
        for mut entry in fired {
            self.in_flight.remove(&entry.id);
            if self.cancelled.remove(&entry.id) {
                settled.cancelled += 1;
                self.retired.push(entry);
            } else if entry.is_periodic() {
                entry.reschedule();
                self.insert_entry(entry);
                settled.rescheduled += 1;
            } else {
                settled.completed += 1;
                self.retired.push(entry);
            }
        }
        settled
    }

    /// Retires every pending timer without firing it.
    ///
    /// In-flight entries are owned by whoever popped them; any of them that
    /// come back through [`settle`](Self::settle) are retired as cancelled.
    pub fn clear(&mut self) {
        let active = mem::take(&mut self.active);
        self.retired.extend(active.into_values());
        self.index.clear();
        self.cancelled.extend(self.in_flight.iter().copied());
    }

    /// Hands over every entry that has left the queue since the last call.
    ///
    /// Drop the result with no lock held.
    #[must_use]
    pub fn take_retired(&mut self) -> Vec<TimerEntry> {
        mem::take(&mut self.retired)
    }

    fn insert_entry(&mut self, entry: TimerEntry) {
        self.index.insert(entry.id, entry.when);
        self.active.insert(entry.key(), entry);
    }
}
