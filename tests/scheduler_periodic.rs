//! Periodic rescheduling against the system clock.

mod common;

use common::{counter, fast_scheduler, init_test, wait_until};
use std::sync::atomic::Ordering;
use std::time::{Duration, Instant};
use timer_queue::{Removal, Scheduler, assert_with_log};

#[test]
fn periodic_count_tracks_elapsed_time() {
    init_test("periodic_count_tracks_elapsed_time");
    let scheduler = fast_scheduler();
    scheduler.start().expect("start");

    let interval = Duration::from_millis(50);
    let (hits, callback) = counter();
    let started = Instant::now();
    let handle = scheduler.add_timer_after(callback, interval, interval);

    std::thread::sleep(Duration::from_millis(1_000));
    scheduler.remove_timer(&handle);
    let elapsed = started.elapsed();
    let fired = hits.load(Ordering::SeqCst) as u128;
    scheduler.stop();

    let expected = elapsed.as_millis() / interval.as_millis();
    assert_with_log!(
        fired.abs_diff(expected) <= 1,
        "periodic fire count",
        expected,
        fired
    );
    timer_queue::test_complete!("periodic_count_tracks_elapsed_time");
}

#[test]
fn one_shot_and_periodic_over_three_and_a_half_seconds() {
    init_test("one_shot_and_periodic_over_three_and_a_half_seconds");
    let scheduler = Scheduler::new();
    scheduler.start().expect("start");

    let (one_shot_hits, one_shot) = counter();
    let (periodic_hits, periodic) = counter();
    let first = scheduler.now() + Duration::from_secs(1);
    scheduler.add_timer(one_shot, first, Duration::ZERO);
    scheduler.add_timer(periodic, first, Duration::from_secs(1));

    std::thread::sleep(Duration::from_millis(3_500));
    let one_shot_fired = one_shot_hits.load(Ordering::SeqCst);
    let periodic_fired = periodic_hits.load(Ordering::SeqCst);
    scheduler.stop();

    assert_with_log!(one_shot_fired == 1, "one-shot firings", 1, one_shot_fired);
    assert_with_log!(
        (3..=4).contains(&periodic_fired),
        "periodic firings",
        "3..=4",
        periodic_fired
    );
    timer_queue::test_complete!("one_shot_and_periodic_over_three_and_a_half_seconds");
}

#[test]
fn removing_periodic_after_second_firing_stops_it() {
    init_test("removing_periodic_after_second_firing_stops_it");
    let scheduler = Scheduler::new();
    scheduler.start().expect("start");

    let (hits, callback) = counter();
    let handle = scheduler.add_timer_after(callback, Duration::from_secs(1), Duration::from_secs(1));

    assert!(wait_until(Duration::from_secs(4), || hits.load(Ordering::SeqCst) >= 2));
    let removal = scheduler.remove_timer(&handle);
    assert!(matches!(
        removal,
        Removal::Removed | Removal::CancelledInFlight
    ));
    let at_removal = hits.load(Ordering::SeqCst);

    std::thread::sleep(Duration::from_millis(1_600));
    let fired = hits.load(Ordering::SeqCst);
    scheduler.stop();

    // At most one in-flight firing may land after the removal.
    assert_with_log!(
        (2..=3).contains(&fired) && fired <= at_removal + 1,
        "firings after removal",
        "2..=3",
        fired
    );
    timer_queue::test_complete!("removing_periodic_after_second_firing_stops_it");
}

#[test]
fn periodic_timer_catches_up_missed_beats() {
    init_test("periodic_timer_catches_up_missed_beats");
    let scheduler = fast_scheduler();
    let (hits, callback) = counter();
    // Already 100ms overdue with a 20ms interval: the backlog fires on start.
    let when = scheduler
        .now()
        .saturating_sub_nanos(Duration::from_millis(100).as_nanos() as u64);
    let handle = scheduler.add_timer(callback, when, Duration::from_millis(20));
    scheduler.start().expect("start");

    assert!(wait_until(Duration::from_secs(2), || hits.load(Ordering::SeqCst) >= 6));
    scheduler.remove_timer(&handle);
    scheduler.stop();
    timer_queue::test_complete!("periodic_timer_catches_up_missed_beats");
}
