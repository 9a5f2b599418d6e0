#![allow(missing_docs)]
//! Picker behavior: the starvation bound, tie-breaking, expiry windows, and
//! the kill switch.

use std::sync::Arc;

use turbosched::test_utils::init_test_logging;
use turbosched::{
    Topology, TrackedMutex, TurboConfig, TurboSched, VirtualClock, WaitReason,
};

fn setup(cpus: usize) -> (TurboSched, Arc<VirtualClock>) {
    init_test_logging();
    let clock = Arc::new(VirtualClock::new());
    let sched = TurboSched::with_clock(
        Topology::single_cluster(cpus).expect("topology"),
        TurboConfig::default(),
        clock.clone(),
    )
    .expect("subsystem builds");
    (sched, clock)
}

#[test]
fn starvation_bound_flips_the_pick() {
    let (sched, clock) = setup(1);

    // Base order favors the unboosted thread (smaller fair key).
    let favored = sched.register_thread(10);
    let boosted = sched.register_thread(90);
    sched.set_static_boost(boosted, true);
    sched.enqueue(0, favored);
    sched.enqueue(0, boosted);

    // Below the starvation delay the base choice stands.
    clock.advance_millis(1);
    assert_eq!(sched.pick(0), Some(favored));
    assert_eq!(sched.metrics().pick_overrides, 0);

    // The first pick after crossing the threshold must select the boosted
    // thread.
    clock.advance_millis(2);
    assert_eq!(sched.pick(0), Some(boosted));
    assert_eq!(sched.metrics().pick_overrides, 1);
}

#[test]
fn boosted_base_candidate_needs_no_override() {
    let (sched, clock) = setup(1);

    let boosted = sched.register_thread(10);
    sched.set_static_boost(boosted, true);
    let other = sched.register_thread(20);
    sched.enqueue(0, boosted);
    sched.enqueue(0, other);

    clock.advance_millis(50);
    assert_eq!(sched.pick(0), Some(boosted));
    // The base order already favored it; no override was recorded.
    assert_eq!(sched.metrics().pick_overrides, 0);
}

#[test]
fn simultaneous_starvers_tie_break_on_fair_key() {
    let (sched, clock) = setup(1);

    let favored = sched.register_thread(1);
    sched.enqueue(0, favored);

    // Two boosted threads linked at the same instant.
    let heavy = sched.register_thread(80);
    let light = sched.register_thread(40);
    sched.set_static_boost(heavy, true);
    sched.set_static_boost(light, true);
    sched.enqueue(0, heavy);
    sched.enqueue(0, light);

    clock.advance_millis(5);
    assert_eq!(sched.pick(0), Some(light));
}

#[test]
fn earlier_enqueue_wins_over_smaller_key() {
    let (sched, clock) = setup(1);

    let favored = sched.register_thread(1);
    sched.enqueue(0, favored);

    let first = sched.register_thread(90);
    sched.set_static_boost(first, true);
    sched.enqueue(0, first);

    clock.advance_millis(1);
    let second = sched.register_thread(10);
    sched.set_static_boost(second, true);
    sched.enqueue(0, second);

    clock.advance_millis(5);
    assert_eq!(sched.pick(0), Some(first));
}

#[test]
fn resched_marked_entries_are_skipped() {
    let (sched, clock) = setup(1);

    let favored = sched.register_thread(1);
    sched.enqueue(0, favored);

    let boosted = sched.register_thread(90);
    sched.set_static_boost(boosted, true);
    sched.enqueue(0, boosted);
    sched
        .thread_record(boosted)
        .expect("registered")
        .set_need_resched(true);

    clock.advance_millis(10);
    assert_eq!(sched.pick(0), Some(favored));
}

#[test]
fn dynamic_window_expires_at_dequeue() {
    let (sched, clock) = setup(1);

    let waiter = sched.register_thread(10);
    sched.set_static_boost(waiter, true);
    let owner = sched.register_thread(20);
    sched.enqueue(0, owner);

    let lock = Arc::new(TrackedMutex::new());
    lock.acquire(owner);
    sched.notify_block(waiter, lock);
    assert!(sched.is_boosted(owner));

    // The grant outlives its window with no unblock (the waiter's state is
    // lost); the next dequeue sweeps it.
    clock.advance_millis(40);
    sched.dequeue(0, owner);

    let record = sched.thread_record(owner).expect("registered");
    assert_eq!(record.dynamic_count(WaitReason::Mutex), 0);
    assert!(!sched.is_boosted(owner));
    assert_eq!(sched.metrics().expirations, 1);
}

#[test]
fn idle_sweep_expires_stale_grants_in_place() {
    let (sched, clock) = setup(1);

    let waiter = sched.register_thread(10);
    sched.set_static_boost(waiter, true);
    let owner = sched.register_thread(20);
    sched.enqueue(0, owner);

    let lock = Arc::new(TrackedMutex::new());
    lock.acquire(owner);
    sched.notify_block(waiter, lock);
    assert!(sched.turbo_contains(0, owner));

    // Within the window the sweep is a no-op.
    clock.advance_millis(1);
    sched.sweep_expired(0);
    assert!(sched.turbo_contains(0, owner));

    clock.advance_millis(40);
    sched.sweep_expired(0);
    assert!(!sched.turbo_contains(0, owner));
    assert!(!sched.is_boosted(owner));
}

#[test]
fn static_boost_survives_the_window() {
    let (sched, clock) = setup(1);

    let t = sched.register_thread(10);
    sched.set_static_boost(t, true);
    sched.enqueue(0, t);

    clock.advance_millis(100);
    sched.sweep_expired(0);
    assert!(sched.turbo_contains(0, t));
    assert!(sched.is_boosted(t));
}

#[test]
fn kill_switch_passes_hooks_through() {
    let (sched, clock) = setup(1);
    sched.set_enabled(false);

    let waiter = sched.register_thread(10);
    sched.set_static_boost(waiter, true);
    let owner = sched.register_thread(20);
    sched.enqueue(0, owner);

    let lock = Arc::new(TrackedMutex::new());
    lock.acquire(owner);
    sched.notify_block(waiter, lock);

    let record = sched.thread_record(owner).expect("registered");
    assert_eq!(record.dynamic_count(WaitReason::Mutex), 0);

    clock.advance_millis(50);
    // No override: the base order is untouched.
    let favored = sched.register_thread(1);
    sched.enqueue(0, favored);
    assert_eq!(sched.pick(0), Some(favored));
}

#[test]
fn reenabling_restores_behavior() {
    let (sched, clock) = setup(1);
    sched.set_enabled(false);
    sched.set_enabled(true);

    let favored = sched.register_thread(1);
    let boosted = sched.register_thread(90);
    sched.set_static_boost(boosted, true);
    sched.enqueue(0, favored);
    sched.enqueue(0, boosted);

    clock.advance_millis(5);
    assert_eq!(sched.pick(0), Some(boosted));
}
