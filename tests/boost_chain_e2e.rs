#![allow(missing_docs)]
//! End-to-end propagation scenarios: single-hop grants, multi-waiter
//! accumulation, depth-bounded chains, and implicit release on exit.

use std::sync::Arc;

use turbosched::test_utils::init_test_logging;
use turbosched::{
    Topology, TimeSource, TrackedMutex, TrackedRwLock, TurboConfig, TurboSched, VirtualClock,
    WaitReason,
};

const MAX_DEPTH: u32 = 5;

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
fn scenario_a_single_hop_grant_and_release() {
    let (sched, _clock) = setup(1);

    // Static-boosted T blocks on M held by unboosted, runnable O.
    let t = sched.register_thread(10);
    sched.set_static_boost(t, true);
    let o = sched.register_thread(20);
    sched.enqueue(0, o);

    let m = Arc::new(TrackedMutex::new());
    m.acquire(o);
    sched.mark_blocked(t);
    sched.notify_block(t, m.clone());

    let record = sched.thread_record(o).expect("owner registered");
    assert_eq!(record.dynamic_count(WaitReason::Mutex), 1);
    assert_eq!(record.depth(), 1);
    assert!(sched.is_boosted(o));
    assert!(sched.turbo_contains(0, o));

    // T unblocks: O returns to its pre-block state.
    m.release();
    sched.notify_unblock(t);
    assert_eq!(record.dynamic_count(WaitReason::Mutex), 0);
    assert_eq!(record.depth(), 0);
    assert!(!sched.is_boosted(o));
    assert!(!sched.turbo_contains(0, o));
}

#[test]
fn scenario_b_two_waiters_accumulate() {
    let (sched, _clock) = setup(1);

    let t1 = sched.register_thread(10);
    let t2 = sched.register_thread(11);
    sched.set_static_boost(t1, true);
    sched.set_static_boost(t2, true);
    let o = sched.register_thread(20);
    sched.enqueue(0, o);

    let m = Arc::new(TrackedMutex::new());
    m.acquire(o);
    sched.notify_block(t1, m.clone());
    sched.notify_block(t2, m.clone());

    let record = sched.thread_record(o).expect("owner registered");
    assert_eq!(record.dynamic_count(WaitReason::Mutex), 2);

    // O stays boosted until the last contributor retracts.
    sched.notify_unblock(t1);
    assert!(sched.is_boosted(o));
    assert!(sched.turbo_contains(0, o));

    sched.notify_unblock(t2);
    assert!(!sched.is_boosted(o));
    assert!(!sched.turbo_contains(0, o));
}

#[test]
fn chain_stops_exactly_at_max_depth() {
    let (sched, _clock) = setup(1);

    // Wait chain of MAX_DEPTH + 3 hops:
    //   origin -> L[0] owned by chain[0] -> L[1] owned by chain[1] -> ...
    // Every chain thread is blocked on the next lock before the boosted
    // origin arrives, so a single walk sees the whole chain.
    let hops = (MAX_DEPTH + 3) as usize;
    let origin = sched.register_thread(1);
    sched.set_static_boost(origin, true);

    let chain: Vec<_> = (0..hops).map(|i| sched.register_thread(100 + i as u64)).collect();
    let locks: Vec<_> = (0..hops).map(|_| Arc::new(TrackedMutex::new())).collect();
    for (i, lock) in locks.iter().enumerate() {
        lock.acquire(chain[i]);
    }
    // chain[i] waits on locks[i + 1] (owned by chain[i + 1]).
    for i in 0..hops - 1 {
        sched.notify_block(chain[i], locks[i + 1].clone());
    }

    sched.notify_block(origin, locks[0].clone());

    for (i, &thread) in chain.iter().enumerate() {
        let record = sched.thread_record(thread).expect("chain thread");
        let hop = (i + 1) as u32;
        if hop <= MAX_DEPTH {
            assert!(
                record.dynamic_count(WaitReason::Mutex) > 0,
                "hop {hop} should be boosted"
            );
            assert_eq!(record.depth(), hop, "hop {hop} depth");
        } else {
            assert_eq!(
                record.dynamic_count(WaitReason::Mutex),
                0,
                "hop {hop} is beyond the depth bound"
            );
            assert_eq!(record.depth(), 0);
        }
        assert!(record.depth() <= MAX_DEPTH, "depth invariant");
    }

    // Releasing the origin's wait unwinds every grant it issued.
    sched.notify_unblock(origin);
    for &thread in &chain {
        let record = sched.thread_record(thread).expect("chain thread");
        assert_eq!(record.dynamic_count(WaitReason::Mutex), 0);
        assert_eq!(record.depth(), 0);
    }
}

#[test]
fn chain_reason_follows_each_hop() {
    let (sched, _clock) = setup(1);

    // origin --mutex--> a --rwlock--> b
    let origin = sched.register_thread(1);
    sched.set_static_boost(origin, true);
    let a = sched.register_thread(2);
    let b = sched.register_thread(3);

    let m = Arc::new(TrackedMutex::new());
    m.acquire(a);
    let rw = Arc::new(TrackedRwLock::new());
    rw.acquire_write(b);

    sched.notify_block(a, rw.clone());
    sched.notify_block(origin, m.clone());

    let record_a = sched.thread_record(a).expect("a registered");
    let record_b = sched.thread_record(b).expect("b registered");
    assert_eq!(record_a.dynamic_count(WaitReason::Mutex), 1);
    assert_eq!(record_a.dynamic_count(WaitReason::RwLock), 0);
    assert_eq!(record_b.dynamic_count(WaitReason::RwLock), 1);
    assert_eq!(record_b.dynamic_count(WaitReason::Mutex), 0);
    assert_eq!(record_b.depth(), 2);
}

#[test]
fn read_held_rwlock_has_no_owner_to_boost() {
    let (sched, _clock) = setup(1);

    let t = sched.register_thread(10);
    sched.set_static_boost(t, true);
    let rw = Arc::new(TrackedRwLock::new());

    // Reader-held: no single owner, propagation no-ops.
    sched.notify_block(t, rw);
    assert_eq!(sched.metrics().dynamic_grants, 0);
}

#[test]
fn cyclic_chain_terminates() {
    let (sched, _clock) = setup(1);

    // a waits on lock_b owned by b; b waits on lock_a owned by a. A boosted
    // origin entering the cycle must terminate within the depth bound.
    let origin = sched.register_thread(1);
    sched.set_static_boost(origin, true);
    let a = sched.register_thread(2);
    let b = sched.register_thread(3);

    let lock_a = Arc::new(TrackedMutex::new());
    let lock_b = Arc::new(TrackedMutex::new());
    lock_a.acquire(a);
    lock_b.acquire(b);
    sched.notify_block(a, lock_b.clone());
    sched.notify_block(b, lock_a.clone());

    sched.notify_block(origin, lock_a.clone());

    let record_a = sched.thread_record(a).expect("a registered");
    let record_b = sched.thread_record(b).expect("b registered");
    assert!(record_a.depth() <= MAX_DEPTH);
    assert!(record_b.depth() <= MAX_DEPTH);

    sched.notify_unblock(origin);
    assert_eq!(record_a.dynamic_count(WaitReason::Mutex), 0);
    assert_eq!(record_b.dynamic_count(WaitReason::Mutex), 0);
}

#[test]
fn deregistering_a_waiter_is_an_implicit_unblock() {
    let (sched, _clock) = setup(1);

    let t = sched.register_thread(10);
    sched.set_static_boost(t, true);
    let o = sched.register_thread(20);
    sched.enqueue(0, o);

    let m = Arc::new(TrackedMutex::new());
    m.acquire(o);
    sched.notify_block(t, m.clone());
    assert!(sched.is_boosted(o));

    // T exits without ever unblocking: its grants must not dangle.
    sched.deregister_thread(t);
    let record = sched.thread_record(o).expect("owner registered");
    assert_eq!(record.dynamic_count(WaitReason::Mutex), 0);
    assert!(!sched.is_boosted(o));
    assert!(!sched.turbo_contains(0, o));
}

#[test]
fn static_boost_is_idempotent() {
    let (sched, _clock) = setup(1);
    let t = sched.register_thread(10);
    sched.enqueue(0, t);

    sched.set_static_boost(t, true);
    sched.set_static_boost(t, true);
    assert!(sched.is_boosted(t));
    assert_eq!(sched.turbo_len(0), 1);

    sched.set_static_boost(t, false);
    assert!(!sched.is_boosted(t));
    assert_eq!(sched.turbo_len(0), 0);
}

#[test]
fn turbo_membership_matches_boost_and_runnability() {
    let (sched, clock) = setup(2);
    let t = sched.register_thread(10);

    // Blocked + boosted: not linked anywhere.
    sched.set_static_boost(t, true);
    assert!(!sched.turbo_contains(0, t) && !sched.turbo_contains(1, t));

    // Runnable on CPU 0: linked exactly there, enqueue time stamped.
    clock.advance_millis(1);
    sched.enqueue(0, t);
    assert!(sched.turbo_contains(0, t));
    assert!(!sched.turbo_contains(1, t));
    let record = sched.thread_record(t).expect("registered");
    assert_eq!(record.enqueue_time(), clock.now().as_nanos());

    // Running: leaves the list.
    sched.mark_running(0, t);
    assert!(!sched.turbo_contains(0, t));

    // Requeued after preemption: linked again.
    sched.enqueue(0, t);
    assert!(sched.turbo_contains(0, t));

    // Boost dropped: membership follows.
    sched.set_static_boost(t, false);
    assert!(!sched.turbo_contains(0, t));
    assert_eq!(record.enqueue_time(), 0);
}
