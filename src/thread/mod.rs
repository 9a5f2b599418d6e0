//! Per-thread scheduling record.
//!
//! The subsystem attaches boost state to every schedulable thread and also
//! carries the minimal base-scheduler state (run state, residency, fair
//! ordering key) the per-CPU queues need. Hot fields are lock-free atomics
//! so propagators on other CPUs can elevate a thread without taking its run
//! queue's lock; only the wait descriptor sits behind a small leaf mutex.

pub mod registry;

pub use registry::ThreadTable;

use crate::boost::BoostWord;
use crate::sync::OwnedLock;
use crate::types::{CpuId, ThreadId, WaitReason};
use parking_lot::Mutex;
use smallvec::SmallVec;
use std::sync::atomic::{AtomicBool, AtomicU32, AtomicU64, AtomicU8, AtomicUsize, Ordering};
use std::sync::Arc;

/// Sentinel for "not resident on / not linked to any CPU".
pub(crate) const NO_CPU: usize = usize::MAX;

/// Scheduling state of a thread as the base scheduler sees it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum RunState {
    /// Waiting on a primitive; not in any run queue.
    Blocked = 0,
    /// Queued and eligible to run.
    Runnable = 1,
    /// Currently on a CPU.
    Running = 2,
}

impl RunState {
    fn from_u8(raw: u8) -> Self {
        match raw {
            1 => Self::Runnable,
            2 => Self::Running,
            _ => Self::Blocked,
        }
    }
}

/// What a blocked thread is waiting on, plus the boost grants issued
/// downstream on behalf of this wait (so unblock can retract them).
pub(crate) struct WaitDesc {
    /// The primitive the thread is blocked on.
    pub primitive: Arc<dyn OwnedLock>,
    /// Reason kind derived from the primitive.
    pub reason: WaitReason,
    /// Owners elevated by this wait, in chain order.
    pub granted: SmallVec<[(ThreadId, WaitReason); 8]>,
}

impl std::fmt::Debug for WaitDesc {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WaitDesc")
            .field("reason", &self.reason)
            .field("granted", &self.granted)
            .finish_non_exhaustive()
    }
}

/// Per-thread record: boost state plus base scheduling state.
#[derive(Debug)]
pub struct ThreadRecord {
    /// Unique identifier for this thread.
    pub id: ThreadId,
    static_boost: AtomicBool,
    /// Packed dynamic boost counters, one field per wait reason.
    pub(crate) dynamic: BoostWord,
    depth: AtomicU32,
    /// Nanos of the most recent dynamic grant (window expiry base).
    dynamic_since: AtomicU64,
    /// Nanos when linked into a turbo list; 0 when unlinked.
    enqueue_time: AtomicU64,
    /// Turbo-list membership tag: the CPU whose list holds this thread.
    linked_cpu: AtomicUsize,
    run_state: AtomicU8,
    cpu: AtomicUsize,
    need_resched: AtomicBool,
    /// Nanos when last dispatched onto a CPU (cache-hot check).
    last_ran: AtomicU64,
    fair_key: AtomicU64,
    pub(crate) wait: Mutex<Option<WaitDesc>>,
}

impl ThreadRecord {
    /// Creates a record with all boost state zeroed.
    #[must_use]
    pub fn new(id: ThreadId, fair_key: u64) -> Self {
        Self {
            id,
            static_boost: AtomicBool::new(false),
            dynamic: BoostWord::new(),
            depth: AtomicU32::new(0),
            dynamic_since: AtomicU64::new(0),
            enqueue_time: AtomicU64::new(0),
            linked_cpu: AtomicUsize::new(NO_CPU),
            run_state: AtomicU8::new(RunState::Blocked as u8),
            cpu: AtomicUsize::new(NO_CPU),
            need_resched: AtomicBool::new(false),
            last_ran: AtomicU64::new(0),
            fair_key: AtomicU64::new(fair_key),
            wait: Mutex::new(None),
        }
    }

    /// Returns true if the thread is boosted, statically or dynamically.
    #[must_use]
    pub fn boosted(&self) -> bool {
        self.static_boost.load(Ordering::Acquire) || self.dynamic.any()
    }

    /// Returns true if the thread holds any dynamic grant.
    #[must_use]
    pub fn boosted_dynamic(&self) -> bool {
        self.dynamic.any()
    }

    /// Returns true if the thread carries a static boost.
    #[must_use]
    pub fn boosted_static(&self) -> bool {
        self.static_boost.load(Ordering::Acquire)
    }

    /// Current dynamic counter for one wait reason.
    #[must_use]
    pub fn dynamic_count(&self, reason: WaitReason) -> u8 {
        self.dynamic.count(reason)
    }

    /// Sets the static boost flag, returning the previous value.
    pub fn set_static_boost(&self, on: bool) -> bool {
        self.static_boost.swap(on, Ordering::AcqRel)
    }

    /// Current propagation depth.
    #[must_use]
    pub fn depth(&self) -> u32 {
        self.depth.load(Ordering::Acquire)
    }

    /// Raises the depth to `to` if it is currently lower.
    pub(crate) fn raise_depth(&self, to: u32) {
        self.depth.fetch_max(to, Ordering::AcqRel);
    }

    /// Resets the depth to zero (boost fully retracted).
    pub(crate) fn reset_depth(&self) {
        self.depth.store(0, Ordering::Release);
    }

    /// Current run state.
    #[must_use]
    pub fn run_state(&self) -> RunState {
        RunState::from_u8(self.run_state.load(Ordering::Acquire))
    }

    pub(crate) fn set_run_state(&self, state: RunState) {
        self.run_state.store(state as u8, Ordering::Release);
    }

    /// CPU the thread is resident on, if any.
    #[must_use]
    pub fn cpu(&self) -> Option<CpuId> {
        let cpu = self.cpu.load(Ordering::Acquire);
        (cpu != NO_CPU).then_some(cpu)
    }

    pub(crate) fn set_cpu(&self, cpu: CpuId) {
        self.cpu.store(cpu, Ordering::Release);
    }

    pub(crate) fn clear_cpu(&self) {
        self.cpu.store(NO_CPU, Ordering::Release);
    }

    /// Base-scheduler ordering key (lower runs sooner).
    #[must_use]
    pub fn fair_key(&self) -> u64 {
        self.fair_key.load(Ordering::Acquire)
    }

    /// Updates the base-scheduler ordering key.
    pub fn set_fair_key(&self, key: u64) {
        self.fair_key.store(key, Ordering::Release);
    }

    /// Returns true if a reschedule has been requested for this thread.
    #[must_use]
    pub fn need_resched(&self) -> bool {
        self.need_resched.load(Ordering::Acquire)
    }

    /// Sets or clears the reschedule request flag.
    pub fn set_need_resched(&self, on: bool) {
        self.need_resched.store(on, Ordering::Release);
    }

    pub(crate) fn last_ran(&self) -> u64 {
        self.last_ran.load(Ordering::Acquire)
    }

    pub(crate) fn note_ran(&self, now_nanos: u64) {
        self.last_ran.store(now_nanos, Ordering::Release);
    }

    pub(crate) fn dynamic_since(&self) -> u64 {
        self.dynamic_since.load(Ordering::Acquire)
    }

    pub(crate) fn note_granted(&self, now_nanos: u64) {
        self.dynamic_since.store(now_nanos, Ordering::Release);
    }

    /// Nanos at which the thread was linked to a turbo list (0 if unset).
    #[must_use]
    pub fn enqueue_time(&self) -> u64 {
        self.enqueue_time.load(Ordering::Acquire)
    }

    pub(crate) fn set_enqueue_time(&self, nanos: u64) {
        self.enqueue_time.store(nanos, Ordering::Release);
    }

    /// CPU whose turbo list currently links this thread, if any.
    #[must_use]
    pub fn linked_cpu(&self) -> Option<CpuId> {
        let cpu = self.linked_cpu.load(Ordering::Acquire);
        (cpu != NO_CPU).then_some(cpu)
    }

    /// Claims turbo-list membership for `cpu`. Fails if already linked
    /// anywhere, enforcing the at-most-one-list invariant.
    pub(crate) fn try_link(&self, cpu: CpuId) -> bool {
        self.linked_cpu
            .compare_exchange(NO_CPU, cpu, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }

    /// Releases turbo-list membership held by `cpu`.
    pub(crate) fn unlink_from(&self, cpu: CpuId) -> bool {
        self.linked_cpu
            .compare_exchange(cpu, NO_CPU, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }
}
