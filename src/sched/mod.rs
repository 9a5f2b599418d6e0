//! Per-CPU queues, pick override, and cluster-scoped balancing.
//!
//! [`TurboSched`] is the subsystem facade. It wraps the base scheduler's
//! per-CPU enqueue/dequeue/pick through the [`BaseQueue`] seam, maintains
//! the per-CPU turbo lists, and exposes the control surface driven by
//! synchronization primitives (`notify_block` / `notify_unblock`, defined
//! in [`crate::boost::propagate`]) and by the embedding scheduler
//! (`enqueue` / `dequeue` / `pick` / `trigger_balance`).

pub mod balance;
pub mod base;
pub(crate) mod cpu;
pub mod topology;
pub(crate) mod turbo_list;

pub use balance::BalanceOutcome;
pub use base::{BaseQueue, FairQueue};
pub use topology::Topology;

use crate::config::TurboConfig;
use crate::error::ConfigError;
use crate::metrics::{MetricsSnapshot, TurboMetrics};
use crate::sched::cpu::{CpuQueue, CpuQueueInner};
use crate::thread::{RunState, ThreadRecord, ThreadTable};
use crate::time::{Time, TimeSource, WallClock};
use crate::tracing_compat::{debug, trace, warn};
use crate::types::{CpuId, ThreadId};
use parking_lot::{MutexGuard, RwLock};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// The turbo-boost scheduling subsystem.
///
/// One instance covers a whole topology: a thread registry, one locked run
/// queue per CPU, and the shared tunables. All operations are bounded and
/// infallible; misuse (stale ids, out-of-range CPUs) degrades to no-ops.
pub struct TurboSched {
    pub(crate) config: RwLock<TurboConfig>,
    /// Mirror of `config.enabled` for lock-free hook gating.
    pub(crate) enabled: AtomicBool,
    pub(crate) threads: ThreadTable,
    pub(crate) cpus: Vec<CpuQueue>,
    pub(crate) topology: Topology,
    pub(crate) clock: Arc<dyn TimeSource>,
    pub(crate) metrics: TurboMetrics,
}

impl std::fmt::Debug for TurboSched {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TurboSched")
            .field("cpus", &self.cpus.len())
            .field("threads", &self.threads.len())
            .field("enabled", &self.is_enabled())
            .finish_non_exhaustive()
    }
}

impl TurboSched {
    /// Creates a subsystem over a single cluster of `cpu_count` CPUs.
    pub fn new(cpu_count: usize, config: TurboConfig) -> Result<Self, ConfigError> {
        Self::with_topology(Topology::single_cluster(cpu_count)?, config)
    }

    /// Creates a subsystem over an explicit topology with a wall clock.
    pub fn with_topology(topology: Topology, config: TurboConfig) -> Result<Self, ConfigError> {
        Self::with_clock(topology, config, Arc::new(WallClock::new()))
    }

    /// Creates a subsystem with an explicit time source (virtual in tests).
    pub fn with_clock(
        topology: Topology,
        mut config: TurboConfig,
        clock: Arc<dyn TimeSource>,
    ) -> Result<Self, ConfigError> {
        config.validate()?;
        config.normalize();
        let cpus = (0..topology.cpu_count()).map(CpuQueue::new).collect();
        Ok(Self {
            enabled: AtomicBool::new(config.enabled),
            config: RwLock::new(config),
            threads: ThreadTable::new(),
            cpus,
            topology,
            clock,
            metrics: TurboMetrics::default(),
        })
    }

    /// Number of CPUs covered.
    #[must_use]
    pub fn cpu_count(&self) -> usize {
        self.cpus.len()
    }

    /// Snapshot of the current configuration.
    #[must_use]
    pub fn config(&self) -> TurboConfig {
        self.config.read().clone()
    }

    /// Applies a configuration change under the config lock, re-normalizing
    /// afterwards. This is the only sanctioned reconfiguration path.
    pub fn reconfigure(&self, apply: impl FnOnce(&mut TurboConfig)) {
        let mut config = self.config.write();
        apply(&mut config);
        config.normalize();
        self.enabled.store(config.enabled, Ordering::Release);
    }

    /// Flips the global kill switch.
    pub fn set_enabled(&self, on: bool) {
        self.reconfigure(|config| config.enabled = on);
    }

    /// Returns true unless the kill switch is off.
    #[must_use]
    pub fn is_enabled(&self) -> bool {
        self.enabled.load(Ordering::Acquire)
    }

    /// Point-in-time counter values.
    #[must_use]
    pub fn metrics(&self) -> MetricsSnapshot {
        self.metrics.snapshot()
    }

    /// Current queue clock.
    pub(crate) fn now(&self) -> Time {
        self.clock.now()
    }

    // --- thread lifecycle -------------------------------------------------

    /// Registers a thread with the given base ordering key. The record
    /// starts blocked, unboosted, resident nowhere.
    pub fn register_thread(&self, fair_key: u64) -> ThreadId {
        self.threads.register(fair_key)
    }

    /// Deregisters a thread: an implicit unblock for every grant it issued,
    /// removal from any queue, and release of its record. Stale ids held by
    /// callers resolve to nothing afterwards.
    pub fn deregister_thread(&self, thread: ThreadId) {
        let Some(record) = self.threads.remove(thread) else {
            return;
        };
        let desc = record.wait.lock().take();
        if let Some(desc) = desc {
            self.release_grants(&desc.granted);
        }
        if let Some(cpu) = record.cpu() {
            if let Some(queue) = self.cpus.get(cpu) {
                let mut inner = queue.lock();
                inner.base.dequeue(thread);
                inner.turbo.unlink(thread);
                if inner.current == Some(thread) {
                    inner.current = None;
                }
            }
        }
        self.unlink_anywhere(&record);
        record.dynamic.clear();
        record.reset_depth();
        record.clear_cpu();
        debug!(thread = %thread, "thread deregistered");
    }

    /// Resolves a thread id to its record, if still registered.
    #[must_use]
    pub fn thread_record(&self, thread: ThreadId) -> Option<Arc<ThreadRecord>> {
        self.threads.resolve(thread)
    }

    // --- boost control surface -------------------------------------------

    /// Marks or unmarks a thread as permanently latency-critical.
    /// Idempotent: repeated calls with the same value change nothing.
    pub fn set_static_boost(&self, thread: ThreadId, on: bool) {
        let Some(record) = self.threads.resolve(thread) else {
            return;
        };
        let was = record.set_static_boost(on);
        if on && !was {
            self.link_if_runnable(&record);
        } else if !on && was && !record.boosted() {
            record.reset_depth();
            self.unlink_anywhere(&record);
        }
    }

    /// Returns true if the thread is boosted (statically or dynamically).
    /// Always false while the kill switch is off.
    #[must_use]
    pub fn is_boosted(&self, thread: ThreadId) -> bool {
        self.is_enabled()
            && self
                .threads
                .resolve(thread)
                .is_some_and(|record| record.boosted())
    }

    // --- run-queue integration -------------------------------------------

    /// Base enqueue wrapper: the thread becomes runnable on `cpu`; boosted
    /// threads are additionally linked into the CPU's turbo list.
    pub fn enqueue(&self, cpu: CpuId, thread: ThreadId) {
        let Some(record) = self.threads.resolve(thread) else {
            return;
        };
        let Some(queue) = self.cpus.get(cpu) else {
            return;
        };
        let now = self.now();
        let mut inner = queue.lock();
        record.set_cpu(cpu);
        record.set_run_state(RunState::Runnable);
        inner.base.enqueue(&record);
        if inner.current == Some(thread) {
            inner.current = None;
        }
        if self.is_enabled() && record.boosted() && inner.turbo.link(&record, now) {
            trace!(thread = %thread, cpu, "turbo list link");
        }
    }

    /// Base dequeue wrapper: unlinks the turbo entry and opportunistically
    /// expires a stale dynamic grant window.
    pub fn dequeue(&self, cpu: CpuId, thread: ThreadId) {
        let Some(record) = self.threads.resolve(thread) else {
            return;
        };
        let Some(queue) = self.cpus.get(cpu) else {
            return;
        };
        let now = self.now();
        let mut inner = queue.lock();
        self.dequeue_locked(&mut inner, &record, now);
    }

    /// The scheduling decision: the base candidate, unless a sufficiently
    /// delayed boosted thread must override it.
    #[must_use]
    pub fn pick(&self, cpu: CpuId) -> Option<ThreadId> {
        let Some(queue) = self.cpus.get(cpu) else {
            return None;
        };
        let mut inner = queue.lock();
        let candidate = inner.base.pick();
        if !self.is_enabled() {
            return candidate;
        }
        // A boosted base candidate needs no override.
        if let Some(chosen) = candidate {
            if self
                .threads
                .resolve(chosen)
                .is_some_and(|record| record.boosted())
            {
                return candidate;
            }
        }
        let healed = inner.turbo.sweep_zero_boost();
        if healed > 0 {
            warn!(cpu, healed, "unlinked turbo entries with no boost");
            self.metrics.self_heals.add(healed as u64);
        }
        if inner.turbo.is_empty() {
            return candidate;
        }
        let now = self.now();
        let starve_delay = self.config.read().starve_delay_ns();
        if let Some(starved) = inner.turbo.pick_delayed(now, starve_delay) {
            // The entry can go non-runnable between selection and dispatch;
            // fall back to the base candidate once, never retry.
            let still_runnable = self
                .threads
                .resolve(starved)
                .is_some_and(|record| record.run_state() == RunState::Runnable);
            if still_runnable {
                self.metrics.pick_overrides.increment();
                trace!(thread = %starved, cpu, "pick override for starved boosted thread");
                return Some(starved);
            }
            return candidate;
        }
        candidate
    }

    /// Records that `thread` was dispatched onto `cpu`: it leaves the
    /// queues, becomes current, and its reschedule mark clears.
    pub fn mark_running(&self, cpu: CpuId, thread: ThreadId) {
        let Some(record) = self.threads.resolve(thread) else {
            return;
        };
        let Some(queue) = self.cpus.get(cpu) else {
            return;
        };
        let now = self.now();
        let mut inner = queue.lock();
        self.dequeue_locked(&mut inner, &record, now);
        record.set_cpu(cpu);
        record.set_run_state(RunState::Running);
        record.set_need_resched(false);
        record.note_ran(now.as_nanos());
        inner.current = Some(thread);
    }

    /// Records that `thread` blocked: it leaves its queue and stops being
    /// current. The wait descriptor is handled by `notify_block`.
    pub fn mark_blocked(&self, thread: ThreadId) {
        let Some(record) = self.threads.resolve(thread) else {
            return;
        };
        if let Some(cpu) = record.cpu() {
            if let Some(queue) = self.cpus.get(cpu) {
                let now = self.now();
                let mut inner = queue.lock();
                self.dequeue_locked(&mut inner, &record, now);
                if inner.current == Some(thread) {
                    inner.current = None;
                }
            }
        }
        record.set_run_state(RunState::Blocked);
    }

    /// Idle-time housekeeping: clears dynamic grants on this CPU's turbo
    /// list that outlived their window.
    pub fn sweep_expired(&self, cpu: CpuId) {
        let Some(queue) = self.cpus.get(cpu) else {
            return;
        };
        let now = self.now();
        let window = self.config.read().dynamic_window_ns();
        let mut inner = queue.lock();
        let expired = inner.turbo.expire_window(now, window);
        if expired > 0 {
            debug!(cpu, expired, "dynamic boost windows expired");
            self.metrics.expirations.add(expired as u64);
        }
    }

    // --- introspection ----------------------------------------------------

    /// Thread currently running on `cpu`, if tracked.
    #[must_use]
    pub fn current(&self, cpu: CpuId) -> Option<ThreadId> {
        self.cpus.get(cpu).and_then(|queue| queue.lock().current)
    }

    /// Number of turbo-list entries on `cpu`.
    #[must_use]
    pub fn turbo_len(&self, cpu: CpuId) -> usize {
        self.cpus.get(cpu).map_or(0, |queue| queue.lock().turbo.len())
    }

    /// Returns true if `thread` is linked into `cpu`'s turbo list.
    #[must_use]
    pub fn turbo_contains(&self, cpu: CpuId, thread: ThreadId) -> bool {
        self.cpus
            .get(cpu)
            .is_some_and(|queue| queue.lock().turbo.contains(thread))
    }

    // --- shared internals -------------------------------------------------

    /// Removes a thread from one queue's base and turbo structures, applying
    /// the opportunistic dynamic-window expiry check.
    pub(crate) fn dequeue_locked(
        &self,
        inner: &mut CpuQueueInner,
        record: &Arc<ThreadRecord>,
        now: Time,
    ) {
        inner.base.dequeue(record.id);
        if inner.turbo.unlink(record.id) {
            trace!(thread = %record.id, "turbo list unlink");
        }
        if record.boosted_dynamic() {
            let window = self.config.read().dynamic_window_ns();
            if now.as_nanos().saturating_sub(record.dynamic_since()) >= window {
                record.dynamic.clear();
                if !record.boosted() {
                    record.reset_depth();
                }
                self.metrics.expirations.increment();
                debug!(thread = %record.id, "dynamic boost expired at dequeue");
            }
        }
    }

    /// Links a boosted record into its resident CPU's turbo list, after
    /// re-validating runnability and residency under that queue's lock. The
    /// window between observing an owner and elevating it is real; this is
    /// where it gets closed.
    pub(crate) fn link_if_runnable(&self, record: &Arc<ThreadRecord>) {
        if record.run_state() != RunState::Runnable {
            return;
        }
        let Some(cpu) = record.cpu() else {
            return;
        };
        let Some(queue) = self.cpus.get(cpu) else {
            return;
        };
        let now = self.now();
        let mut inner = queue.lock();
        if record.run_state() == RunState::Runnable
            && record.cpu() == Some(cpu)
            && inner.base.contains(record.id)
            && record.boosted()
            && inner.turbo.link(record, now)
        {
            trace!(thread = %record.id, cpu, "turbo list link (propagation)");
        }
    }

    /// Unlinks a record from whichever turbo list holds it. Bounded retries:
    /// a concurrent migration can move the entry between the membership read
    /// and the lock; a missed unlink is recovered by the picker's self-heal.
    pub(crate) fn unlink_anywhere(&self, record: &Arc<ThreadRecord>) {
        for _ in 0..2 {
            let Some(cpu) = record.linked_cpu() else {
                return;
            };
            let Some(queue) = self.cpus.get(cpu) else {
                return;
            };
            let mut inner = queue.lock();
            if inner.turbo.unlink(record.id) {
                return;
            }
        }
    }

    /// Locks two CPU queues in ascending id order, returning the guards as
    /// `(first, second)` matching the argument order.
    pub(crate) fn lock_pair(
        &self,
        first: CpuId,
        second: CpuId,
    ) -> (MutexGuard<'_, CpuQueueInner>, MutexGuard<'_, CpuQueueInner>) {
        debug_assert_ne!(first, second, "dual lock of one queue");
        if first < second {
            let a = self.cpus[first].lock();
            let b = self.cpus[second].lock();
            (a, b)
        } else {
            let b = self.cpus[second].lock();
            let a = self.cpus[first].lock();
            (a, b)
        }
    }
}
