//! Cluster-scoped migration of starved boosted threads.
//!
//! A turbo-list entry that out-waits the migration delay (strictly beyond
//! the picker's starvation delay) triggers one bounded scan-then-migrate
//! pass: find the first idle-enough cluster mate, take both queue locks in
//! ascending CPU-id order, re-validate, and move the thread, or abort
//! silently. Never more than one attempt per trigger, never a retry loop,
//! and at most one scan in flight per source CPU.

use crate::sched::TurboSched;
use crate::thread::RunState;
use crate::tracing_compat::{debug, trace};
use crate::types::{CpuId, ThreadId};

/// Result of one balance trigger.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BalanceOutcome {
    /// The kill switch is off.
    Disabled,
    /// No overdue candidate, or a scan is already active for this CPU.
    Idle,
    /// No acceptable destination in the cluster.
    NoDestination,
    /// Re-validation failed at migrate time; not retried.
    Aborted,
    /// The candidate moved.
    Migrated {
        /// The migrated thread.
        thread: ThreadId,
        /// Source CPU.
        from: CpuId,
        /// Destination CPU.
        to: CpuId,
    },
}

impl TurboSched {
    /// Runs one balance pass for `cpu`.
    pub fn trigger_balance(&self, cpu: CpuId) -> BalanceOutcome {
        if !self.is_enabled() {
            return BalanceOutcome::Disabled;
        }
        if self.cpus.get(cpu).is_none() {
            return BalanceOutcome::Idle;
        }

        let migration_delay = self.config.read().migration_delay_ns();
        let candidate = {
            let mut inner = self.cpus[cpu].lock();
            if inner.balance_active {
                return BalanceOutcome::Idle;
            }
            let now = self.now();
            let Some(candidate) = inner.turbo.first_overdue(now, migration_delay) else {
                return BalanceOutcome::Idle;
            };
            inner.balance_active = true;
            candidate
        };

        let outcome = self.scan_and_migrate(cpu, candidate);
        if !matches!(outcome, BalanceOutcome::Migrated { .. }) {
            // Migrated paths clear the latch under the source lock.
            self.cpus[cpu].lock().balance_active = false;
        }
        outcome
    }

    /// SCAN then MIGRATE for an already-latched source CPU.
    fn scan_and_migrate(&self, src: CpuId, candidate: ThreadId) -> BalanceOutcome {
        let Some(dst) = self.find_destination(src) else {
            trace!(cpu = src, thread = %candidate, "no migration destination in cluster");
            return BalanceOutcome::NoDestination;
        };

        let migration_cost = self.config.read().migration_cost_ns;
        let now = self.now();
        let (mut src_q, mut dst_q) = self.lock_pair(src, dst);

        let Some(record) = self.threads.resolve(candidate) else {
            self.metrics.migration_aborts.increment();
            return BalanceOutcome::Aborted;
        };
        let hot = now.as_nanos().saturating_sub(record.last_ran()) < migration_cost;
        let movable = record.run_state() == RunState::Runnable
            && record.cpu() == Some(src)
            && src_q.turbo.contains(candidate)
            && !hot;
        if !movable {
            self.metrics.migration_aborts.increment();
            debug!(thread = %candidate, from = src, hot, "migration aborted at re-validation");
            return BalanceOutcome::Aborted;
        }

        src_q.base.detach(candidate);
        src_q.turbo.unlink(candidate);
        record.set_cpu(dst);
        dst_q.base.attach(&record);
        dst_q.turbo.link(&record, now);
        if let Some(current) = dst_q.current {
            if let Some(current_record) = self.threads.resolve(current) {
                current_record.set_need_resched(true);
            }
        }
        src_q.balance_active = false;
        self.metrics.migrations.increment();
        debug!(thread = %candidate, from = src, to = dst, "boosted thread migrated");
        BalanceOutcome::Migrated {
            thread: candidate,
            from: src,
            to: dst,
        }
    }

    /// First cluster mate with an empty turbo list and no boosted thread on
    /// CPU. No load ranking; latency over optimality.
    fn find_destination(&self, src: CpuId) -> Option<CpuId> {
        for &mate in self.topology.cluster_mates(src) {
            if mate == src {
                continue;
            }
            let Some(queue) = self.cpus.get(mate) else {
                continue;
            };
            let inner = queue.lock();
            let current_boosted = inner
                .current
                .and_then(|id| self.threads.resolve(id))
                .is_some_and(|record| record.boosted());
            if inner.turbo.is_empty() && !current_boosted {
                return Some(mate);
            }
        }
        None
    }
}
