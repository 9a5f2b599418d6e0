//! Per-CPU list of boosted runnable threads.
//!
//! The list tracks exactly the threads that are boosted, queued-runnable,
//! and resident on this CPU. Entries pin their record (`Arc`) for the
//! duration of membership; the record's `linked_cpu` tag is the O(1)
//! membership check and enforces the at-most-one-list invariant. All
//! mutation happens under the owning CPU queue's lock.

use crate::thread::{RunState, ThreadRecord};
use crate::time::Time;
use crate::tracing_compat::warn;
use crate::types::{CpuId, ThreadId};
use std::collections::VecDeque;
use std::sync::Arc;

/// One pinned turbo-list membership.
#[derive(Debug)]
pub(crate) struct TurboEntry {
    /// Pinned record; released on unlink.
    pub record: Arc<ThreadRecord>,
    /// Queue clock when the entry was linked.
    pub enqueued_at: Time,
}

/// Ordered set of boosted runnable threads on one CPU.
#[derive(Debug)]
pub(crate) struct TurboList {
    cpu: CpuId,
    entries: VecDeque<TurboEntry>,
}

impl TurboList {
    pub fn new(cpu: CpuId) -> Self {
        Self {
            cpu,
            entries: VecDeque::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn contains(&self, thread: ThreadId) -> bool {
        self.entries.iter().any(|e| e.record.id == thread)
    }

    /// Links a thread, recording its enqueue time. A no-op (false) when the
    /// thread is already on a turbo list; double insertion is detected via
    /// the membership tag, not by scanning.
    pub fn link(&mut self, record: &Arc<ThreadRecord>, now: Time) -> bool {
        if !record.try_link(self.cpu) {
            if record.linked_cpu() != Some(self.cpu) {
                warn!(
                    thread = %record.id,
                    cpu = self.cpu,
                    linked = ?record.linked_cpu(),
                    "thread already linked to another turbo list"
                );
            }
            return false;
        }
        record.set_enqueue_time(now.as_nanos());
        self.entries.push_back(TurboEntry {
            record: Arc::clone(record),
            enqueued_at: now,
        });
        true
    }

    /// Unlinks a thread, clearing its enqueue time and releasing the pin.
    pub fn unlink(&mut self, thread: ThreadId) -> bool {
        let Some(pos) = self.entries.iter().position(|e| e.record.id == thread) else {
            return false;
        };
        if let Some(entry) = self.entries.remove(pos) {
            entry.record.set_enqueue_time(0);
            entry.record.unlink_from(self.cpu);
        }
        true
    }

    /// Picker scan: the earliest-enqueued entry that is runnable, not
    /// resched-marked, and has waited at least `min_delay_ns`. Ties on
    /// enqueue time fall back to the smallest base ordering key.
    pub fn pick_delayed(&self, now: Time, min_delay_ns: u64) -> Option<ThreadId> {
        let mut best: Option<&TurboEntry> = None;
        for entry in &self.entries {
            if entry.record.run_state() != RunState::Runnable || entry.record.need_resched() {
                continue;
            }
            if now.duration_since(entry.enqueued_at) < min_delay_ns {
                continue;
            }
            best = Some(match best {
                None => entry,
                Some(current)
                    if entry.enqueued_at < current.enqueued_at
                        || (entry.enqueued_at == current.enqueued_at
                            && entry.record.fair_key() < current.record.fair_key()) =>
                {
                    entry
                }
                Some(current) => current,
            });
        }
        best.map(|e| e.record.id)
    }

    /// Balancer trigger scan: the first runnable entry delayed at least
    /// `min_delay_ns`.
    pub fn first_overdue(&self, now: Time, min_delay_ns: u64) -> Option<ThreadId> {
        self.entries
            .iter()
            .find(|e| {
                e.record.run_state() == RunState::Runnable
                    && now.duration_since(e.enqueued_at) >= min_delay_ns
            })
            .map(|e| e.record.id)
    }

    /// Unlinks entries whose boost is already gone (membership with zero
    /// boost is an invariant breach; the list heals itself rather than
    /// propagate the corruption). Returns how many were removed.
    pub fn sweep_zero_boost(&mut self) -> usize {
        let cpu = self.cpu;
        let before = self.entries.len();
        self.entries.retain(|entry| {
            if entry.record.boosted() {
                return true;
            }
            entry.record.reset_depth();
            entry.record.set_enqueue_time(0);
            entry.record.unlink_from(cpu);
            false
        });
        before - self.entries.len()
    }

    /// Clears dynamic grants older than the expiry window and unlinks
    /// entries left with no boost at all. Returns how many words expired.
    pub fn expire_window(&mut self, now: Time, window_ns: u64) -> usize {
        let cpu = self.cpu;
        let mut expired = 0;
        self.entries.retain(|entry| {
            let record = &entry.record;
            if record.boosted_dynamic()
                && now.as_nanos().saturating_sub(record.dynamic_since()) >= window_ns
            {
                record.dynamic.clear();
                expired += 1;
            }
            if record.boosted() {
                return true;
            }
            record.reset_depth();
            record.set_enqueue_time(0);
            record.unlink_from(cpu);
            false
        });
        expired
    }
}
