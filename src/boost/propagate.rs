//! Transitive boost propagation along lock-ownership chains.
//!
//! When a boosted thread blocks, the primitive's owner inherits a dynamic
//! grant; if that owner is itself blocked, the walk continues through its
//! wait descriptor, at most `max_depth` hops. Grants are recorded on the
//! waiter's descriptor so the matching unblock retracts exactly what this
//! wait contributed: two independent waiters on one owner each add and
//! remove their own increment, and the owner stays elevated until the last
//! contributor is gone.
//!
//! There is no cycle detection: a cyclic ownership graph is a latent
//! deadlock elsewhere, and the depth bound alone guarantees termination
//! here.

use crate::sched::TurboSched;
use crate::sync::OwnedLock;
use crate::thread::{RunState, WaitDesc};
use crate::tracing_compat::{debug, trace};
use crate::types::{ThreadId, WaitReason};
use smallvec::SmallVec;
use std::sync::Arc;

type Grants = SmallVec<[(ThreadId, WaitReason); 8]>;

impl TurboSched {
    /// Hook invoked by a synchronization primitive when `waiter` blocks on
    /// it. Records the wait descriptor and, if the waiter is boosted,
    /// propagates a dynamic grant along the ownership chain.
    pub fn notify_block(&self, waiter: ThreadId, primitive: Arc<dyn OwnedLock>) {
        if !self.is_enabled() {
            return;
        }
        let Some(record) = self.threads.resolve(waiter) else {
            return;
        };
        let reason = primitive.reason();
        // Descriptor first: a concurrent walk arriving at this thread must
        // be able to continue through it. A leftover descriptor means the
        // previous wait never unblocked; retract its grants now.
        let previous = record.wait.lock().replace(WaitDesc {
            primitive: Arc::clone(&primitive),
            reason,
            granted: SmallVec::new(),
        });
        if let Some(previous) = previous {
            self.release_grants(&previous.granted);
        }

        let max_depth = self.config.read().max_depth;
        let depth = record.depth();
        if !record.boosted() || depth >= max_depth {
            return;
        }

        let grants = self.walk_chain(waiter, &primitive, reason, depth, max_depth);
        if grants.is_empty() {
            return;
        }
        let mut guard = record.wait.lock();
        if let Some(desc) = guard.as_mut() {
            desc.granted.extend(grants);
        } else {
            // The unblock raced the walk; retract immediately.
            drop(guard);
            self.release_grants(&grants);
        }
    }

    /// Hook invoked when `waiter` stops waiting: takes its descriptor and
    /// retracts every grant this wait issued. Runs even when the kill
    /// switch is off; releasing is cleanup, not elevation.
    pub fn notify_unblock(&self, waiter: ThreadId) {
        let Some(record) = self.threads.resolve(waiter) else {
            return;
        };
        let desc = record.wait.lock().take();
        let Some(desc) = desc else {
            return;
        };
        self.release_grants(&desc.granted);
    }

    /// Retracts one grant whose waiter never delivered an explicit unblock
    /// (exited, or its state was lost). Same release path as unblock.
    pub fn expire(&self, thread: ThreadId, reason: WaitReason) {
        let Some(record) = self.threads.resolve(thread) else {
            return;
        };
        if record.dynamic_count(reason) == 0 {
            return;
        }
        self.metrics.expirations.increment();
        self.release_one(thread, reason);
    }

    /// Walks the ownership chain starting at `primitive`, elevating each
    /// resolvable owner. Returns the grants issued, in chain order.
    fn walk_chain(
        &self,
        origin: ThreadId,
        primitive: &Arc<dyn OwnedLock>,
        first_reason: WaitReason,
        start_depth: u32,
        max_depth: u32,
    ) -> Grants {
        let mut grants = Grants::new();
        let mut primitive = Arc::clone(primitive);
        let mut reason = first_reason;
        let mut depth = start_depth;
        let now = self.now().as_nanos();

        loop {
            if depth >= max_depth {
                break;
            }
            let Some(owner_id) = primitive.owner() else {
                break;
            };
            if owner_id == origin {
                break;
            }
            let Some(owner) = self.threads.resolve(owner_id) else {
                break;
            };

            let was_boosted = owner.boosted();
            owner.dynamic.increment(reason);
            owner.note_granted(now);
            owner.raise_depth(depth + 1);
            grants.push((owner_id, reason));
            self.metrics.dynamic_grants.increment();
            trace!(
                owner = %owner_id,
                %reason,
                depth = depth + 1,
                "dynamic boost granted"
            );

            match owner.run_state() {
                RunState::Runnable => {
                    self.link_if_runnable(&owner);
                    break;
                }
                // Already on a CPU; it re-links at its next enqueue.
                RunState::Running => break,
                RunState::Blocked => {
                    if was_boosted {
                        // Its own chain already elevated everything downstream.
                        break;
                    }
                    let next = {
                        let guard = owner.wait.lock();
                        guard
                            .as_ref()
                            .map(|desc| (Arc::clone(&desc.primitive), desc.reason))
                    };
                    let Some((next_primitive, next_reason)) = next else {
                        break;
                    };
                    primitive = next_primitive;
                    reason = next_reason;
                    depth = owner.depth();
                }
            }
        }
        grants
    }

    /// Retracts a list of grants in order.
    pub(crate) fn release_grants(&self, grants: &[(ThreadId, WaitReason)]) {
        for &(owner, reason) in grants {
            self.release_one(owner, reason);
        }
    }

    fn release_one(&self, owner_id: ThreadId, reason: WaitReason) {
        let Some(owner) = self.threads.resolve(owner_id) else {
            return;
        };
        let word = owner.dynamic.decrement(reason);
        self.metrics.dynamic_releases.increment();
        if word == 0 && !owner.boosted_static() {
            owner.reset_depth();
            self.unlink_anywhere(&owner);
            debug!(owner = %owner_id, "dynamic boost fully retracted");
        }
    }
}
