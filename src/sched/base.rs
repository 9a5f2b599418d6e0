//! Base-scheduler seam.
//!
//! The turbo subsystem never reimplements fair scheduling; it wraps it.
//! [`BaseQueue`] is the explicit interface the base scheduler implements
//! once per CPU (enqueue, dequeue, and a non-destructive pick), with no
//! runtime rebinding. [`FairQueue`] is the single in-crate implementation:
//! a key-ordered ready queue standing in for the real fair scheduler's
//! per-CPU structure.

use crate::thread::ThreadRecord;
use crate::types::ThreadId;
use std::collections::{HashSet, VecDeque};
use std::sync::Arc;

/// Per-CPU interface the base scheduler implements for the turbo layer.
pub trait BaseQueue: Send {
    /// Adds a runnable thread. A no-op if already queued.
    fn enqueue(&mut self, record: &Arc<ThreadRecord>);

    /// Removes a thread. Returns true if it was queued.
    fn dequeue(&mut self, thread: ThreadId) -> bool;

    /// The base scheduler's candidate, without removing it.
    fn pick(&self) -> Option<ThreadId>;

    /// Returns true if the thread is queued.
    fn contains(&self, thread: ThreadId) -> bool;

    /// Number of queued threads.
    fn len(&self) -> usize;

    /// Returns true if no threads are queued.
    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Migration primitive: removes a thread from this queue so it can be
    /// attached elsewhere. Callers hold both queues' locks in the global
    /// order. Returns true if the thread was queued here.
    fn detach(&mut self, thread: ThreadId) -> bool {
        self.dequeue(thread)
    }

    /// Migration primitive: inserts a detached thread into this queue.
    fn attach(&mut self, record: &Arc<ThreadRecord>) {
        self.enqueue(record);
    }
}

#[derive(Debug, Clone, Copy)]
struct FairEntry {
    thread: ThreadId,
    key: u64,
}

/// Minimal fair ready queue ordered by a per-thread key.
///
/// Lower key runs sooner; equal keys keep FIFO order. The key is snapshotted
/// at enqueue time, mirroring how a fair scheduler fixes a thread's position
/// when it joins the tree.
#[derive(Debug, Default)]
pub struct FairQueue {
    queue: VecDeque<FairEntry>,
    queued: HashSet<ThreadId>,
}

impl FairQueue {
    /// Creates an empty queue.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl BaseQueue for FairQueue {
    fn enqueue(&mut self, record: &Arc<ThreadRecord>) {
        if !self.queued.insert(record.id) {
            return;
        }
        let entry = FairEntry {
            thread: record.id,
            key: record.fair_key(),
        };
        // Smaller key first; stable among equals.
        let pos = self
            .queue
            .iter()
            .position(|e| entry.key < e.key)
            .unwrap_or(self.queue.len());
        self.queue.insert(pos, entry);
    }

    fn dequeue(&mut self, thread: ThreadId) -> bool {
        if !self.queued.remove(&thread) {
            return false;
        }
        self.queue.retain(|e| e.thread != thread);
        true
    }

    fn pick(&self) -> Option<ThreadId> {
        self.queue.front().map(|e| e.thread)
    }

    fn contains(&self, thread: ThreadId) -> bool {
        self.queued.contains(&thread)
    }

    fn len(&self) -> usize {
        self.queue.len()
    }
}
