//! Generation-checked thread registry.
//!
//! The table hands out [`ThreadId`]s that act as capabilities: resolving
//! one after the thread deregistered returns `None`, so a propagator that
//! observed an owner just before it exited simply no-ops instead of
//! touching recycled state.

use crate::thread::ThreadRecord;
use crate::types::ThreadId;
use crate::util::Arena;
use parking_lot::RwLock;
use std::sync::Arc;

/// Registry of live thread records.
#[derive(Debug, Default)]
pub struct ThreadTable {
    inner: RwLock<Arena<Arc<ThreadRecord>>>,
}

impl ThreadTable {
    /// Creates an empty table.
    #[must_use]
    pub fn new() -> Self {
        Self {
            inner: RwLock::new(Arena::new()),
        }
    }

    /// Registers a thread with the given base ordering key.
    pub fn register(&self, fair_key: u64) -> ThreadId {
        let mut arena = self.inner.write();
        let index = arena.insert_with(|index| {
            Arc::new(ThreadRecord::new(ThreadId::from_arena(index), fair_key))
        });
        ThreadId::from_arena(index)
    }

    /// Resolves an id to its record, if still registered.
    #[must_use]
    pub fn resolve(&self, id: ThreadId) -> Option<Arc<ThreadRecord>> {
        self.inner.read().get(id.arena_index()).cloned()
    }

    /// Removes a thread, returning its record for teardown.
    pub fn remove(&self, id: ThreadId) -> Option<Arc<ThreadRecord>> {
        self.inner.write().remove(id.arena_index())
    }

    /// Number of registered threads.
    #[must_use]
    pub fn len(&self) -> usize {
        self.inner.read().len()
    }

    /// Returns true if no threads are registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.inner.read().is_empty()
    }
}
