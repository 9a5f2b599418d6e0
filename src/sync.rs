//! Owner-tracking shims for blocking primitives.
//!
//! The propagator never touches a lock's fast path; it only needs a
//! capability answering "who owns this primitive right now". Real lock
//! implementations plug in by implementing [`OwnedLock`]; the two tracked
//! shims here cover the supported primitive kinds and are what the tests
//! drive. Owner answers are advisory: the caller must re-resolve the
//! returned id through the registry before mutating anything.

use crate::types::{ThreadId, WaitReason};
use parking_lot::Mutex;

/// Capability exposing the current owner of a blocking primitive.
pub trait OwnedLock: Send + Sync {
    /// The thread currently holding the primitive, if known.
    fn owner(&self) -> Option<ThreadId>;

    /// The wait-reason kind this primitive maps to.
    fn reason(&self) -> WaitReason;
}

/// Owner tracking for an exclusive lock.
#[derive(Debug, Default)]
pub struct TrackedMutex {
    owner: Mutex<Option<ThreadId>>,
}

impl TrackedMutex {
    /// Creates an unowned tracked mutex.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Records `owner` as the holder.
    pub fn acquire(&self, owner: ThreadId) {
        *self.owner.lock() = Some(owner);
    }

    /// Clears the holder.
    pub fn release(&self) {
        *self.owner.lock() = None;
    }
}

impl OwnedLock for TrackedMutex {
    fn owner(&self) -> Option<ThreadId> {
        *self.owner.lock()
    }

    fn reason(&self) -> WaitReason {
        WaitReason::Mutex
    }
}

/// Owner tracking for a reader/writer lock.
///
/// Only the writer side is owner-tracked; a read-held lock has no single
/// owner to elevate, so `owner()` answers `None` and propagation no-ops.
#[derive(Debug, Default)]
pub struct TrackedRwLock {
    writer: Mutex<Option<ThreadId>>,
}

impl TrackedRwLock {
    /// Creates an unowned tracked rwlock.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Records `owner` as the write holder.
    pub fn acquire_write(&self, owner: ThreadId) {
        *self.writer.lock() = Some(owner);
    }

    /// Clears the write holder.
    pub fn release_write(&self) {
        *self.writer.lock() = None;
    }
}

impl OwnedLock for TrackedRwLock {
    fn owner(&self) -> Option<ThreadId> {
        *self.writer.lock()
    }

    fn reason(&self) -> WaitReason {
        WaitReason::RwLock
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mutex_owner_round_trip() {
        let lock = TrackedMutex::new();
        assert_eq!(lock.owner(), None);
        assert_eq!(lock.reason(), WaitReason::Mutex);

        let holder = ThreadId::new_for_test(1, 0);
        lock.acquire(holder);
        assert_eq!(lock.owner(), Some(holder));
        lock.release();
        assert_eq!(lock.owner(), None);
    }

    #[test]
    fn rwlock_tracks_writer_only() {
        let lock = TrackedRwLock::new();
        assert_eq!(lock.owner(), None);
        assert_eq!(lock.reason(), WaitReason::RwLock);

        let writer = ThreadId::new_for_test(2, 0);
        lock.acquire_write(writer);
        assert_eq!(lock.owner(), Some(writer));
        lock.release_write();
        assert_eq!(lock.owner(), None);
    }
}
