//! Identifier types for scheduler entities.
//!
//! [`ThreadId`] wraps a generation-checked arena index: resolving a stale id
//! after the thread deregistered yields nothing instead of touching reused
//! storage, which is what lets the propagator chase lock owners across CPUs
//! without a lifetime tie to the owner.

use crate::util::ArenaIndex;
use core::fmt;

/// Identifier for a logical CPU (one run queue each).
pub type CpuId = usize;

/// A unique, generation-checked identifier for a schedulable thread.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ThreadId(pub(crate) ArenaIndex);

impl ThreadId {
    /// Creates a thread ID from an arena index (internal use).
    #[must_use]
    pub(crate) const fn from_arena(index: ArenaIndex) -> Self {
        Self(index)
    }

    /// Returns the underlying arena index (internal use).
    #[must_use]
    pub(crate) const fn arena_index(self) -> ArenaIndex {
        self.0
    }

    /// Creates a thread ID for testing purposes.
    #[doc(hidden)]
    #[must_use]
    pub const fn new_for_test(index: u32, generation: u32) -> Self {
        Self(ArenaIndex::new(index, generation))
    }
}

impl fmt::Debug for ThreadId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ThreadId({}:{})", self.0.index(), self.0.generation())
    }
}

impl fmt::Display for ThreadId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "T{}", self.0.index())
    }
}

/// The kind of blocking primitive a waiter is stalled on.
///
/// A closed set: each reason owns one 8-bit field of the packed dynamic
/// boost word, so adding a reason means widening the word layout.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum WaitReason {
    /// Blocked acquiring an exclusive lock.
    Mutex,
    /// Blocked acquiring a reader/writer lock (writer side is owner-tracked).
    RwLock,
}

impl WaitReason {
    /// Number of distinct wait reasons (fields in the boost word).
    pub const COUNT: usize = 2;

    /// Field index of this reason within the packed boost word.
    #[must_use]
    pub const fn index(self) -> u32 {
        match self {
            Self::Mutex => 0,
            Self::RwLock => 1,
        }
    }
}

impl fmt::Display for WaitReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Mutex => write!(f, "mutex"),
            Self::RwLock => write!(f, "rwlock"),
        }
    }
}
