//! Packed multi-reason dynamic boost counters.
//!
//! One machine word is split into [`WaitReason::COUNT`] fixed-width 8-bit
//! fields, one per wait reason. Increment and decrement are lock-free
//! read-modify-write loops that touch only their own field, saturating at
//! the field bounds, so concurrent propagators on different reasons (or the
//! same reason) never serialize on a lock and never corrupt a neighbor.
//! Removal decisions compose by observing "did the whole word become zero".

use crate::types::WaitReason;
use std::sync::atomic::{AtomicU64, Ordering};

const FIELD_BITS: u32 = 8;
const FIELD_MAX: u64 = 0xFF;

const fn shift(reason: WaitReason) -> u32 {
    reason.index() * FIELD_BITS
}

const fn field(word: u64, reason: WaitReason) -> u64 {
    (word >> shift(reason)) & FIELD_MAX
}

/// The packed dynamic-boost counter word.
#[derive(Debug, Default)]
pub struct BoostWord(AtomicU64);

impl BoostWord {
    /// Creates a word with all counters at zero.
    #[must_use]
    pub const fn new() -> Self {
        Self(AtomicU64::new(0))
    }

    /// Atomically increments the counter for `reason`, saturating at the
    /// field maximum. Returns the new word value.
    pub fn increment(&self, reason: WaitReason) -> u64 {
        let mut current = self.0.load(Ordering::Acquire);
        loop {
            if field(current, reason) == FIELD_MAX {
                return current;
            }
            let next = current + (1 << shift(reason));
            match self
                .0
                .compare_exchange_weak(current, next, Ordering::AcqRel, Ordering::Acquire)
            {
                Ok(_) => return next,
                Err(observed) => current = observed,
            }
        }
    }

    /// Atomically decrements the counter for `reason`; a no-op at zero.
    /// Returns the new word value.
    pub fn decrement(&self, reason: WaitReason) -> u64 {
        let mut current = self.0.load(Ordering::Acquire);
        loop {
            if field(current, reason) == 0 {
                return current;
            }
            let next = current - (1 << shift(reason));
            match self
                .0
                .compare_exchange_weak(current, next, Ordering::AcqRel, Ordering::Acquire)
            {
                Ok(_) => return next,
                Err(observed) => current = observed,
            }
        }
    }

    /// Returns the counter value for `reason`.
    #[must_use]
    pub fn count(&self, reason: WaitReason) -> u8 {
        let word = self.0.load(Ordering::Acquire);
        u8::try_from(field(word, reason)).expect("field masked to 8 bits")
    }

    /// Returns true if any counter is non-zero.
    #[must_use]
    pub fn any(&self) -> bool {
        self.0.load(Ordering::Acquire) != 0
    }

    /// Returns the raw word.
    #[must_use]
    pub fn raw(&self) -> u64 {
        self.0.load(Ordering::Acquire)
    }

    /// Zeroes every counter, returning the previous word.
    pub fn clear(&self) -> u64 {
        self.0.swap(0, Ordering::AcqRel)
    }
}
