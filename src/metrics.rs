//! Subsystem counters.
//!
//! Cheap relaxed atomics; read out with [`TurboMetrics::snapshot`]. These
//! exist for tests and diagnostics, not as an observability pipeline.

use std::sync::atomic::{AtomicU64, Ordering};

/// A monotonically increasing counter.
#[derive(Debug, Default)]
pub struct Counter {
    value: AtomicU64,
}

impl Counter {
    /// Increments the counter by 1.
    pub fn increment(&self) {
        self.add(1);
    }

    /// Adds a value to the counter.
    pub fn add(&self, value: u64) {
        self.value.fetch_add(value, Ordering::Relaxed);
    }

    /// Returns the current value.
    #[must_use]
    pub fn get(&self) -> u64 {
        self.value.load(Ordering::Relaxed)
    }
}

/// Counters kept by the turbo subsystem.
#[derive(Debug, Default)]
pub struct TurboMetrics {
    /// Dynamic grants issued by chain propagation.
    pub dynamic_grants: Counter,
    /// Dynamic grants released by unblock or implicit unblock.
    pub dynamic_releases: Counter,
    /// Grants cleared by window expiry.
    pub expirations: Counter,
    /// Picks where a delayed boosted thread overrode the base candidate.
    pub pick_overrides: Counter,
    /// Completed migrations.
    pub migrations: Counter,
    /// Migration attempts abandoned at re-validation.
    pub migration_aborts: Counter,
    /// Turbo-list entries unlinked because their boost was already gone.
    pub self_heals: Counter,
}

impl TurboMetrics {
    /// Returns a point-in-time copy of all counters.
    #[must_use]
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            dynamic_grants: self.dynamic_grants.get(),
            dynamic_releases: self.dynamic_releases.get(),
            expirations: self.expirations.get(),
            pick_overrides: self.pick_overrides.get(),
            migrations: self.migrations.get(),
            migration_aborts: self.migration_aborts.get(),
            self_heals: self.self_heals.get(),
        }
    }
}

/// Point-in-time values of the subsystem counters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct MetricsSnapshot {
    /// Dynamic grants issued.
    pub dynamic_grants: u64,
    /// Dynamic grants released.
    pub dynamic_releases: u64,
    /// Grants cleared by window expiry.
    pub expirations: u64,
    /// Picker overrides.
    pub pick_overrides: u64,
    /// Completed migrations.
    pub migrations: u64,
    /// Aborted migrations.
    pub migration_aborts: u64,
    /// Invariant self-heals.
    pub self_heals: u64,
}
