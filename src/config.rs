//! Subsystem configuration.
//!
//! An explicit [`TurboConfig`] value is handed to the subsystem at
//! construction; reconfiguration goes through
//! [`TurboSched::reconfigure`](crate::sched::TurboSched::reconfigure), never
//! ad-hoc global writes.
//!
//! # Defaults
//!
//! | Field | Default |
//! |-------|---------|
//! | `enabled` | true |
//! | `max_depth` | 5 |
//! | `starve_delay_ms` | 2 |
//! | `migration_delay_ms` | 10 |
//! | `dynamic_window_ms` | 32 |
//! | `migration_cost_ns` | 500 µs |

use crate::error::ConfigError;

/// Tunables for the turbo-boost subsystem.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct TurboConfig {
    /// Global kill switch. When false, every hook is a pure pass-through.
    pub enabled: bool,
    /// Maximum number of ownership-chain hops one propagation may touch.
    pub max_depth: u32,
    /// Minimum wait before the picker overrides the base choice (ms).
    pub starve_delay_ms: u64,
    /// Minimum wait before the balancer attempts migration (ms).
    /// Must exceed `starve_delay_ms`.
    pub migration_delay_ms: u64,
    /// Lifetime of a dynamic grant without an explicit unblock (ms).
    pub dynamic_window_ms: u64,
    /// Cache-affinity threshold: a thread scheduled more recently than this
    /// is considered hot and is not migrated (ns).
    pub migration_cost_ns: u64,
}

impl TurboConfig {
    /// Normalizes values to safe defaults in place.
    pub fn normalize(&mut self) {
        if self.max_depth == 0 {
            self.max_depth = 1;
        }
        if self.dynamic_window_ms == 0 {
            self.dynamic_window_ms = 1;
        }
        if self.migration_delay_ms <= self.starve_delay_ms {
            self.migration_delay_ms = self.starve_delay_ms + 1;
        }
    }

    /// Validates without mutating; prefer this over [`normalize`](Self::normalize)
    /// when a misconfiguration should be reported instead of silently fixed.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_depth == 0 {
            return Err(ConfigError::ZeroDepth);
        }
        if self.migration_delay_ms <= self.starve_delay_ms {
            return Err(ConfigError::DelayOrdering {
                starve_ms: self.starve_delay_ms,
                migration_ms: self.migration_delay_ms,
            });
        }
        Ok(())
    }

    /// Starvation delay in nanoseconds.
    #[must_use]
    pub(crate) const fn starve_delay_ns(&self) -> u64 {
        self.starve_delay_ms.saturating_mul(1_000_000)
    }

    /// Migration delay in nanoseconds.
    #[must_use]
    pub(crate) const fn migration_delay_ns(&self) -> u64 {
        self.migration_delay_ms.saturating_mul(1_000_000)
    }

    /// Dynamic grant window in nanoseconds.
    #[must_use]
    pub(crate) const fn dynamic_window_ns(&self) -> u64 {
        self.dynamic_window_ms.saturating_mul(1_000_000)
    }
}

impl Default for TurboConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            max_depth: 5,
            starve_delay_ms: 2,
            migration_delay_ms: 10,
            dynamic_window_ms: 32,
            migration_cost_ns: 500_000,
        }
    }
}
