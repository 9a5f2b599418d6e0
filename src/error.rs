//! Error types.
//!
//! Runtime operations never return hard errors: missing owners, stale
//! thread ids, races between scan and migrate, and full counters all
//! degrade to documented policy fallbacks. The only fallible surface is
//! construction and reconfiguration, which validate topology and tunables.

use crate::types::CpuId;

/// Validation failure for topology or tunables.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    /// The topology contains no CPUs.
    #[error("topology must contain at least one CPU")]
    NoCpus,

    /// A CPU id is missing from the clusters or appears more than once.
    #[error("cpu {cpu} appears in {count} clusters (expected exactly one)")]
    ClusterCoverage {
        /// The offending CPU id.
        cpu: CpuId,
        /// How many clusters reference it.
        count: usize,
    },

    /// The migration delay does not exceed the starvation delay.
    #[error("migration delay {migration_ms}ms must exceed starvation delay {starve_ms}ms")]
    DelayOrdering {
        /// Configured starvation delay in milliseconds.
        starve_ms: u64,
        /// Configured migration delay in milliseconds.
        migration_ms: u64,
    },

    /// The propagation depth bound is zero.
    #[error("max_depth must be at least 1")]
    ZeroDepth,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_formats_are_stable() {
        let err = ConfigError::DelayOrdering {
            starve_ms: 10,
            migration_ms: 10,
        };
        assert_eq!(
            err.to_string(),
            "migration delay 10ms must exceed starvation delay 10ms"
        );
        assert_eq!(
            ConfigError::ClusterCoverage { cpu: 3, count: 0 }.to_string(),
            "cpu 3 appears in 0 clusters (expected exactly one)"
        );
    }
}
