//! CPU topology: performance clusters.
//!
//! A cluster is the migration scope boundary: the balancer never moves a
//! thread outside its source CPU's cluster. Topologies are validated once
//! at construction: every CPU id below the count must belong to exactly one
//! cluster.

use crate::error::ConfigError;
use crate::types::CpuId;

/// Cluster layout over a contiguous range of CPU ids.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Topology {
    clusters: Vec<Vec<CpuId>>,
    cluster_of: Vec<usize>,
}

impl Topology {
    /// Builds a topology from explicit clusters.
    ///
    /// CPU ids must cover `0..n` for some `n`, each appearing exactly once.
    pub fn from_clusters(clusters: Vec<Vec<CpuId>>) -> Result<Self, ConfigError> {
        let cpu_count = clusters
            .iter()
            .flatten()
            .copied()
            .max()
            .map(|max| max + 1)
            .ok_or(ConfigError::NoCpus)?;

        let mut seen = vec![0usize; cpu_count];
        let mut cluster_of = vec![0usize; cpu_count];
        for (cluster_index, cluster) in clusters.iter().enumerate() {
            for &cpu in cluster {
                seen[cpu] += 1;
                cluster_of[cpu] = cluster_index;
            }
        }
        if let Some(cpu) = seen.iter().position(|&count| count != 1) {
            return Err(ConfigError::ClusterCoverage {
                cpu,
                count: seen[cpu],
            });
        }

        Ok(Self {
            clusters,
            cluster_of,
        })
    }

    /// Builds a single-cluster topology over `cpu_count` CPUs.
    pub fn single_cluster(cpu_count: usize) -> Result<Self, ConfigError> {
        if cpu_count == 0 {
            return Err(ConfigError::NoCpus);
        }
        Self::from_clusters(vec![(0..cpu_count).collect()])
    }

    /// Total number of CPUs.
    #[must_use]
    pub fn cpu_count(&self) -> usize {
        self.cluster_of.len()
    }

    /// CPUs sharing `cpu`'s cluster (including `cpu` itself).
    ///
    /// Out-of-range ids get an empty slice.
    #[must_use]
    pub fn cluster_mates(&self, cpu: CpuId) -> &[CpuId] {
        self.cluster_of
            .get(cpu)
            .map_or(&[], |&index| self.clusters[index].as_slice())
    }
}
