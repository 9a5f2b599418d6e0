//! Turbosched: a priority-elevation ("turbo boost") layer over a fair per-CPU scheduler.
//!
//! # Overview
//!
//! Turbosched sits on top of a general-purpose fair scheduler and bounds the
//! scheduling latency of latency-critical threads without disturbing base
//! fairness below that bound. Threads can be marked permanently boosted
//! (static boost), and a boosted thread that blocks on a lock transitively
//! elevates the lock holder (dynamic boost) so it is never stalled behind an
//! unboosted owner. This is priority-inversion avoidance, propagated along
//! ownership chains with a hard depth bound.
//!
//! # Core Guarantees
//!
//! - **Bounded extra latency**: a boosted runnable thread waits at most the
//!   configured starvation delay before the picker overrides the base choice
//! - **Bounded propagation**: chain walks touch at most `max_depth` owners;
//!   cycles cannot loop
//! - **Reference-counted elevation**: each blocked waiter contributes its own
//!   increment per wait reason; an owner stays elevated until the last
//!   contributor retracts or the grant window expires
//! - **Deadlock-safe migration**: the balancer takes run-queue locks in a
//!   single global order and makes exactly one migration attempt per trigger
//! - **No hard failures**: every runtime operation degrades to a policy
//!   fallback; only construction and reconfiguration validate
//!
//! # Module Structure
//!
//! - [`types`]: identifier types and wait reasons
//! - [`time`]: logical timestamps and pluggable time sources
//! - [`config`]: tunables ([`TurboConfig`])
//! - [`boost`]: the packed dynamic-boost word and chain propagation
//! - [`thread`]: per-thread records and the generation-checked registry
//! - [`sched`]: per-CPU queues, pick override, cluster-scoped balancing
//! - [`sync`]: owner-tracking lock shims feeding the propagator
//! - [`metrics`]: subsystem counters
//! - [`util`]: internal utilities (arena)
//! - [`error`]: error types

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_const_for_fn)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::doc_markdown)]

pub mod boost;
pub mod config;
pub mod error;
pub mod metrics;
pub mod sched;
pub mod sync;
pub mod test_utils;
pub mod thread;
pub mod time;
pub mod tracing_compat;
pub mod types;
pub mod util;

pub use config::TurboConfig;
pub use error::ConfigError;
pub use metrics::MetricsSnapshot;
pub use sched::{BalanceOutcome, BaseQueue, FairQueue, Topology, TurboSched};
pub use sync::{OwnedLock, TrackedMutex, TrackedRwLock};
pub use thread::RunState;
pub use time::{Time, TimeSource, VirtualClock, WallClock};
pub use types::{CpuId, ThreadId, WaitReason};
