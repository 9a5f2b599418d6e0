//! Per-CPU queue state.
//!
//! One logical run queue per CPU: the base scheduler's ready queue, the
//! turbo list, the currently-running thread, and the balancer's scan latch.
//! Everything behind a single mutex: list linkage is local shared state
//! and requires this lock; cross-CPU work orders its acquisitions by CPU id
//! (see `balance`).

use crate::sched::base::{BaseQueue, FairQueue};
use crate::sched::turbo_list::TurboList;
use crate::types::{CpuId, ThreadId};
use parking_lot::{Mutex, MutexGuard};

/// Lock-protected per-CPU scheduler state.
pub(crate) struct CpuQueueInner {
    /// The base scheduler's ready queue for this CPU.
    pub base: Box<dyn BaseQueue>,
    /// Boosted runnable threads resident here.
    pub turbo: TurboList,
    /// Thread currently on this CPU, if any.
    pub current: Option<ThreadId>,
    /// True while a balance scan is in flight for this CPU.
    pub balance_active: bool,
}

impl std::fmt::Debug for CpuQueueInner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CpuQueueInner")
            .field("base_len", &self.base.len())
            .field("turbo", &self.turbo)
            .field("current", &self.current)
            .field("balance_active", &self.balance_active)
            .finish()
    }
}

/// One CPU's run queue.
#[derive(Debug)]
pub(crate) struct CpuQueue {
    inner: Mutex<CpuQueueInner>,
}

impl CpuQueue {
    pub fn new(cpu: CpuId) -> Self {
        Self {
            inner: Mutex::new(CpuQueueInner {
                base: Box::new(FairQueue::new()),
                turbo: TurboList::new(cpu),
                current: None,
                balance_active: false,
            }),
        }
    }

    pub fn lock(&self) -> MutexGuard<'_, CpuQueueInner> {
        self.inner.lock()
    }
}
