//! Completion barrier for in-flight resolution tasks

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::Notify;

#[derive(Debug, Default)]
struct Inner {
    in_flight: AtomicUsize,
    drained: Notify,
}

/// Counts registered tasks; [`CompletionBarrier::wait`] returns once every
/// [`BarrierGuard`] has been dropped.
#[derive(Debug, Clone, Default)]
pub struct CompletionBarrier(Arc<Inner>);

/// Keeps the barrier open while alive.
#[derive(Debug)]
#[must_use = "dropping the guard immediately releases the barrier"]
pub struct BarrierGuard(Arc<Inner>);

impl CompletionBarrier {
    #[inline]
    pub fn new() -> Self {
        Self::default()
    }

    /// Count one more task. Must happen before the task is started.
    #[inline]
    pub fn register(&self) -> BarrierGuard {
        self.0.in_flight.fetch_add(1, Ordering::AcqRel);
        BarrierGuard(Arc::clone(&self.0))
    }

    #[must_use]
    #[inline]
    pub fn in_flight(&self) -> usize {
        self.0.in_flight.load(Ordering::Acquire)
    }

    #[must_use]
    #[inline]
    pub fn is_complete(&self) -> bool {
        self.in_flight() == 0
    }

    /// Wait until the in-flight count reaches zero.
    pub async fn wait(&self) {
        loop {
            let drained = self.0.drained.notified();
            tokio::pin!(drained);
            // register for the wakeup before checking, so a release in between is not lost
            drained.as_mut().enable();
            if self.is_complete() {
                return;
            }
            drained.await;
        }
    }
}

impl Drop for BarrierGuard {
    fn drop(&mut self) {
        if self.0.in_flight.fetch_sub(1, Ordering::AcqRel) == 1 {
            self.0.drained.notify_waiters();
        }
    }
}
