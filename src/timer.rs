use std::ops::ControlFlow;
use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc, Mutex, Weak,
};
use tokio::task::JoinHandle;
use tokio::time::{sleep, Duration};
use tracing::trace;

use crate::utils::lock;

/// An owned timer task. Dropping or cancelling it guarantees the callback
/// will not run afterwards, even if the deadline already passed.
#[derive(Debug)]
pub(crate) struct TimerHandle {
    cancelled: Arc<AtomicBool>,
    task: JoinHandle<()>,
}

impl TimerHandle {
    pub(crate) fn cancel(self) {
        // Drop does the work
    }

    #[cfg(test)]
    pub(crate) fn is_finished(&self) -> bool {
        self.task.is_finished()
    }
}

impl Drop for TimerHandle {
    fn drop(&mut self) {
        self.cancelled.store(true, Ordering::SeqCst);
        self.task.abort();
    }
}

/// Cancel whatever timer sits in `slot`
pub(crate) fn clear(slot: &mut Option<TimerHandle>) {
    if let Some(handle) = slot.take() {
        handle.cancel();
    }
}

/// Run `callback` once on `state` after `delay`.
pub(crate) fn spawn_timeout<T, F>(state: Weak<Mutex<T>>, delay: Duration, callback: F) -> TimerHandle
where
    T: Send + 'static,
    F: FnOnce(&mut T) + Send + 'static,
{
    let cancelled = Arc::new(AtomicBool::new(false));
    let flag = cancelled.clone();

    let task = tokio::spawn(async move {
        sleep(delay).await;

        let Some(state) = state.upgrade() else {
            trace!("timeout fired after controller was dropped");
            return;
        };
        let mut guard = lock(&state);
        if flag.load(Ordering::SeqCst) {
            return;
        }
        callback(&mut guard);
    });

    TimerHandle { cancelled, task }
}

/// Run `callback` on `state` every `period` until it breaks or the timer is cancelled.
///
/// The first tick happens one period after spawning.
pub(crate) fn spawn_interval<T, F>(
    state: Weak<Mutex<T>>,
    period: Duration,
    mut callback: F,
) -> TimerHandle
where
    T: Send + 'static,
    F: FnMut(&mut T) -> ControlFlow<()> + Send + 'static,
{
    let cancelled = Arc::new(AtomicBool::new(false));
    let flag = cancelled.clone();

    let task = tokio::spawn(async move {
        loop {
            sleep(period).await;

            let Some(state) = state.upgrade() else {
                trace!("interval stopped, controller was dropped");
                return;
            };
            let mut guard = lock(&state);
            if flag.load(Ordering::SeqCst) {
                return;
            }
            if callback(&mut guard).is_break() {
                return;
            }
            // The callback may have cancelled this very timer
            if flag.load(Ordering::SeqCst) {
                return;
            }
        }
    });

    TimerHandle { cancelled, task }
}
