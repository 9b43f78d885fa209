use std::future::Future;
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;

use tokio::task::JoinHandle;

/// A single cancellable delayed task. Scheduling again replaces (and aborts)
/// whatever was pending, which gives trailing-edge debounce.
#[derive(Debug, Default)]
pub struct TimerSlot {
    pending: Mutex<Option<JoinHandle<()>>>,
}

impl TimerSlot {
    pub fn new() -> Self {
        Self::default()
    }

    /// Run `task` after `delay` unless rescheduled or cancelled first.
    /// Must be called from inside a tokio runtime.
    pub fn schedule<F>(&self, delay: Duration, task: F)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let handle = tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            task.await;
        });
        if let Some(previous) = self.slot().replace(handle) {
            previous.abort();
        }
    }

    /// Returns true if something was still waiting.
    pub fn cancel(&self) -> bool {
        match self.slot().take() {
            Some(handle) => {
                let was_pending = !handle.is_finished();
                handle.abort();
                was_pending
            }
            None => false,
        }
    }

    pub fn is_pending(&self) -> bool {
        self.slot()
            .as_ref()
            .is_some_and(|handle| !handle.is_finished())
    }

    fn slot(&self) -> MutexGuard<'_, Option<JoinHandle<()>>> {
        self.pending.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl Drop for TimerSlot {
    fn drop(&mut self) {
        if let Some(handle) = self.slot().take() {
            handle.abort();
        }
    }
}
