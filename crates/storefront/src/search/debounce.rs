//! Trailing-edge debounce timer.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::task::JoinHandle;

/// Runs the most recently scheduled job once input has been quiet for the
/// window. Scheduling again restarts the window and discards the old job.
pub struct Debouncer {
    window: Duration,
    pending: Arc<Mutex<Pending>>,
}

#[derive(Default)]
struct Pending {
    /// Bumped by every `schedule` and `cancel`; a timer only fires if its
    /// generation is still current.
    generation: u64,
    timer: Option<JoinHandle<()>>,
}

impl Pending {
    fn supersede(&mut self) -> Option<JoinHandle<()>> {
        self.generation += 1;
        self.timer.take()
    }
}

impl Debouncer {
    #[must_use]
    pub fn new(window: Duration) -> Self {
        Self {
            window,
            pending: Arc::new(Mutex::new(Pending::default())),
        }
    }

    /// Quiet period before the job fires.
    #[must_use]
    pub const fn window(&self) -> Duration {
        self.window
    }

    /// Replace any pending job with `job` and restart the window.
    ///
    /// When the window elapses `job` is called under the timer lock, so
    /// whatever it claims synchronously (a sequence ticket) is ordered
    /// against `schedule` and `cancel`. The future it returns then runs on
    /// its own task: a later `schedule` or `cancel` only ever stops a timer,
    /// never a running job. Returns `false` (and drops the job) outside a
    /// tokio runtime.
    pub fn schedule<F, Fut>(&self, job: F) -> bool
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let Ok(handle) = tokio::runtime::Handle::try_current() else {
            tracing::warn!("debounce scheduled outside a runtime; dropping job");
            return false;
        };

        let mut pending = self.pending.lock();
        if let Some(previous) = pending.supersede() {
            previous.abort();
        }
        let generation = pending.generation;

        let window = self.window;
        let shared = Arc::clone(&self.pending);
        let spawner = handle.clone();
        pending.timer = Some(handle.spawn(async move {
            tokio::time::sleep(window).await;
            let mut pending = shared.lock();
            if pending.generation != generation {
                return;
            }
            // Detach ourselves; the job outlives the timer.
            pending.timer = None;
            spawner.spawn(job());
        }));
        true
    }

    /// Stop the pending timer. Returns `true` if one was still waiting.
    pub fn cancel(&self) -> bool {
        self.pending.lock().supersede().is_some_and(|timer| {
            let waiting = !timer.is_finished();
            timer.abort();
            waiting
        })
    }

    /// Whether a timer is waiting to fire.
    #[must_use]
    pub fn is_pending(&self) -> bool {
        self.pending
            .lock()
            .timer
            .as_ref()
            .is_some_and(|timer| !timer.is_finished())
    }
}

impl Drop for Debouncer {
    fn drop(&mut self) {
        if let Some(timer) = self.pending.lock().supersede() {
            timer.abort();
        }
    }
}
