//! Periodic eviction of expired rate-limit windows.
//!
//! The sweep is memory hygiene only: a stale window left in place behaves exactly like
//! a missing one on the next check.

use crate::rate_limit::RateLimiter;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

/// How often the background sweep runs.
pub const DEFAULT_SWEEP_INTERVAL: Duration = Duration::from_secs(60);

const MIN_SWEEP_INTERVAL: Duration = Duration::from_millis(1);

/// Owns the sweep task. [`stop`](Self::stop) shuts it down cleanly; dropping the
/// handle aborts it.
#[derive(Debug)]
pub struct SweeperHandle {
    shutdown: watch::Sender<bool>,
    task: Option<JoinHandle<()>>,
}

impl SweeperHandle {
    pub(crate) fn spawn(limiter: RateLimiter, every: Duration) -> Self {
        let every = every.max(MIN_SWEEP_INTERVAL);
        let (shutdown, mut stop_rx) = watch::channel(false);

        let task = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(every);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            // first tick completes immediately
            ticker.tick().await;
            tracing::info!(?every, "rate limit sweeper started");

            loop {
                tokio::select! {
                    _ = ticker.tick() => {
                        let removed = limiter.sweep();
                        tracing::debug!(removed, remaining = limiter.len(), "rate limit sweep");
                    }
                    changed = stop_rx.changed() => {
                        if changed.is_err() || *stop_rx.borrow() {
                            break;
                        }
                    }
                }
            }
            tracing::info!("rate limit sweeper stopped");
        });

        Self { shutdown, task: Some(task) }
    }

    pub fn is_running(&self) -> bool {
        self.task.as_ref().is_some_and(|task| !task.is_finished())
    }

    /// Signal the task and wait for it to exit.
    pub async fn stop(mut self) {
        let _ = self.shutdown.send(true);
        if let Some(task) = self.task.take() {
            let _ = task.await;
        }
    }
}

impl Drop for SweeperHandle {
    fn drop(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}
