//! Abstraction for the waits between retry attempts.
//!
//! Production code sleeps on the tokio timer; tests swap in a sleeper that returns
//! immediately and records the requested backoff.

use std::future::Future;
use std::pin::Pin;
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Abstraction for sleeping/waiting
pub trait Sleeper: Send + Sync + std::fmt::Debug {
    fn sleep(&self, duration: Duration) -> Pin<Box<dyn Future<Output = ()> + Send>>;
}

/// Production sleeper using tokio runtime
#[derive(Debug, Default, Clone, Copy)]
pub struct TokioSleeper;

impl Sleeper for TokioSleeper {
    fn sleep(&self, duration: Duration) -> Pin<Box<dyn Future<Output = ()> + Send>> {
        Box::pin(tokio::time::sleep(duration))
    }
}

/// Sleeper that returns immediately.
#[derive(Debug, Default, Clone, Copy)]
pub struct InstantSleeper;

impl Sleeper for InstantSleeper {
    fn sleep(&self, _duration: Duration) -> Pin<Box<dyn Future<Output = ()> + Send>> {
        Box::pin(async {})
    }
}

/// Returns immediately and remembers every requested delay, in order.
#[derive(Debug, Clone, Default)]
pub struct TrackingSleeper {
    calls: Arc<Mutex<Vec<Duration>>>,
}

impl TrackingSleeper {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of recorded delays.
    pub fn calls(&self) -> Vec<Duration> {
        self.calls.lock().expect("tracking sleeper poisoned").clone()
    }

    /// Sum of all recorded delays.
    pub fn total(&self) -> Duration {
        self.calls().into_iter().sum()
    }

    pub fn clear(&self) {
        self.calls.lock().expect("tracking sleeper poisoned").clear();
    }
}

impl Sleeper for TrackingSleeper {
    fn sleep(&self, duration: Duration) -> Pin<Box<dyn Future<Output = ()> + Send>> {
        self.calls.lock().expect("tracking sleeper poisoned").push(duration);
        Box::pin(async {})
    }
}
