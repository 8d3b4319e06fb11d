//! Time source for the polling loop.
//!
//! All waiting goes through [`Clock`], so the state machine's timing
//! decisions can be checked without real wall-clock sleeps.

use async_trait::async_trait;
use chrono::{DateTime, Local};
use std::sync::Mutex;
use std::time::Duration;

/// Wall-clock reading and suspension.
#[async_trait]
pub trait Clock: Send + Sync {
    /// Current local time, used for attempt timestamps and log lines.
    fn now(&self) -> DateTime<Local>;

    /// Suspend the caller for `duration`.
    async fn sleep(&self, duration: Duration);
}

/// Real clock backed by tokio timers.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

#[async_trait]
impl Clock for SystemClock {
    fn now(&self) -> DateTime<Local> {
        Local::now()
    }

    async fn sleep(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }
}

/// Clock that returns from `sleep` immediately and records every request.
///
/// Its `now` advances by the total requested sleep time, so timestamps
/// computed from it stay consistent with the recorded waits.
#[derive(Debug)]
pub struct InstantClock {
    start: DateTime<Local>,
    slept: Mutex<Vec<Duration>>,
}

impl InstantClock {
    /// Create a clock starting at the current local time.
    #[must_use]
    pub fn new() -> Self {
        Self {
            start: Local::now(),
            slept: Mutex::new(Vec::new()),
        }
    }

    /// Every duration passed to `sleep`, in call order.
    #[must_use]
    pub fn sleeps(&self) -> Vec<Duration> {
        self.slept.lock().map(|s| s.clone()).unwrap_or_default()
    }

    fn elapsed(&self) -> Duration {
        self.sleeps().iter().sum()
    }
}

impl Default for InstantClock {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Clock for InstantClock {
    fn now(&self) -> DateTime<Local> {
        let elapsed = chrono::Duration::from_std(self.elapsed())
            .unwrap_or_else(|_| chrono::Duration::zero());
        self.start + elapsed
    }

    async fn sleep(&self, duration: Duration) {
        if let Ok(mut slept) = self.slept.lock() {
            slept.push(duration);
        }
    }
}
