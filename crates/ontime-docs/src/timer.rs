//! Timer abstraction for the status poll loop.
//!
//! The interval and the attempt budget are separate knobs; tests swap the
//! tokio timer for one that returns immediately and records each wait.

use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use ontime_core::config::UploadConfig;

/// Waits between two status polls.
#[async_trait]
pub trait PollTimer: Send + Sync {
    async fn sleep(&self, interval: Duration);
}

/// Real timer backed by `tokio::time::sleep`.
#[derive(Debug, Default, Clone, Copy)]
pub struct TokioTimer;

#[async_trait]
impl PollTimer for TokioTimer {
    async fn sleep(&self, interval: Duration) {
        tokio::time::sleep(interval).await;
    }
}

/// Timer that never waits and records every requested interval.
#[derive(Debug, Default)]
pub struct InstantTimer {
    waits: Mutex<Vec<Duration>>,
}

impl InstantTimer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn waits(&self) -> Vec<Duration> {
        self.waits.lock().map(|w| w.clone()).unwrap_or_default()
    }
}

#[async_trait]
impl PollTimer for InstantTimer {
    async fn sleep(&self, interval: Duration) {
        if let Ok(mut waits) = self.waits.lock() {
            waits.push(interval);
        }
        tokio::task::yield_now().await;
    }
}

/// Fixed-interval, fixed-count polling schedule. No backoff.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollPolicy {
    pub interval: Duration,
    pub max_attempts: u32,
}

impl Default for PollPolicy {
    fn default() -> Self {
        Self::from(&UploadConfig::default())
    }
}

impl From<&UploadConfig> for PollPolicy {
    fn from(config: &UploadConfig) -> Self {
        Self {
            interval: Duration::from_secs(config.poll_interval_secs),
            max_attempts: config.max_poll_attempts,
        }
    }
}
