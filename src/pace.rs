//! Fixed pauses between successive generation calls.
//!
//! The pipeline is strictly sequential. A short fixed delay between chunk
//! calls (and between files) keeps the request rate against the provider
//! low. There is no backoff and no cancellation: a pause always runs to
//! completion before the next call is issued.

use async_trait::async_trait;
use std::time::Duration;

/// Waits between two generation calls.
#[async_trait]
pub trait Pacer: Send + Sync {
    async fn pause(&self);
}

/// Sleeps for a fixed duration on the tokio runtime.
#[derive(Debug, Clone, Copy)]
pub struct FixedDelay(pub Duration);

impl FixedDelay {
    pub fn from_millis(ms: u64) -> Self {
        Self(Duration::from_millis(ms))
    }
}

#[async_trait]
impl Pacer for FixedDelay {
    async fn pause(&self) {
        if !self.0.is_zero() {
            tokio::time::sleep(self.0).await;
        }
    }
}

/// Returns immediately.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoDelay;

#[async_trait]
impl Pacer for NoDelay {
    async fn pause(&self) {}
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Instant;

    #[tokio::test]
    async fn test_fixed_delay_waits() {
        let start = Instant::now();
        FixedDelay::from_millis(20).pause().await;
        assert!(start.elapsed() >= Duration::from_millis(20));
    }

    #[tokio::test]
    async fn test_zero_delay_returns_immediately() {
        let start = Instant::now();
        FixedDelay::from_millis(0).pause().await;
        NoDelay.pause().await;
        assert!(start.elapsed() < Duration::from_millis(20));
    }
}
