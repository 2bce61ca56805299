//! Pacing for concurrent scans.
//!
//! A token bucket with a single token refilled once per pacing period, so
//! probe starts are spaced at least that far apart no matter how many
//! workers share the limiter. Sequential scans sleep after each result
//! instead.

use governor::clock::DefaultClock;
use governor::state::{InMemoryState, NotKeyed};
use governor::{Quota, RateLimiter};
use std::sync::Arc;
use std::time::Duration;

/// Spaces out probe starts. A zero period disables pacing.
#[derive(Clone)]
pub struct Pacer {
    limiter: Option<Arc<RateLimiter<NotKeyed, InMemoryState, DefaultClock>>>,
}

impl Pacer {
    /// Default delay between probes.
    pub const DEFAULT_PERIOD: Duration = Duration::from_millis(10);

    pub fn new(period: Duration) -> Self {
        // `with_period` yields None for a zero period.
        let limiter = Quota::with_period(period).map(|quota| Arc::new(RateLimiter::direct(quota)));
        Self { limiter }
    }

    pub fn is_paced(&self) -> bool {
        self.limiter.is_some()
    }

    /// Wait until the next probe may start.
    pub async fn wait(&self) {
        if let Some(limiter) = &self.limiter {
            limiter.until_ready().await;
        }
    }
}

impl Default for Pacer {
    fn default() -> Self {
        Self::new(Self::DEFAULT_PERIOD)
    }
}

impl std::fmt::Debug for Pacer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Pacer")
            .field("paced", &self.is_paced())
            .finish()
    }
}
