//! Minimum spacing between requests to the listing service

use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::Instant;

/// Enforces a minimum delay between consecutive requests
///
/// Every request path (sequential crawl, boundary search, probes) goes
/// through the same throttle, so the service never sees two requests closer
/// together than `min_interval`.
#[derive(Debug)]
pub struct Throttle {
    min_interval: Duration,
    last_request: Mutex<Option<Instant>>,
}

impl Throttle {
    pub fn new(min_interval: Duration) -> Self {
        Self {
            min_interval,
            last_request: Mutex::new(None),
        }
    }

    pub fn min_interval(&self) -> Duration {
        self.min_interval
    }

    /// Time left before the next request may be sent
    fn time_until_ready(&self, last: Option<Instant>, now: Instant) -> Option<Duration> {
        let elapsed = now.saturating_duration_since(last?);
        if elapsed < self.min_interval {
            Some(self.min_interval - elapsed)
        } else {
            None
        }
    }

    /// Waits until a request may be sent and claims the slot
    pub async fn wait(&self) {
        let mut last = self.last_request.lock().await;
        if let Some(wait) = self.time_until_ready(*last, Instant::now()) {
            tracing::trace!("Throttling for {:?}", wait);
            tokio::time::sleep(wait).await;
        }
        *last = Some(Instant::now());
    }
}
