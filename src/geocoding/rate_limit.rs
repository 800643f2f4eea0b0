//! Shared outbound request rate gate

use std::time::Duration;

use tokio::sync::Mutex;
use tokio::time::{Instant, sleep};
use tracing::trace;

/// Rate limiter for API requests.
///
/// One instance is shared by every worker of a stage. Permits are handed
/// out one at a time, at least `min_interval` apart, regardless of how
/// many workers are waiting.
#[derive(Debug)]
pub struct RateLimiter {
    /// Minimum spacing between two permits
    min_interval: Duration,
    /// When the last permit was granted
    last_permit: Mutex<Option<Instant>>,
}

impl RateLimiter {
    /// Create a limiter allowing at most `max_requests_per_second` permits per second
    #[must_use]
    pub fn new(max_requests_per_second: u32) -> Self {
        let per_second = u64::from(max_requests_per_second.max(1));
        Self::with_interval(Duration::from_micros(1_000_000 / per_second))
    }

    #[must_use]
    pub fn with_interval(min_interval: Duration) -> Self {
        Self {
            min_interval,
            last_permit: Mutex::new(None),
        }
    }

    #[must_use]
    pub fn min_interval(&self) -> Duration {
        self.min_interval
    }

    /// Wait for the next permit.
    ///
    /// The lock is held while sleeping, so waiters are served strictly one
    /// after another.
    pub async fn acquire(&self) {
        let mut last = self.last_permit.lock().await;
        if let Some(previous) = *last {
            let elapsed = previous.elapsed();
            if elapsed < self.min_interval {
                let wait = self.min_interval - elapsed;
                trace!("Rate gate closed, waiting {:?}", wait);
                sleep(wait).await;
            }
        }
        *last = Some(Instant::now());
    }
}
