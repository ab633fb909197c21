//! Minimum spacing between consecutive HTTP requests of one session.

use std::time::Duration;

use tokio::sync::Mutex;
use tokio::time::Instant;
use tracing::debug;

/// Enforces a minimum interval between requests.
#[derive(Debug)]
pub struct RequestSpacer {
    /// Minimum duration between requests.
    min_interval: Duration,

    /// When the last request was let through.
    last_request: Mutex<Option<Instant>>,
}

impl RequestSpacer {
    /// Creates a spacer with the given minimum interval.
    #[must_use]
    pub fn new(min_interval: Duration) -> Self {
        Self {
            min_interval,
            last_request: Mutex::new(None),
        }
    }

    /// Waits until the next request is allowed, then marks it as sent.
    ///
    /// Returns the duration waited.
    pub async fn acquire(&self) -> Duration {
        let mut last = self.last_request.lock().await;

        let wait = last.map_or(Duration::ZERO, |at| {
            self.min_interval.saturating_sub(at.elapsed())
        });

        if !wait.is_zero() {
            debug!("Spacing request by {:?}", wait);
            tokio::time::sleep(wait).await;
        }

        *last = Some(Instant::now());
        wait
    }
}
