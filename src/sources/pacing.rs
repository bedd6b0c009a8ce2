//! Request pacing for sources that rate limit scrapers

use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::Instant;

/// Serializes requests of one adapter with a fixed gap between them
#[derive(Debug)]
pub struct RequestPacer {
    interval: Duration,
    last: Mutex<Option<Instant>>,
}

impl RequestPacer {
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            last: Mutex::new(None),
        }
    }

    /// Waits for the slot, then runs `request` while holding it
    pub async fn run<F, T>(&self, request: F) -> T
    where
        F: std::future::Future<Output = T>,
    {
        let mut last = self.last.lock().await;
        if let Some(previous) = *last {
            tokio::time::sleep_until(previous + self.interval).await;
        }
        let output = request.await;
        *last = Some(Instant::now());
        output
    }
}
