//! Per-webhook send spacing.

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;

use tokio::time::Instant;
use url::Url;

/// Identify a webhook by its URL path (`/api/webhooks/<id>/<token>`).
#[must_use]
pub fn webhook_key(url: &str) -> String {
    Url::parse(url).map_or_else(|_| url.to_string(), |u| u.path().to_string())
}

/// Keeps at least `min_interval` between sends to the same webhook.
#[derive(Debug)]
pub struct RateLimiter {
    min_interval: Duration,
    /// Time of the latest reserved send per webhook key.
    last_sent: Mutex<HashMap<String, Instant>>,
}

impl RateLimiter {
    #[must_use]
    pub fn new(min_interval: Duration) -> Self {
        Self {
            min_interval,
            last_sent: Mutex::new(HashMap::new()),
        }
    }

    /// Reserve the next send slot for `key` and return how long to wait for it.
    ///
    /// Slots are handed out in call order, so concurrent callers queue up
    /// behind each other instead of all sending at once.
    pub fn reserve(&self, key: &str) -> Duration {
        let now = Instant::now();
        let mut last_sent = self
            .last_sent
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        let slot = match last_sent.get(key) {
            Some(last) => (*last + self.min_interval).max(now),
            None => now,
        };
        last_sent.insert(key.to_string(), slot);
        slot - now
    }

    /// Wait until a send to `key` is allowed.
    pub async fn acquire(&self, key: &str) {
        let wait = self.reserve(key);
        if !wait.is_zero() {
            tracing::trace!(webhook = key, wait_ms = u64::try_from(wait.as_millis()).unwrap_or(u64::MAX), "Rate limiting send");
            tokio::time::sleep(wait).await;
        }
    }
}
