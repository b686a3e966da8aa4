//! HTTP webhook dispatcher.

use std::path::PathBuf;
use std::time::Duration;

use async_trait::async_trait;
use regex::Regex;
use reqwest::header::RETRY_AFTER;
use reqwest::{Client, Response, StatusCode};

use crate::config::DispatchConfig;

use super::error::{DeliveryError, DispatcherError};
use super::rate_limit::{webhook_key, RateLimiter};
use super::send_log::{SendLog, SendLogEntry, SendStats};
use super::MessageSink;

/// Connection timeout for webhook requests.
const CONNECT_TIMEOUT: Duration = Duration::from_secs(5);

/// Posts messages to webhooks.
#[derive(Debug)]
pub struct WebhookDispatcher {
    client: Client,
    config: DispatchConfig,
    url_pattern: Regex,
    limiter: RateLimiter,
    send_log: SendLog,
}

impl WebhookDispatcher {
    /// Create a dispatcher with an in-memory send log.
    ///
    /// # Errors
    ///
    /// Returns an error if the URL pattern is invalid or the HTTP client
    /// cannot be built.
    pub fn new(config: DispatchConfig) -> Result<Self, DispatcherError> {
        let client = Client::builder()
            .connect_timeout(CONNECT_TIMEOUT.min(config.timeout()))
            .timeout(config.timeout())
            .build()?;
        let url_pattern = Regex::new(&config.url_pattern)?;

        Ok(Self {
            client,
            limiter: RateLimiter::new(config.min_interval()),
            send_log: SendLog::new(config.send_log_capacity),
            url_pattern,
            config,
        })
    }

    /// Persist the send log at `path` (builder pattern).
    #[must_use]
    pub fn with_send_log(mut self, path: PathBuf) -> Self {
        self.send_log = SendLog::open(path, self.config.send_log_capacity);
        self
    }

    #[must_use]
    pub fn send_log(&self) -> &SendLog {
        &self.send_log
    }

    /// Totals over the recent send log.
    #[must_use]
    pub fn stats(&self) -> SendStats {
        self.send_log.stats()
    }

    /// Check that `url` looks like a webhook before any network call.
    ///
    /// # Errors
    ///
    /// Returns [`DeliveryError::InvalidUrl`] if the URL does not match.
    pub fn validate_url(&self, url: &str) -> Result<(), DeliveryError> {
        if self.url_pattern.is_match(url) {
            Ok(())
        } else {
            Err(DeliveryError::InvalidUrl(url.to_string()))
        }
    }

    async fn deliver(&self, url: &str, text: &str) -> Result<(), DeliveryError> {
        self.validate_url(url)?;

        let key = webhook_key(url);
        let body = serde_json::json!({ "content": text });
        let mut attempt: u32 = 0;
        let mut rate_limit_waits: u32 = 0;

        loop {
            self.limiter.acquire(&key).await;
            attempt += 1;

            let failure = match self.client.post(url).json(&body).send().await {
                Ok(response) => {
                    let status = response.status();
                    if status.is_success() {
                        tracing::debug!(webhook = %key, attempt, "Webhook message delivered");
                        return Ok(());
                    }

                    if status == StatusCode::TOO_MANY_REQUESTS {
                        // Rate-limit waits do not count as attempts.
                        attempt -= 1;
                        rate_limit_waits += 1;
                        if rate_limit_waits > self.config.max_rate_limit_waits {
                            return Err(DeliveryError::RateLimited {
                                waits: rate_limit_waits - 1,
                            });
                        }
                        let wait = self.retry_after(response).await;
                        tracing::warn!(
                            webhook = %key,
                            wait_ms = u64::try_from(wait.as_millis()).unwrap_or(u64::MAX),
                            "Webhook rate limited"
                        );
                        tokio::time::sleep(wait).await;
                        continue;
                    }

                    if status.is_client_error() {
                        let body = response.text().await.unwrap_or_default();
                        tracing::warn!(webhook = %key, status = status.as_u16(), "Webhook rejected message");
                        return Err(DeliveryError::Rejected {
                            status: status.as_u16(),
                            body,
                        });
                    }

                    DeliveryError::ServerError {
                        status: status.as_u16(),
                        attempts: attempt,
                    }
                }
                Err(e) => DeliveryError::Transport {
                    message: e.to_string(),
                    attempts: attempt,
                },
            };

            if attempt >= self.config.max_attempts {
                tracing::warn!(webhook = %key, error = %failure, "Giving up on webhook message");
                return Err(failure);
            }

            let backoff = self.config.backoff(attempt);
            tracing::info!(
                webhook = %key,
                attempt,
                backoff_ms = u64::try_from(backoff.as_millis()).unwrap_or(u64::MAX),
                error = %failure,
                "Retrying webhook message"
            );
            tokio::time::sleep(backoff).await;
        }
    }

    /// Wait requested by a 429: the `retry-after` header, then Discord's
    /// `retry_after` body field, then the configured default.
    async fn retry_after(&self, response: Response) -> Duration {
        let from_header = response
            .headers()
            .get(RETRY_AFTER)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.trim().parse::<f64>().ok());

        let seconds = match from_header {
            Some(secs) => Some(secs),
            None => response
                .json::<serde_json::Value>()
                .await
                .ok()
                .and_then(|body| body.get("retry_after").and_then(serde_json::Value::as_f64)),
        };

        let seconds = seconds
            .filter(|s| s.is_finite() && *s >= 0.0)
            .unwrap_or(self.config.default_retry_after_secs);
        clamp_wait(seconds, self.config.max_retry_after())
    }
}

/// Convert a requested wait in seconds to a duration no longer than `max`.
///
/// Negative and NaN values wait zero; values too large for a `Duration` wait `max`.
fn clamp_wait(seconds: f64, max: Duration) -> Duration {
    if seconds.is_nan() || seconds <= 0.0 {
        return Duration::ZERO;
    }
    Duration::try_from_secs_f64(seconds.min(max.as_secs_f64())).map_or(max, |wait| wait.min(max))
}

#[async_trait]
impl MessageSink for WebhookDispatcher {
    async fn send(&self, url: &str, text: &str) -> Result<(), DeliveryError> {
        let result = self.deliver(url, text).await;
        let error = result.as_ref().err().map(ToString::to_string);
        self.send_log.record(SendLogEntry::new(url, text, error)).await;
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_pattern_accepts_discord_urls() {
        let dispatcher = WebhookDispatcher::new(DispatchConfig::default()).unwrap();
        for url in [
            "https://discord.com/api/webhooks/123456/abc-DEF_123",
            "https://discordapp.com/api/webhooks/1/x",
            "https://canary.discord.com/api/webhooks/1/x",
        ] {
            assert!(dispatcher.validate_url(url).is_ok(), "{url}");
        }
        for url in [
            "http://discord.com/api/webhooks/1/x",
            "https://evil.com/api/webhooks/1/x",
            "https://discord.com/api/webhooks/abc/x",
            "",
        ] {
            assert!(
                matches!(dispatcher.validate_url(url), Err(DeliveryError::InvalidUrl(_))),
                "{url}"
            );
        }
    }

    #[tokio::test]
    async fn test_invalid_url_fails_fast_and_is_logged() {
        let dispatcher = WebhookDispatcher::new(DispatchConfig::default()).unwrap();
        let started = std::time::Instant::now();
        let result = dispatcher.send("https://example.com/hook", "hi").await;

        assert!(matches!(result, Err(DeliveryError::InvalidUrl(_))));
        assert!(started.elapsed() < Duration::from_secs(1));
        let stats = dispatcher.stats();
        assert_eq!(stats.total, 1);
        assert_eq!(stats.failed, 1);
        assert!(stats.last_error.unwrap().contains("Invalid webhook URL"));
    }

    #[test]
    fn test_clamp_wait_bounds_requested_waits() {
        let max = Duration::from_secs(300);
        assert_eq!(clamp_wait(1.5, max), Duration::from_millis(1500));
        assert_eq!(clamp_wait(1e20, max), max);
        assert_eq!(clamp_wait(f64::INFINITY, max), max);
        assert_eq!(clamp_wait(f64::MAX, max), max);
        assert_eq!(clamp_wait(-3.0, max), Duration::ZERO);
        assert_eq!(clamp_wait(f64::NAN, max), Duration::ZERO);
    }

    #[test]
    fn test_invalid_pattern_is_rejected() {
        let config = DispatchConfig {
            url_pattern: "(".to_string(),
            ..Default::default()
        };
        assert!(matches!(
            WebhookDispatcher::new(config),
            Err(DispatcherError::InvalidPattern(_))
        ));
    }
}
