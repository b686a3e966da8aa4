//! Webhook delivery.
//!
//! Formats parsed events into message text and posts it to webhooks with
//! per-webhook rate limiting, retries with exponential backoff and fallback
//! targets.

mod dispatcher;
mod error;
mod format;
mod rate_limit;
mod send_log;

use async_trait::async_trait;
use serde::Serialize;

pub use dispatcher::WebhookDispatcher;
pub use error::{DeliveryError, DispatcherError};
pub use format::{escape_markdown, format_event, truncate_content, MAX_CONTENT_CHARS};
pub use rate_limit::{webhook_key, RateLimiter};
pub use send_log::{SendLog, SendLogEntry, SendStats, SEND_LOG_FILE};

/// A successful delivery through a list of targets.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FallbackDelivery {
    /// The fallback URL that accepted the message, if the primary did not.
    pub used_fallback: Option<String>,
}

/// Outward result shape of a single send.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SendOutcome {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl From<&Result<(), DeliveryError>> for SendOutcome {
    fn from(result: &Result<(), DeliveryError>) -> Self {
        match result {
            Ok(()) => Self {
                success: true,
                error: None,
            },
            Err(e) => Self {
                success: false,
                error: Some(e.to_string()),
            },
        }
    }
}

/// Outward result shape of a send with fallbacks.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FallbackOutcome {
    pub success: bool,
    pub used_fallback: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl From<&Result<FallbackDelivery, DeliveryError>> for FallbackOutcome {
    fn from(result: &Result<FallbackDelivery, DeliveryError>) -> Self {
        match result {
            Ok(delivery) => Self {
                success: true,
                used_fallback: delivery.used_fallback.is_some(),
                error: None,
            },
            Err(e) => Self {
                success: false,
                used_fallback: false,
                error: Some(e.to_string()),
            },
        }
    }
}

/// Destination for formatted messages.
#[async_trait]
pub trait MessageSink: Send + Sync {
    /// Deliver `text` to one webhook.
    async fn send(&self, url: &str, text: &str) -> Result<(), DeliveryError>;

    /// Try `primary`, then each fallback in order, stopping at the first success.
    ///
    /// When every target fails, a transient error wins over a terminal one so
    /// callers retry later.
    async fn send_with_fallback(
        &self,
        primary: &str,
        text: &str,
        fallbacks: &[String],
    ) -> Result<FallbackDelivery, DeliveryError> {
        let mut failure = match self.send(primary, text).await {
            Ok(()) => return Ok(FallbackDelivery::default()),
            Err(e) => e,
        };

        for fallback in fallbacks {
            tracing::info!(error = %failure, "Primary webhook failed, trying fallback");
            match self.send(fallback, text).await {
                Ok(()) => {
                    return Ok(FallbackDelivery {
                        used_fallback: Some(fallback.clone()),
                    })
                }
                Err(e) => {
                    if failure.is_terminal() || !e.is_terminal() {
                        failure = e;
                    }
                }
            }
        }
        Err(failure)
    }
}
