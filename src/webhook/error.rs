//! Webhook error types.

/// Errors building a dispatcher.
#[derive(thiserror::Error, Debug)]
pub enum DispatcherError {
    /// The configured webhook URL pattern is not a valid regex.
    #[error("Invalid webhook URL pattern: {0}")]
    InvalidPattern(#[from] regex::Error),

    /// The HTTP client could not be built.
    #[error("Failed to build HTTP client: {0}")]
    Client(#[from] reqwest::Error),
}

/// Why a message was not delivered.
#[derive(thiserror::Error, Debug)]
pub enum DeliveryError {
    /// URL does not look like a webhook; no request was made.
    #[error("Invalid webhook URL: {0}")]
    InvalidUrl(String),

    /// Webhook answered with a 4xx other than 429.
    #[error("Webhook rejected message: HTTP {status}: {body}")]
    Rejected { status: u16, body: String },

    /// Webhook kept answering 5xx.
    #[error("Webhook server error after {attempts} attempts: HTTP {status}")]
    ServerError { status: u16, attempts: u32 },

    /// Request kept failing before a response arrived.
    #[error("Webhook request failed after {attempts} attempts: {message}")]
    Transport { message: String, attempts: u32 },

    /// Webhook kept answering 429.
    #[error("Webhook still rate limited after {waits} waits")]
    RateLimited { waits: u32 },
}

impl DeliveryError {
    /// Terminal errors will fail the same way if retried later.
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::InvalidUrl(_) | Self::Rejected { .. })
    }
}
