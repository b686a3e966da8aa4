//! Configuration types.

use std::collections::HashMap;
use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::category::WebhookPurpose;

/// Regex matched against webhook URLs before any network call.
pub const DEFAULT_WEBHOOK_URL_PATTERN: &str =
    r"^https://(?:(?:canary|ptb)\.)?discord(?:app)?\.com/api/webhooks/\d+/[A-Za-z0-9_\-]+";

/// Top-level relay configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RelayConfig {
    /// Directory the game server writes its logs into.
    #[serde(alias = "logsPath")]
    pub logs_path: Option<PathBuf>,
    /// Directory holding offsets, processed events and the send log.
    #[serde(alias = "stateDir")]
    pub state_dir: Option<PathBuf>,
    /// Webhook URL per purpose.
    pub webhooks: WebhookUrls,
    /// Fallback webhook URLs per purpose, tried in order.
    pub fallbacks: FallbackUrls,
    pub watch: WatchConfig,
    pub dispatch: DispatchConfig,
}

impl RelayConfig {
    /// Resolve the state directory, falling back to the platform data dir.
    #[must_use]
    pub fn resolved_state_dir(&self) -> PathBuf {
        if let Some(dir) = &self.state_dir {
            return dir.clone();
        }
        dirs::data_dir().map_or_else(
            || PathBuf::from("state"),
            |dir| dir.join("gamelog-relay"),
        )
    }
}

/// Named webhook URLs.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct WebhookUrls {
    #[serde(alias = "logsAdm")]
    pub logs_adm: Option<String>,
    #[serde(alias = "chatGlobal")]
    pub chat_global: Option<String>,
    #[serde(alias = "logDestruicaoVeiculos")]
    pub log_destruicao_veiculos: Option<String>,
    #[serde(alias = "painelPlayersOn")]
    pub painel_players_on: Option<String>,
}

impl WebhookUrls {
    /// Look up the URL for a purpose. Blank values count as missing.
    #[must_use]
    pub fn get(&self, purpose: WebhookPurpose) -> Option<&str> {
        let url = match purpose {
            WebhookPurpose::LogsAdm => self.logs_adm.as_deref(),
            WebhookPurpose::ChatGlobal => self.chat_global.as_deref(),
            WebhookPurpose::LogDestruicaoVeiculos => self.log_destruicao_veiculos.as_deref(),
            WebhookPurpose::PainelPlayersOn => self.painel_players_on.as_deref(),
        };
        url.map(str::trim).filter(|u| !u.is_empty())
    }
}

/// Fallback URLs keyed by purpose name (`logsAdm`, `chatGlobal`, ...).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FallbackUrls(pub HashMap<WebhookPurpose, Vec<String>>);

impl FallbackUrls {
    #[must_use]
    pub fn get(&self, purpose: WebhookPurpose) -> &[String] {
        self.0.get(&purpose).map_or(&[], Vec::as_slice)
    }
}

/// Change detection settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WatchConfig {
    /// Window in which bursts of triggers for one file collapse into one pass.
    pub debounce_ms: u64,
    /// Quiet period the debounced watcher waits for before reporting.
    pub stability_ms: u64,
    /// Also subscribe to raw OS notifications.
    pub native_events: bool,
    /// Periodically create and remove a sibling file so backends notice changes.
    pub force_visibility: bool,
    pub force_visibility_interval_secs: u64,
    /// Override of the per-category polling interval.
    pub poll_interval_ms: Option<u64>,
}

impl Default for WatchConfig {
    fn default() -> Self {
        Self {
            debounce_ms: 100,
            stability_ms: 50,
            native_events: true,
            force_visibility: false,
            force_visibility_interval_secs: 5,
            poll_interval_ms: None,
        }
    }
}

impl WatchConfig {
    #[must_use]
    pub fn debounce(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }

    #[must_use]
    pub fn stability(&self) -> Duration {
        Duration::from_millis(self.stability_ms)
    }
}

/// Webhook delivery settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DispatchConfig {
    /// Minimum spacing between two sends to the same webhook.
    pub min_interval_ms: u64,
    /// Per-request timeout.
    pub timeout_secs: u64,
    /// Attempts for 5xx and transport failures, first attempt included.
    pub max_attempts: u32,
    /// First backoff delay; doubles on every further retry.
    pub backoff_base_ms: u64,
    /// Wait used when a 429 carries no usable `retry-after`.
    pub default_retry_after_secs: f64,
    /// Upper bound on 429 waits for one message.
    pub max_rate_limit_waits: u32,
    /// Longest single wait a 429 can impose.
    pub max_retry_after_ms: u64,
    pub url_pattern: String,
    /// Entries kept in the send log.
    pub send_log_capacity: usize,
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            min_interval_ms: 200,
            timeout_secs: 10,
            max_attempts: 3,
            backoff_base_ms: 2000,
            default_retry_after_secs: 5.0,
            max_rate_limit_waits: 10,
            max_retry_after_ms: 300_000,
            url_pattern: DEFAULT_WEBHOOK_URL_PATTERN.to_string(),
            send_log_capacity: 100,
        }
    }
}

impl DispatchConfig {
    #[must_use]
    pub fn min_interval(&self) -> Duration {
        Duration::from_millis(self.min_interval_ms)
    }

    #[must_use]
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    #[must_use]
    pub fn max_retry_after(&self) -> Duration {
        Duration::from_millis(self.max_retry_after_ms)
    }

    /// Delay before retry number `retry` (1-based): 2s, 4s, 8s with defaults.
    #[must_use]
    pub fn backoff(&self, retry: u32) -> Duration {
        let factor = 1u64 << retry.saturating_sub(1).min(16);
        Duration::from_millis(self.backoff_base_ms.saturating_mul(factor))
    }
}
