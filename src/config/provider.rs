//! Configuration provider seam.
//!
//! Webhook URLs are looked up before every send so edits to the config file
//! take effect without a restart.

use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};

use crate::category::WebhookPurpose;

use super::{load_from_path, RelayConfig};

/// Source of the logs directory and webhook URLs.
pub trait ConfigProvider: Send + Sync {
    /// Directory the game server writes its logs into.
    fn logs_path(&self) -> Option<PathBuf>;

    /// Webhook URL for a purpose, if configured.
    fn webhook(&self, purpose: WebhookPurpose) -> Option<String>;

    /// Fallback URLs for a purpose, tried in order after the primary fails.
    fn fallbacks(&self, purpose: WebhookPurpose) -> Vec<String>;
}

impl ConfigProvider for RelayConfig {
    fn logs_path(&self) -> Option<PathBuf> {
        self.logs_path.clone()
    }

    fn webhook(&self, purpose: WebhookPurpose) -> Option<String> {
        self.webhooks.get(purpose).map(String::from)
    }

    fn fallbacks(&self, purpose: WebhookPurpose) -> Vec<String> {
        self.fallbacks.get(purpose).to_vec()
    }
}

/// Provider that re-reads a TOML file on every lookup.
#[derive(Debug)]
pub struct FileConfigProvider {
    path: PathBuf,
    /// Set while the file fails to load, so a broken edit is reported once.
    failing: AtomicBool,
}

impl FileConfigProvider {
    #[must_use]
    pub fn new(path: PathBuf) -> Self {
        Self {
            path,
            failing: AtomicBool::new(false),
        }
    }

    #[must_use]
    pub fn path(&self) -> &PathBuf {
        &self.path
    }

    /// Whether the last reload failed.
    #[must_use]
    pub fn is_failing(&self) -> bool {
        self.failing.load(Ordering::Relaxed)
    }

    /// Read the current file contents. Failures count as an empty config.
    fn current(&self) -> RelayConfig {
        match load_from_path(&self.path) {
            Ok(config) => {
                if self.failing.swap(false, Ordering::Relaxed) {
                    tracing::info!(path = %self.path.display(), "Config reload recovered");
                }
                config
            }
            Err(e) => {
                if !self.failing.swap(true, Ordering::Relaxed) {
                    tracing::warn!(error = %e, "Config reload failed, treating settings as missing");
                }
                RelayConfig::default()
            }
        }
    }
}

impl ConfigProvider for FileConfigProvider {
    fn logs_path(&self) -> Option<PathBuf> {
        self.current().logs_path
    }

    fn webhook(&self, purpose: WebhookPurpose) -> Option<String> {
        self.current().webhook(purpose)
    }

    fn fallbacks(&self, purpose: WebhookPurpose) -> Vec<String> {
        self.current().fallbacks(purpose)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_file_provider_picks_up_edits() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("relay.toml");
        std::fs::write(&path, "[webhooks]\nchatGlobal = \"https://a\"\n").unwrap();

        let provider = FileConfigProvider::new(path.clone());
        assert_eq!(
            provider.webhook(WebhookPurpose::ChatGlobal).as_deref(),
            Some("https://a")
        );

        std::fs::write(&path, "[webhooks]\nchatGlobal = \"https://b\"\n").unwrap();
        assert_eq!(
            provider.webhook(WebhookPurpose::ChatGlobal).as_deref(),
            Some("https://b")
        );
    }

    #[test]
    fn test_file_provider_tracks_failure_streak() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("relay.toml");
        std::fs::write(&path, "[webhooks\nbroken").unwrap();

        let provider = FileConfigProvider::new(path.clone());
        assert!(provider.webhook(WebhookPurpose::LogsAdm).is_none());
        assert!(provider.fallbacks(WebhookPurpose::LogsAdm).is_empty());
        assert!(provider.is_failing());

        std::fs::write(&path, "[webhooks]\nlogsAdm = \"https://a\"\n").unwrap();
        assert_eq!(
            provider.webhook(WebhookPurpose::LogsAdm).as_deref(),
            Some("https://a")
        );
        assert!(!provider.is_failing());
    }

    #[test]
    fn test_file_provider_missing_file_is_empty() {
        let provider = FileConfigProvider::new(PathBuf::from("/nonexistent/relay.toml"));
        assert!(provider.logs_path().is_none());
        assert!(provider.webhook(WebhookPurpose::LogsAdm).is_none());
        assert!(provider.fallbacks(WebhookPurpose::LogsAdm).is_empty());
    }

    #[test]
    fn test_static_provider() {
        let mut config = RelayConfig::default();
        config.webhooks.logs_adm = Some("https://x".to_string());
        assert_eq!(config.webhook(WebhookPurpose::LogsAdm).as_deref(), Some("https://x"));
        assert!(config.webhook(WebhookPurpose::PainelPlayersOn).is_none());
    }
}
