//! Log categories written by the game server.
//!
//! Every category has its own file naming pattern, text encoding, parser,
//! webhook and dedup retention. These are static properties, never inferred
//! from file contents.

use std::fmt;
use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Text encoding of a log file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogEncoding {
    Utf8,
    Utf16Le,
}

impl LogEncoding {
    /// Width in bytes of one code unit.
    #[must_use]
    pub fn unit_len(self) -> usize {
        match self {
            Self::Utf8 => 1,
            Self::Utf16Le => 2,
        }
    }

    /// Byte-order mark the game server may write at the start of a file.
    #[must_use]
    pub fn bom(self) -> &'static [u8] {
        match self {
            Self::Utf8 => &[0xEF, 0xBB, 0xBF],
            Self::Utf16Le => &[0xFF, 0xFE],
        }
    }
}

/// Named webhook a category posts to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum WebhookPurpose {
    #[serde(rename = "logsAdm")]
    LogsAdm,
    #[serde(rename = "chatGlobal")]
    ChatGlobal,
    #[serde(rename = "logDestruicaoVeiculos")]
    LogDestruicaoVeiculos,
    #[serde(rename = "painelPlayersOn")]
    PainelPlayersOn,
}

impl WebhookPurpose {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::LogsAdm => "logsAdm",
            Self::ChatGlobal => "chatGlobal",
            Self::LogDestruicaoVeiculos => "logDestruicaoVeiculos",
            Self::PainelPlayersOn => "painelPlayersOn",
        }
    }
}

/// What the supervisor does with unread bytes found at startup.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StartupMode {
    /// Mark the latest file as read without sending anything.
    CatchUp,
    /// Push every unread line of every file through the normal pipeline.
    Replay,
}

/// A watcher category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogCategory {
    Admin,
    Chat,
    Login,
    Destruction,
}

impl LogCategory {
    /// All categories, in startup order.
    pub const ALL: [Self; 4] = [Self::Admin, Self::Chat, Self::Login, Self::Destruction];

    /// File name prefix, e.g. `chat_` for `chat_20250705032313.log`.
    #[must_use]
    pub fn file_prefix(self) -> &'static str {
        match self {
            Self::Admin => "admin_",
            Self::Chat => "chat_",
            Self::Login => "login_",
            Self::Destruction => "vehicle_destruction_",
        }
    }

    /// Stem used for this category's persisted state files.
    #[must_use]
    pub fn state_stem(self) -> &'static str {
        match self {
            Self::Admin => "admin",
            Self::Chat => "chat",
            Self::Login => "login",
            Self::Destruction => "vehicle_destruction",
        }
    }

    #[must_use]
    pub fn encoding(self) -> LogEncoding {
        match self {
            Self::Admin | Self::Destruction => LogEncoding::Utf8,
            Self::Chat | Self::Login => LogEncoding::Utf16Le,
        }
    }

    /// Interval of the polling safety net.
    #[must_use]
    pub fn poll_interval(self) -> Duration {
        match self {
            Self::Chat | Self::Login => Duration::from_secs(1),
            Self::Admin => Duration::from_secs(2),
            Self::Destruction => Duration::from_secs(5),
        }
    }

    /// How long a processed-event key is remembered.
    #[must_use]
    pub fn dedup_retention(self) -> chrono::Duration {
        match self {
            Self::Admin | Self::Login => chrono::Duration::hours(24),
            Self::Chat => chrono::Duration::days(7),
            Self::Destruction => chrono::Duration::days(30),
        }
    }

    #[must_use]
    pub fn webhook_purpose(self) -> WebhookPurpose {
        match self {
            Self::Admin => WebhookPurpose::LogsAdm,
            Self::Chat => WebhookPurpose::ChatGlobal,
            Self::Login => WebhookPurpose::PainelPlayersOn,
            Self::Destruction => WebhookPurpose::LogDestruicaoVeiculos,
        }
    }

    /// Destruction events are high-value and low-volume, so a restart replays
    /// them instead of skipping the backlog.
    #[must_use]
    pub fn startup_mode(self) -> StartupMode {
        match self {
            Self::Destruction => StartupMode::Replay,
            Self::Admin | Self::Chat | Self::Login => StartupMode::CatchUp,
        }
    }

    /// Check whether a file belongs to this category.
    #[must_use]
    pub fn matches_file(self, path: &Path) -> bool {
        path.file_name()
            .and_then(|n| n.to_str())
            .is_some_and(|name| self.matches_name(name))
    }

    /// Check whether a bare file name belongs to this category.
    #[must_use]
    pub fn matches_name(self, name: &str) -> bool {
        name.starts_with(self.file_prefix())
            && name.ends_with(".log")
            && name.len() > self.file_prefix().len() + ".log".len()
    }
}

impl fmt::Display for LogCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.state_stem())
    }
}
