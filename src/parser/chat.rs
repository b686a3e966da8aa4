//! Chat log parser.

use std::sync::LazyLock;

use regex::Regex;

use super::{normalize_line, ChatChannel, ChatMessage};

const CHANNEL_MARKERS: [&str; 3] = ["Global:", "Local:", "Squad:"];

/// `TIMESTAMP: 'STEAMID:NAME(ID)' 'CHANNEL: MESSAGE'`, either quote style.
static CHAT_WITH_ID: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r#"^(\d{4}\.\d{2}\.\d{2}-\d{2}\.\d{2}\.\d{2}):\s*['"](\d+):(.+?)\((\d+)\)['"]\s*['"](Global|Local|Squad):\s?(.*)['"]\s*$"#,
    )
    .expect("valid chat regex")
});

/// Same as above without the trailing `(ID)`.
static CHAT_WITHOUT_ID: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r#"^(\d{4}\.\d{2}\.\d{2}-\d{2}\.\d{2}\.\d{2}):\s*['"](\d+):(.+?)['"]\s*['"](Global|Local|Squad):\s?(.*)['"]\s*$"#,
    )
    .expect("valid chat regex")
});

/// Parse a chat log line.
#[must_use]
pub fn parse_chat(raw: &str) -> Option<ChatMessage> {
    let line = normalize_line(raw);
    if !CHANNEL_MARKERS.iter().any(|m| line.contains(m)) {
        return None;
    }

    if let Some(caps) = CHAT_WITH_ID.captures(&line) {
        return Some(ChatMessage {
            timestamp: caps[1].to_string(),
            steam_id: caps[2].to_string(),
            player_name: caps[3].trim().to_string(),
            channel: ChatChannel::from_name(&caps[5])?,
            message: caps[6].to_string(),
        });
    }

    let caps = CHAT_WITHOUT_ID.captures(&line)?;
    Some(ChatMessage {
        timestamp: caps[1].to_string(),
        steam_id: caps[2].to_string(),
        player_name: caps[3].trim().to_string(),
        channel: ChatChannel::from_name(&caps[4])?,
        message: caps[5].to_string(),
    })
}
