//! Line parsers, one per log category.
//!
//! All parsers are pure and total: a line either becomes a typed event or is
//! dropped. Patterns are tried in a fixed priority order and the first match
//! wins.

mod admin;
mod chat;
mod destruction;
mod event;
mod login;

pub use admin::parse_admin;
pub use chat::parse_chat;
pub use destruction::parse_destruction;
pub use event::{
    AdminLine, ChatChannel, ChatMessage, LoginAction, LoginEvent, ParsedEvent, VehicleEvent,
    VehicleEventType,
};
pub use login::parse_login;

use crate::category::LogCategory;

/// Remove artifacts of UTF-16LE text read with the wrong width.
///
/// Strips NUL characters and the byte-order mark, and trims trailing
/// line terminators.
#[must_use]
pub fn normalize_line(raw: &str) -> String {
    raw.chars()
        .filter(|c| *c != '\u{0000}' && *c != '\u{FEFF}')
        .collect::<String>()
        .trim_end_matches(['\r', '\n'])
        .to_string()
}

/// Parse a line with the parser of its category.
#[must_use]
pub fn parse_line(category: LogCategory, raw: &str, log_file: &str) -> Option<ParsedEvent> {
    match category {
        LogCategory::Admin => parse_admin(raw, log_file).map(ParsedEvent::Admin),
        LogCategory::Chat => parse_chat(raw).map(ParsedEvent::Chat),
        LogCategory::Login => parse_login(raw).map(ParsedEvent::Login),
        LogCategory::Destruction => parse_destruction(raw).map(ParsedEvent::Vehicle),
    }
}
