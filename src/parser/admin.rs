//! Admin log "parser": every non-blank line is an event.

use super::{normalize_line, AdminLine};

/// Wrap a non-blank admin log line.
#[must_use]
pub fn parse_admin(raw: &str, log_file: &str) -> Option<AdminLine> {
    let line = normalize_line(raw);
    let line = line.trim();
    if line.is_empty() {
        return None;
    }
    Some(AdminLine {
        raw_line: line.to_string(),
        log_file: log_file.to_string(),
    })
}
