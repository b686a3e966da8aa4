//! Login/logout log parser.

use std::sync::LazyLock;

use regex::Regex;

use super::{normalize_line, LoginAction, LoginEvent};

/// `TIMESTAMP: 'IP STEAMID:NAME(ID)' logged (in|out) at: X=.. Y=.. Z=..`
static LOGIN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r#"^(\d{4}\.\d{2}\.\d{2}-\d{2}\.\d{2}\.\d{2}):\s*['"](\S+)\s+(\d+):(.+?)\((\d+)\)['"]\s+logged\s+(in|out)\b"#,
    )
    .expect("valid login regex")
});

/// Parse a login log line.
#[must_use]
pub fn parse_login(raw: &str) -> Option<LoginEvent> {
    let line = normalize_line(raw);
    if !line.contains("logged") {
        return None;
    }

    let caps = LOGIN.captures(&line)?;
    let action = match &caps[6] {
        "in" => LoginAction::Login,
        _ => LoginAction::Logout,
    };

    Some(LoginEvent {
        timestamp: caps[1].to_string(),
        steam_id: caps[3].to_string(),
        player_name: caps[4].trim().to_string(),
        action,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_login() {
        let event = parse_login(
            "2025.07.05-00.30.39: '192.168.100.3 76561198040636105:Pedreiro(1)' logged in at: X=-559335.000 Y=-197738.000 Z=17276.000",
        )
        .unwrap();
        assert_eq!(event.action, LoginAction::Login);
        assert_eq!(event.steam_id, "76561198040636105");
        assert_eq!(event.player_name, "Pedreiro");
        assert_eq!(event.timestamp, "2025.07.05-00.30.39");
    }

    #[test]
    fn test_parse_logout() {
        let event = parse_login(
            "2025.07.05-01.02.03: '10.0.0.7 76561198040636105:Pedreiro(1)' logged out at: X=1.000 Y=2.000 Z=3.000",
        )
        .unwrap();
        assert_eq!(event.action, LoginAction::Logout);
    }

    #[test]
    fn test_name_with_spaces_and_parens() {
        let event = parse_login(
            "2025.07.05-01.02.03: '10.0.0.7 76561198040636105:Big (Boss)(42)' logged in at: X=1 Y=2 Z=3",
        )
        .unwrap();
        assert_eq!(event.player_name, "Big (Boss)");
    }

    #[test]
    fn test_rejects_other_lines() {
        assert!(parse_login("Game version: 1.0").is_none());
        assert!(parse_login("2025.07.05-01.02.03: 'x' logged sideways").is_none());
    }
}
