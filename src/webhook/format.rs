//! Message text for each event kind.

use crate::parser::{LoginAction, ParsedEvent, VehicleEvent, VehicleEventType};

/// Discord rejects `content` longer than this.
pub const MAX_CONTENT_CHARS: usize = 2000;

/// Escape markdown control characters and defuse mass mentions in
/// player-supplied text.
#[must_use]
pub fn escape_markdown(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        if matches!(c, '\\' | '*' | '_' | '~' | '`' | '|' | '>') {
            out.push('\\');
        }
        out.push(c);
        if c == '@' {
            out.push('\u{200B}');
        }
    }
    out
}

/// Cut `text` to the content limit, marking the cut with an ellipsis.
#[must_use]
pub fn truncate_content(text: &str) -> String {
    if text.chars().count() <= MAX_CONTENT_CHARS {
        return text.to_string();
    }
    let keep: String = text.chars().take(MAX_CONTENT_CHARS - 1).collect();
    format!("{keep}…")
}

/// Render an event as webhook message text.
#[must_use]
pub fn format_event(event: &ParsedEvent) -> String {
    let text = match event {
        ParsedEvent::Admin(admin) => {
            format!("```\n{}\n```", admin.raw_line.replace("```", "'''"))
        }
        ParsedEvent::Chat(chat) => format!(
            "**[{}]** {} ({}): {}",
            chat.channel,
            escape_markdown(&chat.player_name),
            chat.steam_id,
            escape_markdown(&chat.message)
        ),
        ParsedEvent::Login(login) => {
            let (icon, verb) = match login.action {
                LoginAction::Login => ("🟢", "logged in"),
                LoginAction::Logout => ("🔴", "logged out"),
            };
            format!(
                "{icon} **{}** ({}) {verb} at {}",
                escape_markdown(&login.player_name),
                login.steam_id,
                login.timestamp
            )
        }
        ParsedEvent::Vehicle(vehicle) => format_vehicle(vehicle),
    };
    truncate_content(&text)
}

fn format_vehicle(vehicle: &VehicleEvent) -> String {
    let icon = match vehicle.event_type {
        VehicleEventType::Destroyed => "💥",
        VehicleEventType::Disappeared => "👻",
        VehicleEventType::ForbiddenZoneTimerExpired => "⛔",
    };
    let owner = match (&vehicle.owner_name, &vehicle.owner_steam_id) {
        (Some(name), Some(id)) => format!("{} ({id})", escape_markdown(name)),
        (None, Some(id)) => id.clone(),
        (Some(name), None) => escape_markdown(name),
        (None, None) => "N/A".to_string(),
    };
    format!(
        "{icon} **{}**: {} (ID {})\nOwner: {owner}\nLocation: {}\nTime: {}",
        vehicle.event_type,
        escape_markdown(&vehicle.vehicle_name),
        vehicle.vehicle_id,
        vehicle.location,
        vehicle.datetime
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::{parse_chat, parse_destruction, parse_login, AdminLine};

    #[test]
    fn test_format_chat() {
        let chat = parse_chat("2025.07.05-03.23.13: '76561198140545020:mariocs10(12)' 'Global: oi'")
            .unwrap();
        assert_eq!(
            format_event(&ParsedEvent::Chat(chat)),
            "**[Global]** mariocs10 (76561198140545020): oi"
        );
    }

    #[test]
    fn test_format_login() {
        let login = parse_login(
            "2025.07.05-00.30.39: '192.168.100.3 76561198040636105:Pedreiro(1)' logged in at: X=1 Y=2 Z=3",
        )
        .unwrap();
        let text = format_event(&ParsedEvent::Login(login));
        assert!(text.starts_with("🟢 **Pedreiro**"));
        assert!(text.contains("logged in at 2025.07.05-00.30.39"));
    }

    #[test]
    fn test_format_vehicle_escapes_names() {
        let vehicle = parse_destruction(
            "2025.07.03-23.09.02: [Disappeared] Laika_ES. VehicleId: 804481. Owner: 76561198398160339 (15, BlueArcher_BR). Location: X=-375570.938 Y=-7998.395 Z=34911.961",
        )
        .unwrap();
        let text = format_event(&ParsedEvent::Vehicle(vehicle));
        assert!(text.contains("**Disappeared**: Laika\\_ES (ID 804481)"));
        assert!(text.contains("Owner: BlueArcher\\_BR (76561198398160339)"));
        assert!(text.contains("Location: X=-375570.938"));
    }

    #[test]
    fn test_format_admin_is_code_block() {
        let text = format_event(&ParsedEvent::Admin(AdminLine {
            raw_line: "Command: ```drop```".to_string(),
            log_file: "admin_1.log".to_string(),
        }));
        assert_eq!(text, "```\nCommand: '''drop'''\n```");
    }

    #[test]
    fn test_mentions_are_defused() {
        assert_eq!(escape_markdown("@everyone"), "@\u{200B}everyone");
        assert_eq!(escape_markdown("a*b"), "a\\*b");
    }

    #[test]
    fn test_truncate_content() {
        let long = "x".repeat(MAX_CONTENT_CHARS + 10);
        let cut = truncate_content(&long);
        assert_eq!(cut.chars().count(), MAX_CONTENT_CHARS);
        assert!(cut.ends_with('…'));
        assert_eq!(truncate_content("short"), "short");
    }
}
