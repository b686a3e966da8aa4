//! Vehicle destruction log parser.

use std::sync::LazyLock;

use regex::Regex;

use super::{normalize_line, VehicleEvent, VehicleEventType};

/// `TIMESTAMP: [TYPE] NAME. VehicleId: ID. Owner: (N/A|STEAMID)( (FAME, NAME))?. Location: REST`
static STRICT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"^(\d{4}\.\d{2}\.\d{2}-\d{2}\.\d{2}\.\d{2}):\s*\[(Disappeared|ForbiddenZoneTimerExpired|Destroyed)\]\s+(.+?)\.\s+VehicleId:\s*(\d+)\.\s+Owner:\s*(N/A|\d+)(?:\s+\((-?[\d.]+),\s*(.+?)\))?\.\s+Location:\s*(.*)$",
    )
    .expect("valid destruction regex")
});

/// Looser form that keeps the owner section as free text.
static LOOSE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"^(\d{4}\.\d{2}\.\d{2}-\d{2}\.\d{2}\.\d{2}):\s*\[(Disappeared|ForbiddenZoneTimerExpired|Destroyed)\]\s+(.+?)\.\s+VehicleId:\s*(\d+)\.\s+Owner:\s*(.*?)\.?\s+Location:\s*(.*)$",
    )
    .expect("valid destruction regex")
});

/// `STEAMID (anything, NAME)` or `STEAMID (NAME)` inside a free-form owner section.
static OWNER_INFO: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(\d{17})\s*\((?:[^,()]*,\s*)?(.+?)\)").expect("valid owner regex")
});

static BARE_STEAM_ID: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\b(\d{17})\b").expect("valid steam id regex"));

/// Parse a vehicle destruction log line.
#[must_use]
pub fn parse_destruction(raw: &str) -> Option<VehicleEvent> {
    let line = normalize_line(raw);
    let line = line.trim();
    if !line.contains("VehicleId:") {
        return None;
    }

    if let Some(caps) = STRICT.captures(line) {
        let owner_steam_id = match &caps[5] {
            "N/A" => None,
            id => Some(id.to_string()),
        };
        return Some(VehicleEvent {
            datetime: caps[1].to_string(),
            event_type: VehicleEventType::from_name(&caps[2])?,
            vehicle_name: caps[3].to_string(),
            vehicle_id: caps[4].to_string(),
            owner_steam_id,
            owner_name: caps.get(7).map(|m| m.as_str().trim().to_string()),
            location: caps[8].trim().to_string(),
        });
    }

    let caps = LOOSE.captures(line)?;
    let (owner_steam_id, owner_name) = extract_owner(&caps[5]);
    Some(VehicleEvent {
        datetime: caps[1].to_string(),
        event_type: VehicleEventType::from_name(&caps[2])?,
        vehicle_name: caps[3].to_string(),
        vehicle_id: caps[4].to_string(),
        owner_steam_id,
        owner_name,
        location: caps[6].trim().to_string(),
    })
}

/// Pull `(steam id, name)` out of a free-form owner section.
fn extract_owner(info: &str) -> (Option<String>, Option<String>) {
    let info = info.trim();
    if info.is_empty() || info.starts_with("N/A") {
        return (None, None);
    }
    if let Some(caps) = OWNER_INFO.captures(info) {
        return (
            Some(caps[1].to_string()),
            Some(caps[2].trim().to_string()),
        );
    }
    if let Some(caps) = BARE_STEAM_ID.captures(info) {
        return (Some(caps[1].to_string()), None);
    }
    (None, Some(info.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_disappeared_with_owner() {
        let event = parse_destruction(
            "2025.07.03-23.09.02: [Disappeared] Laika_ES. VehicleId: 804481. Owner: 76561198398160339 (15, BlueArcher_BR). Location: X=-375570.938 Y=-7998.395 Z=34911.961",
        )
        .unwrap();
        assert_eq!(event.event_type, VehicleEventType::Disappeared);
        assert_eq!(event.vehicle_id, "804481");
        assert_eq!(event.vehicle_name, "Laika_ES");
        assert_eq!(event.owner_steam_id.as_deref(), Some("76561198398160339"));
        assert_eq!(event.owner_name.as_deref(), Some("BlueArcher_BR"));
        assert_eq!(event.location, "X=-375570.938 Y=-7998.395 Z=34911.961");
        assert_eq!(event.datetime, "2025.07.03-23.09.02");
    }

    #[test]
    fn test_parse_owner_not_available() {
        let event = parse_destruction(
            "2025.07.03-23.10.00: [Destroyed] Rager. VehicleId: 12. Owner: N/A. Location: X=1 Y=2 Z=3",
        )
        .unwrap();
        assert_eq!(event.event_type, VehicleEventType::Destroyed);
        assert!(event.owner_steam_id.is_none());
        assert!(event.owner_name.is_none());
    }

    #[test]
    fn test_parse_forbidden_zone() {
        let event = parse_destruction(
            "2025.07.03-23.10.00: [ForbiddenZoneTimerExpired] WolfsWagen. VehicleId: 99. Owner: 76561198398160339 (0, Ana). Location: X=1 Y=2 Z=3",
        )
        .unwrap();
        assert_eq!(event.event_type, VehicleEventType::ForbiddenZoneTimerExpired);
        assert_eq!(event.owner_name.as_deref(), Some("Ana"));
    }

    #[test]
    fn test_loose_fallback_extracts_owner() {
        // Owner section does not fit the strict grammar.
        let event = parse_destruction(
            "2025.07.03-23.10.00: [Destroyed] Tractor. VehicleId: 7. Owner: squad 76561198398160339 (Ana Maria). Location: X=1 Y=2 Z=3",
        )
        .unwrap();
        assert_eq!(event.vehicle_id, "7");
        assert_eq!(event.owner_steam_id.as_deref(), Some("76561198398160339"));
        assert_eq!(event.owner_name.as_deref(), Some("Ana Maria"));
    }

    #[test]
    fn test_extract_owner_variants() {
        assert_eq!(extract_owner("N/A (unknown)"), (None, None));
        assert_eq!(
            extract_owner("76561198398160339"),
            (Some("76561198398160339".to_string()), None)
        );
        assert_eq!(
            extract_owner("someone"),
            (None, Some("someone".to_string()))
        );
    }

    #[test]
    fn test_rejects_unknown_event_type() {
        assert!(parse_destruction(
            "2025.07.03-23.10.00: [Exploded] Rager. VehicleId: 12. Owner: N/A. Location: X=1"
        )
        .is_none());
        assert!(parse_destruction("Game version: 1.0").is_none());
    }
}
