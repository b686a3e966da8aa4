//! Typed events produced by the parsers.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Chat channel a message was sent on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ChatChannel {
    Global,
    Local,
    Squad,
}

impl ChatChannel {
    #[must_use]
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "Global" => Some(Self::Global),
            "Local" => Some(Self::Local),
            "Squad" => Some(Self::Squad),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Global => "Global",
            Self::Local => "Local",
            Self::Squad => "Squad",
        }
    }
}

impl fmt::Display for ChatChannel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Whether a player joined or left.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LoginAction {
    Login,
    Logout,
}

impl fmt::Display for LoginAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Login => f.write_str("Login"),
            Self::Logout => f.write_str("Logout"),
        }
    }
}

/// Kind of vehicle destruction event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum VehicleEventType {
    Disappeared,
    ForbiddenZoneTimerExpired,
    Destroyed,
}

impl VehicleEventType {
    #[must_use]
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "Disappeared" => Some(Self::Disappeared),
            "ForbiddenZoneTimerExpired" => Some(Self::ForbiddenZoneTimerExpired),
            "Destroyed" => Some(Self::Destroyed),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Disappeared => "Disappeared",
            Self::ForbiddenZoneTimerExpired => "ForbiddenZoneTimerExpired",
            Self::Destroyed => "Destroyed",
        }
    }
}

impl fmt::Display for VehicleEventType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A raw admin log line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AdminLine {
    pub raw_line: String,
    pub log_file: String,
}

/// A chat message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatMessage {
    pub timestamp: String,
    pub steam_id: String,
    pub player_name: String,
    pub channel: ChatChannel,
    pub message: String,
}

/// A player login or logout.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoginEvent {
    pub timestamp: String,
    pub steam_id: String,
    pub player_name: String,
    pub action: LoginAction,
}

/// A vehicle disappearing or being destroyed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VehicleEvent {
    pub datetime: String,
    pub event_type: VehicleEventType,
    pub vehicle_name: String,
    pub vehicle_id: String,
    /// `None` when the owner is `N/A`.
    pub owner_steam_id: Option<String>,
    pub owner_name: Option<String>,
    pub location: String,
}

/// One parsed log line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParsedEvent {
    Admin(AdminLine),
    Chat(ChatMessage),
    Login(LoginEvent),
    Vehicle(VehicleEvent),
}

impl ParsedEvent {
    /// Key identifying the logical event for deduplication.
    ///
    /// Admin lines dedup on the exact line within a file. The other kinds
    /// dedup on their semantic identity.
    #[must_use]
    pub fn dedup_key(&self) -> String {
        match self {
            Self::Admin(a) => format!("{}|{}", a.log_file, a.raw_line),
            Self::Chat(c) => format!("{}|{}|{}|{}", c.timestamp, c.steam_id, c.channel, c.message),
            Self::Login(l) => format!("{}|{}|{}", l.timestamp, l.steam_id, l.action),
            Self::Vehicle(v) => format!("{}|{}|{}", v.vehicle_id, v.datetime, v.event_type),
        }
    }
}
