// Roleplay session data types.

use chrono::{DateTime, Utc};

/// A persistent, chat-based collaborative session.
#[derive(Debug, Clone, PartialEq)]
pub struct Roleplay {
    /// Database row id.
    pub id: i64,
    pub guild_id: u64,
    pub owner_id: u64,
    /// Unique per server, case-insensitive.
    pub name: String,
    pub summary: Option<String>,
    pub is_active: bool,
    /// Public roleplays can be joined and replayed by anyone.
    pub is_public: bool,
    pub is_nsfw: bool,
    /// The channel the roleplay is currently running in, when active.
    pub active_channel_id: Option<u64>,
    /// A channel dedicated to this roleplay, if one was created.
    pub dedicated_channel_id: Option<u64>,
    /// Refreshed whenever a message is logged. Drives the timeout sweep.
    pub last_updated: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParticipantStatus {
    Invited,
    Joined,
    Left,
    Kicked,
}

impl ParticipantStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ParticipantStatus::Invited => "invited",
            ParticipantStatus::Joined => "joined",
            ParticipantStatus::Left => "left",
            ParticipantStatus::Kicked => "kicked",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "invited" => Some(ParticipantStatus::Invited),
            "joined" => Some(ParticipantStatus::Joined),
            "left" => Some(ParticipantStatus::Left),
            "kicked" => Some(ParticipantStatus::Kicked),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct RoleplayParticipant {
    pub roleplay_id: i64,
    pub user_id: u64,
    pub status: ParticipantStatus,
}

/// A message captured into a roleplay transcript.
#[derive(Debug, Clone, PartialEq)]
pub struct RoleplayMessage {
    pub roleplay_id: i64,
    /// The Discord message this was captured from. Used to de-duplicate
    /// edits.
    pub discord_message_id: u64,
    pub author_id: u64,
    pub author_nickname: String,
    pub timestamp: DateTime<Utc>,
    pub contents: String,
}
