// Moderation domain models - per-server settings, notes, warnings, bans.
//
// These are pure domain types with no Discord dependencies.
// The Discord layer applies the actual bans and posts log messages.

use chrono::{DateTime, Utc};

pub const DEFAULT_WARNING_THRESHOLD: i32 = 3;

/// Per-guild moderation settings.
#[derive(Debug, Clone, PartialEq)]
pub struct ModerationSettings {
    pub guild_id: u64,
    /// Channel moderation events (warnings added, bans rescinded) are
    /// logged to.
    pub moderation_log_channel: Option<u64>,
    /// Channel user events (joins, leaves) are mirrored to.
    pub monitoring_channel: Option<u64>,
    /// Number of warnings at which moderators get alerted.
    pub warning_threshold: i32,
}

impl ModerationSettings {
    pub fn new(guild_id: u64) -> Self {
        Self {
            guild_id,
            moderation_log_channel: None,
            monitoring_channel: None,
            warning_threshold: DEFAULT_WARNING_THRESHOLD,
        }
    }
}

/// A freeform moderator note about a user.
#[derive(Debug, Clone, PartialEq)]
pub struct UserNote {
    pub id: i64,
    pub guild_id: u64,
    pub user_id: u64,
    pub author_id: u64,
    pub content: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A warning issued to a user, optionally expiring.
#[derive(Debug, Clone, PartialEq)]
pub struct UserWarning {
    pub id: i64,
    pub guild_id: u64,
    pub user_id: u64,
    pub author_id: u64,
    pub reason: String,
    /// The offending message, if the warning was issued in response to one.
    pub message_id: Option<u64>,
    pub expires_on: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl UserWarning {
    pub fn is_temporary(&self) -> bool {
        self.expires_on.is_some()
    }

    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        matches!(self.expires_on, Some(expiry) if expiry <= now)
    }
}

/// A ban record, optionally expiring. The actual Discord ban is applied by
/// the command layer; this row tracks the reason and lifetime.
#[derive(Debug, Clone, PartialEq)]
pub struct UserBan {
    pub id: i64,
    pub guild_id: u64,
    pub user_id: u64,
    pub author_id: u64,
    pub reason: String,
    pub message_id: Option<u64>,
    pub expires_on: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl UserBan {
    pub fn is_temporary(&self) -> bool {
        self.expires_on.is_some()
    }

    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        matches!(self.expires_on, Some(expiry) if expiry <= now)
    }
}
