use super::conditions::AutoroleCondition;

/// Per-role autorole setup: the conditions a user must meet, whether
/// the assignment is live, and whether a moderator has to confirm each
/// grant by hand.
#[derive(Debug, Clone, PartialEq)]
pub struct AutoroleConfiguration {
    /// Database row id.
    pub id: i64,
    pub guild_id: u64,
    /// The Discord role this configuration assigns.
    pub role_id: u64,
    pub is_enabled: bool,
    /// When set, a qualified user is queued for manual confirmation
    /// instead of being granted the role immediately.
    pub requires_confirmation: bool,
    pub conditions: Vec<AutoroleCondition>,
}

impl AutoroleConfiguration {
    pub fn new(guild_id: u64, role_id: u64) -> Self {
        Self {
            id: 0,
            guild_id,
            role_id,
            is_enabled: false,
            requires_confirmation: false,
            conditions: Vec::new(),
        }
    }
}

/// Where a queued grant stands. Denied entries are kept so a denied
/// user isn't silently re-queued the next time they qualify.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ConfirmationStatus {
    #[default]
    Pending,
    Affirmed,
    Denied,
}

impl ConfirmationStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ConfirmationStatus::Pending => "pending",
            ConfirmationStatus::Affirmed => "affirmed",
            ConfirmationStatus::Denied => "denied",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "pending" => Some(ConfirmationStatus::Pending),
            "affirmed" => Some(ConfirmationStatus::Affirmed),
            "denied" => Some(ConfirmationStatus::Denied),
            _ => None,
        }
    }
}

/// A manual sign-off entry for a qualified user.
#[derive(Debug, Clone, PartialEq)]
pub struct AutoroleConfirmation {
    /// Database row id.
    pub id: i64,
    pub autorole_id: i64,
    pub user_id: u64,
    pub status: ConfirmationStatus,
}
