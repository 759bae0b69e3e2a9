// Autorole qualification conditions.
//
// Conditions are persisted as a kind discriminator plus a JSON payload,
// so the enum derives serde with an internal tag. Evaluation is pure:
// the Discord layer gathers a QualificationContext and conditions only
// inspect that.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use super::statistics_service::UserStatistics;

/// A single requirement a user must meet to be granted an autorole.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum AutoroleCondition {
    /// The user has sent at least this many messages in the server.
    MessageCountInGuild { count: u64 },

    /// The user has sent at least this many messages in a specific
    /// channel.
    MessageCountInChannel { channel_id: u64, count: u64 },

    /// The user joined the server at least this long ago.
    TimeSinceJoin { seconds: i64 },

    /// The user was last active at most this long ago.
    TimeSinceLastActivity { seconds: i64 },

    /// The user holds another role.
    HasRole { role_id: u64 },

    /// The user reacted to a specific message.
    ReactionToMessage { message_id: u64 },
}

impl AutoroleCondition {
    /// Stable discriminator, used as the storage column and for
    /// duplicate detection.
    pub fn kind(&self) -> &'static str {
        match self {
            AutoroleCondition::MessageCountInGuild { .. } => "message_count_in_guild",
            AutoroleCondition::MessageCountInChannel { .. } => "message_count_in_channel",
            AutoroleCondition::TimeSinceJoin { .. } => "time_since_join",
            AutoroleCondition::TimeSinceLastActivity { .. } => "time_since_last_activity",
            AutoroleCondition::HasRole { .. } => "has_role",
            AutoroleCondition::ReactionToMessage { .. } => "reaction_to_message",
        }
    }

    /// Two conditions collide when adding the second would be redundant:
    /// same kind targeting the same entity.
    pub fn collides_with(&self, other: &AutoroleCondition) -> bool {
        use AutoroleCondition::*;

        match (self, other) {
            (MessageCountInGuild { .. }, MessageCountInGuild { .. }) => true,
            (
                MessageCountInChannel { channel_id: a, .. },
                MessageCountInChannel { channel_id: b, .. },
            ) => a == b,
            (TimeSinceJoin { .. }, TimeSinceJoin { .. }) => true,
            (TimeSinceLastActivity { .. }, TimeSinceLastActivity { .. }) => true,
            (HasRole { role_id: a }, HasRole { role_id: b }) => a == b,
            (ReactionToMessage { message_id: a }, ReactionToMessage { message_id: b }) => a == b,
            _ => false,
        }
    }

    /// Whether the user described by `context` satisfies this condition.
    pub fn is_fulfilled(&self, context: &QualificationContext, now: DateTime<Utc>) -> bool {
        match self {
            AutoroleCondition::MessageCountInGuild { count } => {
                context.statistics.total_message_count >= *count
            }
            AutoroleCondition::MessageCountInChannel { channel_id, count } => context
                .statistics
                .channel_message_count(*channel_id)
                .map(|c| c >= *count)
                .unwrap_or(false),
            AutoroleCondition::TimeSinceJoin { seconds } => match context.joined_at {
                Some(joined_at) => now - joined_at >= Duration::seconds(*seconds),
                None => false,
            },
            AutoroleCondition::TimeSinceLastActivity { seconds } => {
                match context.statistics.last_activity {
                    Some(last) => now - last <= Duration::seconds(*seconds),
                    None => false,
                }
            }
            AutoroleCondition::HasRole { role_id } => context.role_ids.contains(role_id),
            AutoroleCondition::ReactionToMessage { message_id } => {
                context.reacted_message_ids.contains(message_id)
            }
        }
    }
}

/// Everything known about a user that conditions can inspect. The
/// Discord layer assembles this from the gateway cache and statistics.
#[derive(Debug, Clone, Default)]
pub struct QualificationContext {
    pub joined_at: Option<DateTime<Utc>>,
    pub role_ids: Vec<u64>,
    pub reacted_message_ids: Vec<u64>,
    pub statistics: UserStatistics,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::autorole::statistics_service::UserChannelStatistics;

    fn context_with_messages(total: u64) -> QualificationContext {
        QualificationContext {
            statistics: UserStatistics {
                total_message_count: total,
                ..Default::default()
            },
            ..Default::default()
        }
    }

    #[test]
    fn guild_message_count_threshold() {
        let condition = AutoroleCondition::MessageCountInGuild { count: 10 };
        let now = Utc::now();

        assert!(!condition.is_fulfilled(&context_with_messages(9), now));
        assert!(condition.is_fulfilled(&context_with_messages(10), now));
    }

    #[test]
    fn channel_message_count_requires_that_channel() {
        let condition = AutoroleCondition::MessageCountInChannel {
            channel_id: 1,
            count: 5,
        };
        let now = Utc::now();

        let mut context = QualificationContext::default();
        context.statistics.channels.push(UserChannelStatistics {
            channel_id: 2,
            message_count: 100,
        });
        assert!(!condition.is_fulfilled(&context, now));

        context.statistics.channels.push(UserChannelStatistics {
            channel_id: 1,
            message_count: 5,
        });
        assert!(condition.is_fulfilled(&context, now));
    }

    #[test]
    fn time_since_join() {
        let condition = AutoroleCondition::TimeSinceJoin { seconds: 3600 };
        let now = Utc::now();

        let mut context = QualificationContext::default();
        assert!(!condition.is_fulfilled(&context, now));

        context.joined_at = Some(now - Duration::minutes(30));
        assert!(!condition.is_fulfilled(&context, now));

        context.joined_at = Some(now - Duration::hours(2));
        assert!(condition.is_fulfilled(&context, now));
    }

    #[test]
    fn collision_respects_targets() {
        let a = AutoroleCondition::MessageCountInChannel {
            channel_id: 1,
            count: 5,
        };
        let b = AutoroleCondition::MessageCountInChannel {
            channel_id: 1,
            count: 10,
        };
        let c = AutoroleCondition::MessageCountInChannel {
            channel_id: 2,
            count: 5,
        };

        assert!(a.collides_with(&b));
        assert!(!a.collides_with(&c));
        assert!(!a.collides_with(&AutoroleCondition::MessageCountInGuild { count: 5 }));
    }

    #[test]
    fn conditions_roundtrip_through_json() {
        let condition = AutoroleCondition::TimeSinceLastActivity { seconds: 86400 };
        let json = serde_json::to_string(&condition).unwrap();
        let parsed: AutoroleCondition = serde_json::from_str(&json).unwrap();
        assert_eq!(condition, parsed);
    }
}
