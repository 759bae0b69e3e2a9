// Per-user activity statistics, fed by the message event handler and
// consumed by autorole conditions.
//
// NO Discord dependencies here - just pure domain logic.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StatisticsError {
    #[error("Storage error: {0}")]
    Storage(String),
}

/// A user's activity within one server.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct UserStatistics {
    pub guild_id: u64,
    pub user_id: u64,
    pub total_message_count: u64,
    pub last_activity: Option<DateTime<Utc>>,
    pub channels: Vec<UserChannelStatistics>,
}

impl UserStatistics {
    pub fn channel_message_count(&self, channel_id: u64) -> Option<u64> {
        self.channels
            .iter()
            .find(|c| c.channel_id == channel_id)
            .map(|c| c.message_count)
    }
}

/// Message count within a single channel.
#[derive(Debug, Clone, PartialEq)]
pub struct UserChannelStatistics {
    pub channel_id: u64,
    pub message_count: u64,
}

/// Trait for persisting activity statistics.
#[async_trait]
pub trait StatisticsStore: Send + Sync {
    async fn get_user_statistics(
        &self,
        guild_id: u64,
        user_id: u64,
    ) -> Result<UserStatistics, StatisticsError>;

    /// Bumps the user's total and per-channel message counts by one and
    /// stamps their last activity.
    async fn record_message(
        &self,
        guild_id: u64,
        user_id: u64,
        channel_id: u64,
        timestamp: DateTime<Utc>,
    ) -> Result<(), StatisticsError>;

    /// Stamps last activity without touching message counts. Used for
    /// non-message activity like voice state changes.
    async fn record_activity(
        &self,
        guild_id: u64,
        user_id: u64,
        timestamp: DateTime<Utc>,
    ) -> Result<(), StatisticsError>;
}

pub struct StatisticsService<S: StatisticsStore> {
    store: S,
}

impl<S: StatisticsStore> StatisticsService<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    pub async fn get_user_statistics(
        &self,
        guild_id: u64,
        user_id: u64,
    ) -> Result<UserStatistics, StatisticsError> {
        self.store.get_user_statistics(guild_id, user_id).await
    }

    pub async fn record_message(
        &self,
        guild_id: u64,
        user_id: u64,
        channel_id: u64,
    ) -> Result<(), StatisticsError> {
        self.store
            .record_message(guild_id, user_id, channel_id, Utc::now())
            .await
    }

    pub async fn record_activity(&self, guild_id: u64, user_id: u64) -> Result<(), StatisticsError> {
        self.store.record_activity(guild_id, user_id, Utc::now()).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dashmap::DashMap;

    #[derive(Default)]
    struct MockStatisticsStore {
        stats: DashMap<(u64, u64), UserStatistics>,
    }

    #[async_trait]
    impl StatisticsStore for MockStatisticsStore {
        async fn get_user_statistics(
            &self,
            guild_id: u64,
            user_id: u64,
        ) -> Result<UserStatistics, StatisticsError> {
            Ok(self
                .stats
                .get(&(guild_id, user_id))
                .map(|s| s.clone())
                .unwrap_or(UserStatistics {
                    guild_id,
                    user_id,
                    ..Default::default()
                }))
        }

        async fn record_message(
            &self,
            guild_id: u64,
            user_id: u64,
            channel_id: u64,
            timestamp: DateTime<Utc>,
        ) -> Result<(), StatisticsError> {
            let mut entry = self
                .stats
                .entry((guild_id, user_id))
                .or_insert(UserStatistics {
                    guild_id,
                    user_id,
                    ..Default::default()
                });

            entry.total_message_count += 1;
            entry.last_activity = Some(timestamp);
            match entry
                .channels
                .iter_mut()
                .find(|c| c.channel_id == channel_id)
            {
                Some(channel) => channel.message_count += 1,
                None => entry.channels.push(UserChannelStatistics {
                    channel_id,
                    message_count: 1,
                }),
            }

            Ok(())
        }

        async fn record_activity(
            &self,
            guild_id: u64,
            user_id: u64,
            timestamp: DateTime<Utc>,
        ) -> Result<(), StatisticsError> {
            let mut entry = self
                .stats
                .entry((guild_id, user_id))
                .or_insert(UserStatistics {
                    guild_id,
                    user_id,
                    ..Default::default()
                });
            entry.last_activity = Some(timestamp);
            Ok(())
        }
    }

    #[tokio::test]
    async fn messages_bump_totals_and_channels() {
        let service = StatisticsService::new(MockStatisticsStore::default());

        service.record_message(1, 10, 100).await.unwrap();
        service.record_message(1, 10, 100).await.unwrap();
        service.record_message(1, 10, 200).await.unwrap();

        let stats = service.get_user_statistics(1, 10).await.unwrap();
        assert_eq!(stats.total_message_count, 3);
        assert_eq!(stats.channel_message_count(100), Some(2));
        assert_eq!(stats.channel_message_count(200), Some(1));
        assert!(stats.last_activity.is_some());
    }

    #[tokio::test]
    async fn unknown_users_get_empty_statistics() {
        let service = StatisticsService::new(MockStatisticsStore::default());

        let stats = service.get_user_statistics(1, 99).await.unwrap();
        assert_eq!(stats.total_message_count, 0);
        assert!(stats.last_activity.is_none());
    }
}
