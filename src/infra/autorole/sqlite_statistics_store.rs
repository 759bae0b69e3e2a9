// SQLite-backed activity statistics.
//
// Tables:
// - user_statistics: Totals and last activity per user and guild
// - user_channel_statistics: Message counts per channel

use crate::core::autorole::{
    StatisticsError, StatisticsStore, UserChannelStatistics, UserStatistics,
};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{Pool, Row, Sqlite};

pub struct SqliteStatisticsStore {
    pool: Pool<Sqlite>,
}

impl SqliteStatisticsStore {
    pub fn new(pool: Pool<Sqlite>) -> Self {
        Self { pool }
    }

    /// Run database migrations to create required tables.
    pub async fn migrate(&self) -> Result<(), StatisticsError> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS user_statistics (
                guild_id INTEGER NOT NULL,
                user_id INTEGER NOT NULL,
                total_message_count INTEGER NOT NULL DEFAULT 0,
                last_activity TEXT,
                PRIMARY KEY (guild_id, user_id)
            );
            "#,
        )
        .execute(&self.pool)
        .await
        .map_err(|e| StatisticsError::Storage(e.to_string()))?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS user_channel_statistics (
                guild_id INTEGER NOT NULL,
                user_id INTEGER NOT NULL,
                channel_id INTEGER NOT NULL,
                message_count INTEGER NOT NULL DEFAULT 0,
                PRIMARY KEY (guild_id, user_id, channel_id)
            );
            "#,
        )
        .execute(&self.pool)
        .await
        .map_err(|e| StatisticsError::Storage(e.to_string()))?;

        Ok(())
    }
}

#[async_trait]
impl StatisticsStore for SqliteStatisticsStore {
    async fn get_user_statistics(
        &self,
        guild_id: u64,
        user_id: u64,
    ) -> Result<UserStatistics, StatisticsError> {
        let row = sqlx::query("SELECT * FROM user_statistics WHERE guild_id = ? AND user_id = ?")
            .bind(guild_id as i64)
            .bind(user_id as i64)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| StatisticsError::Storage(e.to_string()))?;

        let channel_rows = sqlx::query(
            "SELECT channel_id, message_count FROM user_channel_statistics WHERE guild_id = ? AND user_id = ?",
        )
        .bind(guild_id as i64)
        .bind(user_id as i64)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| StatisticsError::Storage(e.to_string()))?;

        let channels = channel_rows
            .iter()
            .map(|row| UserChannelStatistics {
                channel_id: row.get::<i64, _>("channel_id") as u64,
                message_count: row.get::<i64, _>("message_count") as u64,
            })
            .collect();

        match row {
            Some(row) => Ok(UserStatistics {
                guild_id,
                user_id,
                total_message_count: row.get::<i64, _>("total_message_count") as u64,
                last_activity: row
                    .get::<Option<String>, _>("last_activity")
                    .as_deref()
                    .and_then(|v| DateTime::parse_from_rfc3339(v).ok())
                    .map(|dt| dt.with_timezone(&Utc)),
                channels,
            }),
            None => Ok(UserStatistics {
                guild_id,
                user_id,
                channels,
                ..Default::default()
            }),
        }
    }

    async fn record_message(
        &self,
        guild_id: u64,
        user_id: u64,
        channel_id: u64,
        timestamp: DateTime<Utc>,
    ) -> Result<(), StatisticsError> {
        sqlx::query(
            r#"
            INSERT INTO user_statistics (guild_id, user_id, total_message_count, last_activity)
            VALUES (?, ?, 1, ?)
            ON CONFLICT(guild_id, user_id) DO UPDATE SET
                total_message_count = total_message_count + 1,
                last_activity = excluded.last_activity
            "#,
        )
        .bind(guild_id as i64)
        .bind(user_id as i64)
        .bind(timestamp.to_rfc3339())
        .execute(&self.pool)
        .await
        .map_err(|e| StatisticsError::Storage(e.to_string()))?;

        sqlx::query(
            r#"
            INSERT INTO user_channel_statistics (guild_id, user_id, channel_id, message_count)
            VALUES (?, ?, ?, 1)
            ON CONFLICT(guild_id, user_id, channel_id) DO UPDATE SET
                message_count = message_count + 1
            "#,
        )
        .bind(guild_id as i64)
        .bind(user_id as i64)
        .bind(channel_id as i64)
        .execute(&self.pool)
        .await
        .map_err(|e| StatisticsError::Storage(e.to_string()))?;
        Ok(())
    }

    async fn record_activity(
        &self,
        guild_id: u64,
        user_id: u64,
        timestamp: DateTime<Utc>,
    ) -> Result<(), StatisticsError> {
        sqlx::query(
            r#"
            INSERT INTO user_statistics (guild_id, user_id, total_message_count, last_activity)
            VALUES (?, ?, 0, ?)
            ON CONFLICT(guild_id, user_id) DO UPDATE SET
                last_activity = excluded.last_activity
            "#,
        )
        .bind(guild_id as i64)
        .bind(user_id as i64)
        .bind(timestamp.to_rfc3339())
        .execute(&self.pool)
        .await
        .map_err(|e| StatisticsError::Storage(e.to_string()))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::autorole::StatisticsService;
    use sqlx::sqlite::SqlitePoolOptions;

    async fn test_service() -> StatisticsService<SqliteStatisticsStore> {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .unwrap();
        let store = SqliteStatisticsStore::new(pool);
        store.migrate().await.unwrap();
        StatisticsService::new(store)
    }

    #[tokio::test]
    async fn counts_accumulate_per_channel() {
        let service = test_service().await;

        service.record_message(1, 10, 100).await.unwrap();
        service.record_message(1, 10, 100).await.unwrap();
        service.record_message(1, 10, 200).await.unwrap();

        let stats = service.get_user_statistics(1, 10).await.unwrap();
        assert_eq!(stats.total_message_count, 3);
        assert_eq!(stats.channel_message_count(100), Some(2));
        assert_eq!(stats.channel_message_count(200), Some(1));
    }

    #[tokio::test]
    async fn activity_stamp_does_not_touch_counts() {
        let service = test_service().await;

        service.record_message(1, 10, 100).await.unwrap();
        service.record_activity(1, 10).await.unwrap();

        let stats = service.get_user_statistics(1, 10).await.unwrap();
        assert_eq!(stats.total_message_count, 1);
        assert!(stats.last_activity.is_some());
    }
}
