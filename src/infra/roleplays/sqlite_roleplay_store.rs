// SQLite-backed roleplay store.
//
// Tables:
// - roleplays: Session metadata, one row per roleplay
// - roleplay_participants: Membership status per user and roleplay
// - roleplay_messages: Captured transcript, keyed by Discord message id

use crate::core::roleplays::{
    ParticipantStatus, Roleplay, RoleplayError, RoleplayMessage, RoleplayParticipant,
    RoleplayStore,
};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{Pool, Row, Sqlite};

pub struct SqliteRoleplayStore {
    pool: Pool<Sqlite>,
}

impl SqliteRoleplayStore {
    pub fn new(pool: Pool<Sqlite>) -> Self {
        Self { pool }
    }

    /// Run database migrations to create required tables.
    pub async fn migrate(&self) -> Result<(), RoleplayError> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS roleplays (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                guild_id INTEGER NOT NULL,
                owner_id INTEGER NOT NULL,
                name TEXT NOT NULL,
                summary TEXT,
                is_active BOOLEAN NOT NULL DEFAULT 0,
                is_public BOOLEAN NOT NULL DEFAULT 1,
                is_nsfw BOOLEAN NOT NULL DEFAULT 0,
                active_channel_id INTEGER,
                dedicated_channel_id INTEGER,
                last_updated TEXT
            );
            CREATE INDEX IF NOT EXISTS idx_roleplays_guild ON roleplays(guild_id);
            "#,
        )
        .execute(&self.pool)
        .await
        .map_err(|e| RoleplayError::Storage(e.to_string()))?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS roleplay_participants (
                roleplay_id INTEGER NOT NULL,
                user_id INTEGER NOT NULL,
                status TEXT NOT NULL,
                PRIMARY KEY (roleplay_id, user_id)
            );
            "#,
        )
        .execute(&self.pool)
        .await
        .map_err(|e| RoleplayError::Storage(e.to_string()))?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS roleplay_messages (
                roleplay_id INTEGER NOT NULL,
                discord_message_id INTEGER NOT NULL,
                author_id INTEGER NOT NULL,
                author_nickname TEXT NOT NULL,
                timestamp TEXT NOT NULL,
                contents TEXT NOT NULL,
                PRIMARY KEY (roleplay_id, discord_message_id)
            );
            "#,
        )
        .execute(&self.pool)
        .await
        .map_err(|e| RoleplayError::Storage(e.to_string()))?;

        Ok(())
    }
}

fn parse_timestamp(value: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(value)
        .map(|dt| dt.with_timezone(&Utc))
        .unwrap_or_else(|_| Utc::now())
}

fn row_to_roleplay(row: &sqlx::sqlite::SqliteRow) -> Roleplay {
    Roleplay {
        id: row.get("id"),
        guild_id: row.get::<i64, _>("guild_id") as u64,
        owner_id: row.get::<i64, _>("owner_id") as u64,
        name: row.get("name"),
        summary: row.get("summary"),
        is_active: row.get("is_active"),
        is_public: row.get("is_public"),
        is_nsfw: row.get("is_nsfw"),
        active_channel_id: row
            .get::<Option<i64>, _>("active_channel_id")
            .map(|id| id as u64),
        dedicated_channel_id: row
            .get::<Option<i64>, _>("dedicated_channel_id")
            .map(|id| id as u64),
        last_updated: row
            .get::<Option<String>, _>("last_updated")
            .as_deref()
            .map(parse_timestamp),
    }
}

#[async_trait]
impl RoleplayStore for SqliteRoleplayStore {
    async fn insert_roleplay(&self, roleplay: Roleplay) -> Result<Roleplay, RoleplayError> {
        let result = sqlx::query(
            r#"
            INSERT INTO roleplays (
                guild_id, owner_id, name, summary, is_active, is_public,
                is_nsfw, active_channel_id, dedicated_channel_id, last_updated
            )
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(roleplay.guild_id as i64)
        .bind(roleplay.owner_id as i64)
        .bind(&roleplay.name)
        .bind(&roleplay.summary)
        .bind(roleplay.is_active)
        .bind(roleplay.is_public)
        .bind(roleplay.is_nsfw)
        .bind(roleplay.active_channel_id.map(|id| id as i64))
        .bind(roleplay.dedicated_channel_id.map(|id| id as i64))
        .bind(roleplay.last_updated.map(|ts| ts.to_rfc3339()))
        .execute(&self.pool)
        .await
        .map_err(|e| RoleplayError::Storage(e.to_string()))?;

        let mut inserted = roleplay;
        inserted.id = result.last_insert_rowid();
        Ok(inserted)
    }

    async fn update_roleplay(&self, roleplay: &Roleplay) -> Result<(), RoleplayError> {
        sqlx::query(
            r#"
            UPDATE roleplays SET
                owner_id = ?,
                name = ?,
                summary = ?,
                is_active = ?,
                is_public = ?,
                is_nsfw = ?,
                active_channel_id = ?,
                dedicated_channel_id = ?,
                last_updated = ?
            WHERE id = ?
            "#,
        )
        .bind(roleplay.owner_id as i64)
        .bind(&roleplay.name)
        .bind(&roleplay.summary)
        .bind(roleplay.is_active)
        .bind(roleplay.is_public)
        .bind(roleplay.is_nsfw)
        .bind(roleplay.active_channel_id.map(|id| id as i64))
        .bind(roleplay.dedicated_channel_id.map(|id| id as i64))
        .bind(roleplay.last_updated.map(|ts| ts.to_rfc3339()))
        .bind(roleplay.id)
        .execute(&self.pool)
        .await
        .map_err(|e| RoleplayError::Storage(e.to_string()))?;
        Ok(())
    }

    async fn delete_roleplay(&self, roleplay_id: i64) -> Result<(), RoleplayError> {
        sqlx::query("DELETE FROM roleplay_messages WHERE roleplay_id = ?")
            .bind(roleplay_id)
            .execute(&self.pool)
            .await
            .map_err(|e| RoleplayError::Storage(e.to_string()))?;

        sqlx::query("DELETE FROM roleplay_participants WHERE roleplay_id = ?")
            .bind(roleplay_id)
            .execute(&self.pool)
            .await
            .map_err(|e| RoleplayError::Storage(e.to_string()))?;

        sqlx::query("DELETE FROM roleplays WHERE id = ?")
            .bind(roleplay_id)
            .execute(&self.pool)
            .await
            .map_err(|e| RoleplayError::Storage(e.to_string()))?;
        Ok(())
    }

    async fn get_roleplay(&self, roleplay_id: i64) -> Result<Option<Roleplay>, RoleplayError> {
        let row = sqlx::query("SELECT * FROM roleplays WHERE id = ?")
            .bind(roleplay_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| RoleplayError::Storage(e.to_string()))?;

        Ok(row.as_ref().map(row_to_roleplay))
    }

    async fn get_server_roleplays(&self, guild_id: u64) -> Result<Vec<Roleplay>, RoleplayError> {
        let rows = sqlx::query("SELECT * FROM roleplays WHERE guild_id = ? ORDER BY name")
            .bind(guild_id as i64)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| RoleplayError::Storage(e.to_string()))?;

        Ok(rows.iter().map(row_to_roleplay).collect())
    }

    async fn get_participants(
        &self,
        roleplay_id: i64,
    ) -> Result<Vec<RoleplayParticipant>, RoleplayError> {
        let rows = sqlx::query("SELECT * FROM roleplay_participants WHERE roleplay_id = ?")
            .bind(roleplay_id)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| RoleplayError::Storage(e.to_string()))?;

        let mut participants = Vec::new();
        for row in rows {
            let status_str: String = row.get("status");
            let status = ParticipantStatus::parse(&status_str).ok_or_else(|| {
                RoleplayError::Storage(format!("Unknown participant status: {}", status_str))
            })?;

            participants.push(RoleplayParticipant {
                roleplay_id: row.get("roleplay_id"),
                user_id: row.get::<i64, _>("user_id") as u64,
                status,
            });
        }
        Ok(participants)
    }

    async fn set_participant_status(
        &self,
        roleplay_id: i64,
        user_id: u64,
        status: ParticipantStatus,
    ) -> Result<(), RoleplayError> {
        sqlx::query(
            r#"
            INSERT INTO roleplay_participants (roleplay_id, user_id, status)
            VALUES (?, ?, ?)
            ON CONFLICT(roleplay_id, user_id) DO UPDATE SET
                status = excluded.status
            "#,
        )
        .bind(roleplay_id)
        .bind(user_id as i64)
        .bind(status.as_str())
        .execute(&self.pool)
        .await
        .map_err(|e| RoleplayError::Storage(e.to_string()))?;
        Ok(())
    }

    async fn upsert_message(&self, message: RoleplayMessage) -> Result<bool, RoleplayError> {
        let existing = sqlx::query(
            "SELECT 1 AS present FROM roleplay_messages WHERE roleplay_id = ? AND discord_message_id = ?",
        )
        .bind(message.roleplay_id)
        .bind(message.discord_message_id as i64)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| RoleplayError::Storage(e.to_string()))?;

        sqlx::query(
            r#"
            INSERT INTO roleplay_messages (
                roleplay_id, discord_message_id, author_id, author_nickname,
                timestamp, contents
            )
            VALUES (?, ?, ?, ?, ?, ?)
            ON CONFLICT(roleplay_id, discord_message_id) DO UPDATE SET
                author_nickname = excluded.author_nickname,
                contents = excluded.contents
            "#,
        )
        .bind(message.roleplay_id)
        .bind(message.discord_message_id as i64)
        .bind(message.author_id as i64)
        .bind(&message.author_nickname)
        .bind(message.timestamp.to_rfc3339())
        .bind(&message.contents)
        .execute(&self.pool)
        .await
        .map_err(|e| RoleplayError::Storage(e.to_string()))?;

        Ok(existing.is_none())
    }

    async fn get_messages(&self, roleplay_id: i64) -> Result<Vec<RoleplayMessage>, RoleplayError> {
        let rows = sqlx::query(
            "SELECT * FROM roleplay_messages WHERE roleplay_id = ? ORDER BY timestamp",
        )
        .bind(roleplay_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| RoleplayError::Storage(e.to_string()))?;

        Ok(rows
            .iter()
            .map(|row| RoleplayMessage {
                roleplay_id: row.get("roleplay_id"),
                discord_message_id: row.get::<i64, _>("discord_message_id") as u64,
                author_id: row.get::<i64, _>("author_id") as u64,
                author_nickname: row.get("author_nickname"),
                timestamp: parse_timestamp(&row.get::<String, _>("timestamp")),
                contents: row.get("contents"),
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::roleplays::RoleplayService;
    use sqlx::sqlite::SqlitePoolOptions;

    async fn test_service() -> RoleplayService<SqliteRoleplayStore> {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .unwrap();
        let store = SqliteRoleplayStore::new(pool);
        store.migrate().await.unwrap();
        RoleplayService::new(store)
    }

    #[tokio::test]
    async fn roleplay_roundtrip_with_participants() {
        let service = test_service().await;

        let roleplay = service
            .create_roleplay(1, 10, "The Long Night", None, false, true)
            .await
            .unwrap();

        service.join_roleplay(&roleplay, 11).await.unwrap();

        let participants = service.get_participants(&roleplay).await.unwrap();
        let joined: Vec<_> = participants
            .iter()
            .filter(|p| p.status == ParticipantStatus::Joined)
            .collect();
        assert_eq!(joined.len(), 2);
    }

    #[tokio::test]
    async fn message_upsert_deduplicates_edits() {
        let service = test_service().await;

        let roleplay = service
            .create_roleplay(1, 10, "The Long Night", None, false, true)
            .await
            .unwrap();

        service
            .log_message(&roleplay, 555, 10, "Aria", "First draft")
            .await
            .unwrap();
        service
            .log_message(&roleplay, 555, 10, "Aria", "Second draft")
            .await
            .unwrap();

        let transcript = service.get_transcript(&roleplay, 10).await.unwrap();
        assert_eq!(transcript.len(), 1);
        assert_eq!(transcript[0].contents, "Second draft");
    }
}
