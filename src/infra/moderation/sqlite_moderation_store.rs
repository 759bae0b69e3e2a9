// SQLite-backed moderation store.
//
// Tables:
// - moderation_settings: Per-guild channel and threshold configuration
// - user_notes: Moderator notes about users
// - user_warnings: Warnings, optionally expiring
// - user_bans: Ban records, optionally expiring

use crate::core::moderation::{
    ModerationError, ModerationSettings, ModerationStore, UserBan, UserNote, UserWarning,
};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{Pool, Row, Sqlite};

pub struct SqliteModerationStore {
    pool: Pool<Sqlite>,
}

impl SqliteModerationStore {
    pub fn new(pool: Pool<Sqlite>) -> Self {
        Self { pool }
    }

    /// Run database migrations to create required tables.
    pub async fn migrate(&self) -> Result<(), ModerationError> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS moderation_settings (
                guild_id INTEGER PRIMARY KEY,
                moderation_log_channel INTEGER,
                monitoring_channel INTEGER,
                warning_threshold INTEGER NOT NULL DEFAULT 3
            );
            "#,
        )
        .execute(&self.pool)
        .await
        .map_err(|e| ModerationError::Storage(e.to_string()))?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS user_notes (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                guild_id INTEGER NOT NULL,
                user_id INTEGER NOT NULL,
                author_id INTEGER NOT NULL,
                content TEXT NOT NULL,
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL
            );
            CREATE INDEX IF NOT EXISTS idx_user_notes_guild_user
                ON user_notes(guild_id, user_id);
            "#,
        )
        .execute(&self.pool)
        .await
        .map_err(|e| ModerationError::Storage(e.to_string()))?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS user_warnings (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                guild_id INTEGER NOT NULL,
                user_id INTEGER NOT NULL,
                author_id INTEGER NOT NULL,
                reason TEXT NOT NULL,
                message_id INTEGER,
                expires_on TEXT,
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL
            );
            CREATE INDEX IF NOT EXISTS idx_user_warnings_guild_user
                ON user_warnings(guild_id, user_id);
            "#,
        )
        .execute(&self.pool)
        .await
        .map_err(|e| ModerationError::Storage(e.to_string()))?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS user_bans (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                guild_id INTEGER NOT NULL,
                user_id INTEGER NOT NULL,
                author_id INTEGER NOT NULL,
                reason TEXT NOT NULL,
                message_id INTEGER,
                expires_on TEXT,
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL
            );
            CREATE INDEX IF NOT EXISTS idx_user_bans_guild_user
                ON user_bans(guild_id, user_id);
            "#,
        )
        .execute(&self.pool)
        .await
        .map_err(|e| ModerationError::Storage(e.to_string()))?;

        Ok(())
    }
}

fn parse_timestamp(value: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(value)
        .map(|dt| dt.with_timezone(&Utc))
        .unwrap_or_else(|_| Utc::now())
}

fn row_to_note(row: &sqlx::sqlite::SqliteRow) -> UserNote {
    UserNote {
        id: row.get("id"),
        guild_id: row.get::<i64, _>("guild_id") as u64,
        user_id: row.get::<i64, _>("user_id") as u64,
        author_id: row.get::<i64, _>("author_id") as u64,
        content: row.get("content"),
        created_at: parse_timestamp(&row.get::<String, _>("created_at")),
        updated_at: parse_timestamp(&row.get::<String, _>("updated_at")),
    }
}

fn row_to_warning(row: &sqlx::sqlite::SqliteRow) -> UserWarning {
    UserWarning {
        id: row.get("id"),
        guild_id: row.get::<i64, _>("guild_id") as u64,
        user_id: row.get::<i64, _>("user_id") as u64,
        author_id: row.get::<i64, _>("author_id") as u64,
        reason: row.get("reason"),
        message_id: row.get::<Option<i64>, _>("message_id").map(|id| id as u64),
        expires_on: row
            .get::<Option<String>, _>("expires_on")
            .as_deref()
            .map(parse_timestamp),
        created_at: parse_timestamp(&row.get::<String, _>("created_at")),
        updated_at: parse_timestamp(&row.get::<String, _>("updated_at")),
    }
}

fn row_to_ban(row: &sqlx::sqlite::SqliteRow) -> UserBan {
    UserBan {
        id: row.get("id"),
        guild_id: row.get::<i64, _>("guild_id") as u64,
        user_id: row.get::<i64, _>("user_id") as u64,
        author_id: row.get::<i64, _>("author_id") as u64,
        reason: row.get("reason"),
        message_id: row.get::<Option<i64>, _>("message_id").map(|id| id as u64),
        expires_on: row
            .get::<Option<String>, _>("expires_on")
            .as_deref()
            .map(parse_timestamp),
        created_at: parse_timestamp(&row.get::<String, _>("created_at")),
        updated_at: parse_timestamp(&row.get::<String, _>("updated_at")),
    }
}

#[async_trait]
impl ModerationStore for SqliteModerationStore {
    async fn get_settings(
        &self,
        guild_id: u64,
    ) -> Result<Option<ModerationSettings>, ModerationError> {
        let row = sqlx::query("SELECT * FROM moderation_settings WHERE guild_id = ?")
            .bind(guild_id as i64)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| ModerationError::Storage(e.to_string()))?;

        Ok(row.map(|row| ModerationSettings {
            guild_id: row.get::<i64, _>("guild_id") as u64,
            moderation_log_channel: row
                .get::<Option<i64>, _>("moderation_log_channel")
                .map(|id| id as u64),
            monitoring_channel: row
                .get::<Option<i64>, _>("monitoring_channel")
                .map(|id| id as u64),
            warning_threshold: row.get("warning_threshold"),
        }))
    }

    async fn save_settings(&self, settings: &ModerationSettings) -> Result<(), ModerationError> {
        sqlx::query(
            r#"
            INSERT INTO moderation_settings (
                guild_id, moderation_log_channel, monitoring_channel, warning_threshold
            )
            VALUES (?, ?, ?, ?)
            ON CONFLICT(guild_id) DO UPDATE SET
                moderation_log_channel = excluded.moderation_log_channel,
                monitoring_channel = excluded.monitoring_channel,
                warning_threshold = excluded.warning_threshold
            "#,
        )
        .bind(settings.guild_id as i64)
        .bind(settings.moderation_log_channel.map(|id| id as i64))
        .bind(settings.monitoring_channel.map(|id| id as i64))
        .bind(settings.warning_threshold)
        .execute(&self.pool)
        .await
        .map_err(|e| ModerationError::Storage(e.to_string()))?;
        Ok(())
    }

    async fn insert_note(&self, note: UserNote) -> Result<UserNote, ModerationError> {
        let result = sqlx::query(
            r#"
            INSERT INTO user_notes (
                guild_id, user_id, author_id, content, created_at, updated_at
            )
            VALUES (?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(note.guild_id as i64)
        .bind(note.user_id as i64)
        .bind(note.author_id as i64)
        .bind(&note.content)
        .bind(note.created_at.to_rfc3339())
        .bind(note.updated_at.to_rfc3339())
        .execute(&self.pool)
        .await
        .map_err(|e| ModerationError::Storage(e.to_string()))?;

        let mut inserted = note;
        inserted.id = result.last_insert_rowid();
        Ok(inserted)
    }

    async fn update_note(&self, note: &UserNote) -> Result<(), ModerationError> {
        sqlx::query("UPDATE user_notes SET content = ?, updated_at = ? WHERE id = ?")
            .bind(&note.content)
            .bind(note.updated_at.to_rfc3339())
            .bind(note.id)
            .execute(&self.pool)
            .await
            .map_err(|e| ModerationError::Storage(e.to_string()))?;
        Ok(())
    }

    async fn delete_note(&self, note_id: i64) -> Result<(), ModerationError> {
        sqlx::query("DELETE FROM user_notes WHERE id = ?")
            .bind(note_id)
            .execute(&self.pool)
            .await
            .map_err(|e| ModerationError::Storage(e.to_string()))?;
        Ok(())
    }

    async fn get_note(&self, note_id: i64) -> Result<Option<UserNote>, ModerationError> {
        let row = sqlx::query("SELECT * FROM user_notes WHERE id = ?")
            .bind(note_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| ModerationError::Storage(e.to_string()))?;

        Ok(row.as_ref().map(row_to_note))
    }

    async fn get_user_notes(
        &self,
        guild_id: u64,
        user_id: u64,
    ) -> Result<Vec<UserNote>, ModerationError> {
        let rows = sqlx::query(
            "SELECT * FROM user_notes WHERE guild_id = ? AND user_id = ? ORDER BY created_at",
        )
        .bind(guild_id as i64)
        .bind(user_id as i64)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| ModerationError::Storage(e.to_string()))?;

        Ok(rows.iter().map(row_to_note).collect())
    }

    async fn insert_warning(&self, warning: UserWarning) -> Result<UserWarning, ModerationError> {
        let result = sqlx::query(
            r#"
            INSERT INTO user_warnings (
                guild_id, user_id, author_id, reason, message_id, expires_on,
                created_at, updated_at
            )
            VALUES (?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(warning.guild_id as i64)
        .bind(warning.user_id as i64)
        .bind(warning.author_id as i64)
        .bind(&warning.reason)
        .bind(warning.message_id.map(|id| id as i64))
        .bind(warning.expires_on.map(|ts| ts.to_rfc3339()))
        .bind(warning.created_at.to_rfc3339())
        .bind(warning.updated_at.to_rfc3339())
        .execute(&self.pool)
        .await
        .map_err(|e| ModerationError::Storage(e.to_string()))?;

        let mut inserted = warning;
        inserted.id = result.last_insert_rowid();
        Ok(inserted)
    }

    async fn update_warning(&self, warning: &UserWarning) -> Result<(), ModerationError> {
        sqlx::query(
            "UPDATE user_warnings SET reason = ?, expires_on = ?, updated_at = ? WHERE id = ?",
        )
        .bind(&warning.reason)
        .bind(warning.expires_on.map(|ts| ts.to_rfc3339()))
        .bind(warning.updated_at.to_rfc3339())
        .bind(warning.id)
        .execute(&self.pool)
        .await
        .map_err(|e| ModerationError::Storage(e.to_string()))?;
        Ok(())
    }

    async fn delete_warning(&self, warning_id: i64) -> Result<(), ModerationError> {
        sqlx::query("DELETE FROM user_warnings WHERE id = ?")
            .bind(warning_id)
            .execute(&self.pool)
            .await
            .map_err(|e| ModerationError::Storage(e.to_string()))?;
        Ok(())
    }

    async fn get_warning(&self, warning_id: i64) -> Result<Option<UserWarning>, ModerationError> {
        let row = sqlx::query("SELECT * FROM user_warnings WHERE id = ?")
            .bind(warning_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| ModerationError::Storage(e.to_string()))?;

        Ok(row.as_ref().map(row_to_warning))
    }

    async fn get_guild_warnings(&self, guild_id: u64) -> Result<Vec<UserWarning>, ModerationError> {
        let rows = sqlx::query("SELECT * FROM user_warnings WHERE guild_id = ?")
            .bind(guild_id as i64)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| ModerationError::Storage(e.to_string()))?;

        Ok(rows.iter().map(row_to_warning).collect())
    }

    async fn get_user_warnings(
        &self,
        guild_id: u64,
        user_id: u64,
    ) -> Result<Vec<UserWarning>, ModerationError> {
        let rows = sqlx::query(
            "SELECT * FROM user_warnings WHERE guild_id = ? AND user_id = ? ORDER BY created_at",
        )
        .bind(guild_id as i64)
        .bind(user_id as i64)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| ModerationError::Storage(e.to_string()))?;

        Ok(rows.iter().map(row_to_warning).collect())
    }

    async fn insert_ban(&self, ban: UserBan) -> Result<UserBan, ModerationError> {
        let result = sqlx::query(
            r#"
            INSERT INTO user_bans (
                guild_id, user_id, author_id, reason, message_id, expires_on,
                created_at, updated_at
            )
            VALUES (?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(ban.guild_id as i64)
        .bind(ban.user_id as i64)
        .bind(ban.author_id as i64)
        .bind(&ban.reason)
        .bind(ban.message_id.map(|id| id as i64))
        .bind(ban.expires_on.map(|ts| ts.to_rfc3339()))
        .bind(ban.created_at.to_rfc3339())
        .bind(ban.updated_at.to_rfc3339())
        .execute(&self.pool)
        .await
        .map_err(|e| ModerationError::Storage(e.to_string()))?;

        let mut inserted = ban;
        inserted.id = result.last_insert_rowid();
        Ok(inserted)
    }

    async fn update_ban(&self, ban: &UserBan) -> Result<(), ModerationError> {
        sqlx::query("UPDATE user_bans SET reason = ?, expires_on = ?, updated_at = ? WHERE id = ?")
            .bind(&ban.reason)
            .bind(ban.expires_on.map(|ts| ts.to_rfc3339()))
            .bind(ban.updated_at.to_rfc3339())
            .bind(ban.id)
            .execute(&self.pool)
            .await
            .map_err(|e| ModerationError::Storage(e.to_string()))?;
        Ok(())
    }

    async fn delete_ban(&self, ban_id: i64) -> Result<(), ModerationError> {
        sqlx::query("DELETE FROM user_bans WHERE id = ?")
            .bind(ban_id)
            .execute(&self.pool)
            .await
            .map_err(|e| ModerationError::Storage(e.to_string()))?;
        Ok(())
    }

    async fn get_ban(&self, ban_id: i64) -> Result<Option<UserBan>, ModerationError> {
        let row = sqlx::query("SELECT * FROM user_bans WHERE id = ?")
            .bind(ban_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| ModerationError::Storage(e.to_string()))?;

        Ok(row.as_ref().map(row_to_ban))
    }

    async fn get_guild_bans(&self, guild_id: u64) -> Result<Vec<UserBan>, ModerationError> {
        let rows = sqlx::query("SELECT * FROM user_bans WHERE guild_id = ?")
            .bind(guild_id as i64)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| ModerationError::Storage(e.to_string()))?;

        Ok(rows.iter().map(row_to_ban).collect())
    }

    async fn get_user_bans(
        &self,
        guild_id: u64,
        user_id: u64,
    ) -> Result<Vec<UserBan>, ModerationError> {
        let rows = sqlx::query(
            "SELECT * FROM user_bans WHERE guild_id = ? AND user_id = ? ORDER BY created_at",
        )
        .bind(guild_id as i64)
        .bind(user_id as i64)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| ModerationError::Storage(e.to_string()))?;

        Ok(rows.iter().map(row_to_ban).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::moderation::ModerationService;
    use chrono::Duration;
    use sqlx::sqlite::SqlitePoolOptions;

    async fn test_service() -> ModerationService<SqliteModerationStore> {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .unwrap();
        let store = SqliteModerationStore::new(pool);
        store.migrate().await.unwrap();
        ModerationService::new(store)
    }

    #[tokio::test]
    async fn warnings_persist_with_expiry() {
        let service = test_service().await;

        let expiry = Utc::now() + Duration::days(30);
        let (warning, count) = service
            .add_warning(1, 10, 99, "Rude behavior", None, Some(expiry))
            .await
            .unwrap();
        assert_eq!(count, 1);

        let fetched = service.get_warning(warning.id).await.unwrap();
        assert_eq!(fetched.reason, "Rude behavior");
        assert!(fetched.expires_on.is_some());
    }

    #[tokio::test]
    async fn expired_records_are_found_by_sweep_queries() {
        let service = test_service().await;

        let expiry = Utc::now() + Duration::hours(1);
        service
            .add_warning(1, 10, 99, "Short-lived warning", None, Some(expiry))
            .await
            .unwrap();

        // Not yet expired right now
        let expired = service.get_expired_warnings(1, Utc::now()).await.unwrap();
        assert!(expired.is_empty());

        let later = Utc::now() + Duration::hours(2);
        let expired = service.get_expired_warnings(1, later).await.unwrap();
        assert_eq!(expired.len(), 1);
    }
}
