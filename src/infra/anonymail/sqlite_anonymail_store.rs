// SQLite-backed anonymail store.
//
// Tables:
// - mailboxes: Named drop boxes, one per server channel
// - mailbox_blocks: Blocked sender identity hashes (or hash prefixes)

use crate::core::anonymail::{AnonymailError, AnonymailStore, Mailbox};
use async_trait::async_trait;
use sqlx::{Pool, Row, Sqlite};

pub struct SqliteAnonymailStore {
    pool: Pool<Sqlite>,
}

impl SqliteAnonymailStore {
    pub fn new(pool: Pool<Sqlite>) -> Self {
        Self { pool }
    }

    /// Run database migrations to create required tables.
    pub async fn migrate(&self) -> Result<(), AnonymailError> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS mailboxes (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                guild_id INTEGER NOT NULL,
                name TEXT NOT NULL COLLATE NOCASE,
                channel_id INTEGER NOT NULL,
                UNIQUE (guild_id, name)
            );
            "#,
        )
        .execute(&self.pool)
        .await
        .map_err(|e| AnonymailError::Storage(e.to_string()))?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS mailbox_blocks (
                mailbox_id INTEGER NOT NULL,
                identity_hash TEXT NOT NULL,
                PRIMARY KEY (mailbox_id, identity_hash)
            );
            "#,
        )
        .execute(&self.pool)
        .await
        .map_err(|e| AnonymailError::Storage(e.to_string()))?;

        Ok(())
    }
}

fn row_to_mailbox(row: &sqlx::sqlite::SqliteRow) -> Mailbox {
    Mailbox {
        id: row.get("id"),
        guild_id: row.get::<i64, _>("guild_id") as u64,
        name: row.get("name"),
        channel_id: row.get::<i64, _>("channel_id") as u64,
    }
}

#[async_trait]
impl AnonymailStore for SqliteAnonymailStore {
    async fn get_mailbox(
        &self,
        guild_id: u64,
        name: &str,
    ) -> Result<Option<Mailbox>, AnonymailError> {
        let row = sqlx::query(
            "SELECT * FROM mailboxes WHERE guild_id = ? AND name = ? COLLATE NOCASE",
        )
        .bind(guild_id as i64)
        .bind(name)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| AnonymailError::Storage(e.to_string()))?;

        Ok(row.as_ref().map(row_to_mailbox))
    }

    async fn get_guild_mailboxes(&self, guild_id: u64) -> Result<Vec<Mailbox>, AnonymailError> {
        let rows = sqlx::query("SELECT * FROM mailboxes WHERE guild_id = ? ORDER BY name")
            .bind(guild_id as i64)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| AnonymailError::Storage(e.to_string()))?;

        Ok(rows.iter().map(row_to_mailbox).collect())
    }

    async fn insert_mailbox(&self, mailbox: &Mailbox) -> Result<i64, AnonymailError> {
        let result =
            sqlx::query("INSERT INTO mailboxes (guild_id, name, channel_id) VALUES (?, ?, ?)")
                .bind(mailbox.guild_id as i64)
                .bind(&mailbox.name)
                .bind(mailbox.channel_id as i64)
                .execute(&self.pool)
                .await
                .map_err(|e| AnonymailError::Storage(e.to_string()))?;

        Ok(result.last_insert_rowid())
    }

    async fn delete_mailbox(&self, mailbox_id: i64) -> Result<(), AnonymailError> {
        sqlx::query("DELETE FROM mailbox_blocks WHERE mailbox_id = ?")
            .bind(mailbox_id)
            .execute(&self.pool)
            .await
            .map_err(|e| AnonymailError::Storage(e.to_string()))?;

        sqlx::query("DELETE FROM mailboxes WHERE id = ?")
            .bind(mailbox_id)
            .execute(&self.pool)
            .await
            .map_err(|e| AnonymailError::Storage(e.to_string()))?;
        Ok(())
    }

    async fn is_hash_blocked(
        &self,
        mailbox_id: i64,
        identity_hash: &str,
    ) -> Result<bool, AnonymailError> {
        // Blocks may be stored as full hashes or as the short tag prefix
        // moderators see in relayed mail.
        let row = sqlx::query(
            r#"
            SELECT 1 AS present FROM mailbox_blocks
            WHERE mailbox_id = ? AND ? LIKE identity_hash || '%'
            LIMIT 1
            "#,
        )
        .bind(mailbox_id)
        .bind(identity_hash)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| AnonymailError::Storage(e.to_string()))?;

        Ok(row.is_some())
    }

    async fn block_hash(
        &self,
        mailbox_id: i64,
        identity_hash: &str,
    ) -> Result<(), AnonymailError> {
        sqlx::query(
            r#"
            INSERT INTO mailbox_blocks (mailbox_id, identity_hash)
            VALUES (?, ?)
            ON CONFLICT(mailbox_id, identity_hash) DO NOTHING
            "#,
        )
        .bind(mailbox_id)
        .bind(identity_hash)
        .execute(&self.pool)
        .await
        .map_err(|e| AnonymailError::Storage(e.to_string()))?;
        Ok(())
    }

    async fn unblock_hash(
        &self,
        mailbox_id: i64,
        identity_hash: &str,
    ) -> Result<bool, AnonymailError> {
        let result =
            sqlx::query("DELETE FROM mailbox_blocks WHERE mailbox_id = ? AND identity_hash = ?")
                .bind(mailbox_id)
                .bind(identity_hash)
                .execute(&self.pool)
                .await
                .map_err(|e| AnonymailError::Storage(e.to_string()))?;

        Ok(result.rows_affected() > 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::anonymail::AnonymailService;
    use sqlx::sqlite::SqlitePoolOptions;

    async fn test_service() -> AnonymailService<SqliteAnonymailStore> {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .unwrap();
        let store = SqliteAnonymailStore::new(pool);
        store.migrate().await.unwrap();
        AnonymailService::new(store)
    }

    #[tokio::test]
    async fn blocking_by_tag_prefix_matches_full_hashes() {
        let service = test_service().await;
        let mailbox = service.create_mailbox(1, "confessions", 100).await.unwrap();

        let mail = service.prepare_mail(&mailbox, 10, "first").await.unwrap();
        service.block_sender(&mailbox, &mail.sender_tag).await.unwrap();

        let result = service.prepare_mail(&mailbox, 10, "second").await;
        assert!(matches!(result, Err(AnonymailError::Blocked(_))));

        service
            .unblock_sender(&mailbox, &mail.sender_tag)
            .await
            .unwrap();
        service.prepare_mail(&mailbox, 10, "third").await.unwrap();
    }
}
