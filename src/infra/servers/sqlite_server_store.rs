// SQLite-backed server registry.
//
// Tables:
// - servers: One row per known guild with its bot-wide settings

use crate::core::servers::{Server, ServerError, ServerStore};
use async_trait::async_trait;
use sqlx::{Pool, Row, Sqlite};

pub struct SqliteServerStore {
    pool: Pool<Sqlite>,
}

impl SqliteServerStore {
    pub fn new(pool: Pool<Sqlite>) -> Self {
        Self { pool }
    }

    /// Run database migrations to create required tables.
    pub async fn migrate(&self) -> Result<(), ServerError> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS servers (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                discord_id INTEGER NOT NULL UNIQUE,
                description TEXT,
                join_message TEXT,
                is_nsfw BOOLEAN NOT NULL DEFAULT 0,
                send_join_message BOOLEAN NOT NULL DEFAULT 0,
                suppress_permission_warnings BOOLEAN NOT NULL DEFAULT 0
            );
            "#,
        )
        .execute(&self.pool)
        .await
        .map_err(|e| ServerError::Storage(e.to_string()))?;

        Ok(())
    }
}

fn row_to_server(row: &sqlx::sqlite::SqliteRow) -> Server {
    Server {
        id: row.get("id"),
        discord_id: row.get::<i64, _>("discord_id") as u64,
        description: row.get("description"),
        join_message: row.get("join_message"),
        is_nsfw: row.get("is_nsfw"),
        send_join_message: row.get("send_join_message"),
        suppress_permission_warnings: row.get("suppress_permission_warnings"),
    }
}

#[async_trait]
impl ServerStore for SqliteServerStore {
    async fn get_server(&self, discord_id: u64) -> Result<Option<Server>, ServerError> {
        let row = sqlx::query("SELECT * FROM servers WHERE discord_id = ?")
            .bind(discord_id as i64)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| ServerError::Storage(e.to_string()))?;

        Ok(row.as_ref().map(row_to_server))
    }

    async fn insert_server(&self, discord_id: u64) -> Result<Server, ServerError> {
        let result = sqlx::query("INSERT INTO servers (discord_id) VALUES (?)")
            .bind(discord_id as i64)
            .execute(&self.pool)
            .await
            .map_err(|e| ServerError::Storage(e.to_string()))?;

        Ok(Server {
            id: result.last_insert_rowid(),
            discord_id,
            description: None,
            join_message: None,
            is_nsfw: false,
            send_join_message: false,
            suppress_permission_warnings: false,
        })
    }

    async fn update_server(&self, server: &Server) -> Result<(), ServerError> {
        sqlx::query(
            r#"
            UPDATE servers SET
                description = ?,
                join_message = ?,
                is_nsfw = ?,
                send_join_message = ?,
                suppress_permission_warnings = ?
            WHERE id = ?
            "#,
        )
        .bind(&server.description)
        .bind(&server.join_message)
        .bind(server.is_nsfw)
        .bind(server.send_join_message)
        .bind(server.suppress_permission_warnings)
        .bind(server.id)
        .execute(&self.pool)
        .await
        .map_err(|e| ServerError::Storage(e.to_string()))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::servers::ServerService;
    use sqlx::sqlite::SqlitePoolOptions;

    async fn test_store() -> SqliteServerStore {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .unwrap();
        let store = SqliteServerStore::new(pool);
        store.migrate().await.unwrap();
        store
    }

    #[tokio::test]
    async fn registers_and_fetches_servers() {
        let service = ServerService::new(test_store().await);

        let server = service.get_or_register_server(1234).await.unwrap();
        assert_eq!(server.discord_id, 1234);
        assert!(server.id > 0);

        // Second call returns the same row
        let again = service.get_or_register_server(1234).await.unwrap();
        assert_eq!(server.id, again.id);
    }

    #[tokio::test]
    async fn persists_setting_updates() {
        let service = ServerService::new(test_store().await);

        service.get_or_register_server(1234).await.unwrap();
        service.set_description(1234, "A cozy place").await.unwrap();

        let server = service.get_or_register_server(1234).await.unwrap();
        assert_eq!(server.description.as_deref(), Some("A cozy place"));
    }
}
