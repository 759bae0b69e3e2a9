// SQLite-backed user registry.
//
// Tables:
// - users: One row per known Discord user

use crate::core::users::{User, UserError, UserStore};
use async_trait::async_trait;
use sqlx::{Pool, Row, Sqlite};

pub struct SqliteUserStore {
    pool: Pool<Sqlite>,
}

impl SqliteUserStore {
    pub fn new(pool: Pool<Sqlite>) -> Self {
        Self { pool }
    }

    /// Run database migrations to create required tables.
    pub async fn migrate(&self) -> Result<(), UserError> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS users (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                discord_id INTEGER NOT NULL UNIQUE,
                bio TEXT,
                timezone_offset INTEGER
            );
            "#,
        )
        .execute(&self.pool)
        .await
        .map_err(|e| UserError::Storage(e.to_string()))?;

        Ok(())
    }
}

#[async_trait]
impl UserStore for SqliteUserStore {
    async fn get_user(&self, discord_id: u64) -> Result<Option<User>, UserError> {
        let row = sqlx::query("SELECT * FROM users WHERE discord_id = ?")
            .bind(discord_id as i64)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| UserError::Storage(e.to_string()))?;

        Ok(row.map(|row| User {
            id: row.get("id"),
            discord_id: row.get::<i64, _>("discord_id") as u64,
            bio: row.get("bio"),
            timezone_offset: row.get("timezone_offset"),
        }))
    }

    async fn insert_user(&self, discord_id: u64) -> Result<User, UserError> {
        let result = sqlx::query("INSERT INTO users (discord_id) VALUES (?)")
            .bind(discord_id as i64)
            .execute(&self.pool)
            .await
            .map_err(|e| UserError::Storage(e.to_string()))?;

        Ok(User {
            id: result.last_insert_rowid(),
            discord_id,
            bio: None,
            timezone_offset: None,
        })
    }

    async fn update_user(&self, user: &User) -> Result<(), UserError> {
        sqlx::query("UPDATE users SET bio = ?, timezone_offset = ? WHERE id = ?")
            .bind(&user.bio)
            .bind(user.timezone_offset)
            .bind(user.id)
            .execute(&self.pool)
            .await
            .map_err(|e| UserError::Storage(e.to_string()))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::users::UserService;
    use sqlx::sqlite::SqlitePoolOptions;

    async fn test_store() -> SqliteUserStore {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .unwrap();
        let store = SqliteUserStore::new(pool);
        store.migrate().await.unwrap();
        store
    }

    #[tokio::test]
    async fn registers_users_once() {
        let service = UserService::new(test_store().await);

        let user = service.get_or_register_user(42).await.unwrap();
        let again = service.get_or_register_user(42).await.unwrap();
        assert_eq!(user.id, again.id);
    }

    #[tokio::test]
    async fn persists_bio_and_timezone() {
        let service = UserService::new(test_store().await);

        service.set_bio(42, "Hello there").await.unwrap();
        service.set_timezone(42, 2).await.unwrap();

        let user = service.get_or_register_user(42).await.unwrap();
        assert_eq!(user.bio.as_deref(), Some("Hello there"));
        assert_eq!(user.timezone_offset, Some(2));
    }
}
