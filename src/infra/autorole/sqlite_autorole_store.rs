// SQLite-backed autorole store.
//
// Tables:
// - autoroles: Per-role configuration flags
// - autorole_conditions: Condition rows, one per condition, with the
//   condition payload serialized as JSON next to a kind discriminator
// - autorole_confirmations: Manual sign-off queue

use crate::core::autorole::{
    AutoroleCondition, AutoroleConfiguration, AutoroleConfirmation, AutoroleError, AutoroleStore,
    ConfirmationStatus,
};
use async_trait::async_trait;
use sqlx::{Pool, Row, Sqlite};

pub struct SqliteAutoroleStore {
    pool: Pool<Sqlite>,
}

impl SqliteAutoroleStore {
    pub fn new(pool: Pool<Sqlite>) -> Self {
        Self { pool }
    }

    /// Run database migrations to create required tables.
    pub async fn migrate(&self) -> Result<(), AutoroleError> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS autoroles (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                guild_id INTEGER NOT NULL,
                role_id INTEGER NOT NULL,
                is_enabled BOOLEAN NOT NULL DEFAULT 0,
                requires_confirmation BOOLEAN NOT NULL DEFAULT 0,
                UNIQUE (guild_id, role_id)
            );
            "#,
        )
        .execute(&self.pool)
        .await
        .map_err(|e| AutoroleError::Storage(e.to_string()))?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS autorole_conditions (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                autorole_id INTEGER NOT NULL,
                kind TEXT NOT NULL,
                payload TEXT NOT NULL
            );
            CREATE INDEX IF NOT EXISTS idx_autorole_conditions_autorole
                ON autorole_conditions(autorole_id);
            "#,
        )
        .execute(&self.pool)
        .await
        .map_err(|e| AutoroleError::Storage(e.to_string()))?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS autorole_confirmations (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                autorole_id INTEGER NOT NULL,
                user_id INTEGER NOT NULL,
                status TEXT NOT NULL DEFAULT 'pending',
                UNIQUE (autorole_id, user_id)
            );
            "#,
        )
        .execute(&self.pool)
        .await
        .map_err(|e| AutoroleError::Storage(e.to_string()))?;

        Ok(())
    }

    async fn get_conditions(
        &self,
        autorole_id: i64,
    ) -> Result<Vec<AutoroleCondition>, AutoroleError> {
        let rows = sqlx::query(
            "SELECT payload FROM autorole_conditions WHERE autorole_id = ? ORDER BY id",
        )
        .bind(autorole_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| AutoroleError::Storage(e.to_string()))?;

        let mut conditions = Vec::new();
        for row in rows {
            let payload: String = row.get("payload");
            let condition: AutoroleCondition = serde_json::from_str(&payload)
                .map_err(|e| AutoroleError::Storage(e.to_string()))?;
            conditions.push(condition);
        }
        Ok(conditions)
    }

    async fn replace_conditions(
        &self,
        autorole_id: i64,
        conditions: &[AutoroleCondition],
    ) -> Result<(), AutoroleError> {
        sqlx::query("DELETE FROM autorole_conditions WHERE autorole_id = ?")
            .bind(autorole_id)
            .execute(&self.pool)
            .await
            .map_err(|e| AutoroleError::Storage(e.to_string()))?;

        for condition in conditions {
            let payload = serde_json::to_string(condition)
                .map_err(|e| AutoroleError::Storage(e.to_string()))?;

            sqlx::query(
                "INSERT INTO autorole_conditions (autorole_id, kind, payload) VALUES (?, ?, ?)",
            )
            .bind(autorole_id)
            .bind(condition.kind())
            .bind(payload)
            .execute(&self.pool)
            .await
            .map_err(|e| AutoroleError::Storage(e.to_string()))?;
        }
        Ok(())
    }

    async fn row_to_autorole(
        &self,
        row: &sqlx::sqlite::SqliteRow,
    ) -> Result<AutoroleConfiguration, AutoroleError> {
        let id: i64 = row.get("id");
        Ok(AutoroleConfiguration {
            id,
            guild_id: row.get::<i64, _>("guild_id") as u64,
            role_id: row.get::<i64, _>("role_id") as u64,
            is_enabled: row.get("is_enabled"),
            requires_confirmation: row.get("requires_confirmation"),
            conditions: self.get_conditions(id).await?,
        })
    }
}

fn row_to_confirmation(row: &sqlx::sqlite::SqliteRow) -> AutoroleConfirmation {
    let status: String = row.get("status");
    AutoroleConfirmation {
        id: row.get("id"),
        autorole_id: row.get("autorole_id"),
        user_id: row.get::<i64, _>("user_id") as u64,
        status: ConfirmationStatus::parse(&status).unwrap_or_default(),
    }
}

#[async_trait]
impl AutoroleStore for SqliteAutoroleStore {
    async fn get_autorole(
        &self,
        guild_id: u64,
        role_id: u64,
    ) -> Result<Option<AutoroleConfiguration>, AutoroleError> {
        let row = sqlx::query("SELECT * FROM autoroles WHERE guild_id = ? AND role_id = ?")
            .bind(guild_id as i64)
            .bind(role_id as i64)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| AutoroleError::Storage(e.to_string()))?;

        match row {
            Some(row) => Ok(Some(self.row_to_autorole(&row).await?)),
            None => Ok(None),
        }
    }

    async fn get_guild_autoroles(
        &self,
        guild_id: u64,
    ) -> Result<Vec<AutoroleConfiguration>, AutoroleError> {
        let rows = sqlx::query("SELECT * FROM autoroles WHERE guild_id = ? ORDER BY id")
            .bind(guild_id as i64)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| AutoroleError::Storage(e.to_string()))?;

        let mut autoroles = Vec::new();
        for row in &rows {
            autoroles.push(self.row_to_autorole(row).await?);
        }
        Ok(autoroles)
    }

    async fn insert_autorole(
        &self,
        autorole: &AutoroleConfiguration,
    ) -> Result<i64, AutoroleError> {
        let result = sqlx::query(
            r#"
            INSERT INTO autoroles (guild_id, role_id, is_enabled, requires_confirmation)
            VALUES (?, ?, ?, ?)
            "#,
        )
        .bind(autorole.guild_id as i64)
        .bind(autorole.role_id as i64)
        .bind(autorole.is_enabled)
        .bind(autorole.requires_confirmation)
        .execute(&self.pool)
        .await
        .map_err(|e| AutoroleError::Storage(e.to_string()))?;

        let id = result.last_insert_rowid();
        self.replace_conditions(id, &autorole.conditions).await?;
        Ok(id)
    }

    async fn update_autorole(
        &self,
        autorole: &AutoroleConfiguration,
    ) -> Result<(), AutoroleError> {
        sqlx::query(
            "UPDATE autoroles SET is_enabled = ?, requires_confirmation = ? WHERE id = ?",
        )
        .bind(autorole.is_enabled)
        .bind(autorole.requires_confirmation)
        .bind(autorole.id)
        .execute(&self.pool)
        .await
        .map_err(|e| AutoroleError::Storage(e.to_string()))?;

        self.replace_conditions(autorole.id, &autorole.conditions)
            .await
    }

    async fn delete_autorole(&self, autorole_id: i64) -> Result<(), AutoroleError> {
        sqlx::query("DELETE FROM autorole_conditions WHERE autorole_id = ?")
            .bind(autorole_id)
            .execute(&self.pool)
            .await
            .map_err(|e| AutoroleError::Storage(e.to_string()))?;

        sqlx::query("DELETE FROM autorole_confirmations WHERE autorole_id = ?")
            .bind(autorole_id)
            .execute(&self.pool)
            .await
            .map_err(|e| AutoroleError::Storage(e.to_string()))?;

        sqlx::query("DELETE FROM autoroles WHERE id = ?")
            .bind(autorole_id)
            .execute(&self.pool)
            .await
            .map_err(|e| AutoroleError::Storage(e.to_string()))?;
        Ok(())
    }

    async fn get_confirmation(
        &self,
        autorole_id: i64,
        user_id: u64,
    ) -> Result<Option<AutoroleConfirmation>, AutoroleError> {
        let row = sqlx::query(
            "SELECT * FROM autorole_confirmations WHERE autorole_id = ? AND user_id = ?",
        )
        .bind(autorole_id)
        .bind(user_id as i64)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| AutoroleError::Storage(e.to_string()))?;

        Ok(row.as_ref().map(row_to_confirmation))
    }

    async fn get_pending_confirmations(
        &self,
        autorole_id: i64,
    ) -> Result<Vec<AutoroleConfirmation>, AutoroleError> {
        let rows = sqlx::query(
            "SELECT * FROM autorole_confirmations WHERE autorole_id = ? AND status = 'pending'",
        )
        .bind(autorole_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| AutoroleError::Storage(e.to_string()))?;

        Ok(rows.iter().map(row_to_confirmation).collect())
    }

    async fn insert_confirmation(
        &self,
        confirmation: &AutoroleConfirmation,
    ) -> Result<i64, AutoroleError> {
        let result = sqlx::query(
            r#"
            INSERT INTO autorole_confirmations (autorole_id, user_id, status)
            VALUES (?, ?, ?)
            "#,
        )
        .bind(confirmation.autorole_id)
        .bind(confirmation.user_id as i64)
        .bind(confirmation.status.as_str())
        .execute(&self.pool)
        .await
        .map_err(|e| AutoroleError::Storage(e.to_string()))?;

        Ok(result.last_insert_rowid())
    }

    async fn update_confirmation(
        &self,
        confirmation: &AutoroleConfirmation,
    ) -> Result<(), AutoroleError> {
        sqlx::query("UPDATE autorole_confirmations SET status = ? WHERE id = ?")
            .bind(confirmation.status.as_str())
            .bind(confirmation.id)
            .execute(&self.pool)
            .await
            .map_err(|e| AutoroleError::Storage(e.to_string()))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::autorole::AutoroleService;
    use sqlx::sqlite::SqlitePoolOptions;

    async fn test_service() -> AutoroleService<SqliteAutoroleStore> {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .unwrap();
        let store = SqliteAutoroleStore::new(pool);
        store.migrate().await.unwrap();
        AutoroleService::new(store)
    }

    #[tokio::test]
    async fn conditions_roundtrip_through_json_payloads() {
        let service = test_service().await;

        let mut autorole = service.create_autorole(1, 100).await.unwrap();
        service
            .add_condition(
                &mut autorole,
                AutoroleCondition::MessageCountInChannel {
                    channel_id: 5,
                    count: 25,
                },
            )
            .await
            .unwrap();
        service
            .add_condition(
                &mut autorole,
                AutoroleCondition::TimeSinceJoin { seconds: 86400 },
            )
            .await
            .unwrap();

        let reloaded = service.get_autorole(1, 100).await.unwrap();
        assert_eq!(reloaded.conditions.len(), 2);
        assert_eq!(
            reloaded.conditions[0],
            AutoroleCondition::MessageCountInChannel {
                channel_id: 5,
                count: 25
            }
        );
    }
}
