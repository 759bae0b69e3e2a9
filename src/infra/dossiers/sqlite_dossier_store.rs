// SQLite-backed dossier metadata store. The PDF contents live on disk,
// managed by the core service.
//
// Tables:
// - dossiers: Title and summary, one row per dossier

use crate::core::dossiers::{Dossier, DossierError, DossierStore};
use async_trait::async_trait;
use sqlx::{Pool, Row, Sqlite};

pub struct SqliteDossierStore {
    pool: Pool<Sqlite>,
}

impl SqliteDossierStore {
    pub fn new(pool: Pool<Sqlite>) -> Self {
        Self { pool }
    }

    /// Run database migrations to create required tables.
    pub async fn migrate(&self) -> Result<(), DossierError> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS dossiers (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                title TEXT NOT NULL COLLATE NOCASE UNIQUE,
                summary TEXT NOT NULL
            );
            "#,
        )
        .execute(&self.pool)
        .await
        .map_err(|e| DossierError::Storage(e.to_string()))?;

        Ok(())
    }
}

fn row_to_dossier(row: &sqlx::sqlite::SqliteRow) -> Dossier {
    Dossier {
        id: row.get("id"),
        title: row.get("title"),
        summary: row.get("summary"),
    }
}

#[async_trait]
impl DossierStore for SqliteDossierStore {
    async fn get_dossiers(&self) -> Result<Vec<Dossier>, DossierError> {
        let rows = sqlx::query("SELECT * FROM dossiers ORDER BY title")
            .fetch_all(&self.pool)
            .await
            .map_err(|e| DossierError::Storage(e.to_string()))?;

        Ok(rows.iter().map(row_to_dossier).collect())
    }

    async fn get_dossier_by_title(&self, title: &str) -> Result<Option<Dossier>, DossierError> {
        let row = sqlx::query("SELECT * FROM dossiers WHERE title = ? COLLATE NOCASE")
            .bind(title)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| DossierError::Storage(e.to_string()))?;

        Ok(row.as_ref().map(row_to_dossier))
    }

    async fn insert_dossier(&self, dossier: &Dossier) -> Result<i64, DossierError> {
        let result = sqlx::query("INSERT INTO dossiers (title, summary) VALUES (?, ?)")
            .bind(&dossier.title)
            .bind(&dossier.summary)
            .execute(&self.pool)
            .await
            .map_err(|e| DossierError::Storage(e.to_string()))?;

        Ok(result.last_insert_rowid())
    }

    async fn update_dossier(&self, dossier: &Dossier) -> Result<(), DossierError> {
        sqlx::query("UPDATE dossiers SET title = ?, summary = ? WHERE id = ?")
            .bind(&dossier.title)
            .bind(&dossier.summary)
            .bind(dossier.id)
            .execute(&self.pool)
            .await
            .map_err(|e| DossierError::Storage(e.to_string()))?;
        Ok(())
    }

    async fn delete_dossier(&self, dossier_id: i64) -> Result<(), DossierError> {
        sqlx::query("DELETE FROM dossiers WHERE id = ?")
            .bind(dossier_id)
            .execute(&self.pool)
            .await
            .map_err(|e| DossierError::Storage(e.to_string()))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::dossiers::DossierService;
    use sqlx::sqlite::SqlitePoolOptions;

    async fn test_service(dir: &std::path::Path) -> DossierService<SqliteDossierStore> {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .unwrap();
        let store = SqliteDossierStore::new(pool);
        store.migrate().await.unwrap();
        DossierService::new(store, dir)
    }

    #[tokio::test]
    async fn title_lookup_is_case_insensitive() {
        let dir = tempfile::tempdir().unwrap();
        let service = test_service(dir.path()).await;

        service.create_dossier("Server Rules").await.unwrap();

        let found = service.get_dossier_by_title("server rules").await.unwrap();
        assert_eq!(found.title, "Server Rules");

        let result = service.create_dossier("SERVER RULES").await;
        assert!(matches!(result, Err(DossierError::AlreadyExists(_))));
    }
}
