// SQLite-backed kink store.
//
// Tables:
// - kinks: The shared catalogue, keyed on the upstream F-List id
// - user_kinks: Per-user preference rows referencing catalogue entries

use crate::core::kinks::{Kink, KinkCategory, KinkError, KinkPreference, KinkStore, UserKink};
use async_trait::async_trait;
use sqlx::{Pool, Row, Sqlite};

pub struct SqliteKinkStore {
    pool: Pool<Sqlite>,
}

impl SqliteKinkStore {
    pub fn new(pool: Pool<Sqlite>) -> Self {
        Self { pool }
    }

    /// Run database migrations to create required tables.
    pub async fn migrate(&self) -> Result<(), KinkError> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS kinks (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                name TEXT NOT NULL,
                description TEXT NOT NULL,
                category TEXT NOT NULL,
                flist_id INTEGER NOT NULL UNIQUE
            );
            "#,
        )
        .execute(&self.pool)
        .await
        .map_err(|e| KinkError::Storage(e.to_string()))?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS user_kinks (
                user_id INTEGER NOT NULL,
                kink_id INTEGER NOT NULL,
                preference TEXT NOT NULL,
                PRIMARY KEY (user_id, kink_id)
            );
            "#,
        )
        .execute(&self.pool)
        .await
        .map_err(|e| KinkError::Storage(e.to_string()))?;

        Ok(())
    }
}

fn row_to_kink(row: &sqlx::sqlite::SqliteRow) -> Result<Kink, KinkError> {
    let category_str: String = row.get("category");
    let category = KinkCategory::parse(&category_str)
        .ok_or_else(|| KinkError::Storage(format!("Unknown kink category: {}", category_str)))?;

    Ok(Kink {
        id: row.get("id"),
        name: row.get("name"),
        description: row.get("description"),
        category,
        flist_id: row.get("flist_id"),
    })
}

#[async_trait]
impl KinkStore for SqliteKinkStore {
    async fn get_all_kinks(&self) -> Result<Vec<Kink>, KinkError> {
        let rows = sqlx::query("SELECT * FROM kinks ORDER BY flist_id")
            .fetch_all(&self.pool)
            .await
            .map_err(|e| KinkError::Storage(e.to_string()))?;

        rows.iter().map(row_to_kink).collect()
    }

    async fn get_kink_by_flist_id(&self, flist_id: i64) -> Result<Option<Kink>, KinkError> {
        let row = sqlx::query("SELECT * FROM kinks WHERE flist_id = ?")
            .bind(flist_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| KinkError::Storage(e.to_string()))?;

        row.as_ref().map(row_to_kink).transpose()
    }

    async fn get_kinks_by_category(
        &self,
        category: KinkCategory,
    ) -> Result<Vec<Kink>, KinkError> {
        let rows = sqlx::query("SELECT * FROM kinks WHERE category = ? ORDER BY flist_id")
            .bind(category.as_str())
            .fetch_all(&self.pool)
            .await
            .map_err(|e| KinkError::Storage(e.to_string()))?;

        rows.iter().map(row_to_kink).collect()
    }

    async fn upsert_kink(&self, kink: &Kink) -> Result<bool, KinkError> {
        let existing = self.get_kink_by_flist_id(kink.flist_id).await?;

        if let Some(old) = &existing {
            if old.name == kink.name
                && old.description == kink.description
                && old.category == kink.category
            {
                return Ok(false);
            }
        }

        sqlx::query(
            r#"
            INSERT INTO kinks (name, description, category, flist_id)
            VALUES (?, ?, ?, ?)
            ON CONFLICT(flist_id) DO UPDATE SET
                name = excluded.name,
                description = excluded.description,
                category = excluded.category
            "#,
        )
        .bind(&kink.name)
        .bind(&kink.description)
        .bind(kink.category.as_str())
        .bind(kink.flist_id)
        .execute(&self.pool)
        .await
        .map_err(|e| KinkError::Storage(e.to_string()))?;

        Ok(true)
    }

    async fn get_user_kinks(&self, user_id: u64) -> Result<Vec<UserKink>, KinkError> {
        let rows = sqlx::query(
            r#"
            SELECT k.*, uk.preference
            FROM user_kinks uk
            JOIN kinks k ON k.id = uk.kink_id
            WHERE uk.user_id = ?
            ORDER BY k.flist_id
            "#,
        )
        .bind(user_id as i64)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| KinkError::Storage(e.to_string()))?;

        let mut user_kinks = Vec::new();
        for row in &rows {
            let preference_str: String = row.get("preference");
            let preference = KinkPreference::parse(&preference_str).ok_or_else(|| {
                KinkError::Storage(format!("Unknown kink preference: {}", preference_str))
            })?;

            user_kinks.push(UserKink {
                user_id,
                kink: row_to_kink(row)?,
                preference,
            });
        }
        Ok(user_kinks)
    }

    async fn set_user_kink(
        &self,
        user_id: u64,
        kink_id: i64,
        preference: KinkPreference,
    ) -> Result<(), KinkError> {
        sqlx::query(
            r#"
            INSERT INTO user_kinks (user_id, kink_id, preference)
            VALUES (?, ?, ?)
            ON CONFLICT(user_id, kink_id) DO UPDATE SET
                preference = excluded.preference
            "#,
        )
        .bind(user_id as i64)
        .bind(kink_id)
        .bind(preference.as_str())
        .execute(&self.pool)
        .await
        .map_err(|e| KinkError::Storage(e.to_string()))?;
        Ok(())
    }

    async fn clear_user_kinks(&self, user_id: u64) -> Result<u64, KinkError> {
        let result = sqlx::query("DELETE FROM user_kinks WHERE user_id = ?")
            .bind(user_id as i64)
            .execute(&self.pool)
            .await
            .map_err(|e| KinkError::Storage(e.to_string()))?;

        Ok(result.rows_affected())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::kinks::KinkService;
    use sqlx::sqlite::SqlitePoolOptions;

    async fn test_service() -> KinkService<SqliteKinkStore> {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .unwrap();
        let store = SqliteKinkStore::new(pool);
        store.migrate().await.unwrap();
        KinkService::new(store)
    }

    fn kink(flist_id: i64, name: &str, category: KinkCategory) -> Kink {
        Kink {
            id: 0,
            name: name.to_string(),
            description: format!("{} description", name),
            category,
            flist_id,
        }
    }

    #[tokio::test]
    async fn import_and_preferences_roundtrip() {
        let service = test_service().await;

        let altered = service
            .update_kinks(&[
                kink(1, "bondage", KinkCategory::General),
                kink(2, "petplay", KinkCategory::Roleplay),
            ])
            .await
            .unwrap();
        assert_eq!(altered, 2);

        // Re-import is a no-op
        let altered = service
            .update_kinks(&[kink(1, "bondage", KinkCategory::General)])
            .await
            .unwrap();
        assert_eq!(altered, 0);

        let bondage = service.get_kink_by_name("bondage").await.unwrap();
        service
            .set_preference(10, &bondage, KinkPreference::Favourite)
            .await
            .unwrap();

        let user_kinks = service.get_user_kinks(10).await.unwrap();
        assert_eq!(user_kinks.len(), 1);
        assert_eq!(user_kinks[0].preference, KinkPreference::Favourite);
    }
}
