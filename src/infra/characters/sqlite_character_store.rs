// SQLite-backed character store.
//
// Tables:
// - characters: Character profiles, one row per character
// - character_images: Gallery images attached to characters

use crate::core::characters::{Character, CharacterError, CharacterImage, CharacterStore};
use async_trait::async_trait;
use sqlx::{Pool, Row, Sqlite};

pub struct SqliteCharacterStore {
    pool: Pool<Sqlite>,
}

impl SqliteCharacterStore {
    pub fn new(pool: Pool<Sqlite>) -> Self {
        Self { pool }
    }

    /// Run database migrations to create required tables.
    pub async fn migrate(&self) -> Result<(), CharacterError> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS characters (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                guild_id INTEGER NOT NULL,
                owner_id INTEGER NOT NULL,
                name TEXT NOT NULL,
                nickname TEXT,
                summary TEXT,
                description TEXT,
                avatar_url TEXT,
                pronoun_family TEXT NOT NULL,
                is_nsfw BOOLEAN NOT NULL DEFAULT 0,
                is_current BOOLEAN NOT NULL DEFAULT 0,
                is_default BOOLEAN NOT NULL DEFAULT 0
            );
            CREATE INDEX IF NOT EXISTS idx_characters_guild_owner
                ON characters(guild_id, owner_id);
            "#,
        )
        .execute(&self.pool)
        .await
        .map_err(|e| CharacterError::Storage(e.to_string()))?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS character_images (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                character_id INTEGER NOT NULL,
                name TEXT NOT NULL,
                caption TEXT,
                url TEXT NOT NULL,
                is_nsfw BOOLEAN NOT NULL DEFAULT 0
            );
            CREATE INDEX IF NOT EXISTS idx_character_images_character
                ON character_images(character_id);
            "#,
        )
        .execute(&self.pool)
        .await
        .map_err(|e| CharacterError::Storage(e.to_string()))?;

        Ok(())
    }
}

fn row_to_character(row: &sqlx::sqlite::SqliteRow) -> Character {
    Character {
        id: row.get("id"),
        guild_id: row.get::<i64, _>("guild_id") as u64,
        owner_id: row.get::<i64, _>("owner_id") as u64,
        name: row.get("name"),
        nickname: row.get("nickname"),
        summary: row.get("summary"),
        description: row.get("description"),
        avatar_url: row.get("avatar_url"),
        pronoun_family: row.get("pronoun_family"),
        is_nsfw: row.get("is_nsfw"),
        is_current: row.get("is_current"),
        is_default: row.get("is_default"),
    }
}

fn row_to_image(row: &sqlx::sqlite::SqliteRow) -> CharacterImage {
    CharacterImage {
        id: row.get("id"),
        character_id: row.get("character_id"),
        name: row.get("name"),
        caption: row.get("caption"),
        url: row.get("url"),
        is_nsfw: row.get("is_nsfw"),
    }
}

#[async_trait]
impl CharacterStore for SqliteCharacterStore {
    async fn insert_character(&self, character: Character) -> Result<Character, CharacterError> {
        let result = sqlx::query(
            r#"
            INSERT INTO characters (
                guild_id, owner_id, name, nickname, summary, description,
                avatar_url, pronoun_family, is_nsfw, is_current, is_default
            )
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(character.guild_id as i64)
        .bind(character.owner_id as i64)
        .bind(&character.name)
        .bind(&character.nickname)
        .bind(&character.summary)
        .bind(&character.description)
        .bind(&character.avatar_url)
        .bind(&character.pronoun_family)
        .bind(character.is_nsfw)
        .bind(character.is_current)
        .bind(character.is_default)
        .execute(&self.pool)
        .await
        .map_err(|e| CharacterError::Storage(e.to_string()))?;

        let mut inserted = character;
        inserted.id = result.last_insert_rowid();
        Ok(inserted)
    }

    async fn update_character(&self, character: &Character) -> Result<(), CharacterError> {
        sqlx::query(
            r#"
            UPDATE characters SET
                owner_id = ?,
                name = ?,
                nickname = ?,
                summary = ?,
                description = ?,
                avatar_url = ?,
                pronoun_family = ?,
                is_nsfw = ?,
                is_current = ?,
                is_default = ?
            WHERE id = ?
            "#,
        )
        .bind(character.owner_id as i64)
        .bind(&character.name)
        .bind(&character.nickname)
        .bind(&character.summary)
        .bind(&character.description)
        .bind(&character.avatar_url)
        .bind(&character.pronoun_family)
        .bind(character.is_nsfw)
        .bind(character.is_current)
        .bind(character.is_default)
        .bind(character.id)
        .execute(&self.pool)
        .await
        .map_err(|e| CharacterError::Storage(e.to_string()))?;
        Ok(())
    }

    async fn delete_character(&self, character_id: i64) -> Result<(), CharacterError> {
        sqlx::query("DELETE FROM character_images WHERE character_id = ?")
            .bind(character_id)
            .execute(&self.pool)
            .await
            .map_err(|e| CharacterError::Storage(e.to_string()))?;

        sqlx::query("DELETE FROM characters WHERE id = ?")
            .bind(character_id)
            .execute(&self.pool)
            .await
            .map_err(|e| CharacterError::Storage(e.to_string()))?;
        Ok(())
    }

    async fn get_character(&self, character_id: i64) -> Result<Option<Character>, CharacterError> {
        let row = sqlx::query("SELECT * FROM characters WHERE id = ?")
            .bind(character_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| CharacterError::Storage(e.to_string()))?;

        Ok(row.as_ref().map(row_to_character))
    }

    async fn get_user_characters(
        &self,
        guild_id: u64,
        owner_id: u64,
    ) -> Result<Vec<Character>, CharacterError> {
        let rows = sqlx::query(
            "SELECT * FROM characters WHERE guild_id = ? AND owner_id = ? ORDER BY name",
        )
        .bind(guild_id as i64)
        .bind(owner_id as i64)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| CharacterError::Storage(e.to_string()))?;

        Ok(rows.iter().map(row_to_character).collect())
    }

    async fn get_server_characters(&self, guild_id: u64) -> Result<Vec<Character>, CharacterError> {
        let rows = sqlx::query("SELECT * FROM characters WHERE guild_id = ? ORDER BY name")
            .bind(guild_id as i64)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| CharacterError::Storage(e.to_string()))?;

        Ok(rows.iter().map(row_to_character).collect())
    }

    async fn insert_image(&self, image: CharacterImage) -> Result<CharacterImage, CharacterError> {
        let result = sqlx::query(
            r#"
            INSERT INTO character_images (character_id, name, caption, url, is_nsfw)
            VALUES (?, ?, ?, ?, ?)
            "#,
        )
        .bind(image.character_id)
        .bind(&image.name)
        .bind(&image.caption)
        .bind(&image.url)
        .bind(image.is_nsfw)
        .execute(&self.pool)
        .await
        .map_err(|e| CharacterError::Storage(e.to_string()))?;

        let mut inserted = image;
        inserted.id = result.last_insert_rowid();
        Ok(inserted)
    }

    async fn delete_image(&self, image_id: i64) -> Result<(), CharacterError> {
        sqlx::query("DELETE FROM character_images WHERE id = ?")
            .bind(image_id)
            .execute(&self.pool)
            .await
            .map_err(|e| CharacterError::Storage(e.to_string()))?;
        Ok(())
    }

    async fn get_images(&self, character_id: i64) -> Result<Vec<CharacterImage>, CharacterError> {
        let rows =
            sqlx::query("SELECT * FROM character_images WHERE character_id = ? ORDER BY name")
                .bind(character_id)
                .fetch_all(&self.pool)
                .await
                .map_err(|e| CharacterError::Storage(e.to_string()))?;

        Ok(rows.iter().map(row_to_image).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::characters::CharacterService;
    use sqlx::sqlite::SqlitePoolOptions;

    async fn test_service() -> CharacterService<SqliteCharacterStore> {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .unwrap();
        let store = SqliteCharacterStore::new(pool);
        store.migrate().await.unwrap();
        CharacterService::new(store)
    }

    #[tokio::test]
    async fn character_roundtrip() {
        let service = test_service().await;

        let created = service.create_character(1, 10, "Aria").await.unwrap();
        assert!(created.id > 0);

        let found = service
            .get_user_character_by_name(1, 10, "aria")
            .await
            .unwrap();
        assert_eq!(found.id, created.id);
    }

    #[tokio::test]
    async fn becoming_persists_across_lookups() {
        let service = test_service().await;

        let aria = service.create_character(1, 10, "Aria").await.unwrap();
        service.create_character(1, 10, "Brynn").await.unwrap();

        service.become_character(&aria).await.unwrap();

        let current = service.get_current_character(1, 10).await.unwrap().unwrap();
        assert_eq!(current.id, aria.id);
    }

    #[tokio::test]
    async fn images_survive_reloads() {
        let service = test_service().await;

        let aria = service.create_character(1, 10, "Aria").await.unwrap();
        service
            .add_image(&aria, "portrait", "https://example.com/aria.png", None, false)
            .await
            .unwrap();

        let images = service.get_images(&aria).await.unwrap();
        assert_eq!(images.len(), 1);
        assert_eq!(images[0].name, "portrait");
    }
}
