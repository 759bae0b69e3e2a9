// Character management - core business logic for character profiles.
//
// Characters are owned by a user on a particular server. Names are unique
// per owner (case-insensitive); a user can mark one character as current
// (the one they're playing) and one as default.
//
// NO Discord dependencies here - just pure domain logic.

use super::character_models::{Character, CharacterImage};
use super::pronouns;
use async_trait::async_trait;
use thiserror::Error;

pub const MAX_SUMMARY_LEN: usize = 240;
pub const MAX_DESCRIPTION_LEN: usize = 1000;

/// Names that collide with command verbs and therefore can't be used as
/// character names.
const RESERVED_NAMES: &[&str] = &["create", "delete", "list", "show", "become", "clear"];

#[derive(Debug, Error)]
pub enum CharacterError {
    #[error("Storage error: {0}")]
    Storage(String),

    #[error("{0}")]
    InvalidInput(String),

    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    AlreadyExists(String),
}

/// Trait for persisting characters and their images.
#[async_trait]
pub trait CharacterStore: Send + Sync {
    /// Insert a character, returning it with its assigned row id.
    async fn insert_character(&self, character: Character) -> Result<Character, CharacterError>;

    async fn update_character(&self, character: &Character) -> Result<(), CharacterError>;

    async fn delete_character(&self, character_id: i64) -> Result<(), CharacterError>;

    async fn get_character(&self, character_id: i64) -> Result<Option<Character>, CharacterError>;

    /// All characters a user owns on a server.
    async fn get_user_characters(
        &self,
        guild_id: u64,
        owner_id: u64,
    ) -> Result<Vec<Character>, CharacterError>;

    /// All characters on a server, regardless of owner.
    async fn get_server_characters(&self, guild_id: u64) -> Result<Vec<Character>, CharacterError>;

    /// Insert an image, returning it with its assigned row id.
    async fn insert_image(&self, image: CharacterImage) -> Result<CharacterImage, CharacterError>;

    async fn delete_image(&self, image_id: i64) -> Result<(), CharacterError>;

    async fn get_images(&self, character_id: i64) -> Result<Vec<CharacterImage>, CharacterError>;
}

pub struct CharacterService<S: CharacterStore> {
    store: S,
}

impl<S: CharacterStore> CharacterService<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    /// Whether the given name is free for the given user on the given
    /// server. Case-insensitive.
    pub async fn is_name_unique_for_user(
        &self,
        guild_id: u64,
        owner_id: u64,
        name: &str,
    ) -> Result<bool, CharacterError> {
        let characters = self.store.get_user_characters(guild_id, owner_id).await?;
        Ok(!characters
            .iter()
            .any(|c| c.name.eq_ignore_ascii_case(name)))
    }

    pub async fn create_character(
        &self,
        guild_id: u64,
        owner_id: u64,
        name: &str,
    ) -> Result<Character, CharacterError> {
        validate_name(name)?;

        if !self.is_name_unique_for_user(guild_id, owner_id, name).await? {
            return Err(CharacterError::AlreadyExists(
                "You already have a character with that name.".to_string(),
            ));
        }

        let character = Character {
            id: 0,
            guild_id,
            owner_id,
            name: name.to_string(),
            nickname: None,
            summary: None,
            description: None,
            avatar_url: None,
            pronoun_family: pronouns::DEFAULT_PRONOUN_FAMILY.to_string(),
            is_nsfw: false,
            is_current: false,
            is_default: false,
        };

        self.store.insert_character(character).await
    }

    pub async fn delete_character(&self, character: &Character) -> Result<(), CharacterError> {
        self.store.delete_character(character.id).await
    }

    pub async fn get_user_characters(
        &self,
        guild_id: u64,
        owner_id: u64,
    ) -> Result<Vec<Character>, CharacterError> {
        self.store.get_user_characters(guild_id, owner_id).await
    }

    /// Gets a character a user owns, by name.
    pub async fn get_user_character_by_name(
        &self,
        guild_id: u64,
        owner_id: u64,
        name: &str,
    ) -> Result<Character, CharacterError> {
        let characters = self.store.get_user_characters(guild_id, owner_id).await?;
        characters
            .into_iter()
            .find(|c| c.name.eq_ignore_ascii_case(name))
            .ok_or_else(|| {
                CharacterError::NotFound(
                    "You don't have a character with that name.".to_string(),
                )
            })
    }

    /// Gets a character on a server by name alone. Fails if more than one
    /// user owns a character by that name.
    pub async fn get_named_character(
        &self,
        guild_id: u64,
        name: &str,
    ) -> Result<Character, CharacterError> {
        let characters = self.store.get_server_characters(guild_id).await?;
        let mut matching: Vec<_> = characters
            .into_iter()
            .filter(|c| c.name.eq_ignore_ascii_case(name))
            .collect();

        match matching.len() {
            0 => Err(CharacterError::NotFound(
                "No character with that name found.".to_string(),
            )),
            1 => Ok(matching.remove(0)),
            _ => Err(CharacterError::InvalidInput(
                "There's more than one character with that name. \
                 Specify the owner as well."
                    .to_string(),
            )),
        }
    }

    /// The character a user is currently playing, if any.
    pub async fn get_current_character(
        &self,
        guild_id: u64,
        owner_id: u64,
    ) -> Result<Option<Character>, CharacterError> {
        let characters = self.store.get_user_characters(guild_id, owner_id).await?;
        Ok(characters.into_iter().find(|c| c.is_current))
    }

    /// Marks a character as the one its owner is playing, clearing any
    /// other current character first.
    pub async fn become_character(&self, character: &Character) -> Result<(), CharacterError> {
        if let Some(mut current) = self
            .get_current_character(character.guild_id, character.owner_id)
            .await?
        {
            if current.id == character.id {
                return Err(CharacterError::InvalidInput(
                    "You're already playing that character.".to_string(),
                ));
            }

            current.is_current = false;
            self.store.update_character(&current).await?;
        }

        let mut updated = character.clone();
        updated.is_current = true;
        self.store.update_character(&updated).await
    }

    /// Clears the user's current character, falling back to their default
    /// character when one is set. Returns the character now current, if any.
    pub async fn clear_current_character(
        &self,
        guild_id: u64,
        owner_id: u64,
    ) -> Result<Option<Character>, CharacterError> {
        if let Some(mut current) = self.get_current_character(guild_id, owner_id).await? {
            current.is_current = false;
            self.store.update_character(&current).await?;
        }

        let characters = self.store.get_user_characters(guild_id, owner_id).await?;
        if let Some(mut default) = characters.into_iter().find(|c| c.is_default) {
            default.is_current = true;
            self.store.update_character(&default).await?;
            return Ok(Some(default));
        }

        Ok(None)
    }

    pub async fn set_default_character(&self, character: &Character) -> Result<(), CharacterError> {
        let characters = self
            .store
            .get_user_characters(character.guild_id, character.owner_id)
            .await?;

        for mut other in characters {
            if other.is_default && other.id != character.id {
                other.is_default = false;
                self.store.update_character(&other).await?;
            }
        }

        let mut updated = character.clone();
        if updated.is_default {
            return Err(CharacterError::InvalidInput(
                "That's already your default character.".to_string(),
            ));
        }

        updated.is_default = true;
        self.store.update_character(&updated).await
    }

    pub async fn clear_default_character(
        &self,
        guild_id: u64,
        owner_id: u64,
    ) -> Result<(), CharacterError> {
        let characters = self.store.get_user_characters(guild_id, owner_id).await?;
        let mut default = characters
            .into_iter()
            .find(|c| c.is_default)
            .ok_or_else(|| {
                CharacterError::NotFound("You don't have a default character.".to_string())
            })?;

        default.is_default = false;
        self.store.update_character(&default).await
    }

    pub async fn set_name(&self, character: &Character, name: &str) -> Result<(), CharacterError> {
        validate_name(name)?;

        if character.name == name {
            return Err(CharacterError::InvalidInput(
                "The character already has that name.".to_string(),
            ));
        }

        // A case-only rename matches the character itself, so the
        // uniqueness check has to skip it.
        let characters = self
            .store
            .get_user_characters(character.guild_id, character.owner_id)
            .await?;
        if characters
            .iter()
            .any(|c| c.id != character.id && c.name.eq_ignore_ascii_case(name))
        {
            return Err(CharacterError::AlreadyExists(
                "You already have a character with that name.".to_string(),
            ));
        }

        let mut updated = character.clone();
        updated.name = name.to_string();
        self.store.update_character(&updated).await
    }

    pub async fn set_nickname(
        &self,
        character: &Character,
        nickname: &str,
    ) -> Result<(), CharacterError> {
        if nickname.len() > 32 {
            return Err(CharacterError::InvalidInput(
                "Discord nicknames may not be longer than 32 characters.".to_string(),
            ));
        }

        let mut updated = character.clone();
        updated.nickname = Some(nickname.to_string());
        self.store.update_character(&updated).await
    }

    pub async fn set_summary(
        &self,
        character: &Character,
        summary: &str,
    ) -> Result<(), CharacterError> {
        if summary.len() > MAX_SUMMARY_LEN {
            return Err(CharacterError::InvalidInput(format!(
                "The summary may not be longer than {} characters.",
                MAX_SUMMARY_LEN
            )));
        }

        let mut updated = character.clone();
        updated.summary = Some(summary.to_string());
        self.store.update_character(&updated).await
    }

    pub async fn set_description(
        &self,
        character: &Character,
        description: &str,
    ) -> Result<(), CharacterError> {
        if description.len() > MAX_DESCRIPTION_LEN {
            return Err(CharacterError::InvalidInput(format!(
                "The description may not be longer than {} characters.",
                MAX_DESCRIPTION_LEN
            )));
        }

        let mut updated = character.clone();
        updated.description = Some(description.to_string());
        self.store.update_character(&updated).await
    }

    pub async fn set_avatar(&self, character: &Character, url: &str) -> Result<(), CharacterError> {
        if !url.starts_with("http://") && !url.starts_with("https://") {
            return Err(CharacterError::InvalidInput(
                "The avatar URL must be an http or https link.".to_string(),
            ));
        }

        let mut updated = character.clone();
        updated.avatar_url = Some(url.to_string());
        self.store.update_character(&updated).await
    }

    pub async fn set_pronouns(
        &self,
        character: &Character,
        family: &str,
    ) -> Result<(), CharacterError> {
        let provider = pronouns::get_provider(family).ok_or_else(|| {
            CharacterError::InvalidInput(format!(
                "Unknown pronoun family. Known families: {}.",
                pronouns::known_families().collect::<Vec<_>>().join(", ")
            ))
        })?;

        let mut updated = character.clone();
        updated.pronoun_family = provider.family.to_string();
        self.store.update_character(&updated).await
    }

    pub async fn set_is_nsfw(
        &self,
        character: &Character,
        is_nsfw: bool,
    ) -> Result<(), CharacterError> {
        if character.is_nsfw == is_nsfw {
            return Err(CharacterError::InvalidInput(
                "The character's NSFW setting is already set to that.".to_string(),
            ));
        }

        let mut updated = character.clone();
        updated.is_nsfw = is_nsfw;
        self.store.update_character(&updated).await
    }

    /// Hands a character over to another user. Fails if the new owner
    /// already has a character by the same name.
    pub async fn transfer_ownership(
        &self,
        character: &Character,
        new_owner_id: u64,
    ) -> Result<(), CharacterError> {
        if character.owner_id == new_owner_id {
            return Err(CharacterError::InvalidInput(
                "That user already owns the character.".to_string(),
            ));
        }

        if !self
            .is_name_unique_for_user(character.guild_id, new_owner_id, &character.name)
            .await?
        {
            return Err(CharacterError::AlreadyExists(
                "The new owner already has a character with that name.".to_string(),
            ));
        }

        let mut updated = character.clone();
        updated.owner_id = new_owner_id;
        updated.is_current = false;
        updated.is_default = false;
        self.store.update_character(&updated).await
    }

    pub async fn add_image(
        &self,
        character: &Character,
        name: &str,
        url: &str,
        caption: Option<&str>,
        is_nsfw: bool,
    ) -> Result<CharacterImage, CharacterError> {
        if !url.starts_with("http://") && !url.starts_with("https://") {
            return Err(CharacterError::InvalidInput(
                "The image URL must be an http or https link.".to_string(),
            ));
        }

        let images = self.store.get_images(character.id).await?;
        if images.iter().any(|i| i.name.eq_ignore_ascii_case(name)) {
            return Err(CharacterError::AlreadyExists(
                "The character already has an image with that name.".to_string(),
            ));
        }

        let image = CharacterImage {
            id: 0,
            character_id: character.id,
            name: name.to_string(),
            caption: caption.map(|c| c.to_string()),
            url: url.to_string(),
            is_nsfw,
        };

        self.store.insert_image(image).await
    }

    pub async fn remove_image(
        &self,
        character: &Character,
        name: &str,
    ) -> Result<(), CharacterError> {
        let images = self.store.get_images(character.id).await?;
        let image = images
            .iter()
            .find(|i| i.name.eq_ignore_ascii_case(name))
            .ok_or_else(|| {
                CharacterError::NotFound(
                    "The character doesn't have an image with that name.".to_string(),
                )
            })?;

        self.store.delete_image(image.id).await
    }

    pub async fn get_images(
        &self,
        character: &Character,
    ) -> Result<Vec<CharacterImage>, CharacterError> {
        self.store.get_images(character.id).await
    }
}

fn validate_name(name: &str) -> Result<(), CharacterError> {
    if name.trim().is_empty() {
        return Err(CharacterError::InvalidInput(
            "The name may not be empty.".to_string(),
        ));
    }

    if name.len() > 100 {
        return Err(CharacterError::InvalidInput(
            "The name may not be longer than 100 characters.".to_string(),
        ));
    }

    if RESERVED_NAMES.iter().any(|r| r.eq_ignore_ascii_case(name)) {
        return Err(CharacterError::InvalidInput(
            "That name is reserved and can't be used.".to_string(),
        ));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use dashmap::DashMap;
    use std::sync::atomic::{AtomicI64, Ordering};

    struct MockCharacterStore {
        characters: DashMap<i64, Character>,
        images: DashMap<i64, CharacterImage>,
        next_id: AtomicI64,
    }

    impl MockCharacterStore {
        fn new() -> Self {
            Self {
                characters: DashMap::new(),
                images: DashMap::new(),
                next_id: AtomicI64::new(1),
            }
        }
    }

    #[async_trait]
    impl CharacterStore for MockCharacterStore {
        async fn insert_character(
            &self,
            mut character: Character,
        ) -> Result<Character, CharacterError> {
            character.id = self.next_id.fetch_add(1, Ordering::SeqCst);
            self.characters.insert(character.id, character.clone());
            Ok(character)
        }

        async fn update_character(&self, character: &Character) -> Result<(), CharacterError> {
            self.characters.insert(character.id, character.clone());
            Ok(())
        }

        async fn delete_character(&self, character_id: i64) -> Result<(), CharacterError> {
            self.characters.remove(&character_id);
            Ok(())
        }

        async fn get_character(
            &self,
            character_id: i64,
        ) -> Result<Option<Character>, CharacterError> {
            Ok(self.characters.get(&character_id).map(|c| c.clone()))
        }

        async fn get_user_characters(
            &self,
            guild_id: u64,
            owner_id: u64,
        ) -> Result<Vec<Character>, CharacterError> {
            Ok(self
                .characters
                .iter()
                .filter(|c| c.guild_id == guild_id && c.owner_id == owner_id)
                .map(|c| c.clone())
                .collect())
        }

        async fn get_server_characters(
            &self,
            guild_id: u64,
        ) -> Result<Vec<Character>, CharacterError> {
            Ok(self
                .characters
                .iter()
                .filter(|c| c.guild_id == guild_id)
                .map(|c| c.clone())
                .collect())
        }

        async fn insert_image(
            &self,
            mut image: CharacterImage,
        ) -> Result<CharacterImage, CharacterError> {
            image.id = self.next_id.fetch_add(1, Ordering::SeqCst);
            self.images.insert(image.id, image.clone());
            Ok(image)
        }

        async fn delete_image(&self, image_id: i64) -> Result<(), CharacterError> {
            self.images.remove(&image_id);
            Ok(())
        }

        async fn get_images(
            &self,
            character_id: i64,
        ) -> Result<Vec<CharacterImage>, CharacterError> {
            Ok(self
                .images
                .iter()
                .filter(|i| i.character_id == character_id)
                .map(|i| i.clone())
                .collect())
        }
    }

    #[tokio::test]
    async fn creates_character() {
        let service = CharacterService::new(MockCharacterStore::new());

        let character = service.create_character(1, 10, "Amby").await.unwrap();
        assert_eq!(character.name, "Amby");
        assert!(!character.is_current);
    }

    #[tokio::test]
    async fn renames_allow_changing_only_the_casing() {
        let service = CharacterService::new(MockCharacterStore::new());

        let character = service.create_character(1, 10, "aria").await.unwrap();
        service.set_name(&character, "Aria").await.unwrap();

        let renamed = service
            .get_user_character_by_name(1, 10, "Aria")
            .await
            .unwrap();
        assert_eq!(renamed.name, "Aria");

        // The exact current name is still a no-op
        let result = service.set_name(&renamed, "Aria").await;
        assert!(matches!(result, Err(CharacterError::InvalidInput(_))));

        // And another character's name is still off limits, in any casing
        service.create_character(1, 10, "Briar").await.unwrap();
        let result = service.set_name(&renamed, "briar").await;
        assert!(matches!(result, Err(CharacterError::AlreadyExists(_))));
    }

    #[tokio::test]
    async fn rejects_duplicate_name_for_same_owner() {
        let service = CharacterService::new(MockCharacterStore::new());

        service.create_character(1, 10, "Amby").await.unwrap();
        let result = service.create_character(1, 10, "amby").await;

        assert!(matches!(result, Err(CharacterError::AlreadyExists(_))));
    }

    #[tokio::test]
    async fn allows_same_name_for_different_owners() {
        let service = CharacterService::new(MockCharacterStore::new());

        service.create_character(1, 10, "Amby").await.unwrap();
        assert!(service.create_character(1, 11, "Amby").await.is_ok());
    }

    #[tokio::test]
    async fn rejects_reserved_names() {
        let service = CharacterService::new(MockCharacterStore::new());

        let result = service.create_character(1, 10, "create").await;
        assert!(matches!(result, Err(CharacterError::InvalidInput(_))));
    }

    #[tokio::test]
    async fn named_lookup_requires_unambiguous_name() {
        let service = CharacterService::new(MockCharacterStore::new());

        service.create_character(1, 10, "Amby").await.unwrap();
        service.create_character(1, 11, "Amby").await.unwrap();

        let result = service.get_named_character(1, "Amby").await;
        assert!(matches!(result, Err(CharacterError::InvalidInput(_))));
    }

    #[tokio::test]
    async fn becoming_a_character_clears_the_previous_one() {
        let service = CharacterService::new(MockCharacterStore::new());

        let first = service.create_character(1, 10, "Amby").await.unwrap();
        let second = service.create_character(1, 10, "Rex").await.unwrap();

        service.become_character(&first).await.unwrap();
        service.become_character(&second).await.unwrap();

        let current = service.get_current_character(1, 10).await.unwrap().unwrap();
        assert_eq!(current.id, second.id);
    }

    #[tokio::test]
    async fn clearing_current_falls_back_to_default() {
        let service = CharacterService::new(MockCharacterStore::new());

        let first = service.create_character(1, 10, "Amby").await.unwrap();
        let second = service.create_character(1, 10, "Rex").await.unwrap();

        service.set_default_character(&first).await.unwrap();
        service.become_character(&second).await.unwrap();

        let now_current = service.clear_current_character(1, 10).await.unwrap();
        assert_eq!(now_current.unwrap().id, first.id);
    }

    #[tokio::test]
    async fn transfer_fails_when_new_owner_has_name_collision() {
        let service = CharacterService::new(MockCharacterStore::new());

        let character = service.create_character(1, 10, "Amby").await.unwrap();
        service.create_character(1, 11, "Amby").await.unwrap();

        let result = service.transfer_ownership(&character, 11).await;
        assert!(matches!(result, Err(CharacterError::AlreadyExists(_))));
    }

    #[tokio::test]
    async fn image_names_are_unique_per_character() {
        let service = CharacterService::new(MockCharacterStore::new());

        let character = service.create_character(1, 10, "Amby").await.unwrap();
        service
            .add_image(&character, "portrait", "https://example.com/a.png", None, false)
            .await
            .unwrap();

        let result = service
            .add_image(&character, "Portrait", "https://example.com/b.png", None, false)
            .await;

        assert!(matches!(result, Err(CharacterError::AlreadyExists(_))));
    }

    #[tokio::test]
    async fn rejects_unknown_pronoun_family() {
        let service = CharacterService::new(MockCharacterStore::new());

        let character = service.create_character(1, 10, "Amby").await.unwrap();
        assert!(service.set_pronouns(&character, "they").await.is_ok());
        assert!(service.set_pronouns(&character, "blorp").await.is_err());
    }
}
