// User registry - bios and timezones, plus the database identity other
// features hang their rows off.

use async_trait::async_trait;
use thiserror::Error;

pub const MAX_BIO_LEN: usize = 1000;

/// Discord-representable UTC offsets, inclusive.
pub const MIN_TIMEZONE_OFFSET: i32 = -12;
pub const MAX_TIMEZONE_OFFSET: i32 = 14;

#[derive(Debug, Error)]
pub enum UserError {
    #[error("Storage error: {0}")]
    Storage(String),

    #[error("{0}")]
    InvalidInput(String),
}

/// A known Discord user.
#[derive(Debug, Clone, PartialEq)]
pub struct User {
    /// Database row id.
    pub id: i64,
    pub discord_id: u64,
    pub bio: Option<String>,
    pub timezone_offset: Option<i32>,
}

/// Trait for persisting users.
#[async_trait]
pub trait UserStore: Send + Sync {
    async fn get_user(&self, discord_id: u64) -> Result<Option<User>, UserError>;

    /// Insert a fresh row for the user and return it. Must not be called
    /// when a row already exists.
    async fn insert_user(&self, discord_id: u64) -> Result<User, UserError>;

    async fn update_user(&self, user: &User) -> Result<(), UserError>;
}

pub struct UserService<S: UserStore> {
    store: S,
}

impl<S: UserStore> UserService<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    /// Gets the row for a user, registering them on first contact.
    pub async fn get_or_register_user(&self, discord_id: u64) -> Result<User, UserError> {
        if let Some(user) = self.store.get_user(discord_id).await? {
            return Ok(user);
        }

        self.store.insert_user(discord_id).await
    }

    pub async fn set_bio(&self, discord_id: u64, bio: &str) -> Result<(), UserError> {
        if bio.trim().is_empty() {
            return Err(UserError::InvalidInput(
                "The bio may not be empty.".to_string(),
            ));
        }

        if bio.len() > MAX_BIO_LEN {
            return Err(UserError::InvalidInput(format!(
                "The bio may not be longer than {} characters.",
                MAX_BIO_LEN
            )));
        }

        let mut user = self.get_or_register_user(discord_id).await?;
        user.bio = Some(bio.to_string());
        self.store.update_user(&user).await
    }

    pub async fn set_timezone(&self, discord_id: u64, offset: i32) -> Result<(), UserError> {
        if !(MIN_TIMEZONE_OFFSET..=MAX_TIMEZONE_OFFSET).contains(&offset) {
            return Err(UserError::InvalidInput(format!(
                "The timezone offset must be between {} and {}.",
                MIN_TIMEZONE_OFFSET, MAX_TIMEZONE_OFFSET
            )));
        }

        let mut user = self.get_or_register_user(discord_id).await?;
        user.timezone_offset = Some(offset);
        self.store.update_user(&user).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dashmap::DashMap;
    use std::sync::atomic::{AtomicI64, Ordering};

    struct MockUserStore {
        users: DashMap<u64, User>,
        next_id: AtomicI64,
    }

    impl MockUserStore {
        fn new() -> Self {
            Self {
                users: DashMap::new(),
                next_id: AtomicI64::new(1),
            }
        }
    }

    #[async_trait]
    impl UserStore for MockUserStore {
        async fn get_user(&self, discord_id: u64) -> Result<Option<User>, UserError> {
            Ok(self.users.get(&discord_id).map(|u| u.clone()))
        }

        async fn insert_user(&self, discord_id: u64) -> Result<User, UserError> {
            let user = User {
                id: self.next_id.fetch_add(1, Ordering::SeqCst),
                discord_id,
                bio: None,
                timezone_offset: None,
            };
            self.users.insert(discord_id, user.clone());
            Ok(user)
        }

        async fn update_user(&self, user: &User) -> Result<(), UserError> {
            self.users.insert(user.discord_id, user.clone());
            Ok(())
        }
    }

    #[tokio::test]
    async fn registers_user_on_first_contact() {
        let service = UserService::new(MockUserStore::new());

        let user = service.get_or_register_user(42).await.unwrap();
        let again = service.get_or_register_user(42).await.unwrap();

        assert_eq!(user.id, again.id);
    }

    #[tokio::test]
    async fn sets_bio() {
        let service = UserService::new(MockUserStore::new());

        service.set_bio(42, "Just a traveler.").await.unwrap();

        let user = service.get_or_register_user(42).await.unwrap();
        assert_eq!(user.bio.as_deref(), Some("Just a traveler."));
    }

    #[tokio::test]
    async fn rejects_out_of_range_timezone() {
        let service = UserService::new(MockUserStore::new());

        assert!(service.set_timezone(42, 15).await.is_err());
        assert!(service.set_timezone(42, -13).await.is_err());
        assert!(service.set_timezone(42, -12).await.is_ok());
        assert!(service.set_timezone(42, 14).await.is_ok());
    }
}
