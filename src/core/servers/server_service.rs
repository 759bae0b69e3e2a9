// Server registry - per-guild settings shared by every other feature.
//
// NO Discord dependencies here - just pure domain logic.

use async_trait::async_trait;
use thiserror::Error;

/// Longest accepted server description or join message.
pub const MAX_SERVER_TEXT_LEN: usize = 800;

#[derive(Debug, Error)]
pub enum ServerError {
    #[error("Storage error: {0}")]
    Storage(String),

    #[error("{0}")]
    InvalidInput(String),

    #[error("{0}")]
    NothingToChange(String),
}

/// A known Discord guild and its bot-wide settings.
#[derive(Debug, Clone, PartialEq)]
pub struct Server {
    /// Database row id.
    pub id: i64,
    pub discord_id: u64,
    pub description: Option<String>,
    pub join_message: Option<String>,
    pub is_nsfw: bool,
    pub send_join_message: bool,
    pub suppress_permission_warnings: bool,
}

/// Trait for persisting servers.
#[async_trait]
pub trait ServerStore: Send + Sync {
    async fn get_server(&self, discord_id: u64) -> Result<Option<Server>, ServerError>;

    /// Insert a fresh row for the guild and return it. Must not be called
    /// when a row already exists.
    async fn insert_server(&self, discord_id: u64) -> Result<Server, ServerError>;

    async fn update_server(&self, server: &Server) -> Result<(), ServerError>;
}

pub struct ServerService<S: ServerStore> {
    store: S,
}

impl<S: ServerStore> ServerService<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    /// Gets the settings row for a guild, registering the guild on first
    /// contact.
    pub async fn get_or_register_server(&self, guild_id: u64) -> Result<Server, ServerError> {
        if let Some(server) = self.store.get_server(guild_id).await? {
            return Ok(server);
        }

        self.store.insert_server(guild_id).await
    }

    pub async fn set_description(
        &self,
        guild_id: u64,
        description: &str,
    ) -> Result<(), ServerError> {
        if description.trim().is_empty() {
            return Err(ServerError::InvalidInput(
                "The description may not be empty.".to_string(),
            ));
        }

        if description.len() > MAX_SERVER_TEXT_LEN {
            return Err(ServerError::InvalidInput(format!(
                "The description may not be longer than {} characters.",
                MAX_SERVER_TEXT_LEN
            )));
        }

        let mut server = self.get_or_register_server(guild_id).await?;
        if server.description.as_deref() == Some(description) {
            return Err(ServerError::NothingToChange(
                "That's already the server's description.".to_string(),
            ));
        }

        server.description = Some(description.to_string());
        self.store.update_server(&server).await
    }

    pub async fn set_join_message(&self, guild_id: u64, message: &str) -> Result<(), ServerError> {
        if message.trim().is_empty() {
            return Err(ServerError::InvalidInput(
                "The join message may not be empty.".to_string(),
            ));
        }

        if message.len() > MAX_SERVER_TEXT_LEN {
            return Err(ServerError::InvalidInput(format!(
                "The join message may not be longer than {} characters.",
                MAX_SERVER_TEXT_LEN
            )));
        }

        let mut server = self.get_or_register_server(guild_id).await?;
        if server.join_message.as_deref() == Some(message) {
            return Err(ServerError::NothingToChange(
                "That's already the server's join message.".to_string(),
            ));
        }

        server.join_message = Some(message.to_string());
        self.store.update_server(&server).await
    }

    pub async fn set_send_join_message(
        &self,
        guild_id: u64,
        send_join_message: bool,
    ) -> Result<(), ServerError> {
        let mut server = self.get_or_register_server(guild_id).await?;
        if server.send_join_message == send_join_message {
            return Err(ServerError::NothingToChange(
                "Join message sending is already set to that.".to_string(),
            ));
        }

        server.send_join_message = send_join_message;
        self.store.update_server(&server).await
    }

    pub async fn set_is_nsfw(&self, guild_id: u64, is_nsfw: bool) -> Result<(), ServerError> {
        let mut server = self.get_or_register_server(guild_id).await?;
        if server.is_nsfw == is_nsfw {
            return Err(ServerError::NothingToChange(
                "The server's NSFW setting is already set to that.".to_string(),
            ));
        }

        server.is_nsfw = is_nsfw;
        self.store.update_server(&server).await
    }

    pub async fn set_suppress_permission_warnings(
        &self,
        guild_id: u64,
        suppress: bool,
    ) -> Result<(), ServerError> {
        let mut server = self.get_or_register_server(guild_id).await?;
        if server.suppress_permission_warnings == suppress {
            return Err(ServerError::NothingToChange(
                "Permission warning suppression is already set to that.".to_string(),
            ));
        }

        server.suppress_permission_warnings = suppress;
        self.store.update_server(&server).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dashmap::DashMap;
    use std::sync::atomic::{AtomicI64, Ordering};

    struct MockServerStore {
        servers: DashMap<u64, Server>,
        next_id: AtomicI64,
    }

    impl MockServerStore {
        fn new() -> Self {
            Self {
                servers: DashMap::new(),
                next_id: AtomicI64::new(1),
            }
        }
    }

    #[async_trait]
    impl ServerStore for MockServerStore {
        async fn get_server(&self, discord_id: u64) -> Result<Option<Server>, ServerError> {
            Ok(self.servers.get(&discord_id).map(|s| s.clone()))
        }

        async fn insert_server(&self, discord_id: u64) -> Result<Server, ServerError> {
            let server = Server {
                id: self.next_id.fetch_add(1, Ordering::SeqCst),
                discord_id,
                description: None,
                join_message: None,
                is_nsfw: false,
                send_join_message: false,
                suppress_permission_warnings: false,
            };
            self.servers.insert(discord_id, server.clone());
            Ok(server)
        }

        async fn update_server(&self, server: &Server) -> Result<(), ServerError> {
            self.servers.insert(server.discord_id, server.clone());
            Ok(())
        }
    }

    #[tokio::test]
    async fn registers_server_on_first_contact() {
        let service = ServerService::new(MockServerStore::new());

        let server = service.get_or_register_server(123).await.unwrap();
        assert_eq!(server.discord_id, 123);

        // A second call returns the same row
        let again = service.get_or_register_server(123).await.unwrap();
        assert_eq!(server.id, again.id);
    }

    #[tokio::test]
    async fn sets_description() {
        let service = ServerService::new(MockServerStore::new());

        service.set_description(123, "A cozy place").await.unwrap();

        let server = service.get_or_register_server(123).await.unwrap();
        assert_eq!(server.description.as_deref(), Some("A cozy place"));
    }

    #[tokio::test]
    async fn rejects_identical_description() {
        let service = ServerService::new(MockServerStore::new());

        service.set_description(123, "A cozy place").await.unwrap();
        let result = service.set_description(123, "A cozy place").await;

        assert!(matches!(result, Err(ServerError::NothingToChange(_))));
    }

    #[tokio::test]
    async fn rejects_overlong_join_message() {
        let service = ServerService::new(MockServerStore::new());

        let long = "x".repeat(MAX_SERVER_TEXT_LEN + 1);
        let result = service.set_join_message(123, &long).await;

        assert!(matches!(result, Err(ServerError::InvalidInput(_))));
    }

    #[tokio::test]
    async fn toggles_nsfw_flag() {
        let service = ServerService::new(MockServerStore::new());

        service.set_is_nsfw(123, true).await.unwrap();
        let server = service.get_or_register_server(123).await.unwrap();
        assert!(server.is_nsfw);

        // Setting it again is a no-op error
        assert!(service.set_is_nsfw(123, true).await.is_err());
    }
}
