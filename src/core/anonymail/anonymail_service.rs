// Anonymous mail relay - named drop boxes that repost DMed messages
// into a server channel under a stable pseudonymous tag.
//
// The sender tag is derived from sha256("{mailbox_id}:{sender_id}"),
// so a moderator can block a repeat abuser by tag without the bot ever
// exposing who they are.
//
// NO Discord dependencies here - just pure domain logic.

use super::anonymail_models::{Mailbox, OutgoingMail};
use async_trait::async_trait;
use sha2::{Digest, Sha256};
use thiserror::Error;

pub const MAX_MAIL_LEN: usize = 1800;
pub const MAX_MAILBOX_NAME_LEN: usize = 50;

/// Hex characters of the identity hash shown as the sender tag.
const SENDER_TAG_LEN: usize = 8;

#[derive(Debug, Error)]
pub enum AnonymailError {
    #[error("Storage error: {0}")]
    Storage(String),

    #[error("{0}")]
    InvalidInput(String),

    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    AlreadyExists(String),

    #[error("{0}")]
    Blocked(String),
}

/// Trait for persisting mailboxes and sender blocks.
#[async_trait]
pub trait AnonymailStore: Send + Sync {
    /// Case-insensitive name lookup within a server.
    async fn get_mailbox(
        &self,
        guild_id: u64,
        name: &str,
    ) -> Result<Option<Mailbox>, AnonymailError>;

    async fn get_guild_mailboxes(&self, guild_id: u64) -> Result<Vec<Mailbox>, AnonymailError>;

    async fn insert_mailbox(&self, mailbox: &Mailbox) -> Result<i64, AnonymailError>;

    async fn delete_mailbox(&self, mailbox_id: i64) -> Result<(), AnonymailError>;

    async fn is_hash_blocked(
        &self,
        mailbox_id: i64,
        identity_hash: &str,
    ) -> Result<bool, AnonymailError>;

    async fn block_hash(&self, mailbox_id: i64, identity_hash: &str)
        -> Result<(), AnonymailError>;

    /// Returns true when a block existed and was removed.
    async fn unblock_hash(
        &self,
        mailbox_id: i64,
        identity_hash: &str,
    ) -> Result<bool, AnonymailError>;
}

pub struct AnonymailService<S: AnonymailStore> {
    store: S,
}

impl<S: AnonymailStore> AnonymailService<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    pub async fn get_mailbox(&self, guild_id: u64, name: &str) -> Result<Mailbox, AnonymailError> {
        self.store.get_mailbox(guild_id, name).await?.ok_or_else(|| {
            AnonymailError::NotFound("No mailbox with that name found.".to_string())
        })
    }

    pub async fn get_guild_mailboxes(&self, guild_id: u64) -> Result<Vec<Mailbox>, AnonymailError> {
        self.store.get_guild_mailboxes(guild_id).await
    }

    pub async fn create_mailbox(
        &self,
        guild_id: u64,
        name: &str,
        channel_id: u64,
    ) -> Result<Mailbox, AnonymailError> {
        let name = name.trim();
        if name.is_empty() {
            return Err(AnonymailError::InvalidInput(
                "The mailbox name must not be empty.".to_string(),
            ));
        }

        if name.len() > MAX_MAILBOX_NAME_LEN {
            return Err(AnonymailError::InvalidInput(format!(
                "The mailbox name must be at most {} characters.",
                MAX_MAILBOX_NAME_LEN
            )));
        }

        if self.store.get_mailbox(guild_id, name).await?.is_some() {
            return Err(AnonymailError::AlreadyExists(
                "A mailbox with that name already exists.".to_string(),
            ));
        }

        let mut mailbox = Mailbox {
            id: 0,
            guild_id,
            name: name.to_string(),
            channel_id,
        };
        mailbox.id = self.store.insert_mailbox(&mailbox).await?;
        Ok(mailbox)
    }

    pub async fn delete_mailbox(&self, mailbox: &Mailbox) -> Result<(), AnonymailError> {
        self.store.delete_mailbox(mailbox.id).await
    }

    /// The full identity hash of a sender within one mailbox.
    pub fn identity_hash(&self, mailbox: &Mailbox, sender_id: u64) -> String {
        let mut hasher = Sha256::new();
        hasher.update(format!("{}:{}", mailbox.id, sender_id).as_bytes());
        let digest = hasher.finalize();
        digest.iter().map(|b| format!("{:02x}", b)).collect()
    }

    /// Validates a piece of mail and produces the relay payload. The
    /// caller delivers it to `mail.channel_id`.
    pub async fn prepare_mail(
        &self,
        mailbox: &Mailbox,
        sender_id: u64,
        contents: &str,
    ) -> Result<OutgoingMail, AnonymailError> {
        let contents = contents.trim();
        if contents.is_empty() {
            return Err(AnonymailError::InvalidInput(
                "The mail must not be empty.".to_string(),
            ));
        }

        if contents.len() > MAX_MAIL_LEN {
            return Err(AnonymailError::InvalidInput(format!(
                "The mail must be at most {} characters.",
                MAX_MAIL_LEN
            )));
        }

        let hash = self.identity_hash(mailbox, sender_id);
        if self.store.is_hash_blocked(mailbox.id, &hash).await? {
            return Err(AnonymailError::Blocked(
                "You have been blocked from this mailbox.".to_string(),
            ));
        }

        Ok(OutgoingMail {
            channel_id: mailbox.channel_id,
            sender_tag: hash[..SENDER_TAG_LEN].to_string(),
            contents: contents.to_string(),
        })
    }

    /// Blocks a sender by their tag (a hash prefix shown in relayed
    /// mail) or full identity hash.
    pub async fn block_sender(
        &self,
        mailbox: &Mailbox,
        identity_hash: &str,
    ) -> Result<(), AnonymailError> {
        let identity_hash = normalize_hash(identity_hash)?;

        if self.store.is_hash_blocked(mailbox.id, &identity_hash).await? {
            return Err(AnonymailError::AlreadyExists(
                "That sender is already blocked.".to_string(),
            ));
        }

        self.store.block_hash(mailbox.id, &identity_hash).await
    }

    pub async fn unblock_sender(
        &self,
        mailbox: &Mailbox,
        identity_hash: &str,
    ) -> Result<(), AnonymailError> {
        let identity_hash = normalize_hash(identity_hash)?;

        if !self.store.unblock_hash(mailbox.id, &identity_hash).await? {
            return Err(AnonymailError::NotFound(
                "That sender isn't blocked.".to_string(),
            ));
        }

        Ok(())
    }
}

fn normalize_hash(value: &str) -> Result<String, AnonymailError> {
    let value = value.trim().to_ascii_lowercase();
    if value.len() < SENDER_TAG_LEN || !value.chars().all(|c| c.is_ascii_hexdigit()) {
        return Err(AnonymailError::InvalidInput(
            "That doesn't look like a sender tag.".to_string(),
        ));
    }

    Ok(value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use dashmap::DashMap;
    use std::sync::atomic::{AtomicI64, Ordering};

    #[derive(Default)]
    struct MockAnonymailStore {
        mailboxes: DashMap<i64, Mailbox>,
        // Blocks keyed on (mailbox, hash prefix or full hash)
        blocks: DashMap<(i64, String), ()>,
        next_id: AtomicI64,
    }

    #[async_trait]
    impl AnonymailStore for MockAnonymailStore {
        async fn get_mailbox(
            &self,
            guild_id: u64,
            name: &str,
        ) -> Result<Option<Mailbox>, AnonymailError> {
            Ok(self
                .mailboxes
                .iter()
                .find(|m| m.guild_id == guild_id && m.name.eq_ignore_ascii_case(name))
                .map(|m| m.clone()))
        }

        async fn get_guild_mailboxes(
            &self,
            guild_id: u64,
        ) -> Result<Vec<Mailbox>, AnonymailError> {
            Ok(self
                .mailboxes
                .iter()
                .filter(|m| m.guild_id == guild_id)
                .map(|m| m.clone())
                .collect())
        }

        async fn insert_mailbox(&self, mailbox: &Mailbox) -> Result<i64, AnonymailError> {
            let id = self.next_id.fetch_add(1, Ordering::SeqCst) + 1;
            let mut stored = mailbox.clone();
            stored.id = id;
            self.mailboxes.insert(id, stored);
            Ok(id)
        }

        async fn delete_mailbox(&self, mailbox_id: i64) -> Result<(), AnonymailError> {
            self.mailboxes.remove(&mailbox_id);
            Ok(())
        }

        async fn is_hash_blocked(
            &self,
            mailbox_id: i64,
            identity_hash: &str,
        ) -> Result<bool, AnonymailError> {
            Ok(self
                .blocks
                .iter()
                .any(|e| e.key().0 == mailbox_id && identity_hash.starts_with(&e.key().1)))
        }

        async fn block_hash(
            &self,
            mailbox_id: i64,
            identity_hash: &str,
        ) -> Result<(), AnonymailError> {
            self.blocks.insert((mailbox_id, identity_hash.to_string()), ());
            Ok(())
        }

        async fn unblock_hash(
            &self,
            mailbox_id: i64,
            identity_hash: &str,
        ) -> Result<bool, AnonymailError> {
            Ok(self
                .blocks
                .remove(&(mailbox_id, identity_hash.to_string()))
                .is_some())
        }
    }

    fn service() -> AnonymailService<MockAnonymailStore> {
        AnonymailService::new(MockAnonymailStore::default())
    }

    #[tokio::test]
    async fn mailbox_names_are_unique_per_server() {
        let service = service();

        service.create_mailbox(1, "confessions", 100).await.unwrap();
        let result = service.create_mailbox(1, "Confessions", 200).await;
        assert!(matches!(result, Err(AnonymailError::AlreadyExists(_))));

        // Same name on another server is fine
        service.create_mailbox(2, "confessions", 100).await.unwrap();
    }

    #[tokio::test]
    async fn sender_tags_are_stable_and_anonymous() {
        let service = service();
        let mailbox = service.create_mailbox(1, "confessions", 100).await.unwrap();

        let first = service.prepare_mail(&mailbox, 10, "hello").await.unwrap();
        let second = service.prepare_mail(&mailbox, 10, "again").await.unwrap();
        let other = service.prepare_mail(&mailbox, 11, "hello").await.unwrap();

        assert_eq!(first.sender_tag, second.sender_tag);
        assert_ne!(first.sender_tag, other.sender_tag);
        assert_eq!(first.channel_id, 100);

        // The tag must not leak the sender id
        assert!(!first.sender_tag.contains("10"));
        assert_eq!(first.sender_tag.len(), 8);
    }

    #[tokio::test]
    async fn blocked_senders_cannot_mail() {
        let service = service();
        let mailbox = service.create_mailbox(1, "confessions", 100).await.unwrap();

        let mail = service.prepare_mail(&mailbox, 10, "spam").await.unwrap();
        service.block_sender(&mailbox, &mail.sender_tag).await.unwrap();

        let result = service.prepare_mail(&mailbox, 10, "more spam").await;
        assert!(matches!(result, Err(AnonymailError::Blocked(_))));

        // Other senders are unaffected
        service.prepare_mail(&mailbox, 11, "hello").await.unwrap();

        service.unblock_sender(&mailbox, &mail.sender_tag).await.unwrap();
        service.prepare_mail(&mailbox, 10, "reformed").await.unwrap();
    }

    #[tokio::test]
    async fn malformed_tags_are_rejected() {
        let service = service();
        let mailbox = service.create_mailbox(1, "confessions", 100).await.unwrap();

        let result = service.block_sender(&mailbox, "not-a-tag").await;
        assert!(matches!(result, Err(AnonymailError::InvalidInput(_))));

        let result = service.block_sender(&mailbox, "ab12").await;
        assert!(matches!(result, Err(AnonymailError::InvalidInput(_))));
    }

    #[tokio::test]
    async fn mail_length_is_bounded() {
        let service = service();
        let mailbox = service.create_mailbox(1, "confessions", 100).await.unwrap();

        let result = service.prepare_mail(&mailbox, 10, "").await;
        assert!(matches!(result, Err(AnonymailError::InvalidInput(_))));

        let long = "a".repeat(MAX_MAIL_LEN + 1);
        let result = service.prepare_mail(&mailbox, 10, &long).await;
        assert!(matches!(result, Err(AnonymailError::InvalidInput(_))));
    }
}
