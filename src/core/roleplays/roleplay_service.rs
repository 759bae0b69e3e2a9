// Roleplay management - core business logic for collaborative sessions.
//
// A roleplay is owned by a user, has a name unique per server, and tracks
// its participants and a transcript of logged messages. At most one
// roleplay can be active in a channel at a time.
//
// NO Discord dependencies here - just pure domain logic.

use super::roleplay_models::{
    ParticipantStatus, Roleplay, RoleplayMessage, RoleplayParticipant,
};
use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use thiserror::Error;

pub const MAX_SUMMARY_LEN: usize = 240;

#[derive(Debug, Error)]
pub enum RoleplayError {
    #[error("Storage error: {0}")]
    Storage(String),

    #[error("{0}")]
    InvalidInput(String),

    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    AlreadyExists(String),

    #[error("{0}")]
    NotAllowed(String),
}

/// Trait for persisting roleplays, participants, and transcripts.
#[async_trait]
pub trait RoleplayStore: Send + Sync {
    /// Insert a roleplay, returning it with its assigned row id.
    async fn insert_roleplay(&self, roleplay: Roleplay) -> Result<Roleplay, RoleplayError>;

    async fn update_roleplay(&self, roleplay: &Roleplay) -> Result<(), RoleplayError>;

    async fn delete_roleplay(&self, roleplay_id: i64) -> Result<(), RoleplayError>;

    async fn get_roleplay(&self, roleplay_id: i64) -> Result<Option<Roleplay>, RoleplayError>;

    async fn get_server_roleplays(&self, guild_id: u64) -> Result<Vec<Roleplay>, RoleplayError>;

    async fn get_participants(
        &self,
        roleplay_id: i64,
    ) -> Result<Vec<RoleplayParticipant>, RoleplayError>;

    /// Insert or update the status of a participant.
    async fn set_participant_status(
        &self,
        roleplay_id: i64,
        user_id: u64,
        status: ParticipantStatus,
    ) -> Result<(), RoleplayError>;

    /// Insert or update a logged message, keyed by its Discord message id.
    /// Returns true when a new row was created rather than updated.
    async fn upsert_message(&self, message: RoleplayMessage) -> Result<bool, RoleplayError>;

    /// The transcript in chronological order.
    async fn get_messages(&self, roleplay_id: i64) -> Result<Vec<RoleplayMessage>, RoleplayError>;
}

pub struct RoleplayService<S: RoleplayStore> {
    store: S,
}

impl<S: RoleplayStore> RoleplayService<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    pub async fn create_roleplay(
        &self,
        guild_id: u64,
        owner_id: u64,
        name: &str,
        summary: Option<&str>,
        is_nsfw: bool,
        is_public: bool,
    ) -> Result<Roleplay, RoleplayError> {
        if name.trim().is_empty() {
            return Err(RoleplayError::InvalidInput(
                "The name may not be empty.".to_string(),
            ));
        }

        if !self.is_name_unique(guild_id, name).await? {
            return Err(RoleplayError::AlreadyExists(
                "There's already a roleplay with that name on this server.".to_string(),
            ));
        }

        if let Some(summary) = summary {
            if summary.len() > MAX_SUMMARY_LEN {
                return Err(RoleplayError::InvalidInput(format!(
                    "The summary may not be longer than {} characters.",
                    MAX_SUMMARY_LEN
                )));
            }
        }

        let roleplay = Roleplay {
            id: 0,
            guild_id,
            owner_id,
            name: name.to_string(),
            summary: summary.map(|s| s.to_string()),
            is_active: false,
            is_public,
            is_nsfw,
            active_channel_id: None,
            dedicated_channel_id: None,
            last_updated: None,
        };

        let roleplay = self.store.insert_roleplay(roleplay).await?;

        // The owner participates in their own roleplay.
        self.store
            .set_participant_status(roleplay.id, owner_id, ParticipantStatus::Joined)
            .await?;

        Ok(roleplay)
    }

    pub async fn is_name_unique(&self, guild_id: u64, name: &str) -> Result<bool, RoleplayError> {
        let roleplays = self.store.get_server_roleplays(guild_id).await?;
        Ok(!roleplays.iter().any(|r| r.name.eq_ignore_ascii_case(name)))
    }

    pub async fn get_by_name(&self, guild_id: u64, name: &str) -> Result<Roleplay, RoleplayError> {
        let roleplays = self.store.get_server_roleplays(guild_id).await?;
        roleplays
            .into_iter()
            .find(|r| r.name.eq_ignore_ascii_case(name))
            .ok_or_else(|| {
                RoleplayError::NotFound("There's no roleplay with that name.".to_string())
            })
    }

    pub async fn get_server_roleplays(
        &self,
        guild_id: u64,
    ) -> Result<Vec<Roleplay>, RoleplayError> {
        self.store.get_server_roleplays(guild_id).await
    }

    pub async fn get_owned_roleplays(
        &self,
        guild_id: u64,
        owner_id: u64,
    ) -> Result<Vec<Roleplay>, RoleplayError> {
        let roleplays = self.store.get_server_roleplays(guild_id).await?;
        Ok(roleplays
            .into_iter()
            .filter(|r| r.owner_id == owner_id)
            .collect())
    }

    /// The roleplay currently running in a channel, if any.
    pub async fn get_active_in_channel(
        &self,
        guild_id: u64,
        channel_id: u64,
    ) -> Result<Option<Roleplay>, RoleplayError> {
        let roleplays = self.store.get_server_roleplays(guild_id).await?;
        Ok(roleplays
            .into_iter()
            .find(|r| r.is_active && r.active_channel_id == Some(channel_id)))
    }

    pub async fn delete_roleplay(&self, roleplay: &Roleplay) -> Result<(), RoleplayError> {
        self.store.delete_roleplay(roleplay.id).await
    }

    pub async fn get_participants(
        &self,
        roleplay: &Roleplay,
    ) -> Result<Vec<RoleplayParticipant>, RoleplayError> {
        self.store.get_participants(roleplay.id).await
    }

    pub async fn is_participant(
        &self,
        roleplay: &Roleplay,
        user_id: u64,
    ) -> Result<bool, RoleplayError> {
        let participants = self.store.get_participants(roleplay.id).await?;
        Ok(participants
            .iter()
            .any(|p| p.user_id == user_id && p.status == ParticipantStatus::Joined))
    }

    pub async fn invite_user(
        &self,
        roleplay: &Roleplay,
        user_id: u64,
    ) -> Result<(), RoleplayError> {
        let participants = self.store.get_participants(roleplay.id).await?;
        match participants.iter().find(|p| p.user_id == user_id) {
            Some(p) if p.status == ParticipantStatus::Joined => {
                return Err(RoleplayError::InvalidInput(
                    "The user is already in the roleplay.".to_string(),
                ))
            }
            Some(p) if p.status == ParticipantStatus::Invited => {
                return Err(RoleplayError::InvalidInput(
                    "The user has already been invited.".to_string(),
                ))
            }
            _ => {}
        }

        self.store
            .set_participant_status(roleplay.id, user_id, ParticipantStatus::Invited)
            .await
    }

    pub async fn join_roleplay(
        &self,
        roleplay: &Roleplay,
        user_id: u64,
    ) -> Result<(), RoleplayError> {
        let participants = self.store.get_participants(roleplay.id).await?;
        let existing = participants.iter().find(|p| p.user_id == user_id);

        match existing.map(|p| p.status) {
            Some(ParticipantStatus::Joined) => {
                return Err(RoleplayError::InvalidInput(
                    "You're already in that roleplay.".to_string(),
                ))
            }
            Some(ParticipantStatus::Kicked) => {
                return Err(RoleplayError::NotAllowed(
                    "You've been kicked from that roleplay and must be re-invited.".to_string(),
                ))
            }
            Some(ParticipantStatus::Invited) | Some(ParticipantStatus::Left) => {}
            None => {
                if !roleplay.is_public {
                    return Err(RoleplayError::NotAllowed(
                        "That roleplay is invite-only.".to_string(),
                    ));
                }
            }
        }

        self.store
            .set_participant_status(roleplay.id, user_id, ParticipantStatus::Joined)
            .await
    }

    pub async fn leave_roleplay(
        &self,
        roleplay: &Roleplay,
        user_id: u64,
    ) -> Result<(), RoleplayError> {
        if roleplay.owner_id == user_id {
            return Err(RoleplayError::NotAllowed(
                "You can't leave a roleplay you own. Transfer it or delete it instead."
                    .to_string(),
            ));
        }

        if !self.is_participant(roleplay, user_id).await? {
            return Err(RoleplayError::InvalidInput(
                "You're not in that roleplay.".to_string(),
            ));
        }

        self.store
            .set_participant_status(roleplay.id, user_id, ParticipantStatus::Left)
            .await
    }

    /// Kicks a user out; they can't rejoin until re-invited.
    pub async fn kick_user(&self, roleplay: &Roleplay, user_id: u64) -> Result<(), RoleplayError> {
        if roleplay.owner_id == user_id {
            return Err(RoleplayError::NotAllowed(
                "The owner can't be kicked from their own roleplay.".to_string(),
            ));
        }

        let participants = self.store.get_participants(roleplay.id).await?;
        let is_present = participants.iter().any(|p| {
            p.user_id == user_id
                && matches!(
                    p.status,
                    ParticipantStatus::Joined | ParticipantStatus::Invited
                )
        });

        if !is_present {
            return Err(RoleplayError::InvalidInput(
                "The user isn't in that roleplay.".to_string(),
            ));
        }

        self.store
            .set_participant_status(roleplay.id, user_id, ParticipantStatus::Kicked)
            .await
    }

    /// Starts the roleplay in the given channel.
    ///
    /// `channel_is_nsfw` comes from the Discord channel; NSFW roleplays can
    /// only run in NSFW channels.
    pub async fn start_roleplay(
        &self,
        roleplay: &Roleplay,
        channel_id: u64,
        channel_is_nsfw: bool,
    ) -> Result<(), RoleplayError> {
        if roleplay.is_active && roleplay.active_channel_id == Some(channel_id) {
            return Err(RoleplayError::InvalidInput(
                "The roleplay is already running in this channel.".to_string(),
            ));
        }

        if roleplay.is_nsfw && !channel_is_nsfw {
            return Err(RoleplayError::NotAllowed(
                "NSFW roleplays can only be started in NSFW channels.".to_string(),
            ));
        }

        if let Some(other) = self
            .get_active_in_channel(roleplay.guild_id, channel_id)
            .await?
        {
            if other.id != roleplay.id {
                return Err(RoleplayError::NotAllowed(format!(
                    "\"{}\" is already running in this channel. Stop it first.",
                    other.name
                )));
            }
        }

        let mut updated = roleplay.clone();
        updated.is_active = true;
        updated.active_channel_id = Some(channel_id);
        updated.last_updated = Some(Utc::now());
        self.store.update_roleplay(&updated).await
    }

    pub async fn stop_roleplay(&self, roleplay: &Roleplay) -> Result<(), RoleplayError> {
        if !roleplay.is_active {
            return Err(RoleplayError::InvalidInput(
                "The roleplay isn't running.".to_string(),
            ));
        }

        let mut updated = roleplay.clone();
        updated.is_active = false;
        updated.active_channel_id = None;
        self.store.update_roleplay(&updated).await
    }

    pub async fn set_name(&self, roleplay: &Roleplay, name: &str) -> Result<(), RoleplayError> {
        if name.trim().is_empty() {
            return Err(RoleplayError::InvalidInput(
                "The name may not be empty.".to_string(),
            ));
        }

        if !self.is_name_unique(roleplay.guild_id, name).await? {
            return Err(RoleplayError::AlreadyExists(
                "There's already a roleplay with that name on this server.".to_string(),
            ));
        }

        let mut updated = roleplay.clone();
        updated.name = name.to_string();
        self.store.update_roleplay(&updated).await
    }

    pub async fn set_summary(
        &self,
        roleplay: &Roleplay,
        summary: &str,
    ) -> Result<(), RoleplayError> {
        if summary.len() > MAX_SUMMARY_LEN {
            return Err(RoleplayError::InvalidInput(format!(
                "The summary may not be longer than {} characters.",
                MAX_SUMMARY_LEN
            )));
        }

        let mut updated = roleplay.clone();
        updated.summary = Some(summary.to_string());
        self.store.update_roleplay(&updated).await
    }

    pub async fn set_is_public(
        &self,
        roleplay: &Roleplay,
        is_public: bool,
    ) -> Result<(), RoleplayError> {
        if roleplay.is_public == is_public {
            return Err(RoleplayError::InvalidInput(
                "The roleplay's visibility is already set to that.".to_string(),
            ));
        }

        let mut updated = roleplay.clone();
        updated.is_public = is_public;
        self.store.update_roleplay(&updated).await
    }

    pub async fn set_is_nsfw(
        &self,
        roleplay: &Roleplay,
        is_nsfw: bool,
    ) -> Result<(), RoleplayError> {
        if roleplay.is_nsfw == is_nsfw {
            return Err(RoleplayError::InvalidInput(
                "The roleplay's NSFW setting is already set to that.".to_string(),
            ));
        }

        let mut updated = roleplay.clone();
        updated.is_nsfw = is_nsfw;
        self.store.update_roleplay(&updated).await
    }

    pub async fn set_dedicated_channel(
        &self,
        roleplay: &Roleplay,
        channel_id: u64,
    ) -> Result<(), RoleplayError> {
        let mut updated = roleplay.clone();
        updated.dedicated_channel_id = Some(channel_id);
        self.store.update_roleplay(&updated).await
    }

    pub async fn transfer_ownership(
        &self,
        roleplay: &Roleplay,
        new_owner_id: u64,
    ) -> Result<(), RoleplayError> {
        if roleplay.owner_id == new_owner_id {
            return Err(RoleplayError::InvalidInput(
                "That user already owns the roleplay.".to_string(),
            ));
        }

        let mut updated = roleplay.clone();
        updated.owner_id = new_owner_id;
        self.store.update_roleplay(&updated).await?;

        // New owners count as participants.
        self.store
            .set_participant_status(roleplay.id, new_owner_id, ParticipantStatus::Joined)
            .await
    }

    /// Captures a message into the transcript and refreshes the activity
    /// timestamp. Edits to an already-captured message replace its contents.
    pub async fn log_message(
        &self,
        roleplay: &Roleplay,
        discord_message_id: u64,
        author_id: u64,
        author_nickname: &str,
        contents: &str,
    ) -> Result<(), RoleplayError> {
        let message = RoleplayMessage {
            roleplay_id: roleplay.id,
            discord_message_id,
            author_id,
            author_nickname: author_nickname.to_string(),
            timestamp: Utc::now(),
            contents: contents.to_string(),
        };

        self.store.upsert_message(message).await?;

        let mut updated = roleplay.clone();
        updated.last_updated = Some(Utc::now());
        self.store.update_roleplay(&updated).await
    }

    /// The transcript, newest last. Non-public roleplays are only readable
    /// by participants.
    pub async fn get_transcript(
        &self,
        roleplay: &Roleplay,
        requester_id: u64,
    ) -> Result<Vec<RoleplayMessage>, RoleplayError> {
        if !roleplay.is_public && !self.is_participant(roleplay, requester_id).await? {
            return Err(RoleplayError::NotAllowed(
                "You can't replay a private roleplay you're not part of.".to_string(),
            ));
        }

        self.store.get_messages(roleplay.id).await
    }

    /// Renders the transcript as a plaintext export.
    pub async fn export_transcript(
        &self,
        roleplay: &Roleplay,
        requester_id: u64,
    ) -> Result<String, RoleplayError> {
        let messages = self.get_transcript(roleplay, requester_id).await?;

        let mut output = String::new();
        output.push_str(&format!("{}\n", roleplay.name));
        if let Some(summary) = &roleplay.summary {
            output.push_str(&format!("{}\n", summary));
        }
        output.push('\n');

        for message in messages {
            output.push_str(&format!(
                "[{}] {}: {}\n",
                message.timestamp.format("%Y-%m-%d %H:%M:%S"),
                message.author_nickname,
                message.contents
            ));
        }

        Ok(output)
    }

    /// Active roleplays that haven't seen a message for longer than
    /// `max_idle`. Used by the timeout sweep.
    pub async fn get_timed_out_roleplays(
        &self,
        guild_id: u64,
        now: DateTime<Utc>,
        max_idle: Duration,
    ) -> Result<Vec<Roleplay>, RoleplayError> {
        let roleplays = self.store.get_server_roleplays(guild_id).await?;
        Ok(roleplays
            .into_iter()
            .filter(|r| r.is_active)
            .filter(|r| match r.last_updated {
                Some(last) => now - last > max_idle,
                None => false,
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dashmap::DashMap;
    use std::sync::atomic::{AtomicI64, Ordering};

    struct MockRoleplayStore {
        roleplays: DashMap<i64, Roleplay>,
        participants: DashMap<(i64, u64), ParticipantStatus>,
        messages: DashMap<(i64, u64), RoleplayMessage>,
        next_id: AtomicI64,
    }

    impl MockRoleplayStore {
        fn new() -> Self {
            Self {
                roleplays: DashMap::new(),
                participants: DashMap::new(),
                messages: DashMap::new(),
                next_id: AtomicI64::new(1),
            }
        }
    }

    #[async_trait]
    impl RoleplayStore for MockRoleplayStore {
        async fn insert_roleplay(&self, mut roleplay: Roleplay) -> Result<Roleplay, RoleplayError> {
            roleplay.id = self.next_id.fetch_add(1, Ordering::SeqCst);
            self.roleplays.insert(roleplay.id, roleplay.clone());
            Ok(roleplay)
        }

        async fn update_roleplay(&self, roleplay: &Roleplay) -> Result<(), RoleplayError> {
            self.roleplays.insert(roleplay.id, roleplay.clone());
            Ok(())
        }

        async fn delete_roleplay(&self, roleplay_id: i64) -> Result<(), RoleplayError> {
            self.roleplays.remove(&roleplay_id);
            Ok(())
        }

        async fn get_roleplay(&self, roleplay_id: i64) -> Result<Option<Roleplay>, RoleplayError> {
            Ok(self.roleplays.get(&roleplay_id).map(|r| r.clone()))
        }

        async fn get_server_roleplays(
            &self,
            guild_id: u64,
        ) -> Result<Vec<Roleplay>, RoleplayError> {
            Ok(self
                .roleplays
                .iter()
                .filter(|r| r.guild_id == guild_id)
                .map(|r| r.clone())
                .collect())
        }

        async fn get_participants(
            &self,
            roleplay_id: i64,
        ) -> Result<Vec<RoleplayParticipant>, RoleplayError> {
            Ok(self
                .participants
                .iter()
                .filter(|e| e.key().0 == roleplay_id)
                .map(|e| RoleplayParticipant {
                    roleplay_id,
                    user_id: e.key().1,
                    status: *e.value(),
                })
                .collect())
        }

        async fn set_participant_status(
            &self,
            roleplay_id: i64,
            user_id: u64,
            status: ParticipantStatus,
        ) -> Result<(), RoleplayError> {
            self.participants.insert((roleplay_id, user_id), status);
            Ok(())
        }

        async fn upsert_message(&self, message: RoleplayMessage) -> Result<bool, RoleplayError> {
            let key = (message.roleplay_id, message.discord_message_id);
            let is_new = !self.messages.contains_key(&key);
            self.messages.insert(key, message);
            Ok(is_new)
        }

        async fn get_messages(
            &self,
            roleplay_id: i64,
        ) -> Result<Vec<RoleplayMessage>, RoleplayError> {
            let mut messages: Vec<_> = self
                .messages
                .iter()
                .filter(|m| m.roleplay_id == roleplay_id)
                .map(|m| m.clone())
                .collect();
            messages.sort_by_key(|m| m.timestamp);
            Ok(messages)
        }
    }

    fn service() -> RoleplayService<MockRoleplayStore> {
        RoleplayService::new(MockRoleplayStore::new())
    }

    #[tokio::test]
    async fn creates_roleplay_with_owner_as_participant() {
        let service = service();

        let rp = service
            .create_roleplay(1, 10, "The Tavern", None, false, true)
            .await
            .unwrap();

        assert!(service.is_participant(&rp, 10).await.unwrap());
    }

    #[tokio::test]
    async fn names_are_unique_per_server() {
        let service = service();

        service
            .create_roleplay(1, 10, "The Tavern", None, false, true)
            .await
            .unwrap();

        let result = service
            .create_roleplay(1, 11, "the tavern", None, false, true)
            .await;
        assert!(matches!(result, Err(RoleplayError::AlreadyExists(_))));

        // Same name on a different server is fine
        assert!(service
            .create_roleplay(2, 11, "The Tavern", None, false, true)
            .await
            .is_ok());
    }

    #[tokio::test]
    async fn private_roleplays_require_an_invite() {
        let service = service();

        let rp = service
            .create_roleplay(1, 10, "Secret", None, false, false)
            .await
            .unwrap();

        let result = service.join_roleplay(&rp, 11).await;
        assert!(matches!(result, Err(RoleplayError::NotAllowed(_))));

        service.invite_user(&rp, 11).await.unwrap();
        assert!(service.join_roleplay(&rp, 11).await.is_ok());
    }

    #[tokio::test]
    async fn kicked_users_cannot_rejoin() {
        let service = service();

        let rp = service
            .create_roleplay(1, 10, "The Tavern", None, false, true)
            .await
            .unwrap();

        service.join_roleplay(&rp, 11).await.unwrap();
        service.kick_user(&rp, 11).await.unwrap();

        let result = service.join_roleplay(&rp, 11).await;
        assert!(matches!(result, Err(RoleplayError::NotAllowed(_))));

        // A fresh invite lets them back in
        service.invite_user(&rp, 11).await.unwrap();
        assert!(service.join_roleplay(&rp, 11).await.is_ok());
    }

    #[tokio::test]
    async fn one_active_roleplay_per_channel() {
        let service = service();

        let first = service
            .create_roleplay(1, 10, "First", None, false, true)
            .await
            .unwrap();
        let second = service
            .create_roleplay(1, 10, "Second", None, false, true)
            .await
            .unwrap();

        service.start_roleplay(&first, 500, false).await.unwrap();

        let result = service.start_roleplay(&second, 500, false).await;
        assert!(matches!(result, Err(RoleplayError::NotAllowed(_))));
    }

    #[tokio::test]
    async fn nsfw_roleplays_need_nsfw_channels() {
        let service = service();

        let rp = service
            .create_roleplay(1, 10, "Spicy", None, true, true)
            .await
            .unwrap();

        assert!(service.start_roleplay(&rp, 500, false).await.is_err());
        assert!(service.start_roleplay(&rp, 500, true).await.is_ok());
    }

    #[tokio::test]
    async fn stopping_clears_the_active_channel() {
        let service = service();

        let rp = service
            .create_roleplay(1, 10, "The Tavern", None, false, true)
            .await
            .unwrap();
        service.start_roleplay(&rp, 500, false).await.unwrap();

        let started = service.get_by_name(1, "The Tavern").await.unwrap();
        service.stop_roleplay(&started).await.unwrap();

        let stopped = service.get_by_name(1, "The Tavern").await.unwrap();
        assert!(!stopped.is_active);
        assert_eq!(stopped.active_channel_id, None);
    }

    #[tokio::test]
    async fn logging_refreshes_last_updated() {
        let service = service();

        let rp = service
            .create_roleplay(1, 10, "The Tavern", None, false, true)
            .await
            .unwrap();
        assert!(rp.last_updated.is_none());

        service
            .log_message(&rp, 9001, 10, "Amby", "Hello there")
            .await
            .unwrap();

        let updated = service.get_by_name(1, "The Tavern").await.unwrap();
        assert!(updated.last_updated.is_some());
    }

    #[tokio::test]
    async fn edits_replace_logged_messages() {
        let service = service();

        let rp = service
            .create_roleplay(1, 10, "The Tavern", None, false, true)
            .await
            .unwrap();

        service
            .log_message(&rp, 9001, 10, "Amby", "Hello tehre")
            .await
            .unwrap();
        service
            .log_message(&rp, 9001, 10, "Amby", "Hello there")
            .await
            .unwrap();

        let transcript = service.get_transcript(&rp, 10).await.unwrap();
        assert_eq!(transcript.len(), 1);
        assert_eq!(transcript[0].contents, "Hello there");
    }

    #[tokio::test]
    async fn private_transcripts_are_participant_only() {
        let service = service();

        let rp = service
            .create_roleplay(1, 10, "Secret", None, false, false)
            .await
            .unwrap();

        let result = service.get_transcript(&rp, 99).await;
        assert!(matches!(result, Err(RoleplayError::NotAllowed(_))));

        assert!(service.get_transcript(&rp, 10).await.is_ok());
    }

    #[tokio::test]
    async fn timeout_sweep_finds_idle_roleplays() {
        let service = service();

        let rp = service
            .create_roleplay(1, 10, "Idle", None, false, true)
            .await
            .unwrap();
        service.start_roleplay(&rp, 500, false).await.unwrap();

        // Not idle yet
        let now = Utc::now();
        let idle = service
            .get_timed_out_roleplays(1, now, Duration::hours(72))
            .await
            .unwrap();
        assert!(idle.is_empty());

        // 73 hours later it shows up
        let later = now + Duration::hours(73);
        let idle = service
            .get_timed_out_roleplays(1, later, Duration::hours(72))
            .await
            .unwrap();
        assert_eq!(idle.len(), 1);
    }
}
