// Moderation service - core business logic for notes, warnings, and bans.
//
// This service handles:
// - Per-server moderation settings (log channels, warning threshold)
// - Moderator notes about users
// - Warnings and bans with optional expiry
//
// NO Discord dependencies here - just pure domain logic.

use super::moderation_models::{ModerationSettings, UserBan, UserNote, UserWarning};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use thiserror::Error;

pub const MAX_REASON_LEN: usize = 1000;

#[derive(Debug, Error)]
pub enum ModerationError {
    #[error("Storage error: {0}")]
    Storage(String),

    #[error("{0}")]
    InvalidInput(String),

    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    NothingToChange(String),
}

/// Trait for persisting moderation data.
#[async_trait]
pub trait ModerationStore: Send + Sync {
    async fn get_settings(
        &self,
        guild_id: u64,
    ) -> Result<Option<ModerationSettings>, ModerationError>;

    /// Insert or update the settings row for a guild.
    async fn save_settings(&self, settings: &ModerationSettings) -> Result<(), ModerationError>;

    /// Insert a note, returning it with its assigned row id.
    async fn insert_note(&self, note: UserNote) -> Result<UserNote, ModerationError>;

    async fn update_note(&self, note: &UserNote) -> Result<(), ModerationError>;

    async fn delete_note(&self, note_id: i64) -> Result<(), ModerationError>;

    async fn get_note(&self, note_id: i64) -> Result<Option<UserNote>, ModerationError>;

    async fn get_user_notes(
        &self,
        guild_id: u64,
        user_id: u64,
    ) -> Result<Vec<UserNote>, ModerationError>;

    /// Insert a warning, returning it with its assigned row id.
    async fn insert_warning(&self, warning: UserWarning) -> Result<UserWarning, ModerationError>;

    async fn update_warning(&self, warning: &UserWarning) -> Result<(), ModerationError>;

    async fn delete_warning(&self, warning_id: i64) -> Result<(), ModerationError>;

    async fn get_warning(&self, warning_id: i64) -> Result<Option<UserWarning>, ModerationError>;

    async fn get_guild_warnings(&self, guild_id: u64) -> Result<Vec<UserWarning>, ModerationError>;

    async fn get_user_warnings(
        &self,
        guild_id: u64,
        user_id: u64,
    ) -> Result<Vec<UserWarning>, ModerationError>;

    /// Insert a ban, returning it with its assigned row id.
    async fn insert_ban(&self, ban: UserBan) -> Result<UserBan, ModerationError>;

    async fn update_ban(&self, ban: &UserBan) -> Result<(), ModerationError>;

    async fn delete_ban(&self, ban_id: i64) -> Result<(), ModerationError>;

    async fn get_ban(&self, ban_id: i64) -> Result<Option<UserBan>, ModerationError>;

    async fn get_guild_bans(&self, guild_id: u64) -> Result<Vec<UserBan>, ModerationError>;

    async fn get_user_bans(
        &self,
        guild_id: u64,
        user_id: u64,
    ) -> Result<Vec<UserBan>, ModerationError>;
}

pub struct ModerationService<S: ModerationStore> {
    store: S,
}

impl<S: ModerationStore> ModerationService<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    // ------------------------------------------------------------------
    // Settings
    // ------------------------------------------------------------------

    pub async fn get_or_create_settings(
        &self,
        guild_id: u64,
    ) -> Result<ModerationSettings, ModerationError> {
        if let Some(settings) = self.store.get_settings(guild_id).await? {
            return Ok(settings);
        }

        let settings = ModerationSettings::new(guild_id);
        self.store.save_settings(&settings).await?;
        Ok(settings)
    }

    pub async fn set_moderation_log_channel(
        &self,
        guild_id: u64,
        channel_id: u64,
    ) -> Result<(), ModerationError> {
        let mut settings = self.get_or_create_settings(guild_id).await?;
        if settings.moderation_log_channel == Some(channel_id) {
            return Err(ModerationError::NothingToChange(
                "That's already the moderation log channel.".to_string(),
            ));
        }

        settings.moderation_log_channel = Some(channel_id);
        self.store.save_settings(&settings).await
    }

    pub async fn set_monitoring_channel(
        &self,
        guild_id: u64,
        channel_id: u64,
    ) -> Result<(), ModerationError> {
        let mut settings = self.get_or_create_settings(guild_id).await?;
        if settings.monitoring_channel == Some(channel_id) {
            return Err(ModerationError::NothingToChange(
                "That's already the monitoring channel.".to_string(),
            ));
        }

        settings.monitoring_channel = Some(channel_id);
        self.store.save_settings(&settings).await
    }

    pub async fn set_warning_threshold(
        &self,
        guild_id: u64,
        threshold: i32,
    ) -> Result<(), ModerationError> {
        if threshold < 1 {
            return Err(ModerationError::InvalidInput(
                "The warning threshold must be at least 1.".to_string(),
            ));
        }

        let mut settings = self.get_or_create_settings(guild_id).await?;
        if settings.warning_threshold == threshold {
            return Err(ModerationError::NothingToChange(format!(
                "The warning threshold is already {}.",
                threshold
            )));
        }

        settings.warning_threshold = threshold;
        self.store.save_settings(&settings).await
    }

    // ------------------------------------------------------------------
    // Notes
    // ------------------------------------------------------------------

    pub async fn add_note(
        &self,
        guild_id: u64,
        user_id: u64,
        author_id: u64,
        content: &str,
    ) -> Result<UserNote, ModerationError> {
        validate_text(content, "note")?;

        let now = Utc::now();
        let note = UserNote {
            id: 0,
            guild_id,
            user_id,
            author_id,
            content: content.to_string(),
            created_at: now,
            updated_at: now,
        };

        self.store.insert_note(note).await
    }

    pub async fn set_note_contents(
        &self,
        note: &UserNote,
        content: &str,
    ) -> Result<(), ModerationError> {
        validate_text(content, "note")?;

        if note.content == content {
            return Err(ModerationError::NothingToChange(
                "The note already says that.".to_string(),
            ));
        }

        let mut updated = note.clone();
        updated.content = content.to_string();
        updated.updated_at = Utc::now();
        self.store.update_note(&updated).await
    }

    pub async fn delete_note(&self, note: &UserNote) -> Result<(), ModerationError> {
        self.store.delete_note(note.id).await
    }

    pub async fn get_note(&self, note_id: i64) -> Result<UserNote, ModerationError> {
        self.store
            .get_note(note_id)
            .await?
            .ok_or_else(|| ModerationError::NotFound("There's no note with that ID.".to_string()))
    }

    pub async fn get_user_notes(
        &self,
        guild_id: u64,
        user_id: u64,
    ) -> Result<Vec<UserNote>, ModerationError> {
        self.store.get_user_notes(guild_id, user_id).await
    }

    // ------------------------------------------------------------------
    // Warnings
    // ------------------------------------------------------------------

    /// Issues a warning. The returned count is the user's total number of
    /// warnings after this one; callers compare it against the server's
    /// warning threshold.
    pub async fn add_warning(
        &self,
        guild_id: u64,
        user_id: u64,
        author_id: u64,
        reason: &str,
        message_id: Option<u64>,
        expires_on: Option<DateTime<Utc>>,
    ) -> Result<(UserWarning, usize), ModerationError> {
        validate_text(reason, "reason")?;

        if let Some(expiry) = expires_on {
            if expiry <= Utc::now() {
                return Err(ModerationError::InvalidInput(
                    "The expiry date must be in the future.".to_string(),
                ));
            }
        }

        let now = Utc::now();
        let warning = UserWarning {
            id: 0,
            guild_id,
            user_id,
            author_id,
            reason: reason.to_string(),
            message_id,
            expires_on,
            created_at: now,
            updated_at: now,
        };

        let warning = self.store.insert_warning(warning).await?;
        let count = self.store.get_user_warnings(guild_id, user_id).await?.len();

        Ok((warning, count))
    }

    pub async fn set_warning_reason(
        &self,
        warning: &UserWarning,
        reason: &str,
    ) -> Result<(), ModerationError> {
        validate_text(reason, "reason")?;

        if warning.reason == reason {
            return Err(ModerationError::NothingToChange(
                "The warning already has that reason.".to_string(),
            ));
        }

        let mut updated = warning.clone();
        updated.reason = reason.to_string();
        updated.updated_at = Utc::now();
        self.store.update_warning(&updated).await
    }

    pub async fn set_warning_expiry(
        &self,
        warning: &UserWarning,
        expires_on: Option<DateTime<Utc>>,
    ) -> Result<(), ModerationError> {
        if warning.expires_on == expires_on {
            return Err(ModerationError::NothingToChange(
                "The warning already expires then.".to_string(),
            ));
        }

        let mut updated = warning.clone();
        updated.expires_on = expires_on;
        updated.updated_at = Utc::now();
        self.store.update_warning(&updated).await
    }

    pub async fn delete_warning(&self, warning: &UserWarning) -> Result<(), ModerationError> {
        self.store.delete_warning(warning.id).await
    }

    pub async fn get_warning(&self, warning_id: i64) -> Result<UserWarning, ModerationError> {
        self.store.get_warning(warning_id).await?.ok_or_else(|| {
            ModerationError::NotFound("There's no warning with that ID.".to_string())
        })
    }

    pub async fn get_user_warnings(
        &self,
        guild_id: u64,
        user_id: u64,
    ) -> Result<Vec<UserWarning>, ModerationError> {
        self.store.get_user_warnings(guild_id, user_id).await
    }

    /// Temporary warnings in a guild whose expiry has passed.
    pub async fn get_expired_warnings(
        &self,
        guild_id: u64,
        now: DateTime<Utc>,
    ) -> Result<Vec<UserWarning>, ModerationError> {
        let warnings = self.store.get_guild_warnings(guild_id).await?;
        Ok(warnings.into_iter().filter(|w| w.is_expired(now)).collect())
    }

    // ------------------------------------------------------------------
    // Bans
    // ------------------------------------------------------------------

    pub async fn add_ban(
        &self,
        guild_id: u64,
        user_id: u64,
        author_id: u64,
        reason: &str,
        message_id: Option<u64>,
        expires_on: Option<DateTime<Utc>>,
    ) -> Result<UserBan, ModerationError> {
        validate_text(reason, "reason")?;

        if let Some(expiry) = expires_on {
            if expiry <= Utc::now() {
                return Err(ModerationError::InvalidInput(
                    "The expiry date must be in the future.".to_string(),
                ));
            }
        }

        let existing = self.store.get_user_bans(guild_id, user_id).await?;
        if !existing.is_empty() {
            return Err(ModerationError::InvalidInput(
                "The user is already banned.".to_string(),
            ));
        }

        let now = Utc::now();
        let ban = UserBan {
            id: 0,
            guild_id,
            user_id,
            author_id,
            reason: reason.to_string(),
            message_id,
            expires_on,
            created_at: now,
            updated_at: now,
        };

        self.store.insert_ban(ban).await
    }

    pub async fn set_ban_reason(&self, ban: &UserBan, reason: &str) -> Result<(), ModerationError> {
        validate_text(reason, "reason")?;

        if ban.reason == reason {
            return Err(ModerationError::NothingToChange(
                "The ban already has that reason.".to_string(),
            ));
        }

        let mut updated = ban.clone();
        updated.reason = reason.to_string();
        updated.updated_at = Utc::now();
        self.store.update_ban(&updated).await
    }

    pub async fn set_ban_expiry(
        &self,
        ban: &UserBan,
        expires_on: Option<DateTime<Utc>>,
    ) -> Result<(), ModerationError> {
        if ban.expires_on == expires_on {
            return Err(ModerationError::NothingToChange(
                "The ban already expires then.".to_string(),
            ));
        }

        let mut updated = ban.clone();
        updated.expires_on = expires_on;
        updated.updated_at = Utc::now();
        self.store.update_ban(&updated).await
    }

    pub async fn delete_ban(&self, ban: &UserBan) -> Result<(), ModerationError> {
        self.store.delete_ban(ban.id).await
    }

    pub async fn get_ban(&self, ban_id: i64) -> Result<UserBan, ModerationError> {
        self.store
            .get_ban(ban_id)
            .await?
            .ok_or_else(|| ModerationError::NotFound("There's no ban with that ID.".to_string()))
    }

    pub async fn get_user_bans(
        &self,
        guild_id: u64,
        user_id: u64,
    ) -> Result<Vec<UserBan>, ModerationError> {
        self.store.get_user_bans(guild_id, user_id).await
    }

    /// Temporary bans in a guild whose expiry has passed.
    pub async fn get_expired_bans(
        &self,
        guild_id: u64,
        now: DateTime<Utc>,
    ) -> Result<Vec<UserBan>, ModerationError> {
        let bans = self.store.get_guild_bans(guild_id).await?;
        Ok(bans.into_iter().filter(|b| b.is_expired(now)).collect())
    }
}

fn validate_text(text: &str, what: &str) -> Result<(), ModerationError> {
    if text.trim().is_empty() {
        return Err(ModerationError::InvalidInput(format!(
            "The {} may not be empty.",
            what
        )));
    }

    if text.len() > MAX_REASON_LEN {
        return Err(ModerationError::InvalidInput(format!(
            "The {} may not be longer than {} characters.",
            what, MAX_REASON_LEN
        )));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::moderation::moderation_models::DEFAULT_WARNING_THRESHOLD;
    use chrono::Duration;
    use dashmap::DashMap;
    use std::sync::atomic::{AtomicI64, Ordering};

    struct MockModerationStore {
        settings: DashMap<u64, ModerationSettings>,
        notes: DashMap<i64, UserNote>,
        warnings: DashMap<i64, UserWarning>,
        bans: DashMap<i64, UserBan>,
        next_id: AtomicI64,
    }

    impl MockModerationStore {
        fn new() -> Self {
            Self {
                settings: DashMap::new(),
                notes: DashMap::new(),
                warnings: DashMap::new(),
                bans: DashMap::new(),
                next_id: AtomicI64::new(1),
            }
        }
    }

    #[async_trait]
    impl ModerationStore for MockModerationStore {
        async fn get_settings(
            &self,
            guild_id: u64,
        ) -> Result<Option<ModerationSettings>, ModerationError> {
            Ok(self.settings.get(&guild_id).map(|s| s.clone()))
        }

        async fn save_settings(
            &self,
            settings: &ModerationSettings,
        ) -> Result<(), ModerationError> {
            self.settings.insert(settings.guild_id, settings.clone());
            Ok(())
        }

        async fn insert_note(&self, mut note: UserNote) -> Result<UserNote, ModerationError> {
            note.id = self.next_id.fetch_add(1, Ordering::SeqCst);
            self.notes.insert(note.id, note.clone());
            Ok(note)
        }

        async fn update_note(&self, note: &UserNote) -> Result<(), ModerationError> {
            self.notes.insert(note.id, note.clone());
            Ok(())
        }

        async fn delete_note(&self, note_id: i64) -> Result<(), ModerationError> {
            self.notes.remove(&note_id);
            Ok(())
        }

        async fn get_note(&self, note_id: i64) -> Result<Option<UserNote>, ModerationError> {
            Ok(self.notes.get(&note_id).map(|n| n.clone()))
        }

        async fn get_user_notes(
            &self,
            guild_id: u64,
            user_id: u64,
        ) -> Result<Vec<UserNote>, ModerationError> {
            Ok(self
                .notes
                .iter()
                .filter(|n| n.guild_id == guild_id && n.user_id == user_id)
                .map(|n| n.clone())
                .collect())
        }

        async fn insert_warning(
            &self,
            mut warning: UserWarning,
        ) -> Result<UserWarning, ModerationError> {
            warning.id = self.next_id.fetch_add(1, Ordering::SeqCst);
            self.warnings.insert(warning.id, warning.clone());
            Ok(warning)
        }

        async fn update_warning(&self, warning: &UserWarning) -> Result<(), ModerationError> {
            self.warnings.insert(warning.id, warning.clone());
            Ok(())
        }

        async fn delete_warning(&self, warning_id: i64) -> Result<(), ModerationError> {
            self.warnings.remove(&warning_id);
            Ok(())
        }

        async fn get_warning(
            &self,
            warning_id: i64,
        ) -> Result<Option<UserWarning>, ModerationError> {
            Ok(self.warnings.get(&warning_id).map(|w| w.clone()))
        }

        async fn get_guild_warnings(
            &self,
            guild_id: u64,
        ) -> Result<Vec<UserWarning>, ModerationError> {
            Ok(self
                .warnings
                .iter()
                .filter(|w| w.guild_id == guild_id)
                .map(|w| w.clone())
                .collect())
        }

        async fn get_user_warnings(
            &self,
            guild_id: u64,
            user_id: u64,
        ) -> Result<Vec<UserWarning>, ModerationError> {
            Ok(self
                .warnings
                .iter()
                .filter(|w| w.guild_id == guild_id && w.user_id == user_id)
                .map(|w| w.clone())
                .collect())
        }

        async fn insert_ban(&self, mut ban: UserBan) -> Result<UserBan, ModerationError> {
            ban.id = self.next_id.fetch_add(1, Ordering::SeqCst);
            self.bans.insert(ban.id, ban.clone());
            Ok(ban)
        }

        async fn update_ban(&self, ban: &UserBan) -> Result<(), ModerationError> {
            self.bans.insert(ban.id, ban.clone());
            Ok(())
        }

        async fn delete_ban(&self, ban_id: i64) -> Result<(), ModerationError> {
            self.bans.remove(&ban_id);
            Ok(())
        }

        async fn get_ban(&self, ban_id: i64) -> Result<Option<UserBan>, ModerationError> {
            Ok(self.bans.get(&ban_id).map(|b| b.clone()))
        }

        async fn get_guild_bans(&self, guild_id: u64) -> Result<Vec<UserBan>, ModerationError> {
            Ok(self
                .bans
                .iter()
                .filter(|b| b.guild_id == guild_id)
                .map(|b| b.clone())
                .collect())
        }

        async fn get_user_bans(
            &self,
            guild_id: u64,
            user_id: u64,
        ) -> Result<Vec<UserBan>, ModerationError> {
            Ok(self
                .bans
                .iter()
                .filter(|b| b.guild_id == guild_id && b.user_id == user_id)
                .map(|b| b.clone())
                .collect())
        }
    }

    fn service() -> ModerationService<MockModerationStore> {
        ModerationService::new(MockModerationStore::new())
    }

    #[tokio::test]
    async fn creates_settings_on_first_access() {
        let service = service();

        let settings = service.get_or_create_settings(1).await.unwrap();
        assert_eq!(settings.warning_threshold, DEFAULT_WARNING_THRESHOLD);
    }

    #[tokio::test]
    async fn rejects_identical_log_channel() {
        let service = service();

        service.set_moderation_log_channel(1, 500).await.unwrap();
        let result = service.set_moderation_log_channel(1, 500).await;

        assert!(matches!(result, Err(ModerationError::NothingToChange(_))));
    }

    #[tokio::test]
    async fn warning_count_accumulates() {
        let service = service();

        let (_, count) = service
            .add_warning(1, 10, 99, "Spamming", None, None)
            .await
            .unwrap();
        assert_eq!(count, 1);

        let (_, count) = service
            .add_warning(1, 10, 99, "Still spamming", None, None)
            .await
            .unwrap();
        assert_eq!(count, 2);
    }

    #[tokio::test]
    async fn rejects_warning_with_past_expiry() {
        let service = service();

        let yesterday = Utc::now() - Duration::days(1);
        let result = service
            .add_warning(1, 10, 99, "Spamming", None, Some(yesterday))
            .await;

        assert!(matches!(result, Err(ModerationError::InvalidInput(_))));
    }

    #[tokio::test]
    async fn finds_expired_warnings() {
        let service = service();

        let soon = Utc::now() + Duration::seconds(30);
        service
            .add_warning(1, 10, 99, "Temporary", None, Some(soon))
            .await
            .unwrap();
        service
            .add_warning(1, 11, 99, "Permanent", None, None)
            .await
            .unwrap();

        let now = Utc::now();
        assert!(service
            .get_expired_warnings(1, now)
            .await
            .unwrap()
            .is_empty());

        let later = now + Duration::minutes(5);
        let expired = service.get_expired_warnings(1, later).await.unwrap();
        assert_eq!(expired.len(), 1);
        assert_eq!(expired[0].user_id, 10);
    }

    #[tokio::test]
    async fn rejects_double_ban() {
        let service = service();

        service
            .add_ban(1, 10, 99, "Being a menace", None, None)
            .await
            .unwrap();

        let result = service.add_ban(1, 10, 99, "Again", None, None).await;
        assert!(matches!(result, Err(ModerationError::InvalidInput(_))));
    }

    #[tokio::test]
    async fn expired_bans_show_up_in_sweep_query() {
        let service = service();

        let soon = Utc::now() + Duration::seconds(30);
        let ban = service
            .add_ban(1, 10, 99, "Cooling off", None, Some(soon))
            .await
            .unwrap();

        let later = Utc::now() + Duration::minutes(5);
        let expired = service.get_expired_bans(1, later).await.unwrap();
        assert_eq!(expired.len(), 1);
        assert_eq!(expired[0].id, ban.id);

        service.delete_ban(&ban).await.unwrap();
        let expired = service.get_expired_bans(1, later).await.unwrap();
        assert!(expired.is_empty());
    }

    #[tokio::test]
    async fn note_contents_can_be_amended() {
        let service = service();

        let note = service
            .add_note(1, 10, 99, "Keeps derailing threads")
            .await
            .unwrap();

        service
            .set_note_contents(&note, "Has improved lately")
            .await
            .unwrap();

        let updated = service.get_note(note.id).await.unwrap();
        assert_eq!(updated.content, "Has improved lately");
        assert!(updated.updated_at >= note.updated_at);
    }
}
