// Autorole management - per-role condition sets and the confirmation
// queue for roles that need a moderator sign-off.
//
// Qualification itself is evaluated against a QualificationContext so
// this module stays free of Discord types.

use super::autorole_models::{AutoroleConfiguration, AutoroleConfirmation, ConfirmationStatus};
use super::conditions::{AutoroleCondition, QualificationContext};
use async_trait::async_trait;
use chrono::Utc;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AutoroleError {
    #[error("Storage error: {0}")]
    Storage(String),

    #[error("{0}")]
    InvalidInput(String),

    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    AlreadyExists(String),
}

/// Trait for persisting autorole configurations and confirmations.
#[async_trait]
pub trait AutoroleStore: Send + Sync {
    async fn get_autorole(
        &self,
        guild_id: u64,
        role_id: u64,
    ) -> Result<Option<AutoroleConfiguration>, AutoroleError>;

    async fn get_guild_autoroles(
        &self,
        guild_id: u64,
    ) -> Result<Vec<AutoroleConfiguration>, AutoroleError>;

    async fn insert_autorole(
        &self,
        autorole: &AutoroleConfiguration,
    ) -> Result<i64, AutoroleError>;

    /// Persists flags and the full condition set.
    async fn update_autorole(&self, autorole: &AutoroleConfiguration)
        -> Result<(), AutoroleError>;

    async fn delete_autorole(&self, autorole_id: i64) -> Result<(), AutoroleError>;

    async fn get_confirmation(
        &self,
        autorole_id: i64,
        user_id: u64,
    ) -> Result<Option<AutoroleConfirmation>, AutoroleError>;

    async fn get_pending_confirmations(
        &self,
        autorole_id: i64,
    ) -> Result<Vec<AutoroleConfirmation>, AutoroleError>;

    async fn insert_confirmation(
        &self,
        confirmation: &AutoroleConfirmation,
    ) -> Result<i64, AutoroleError>;

    async fn update_confirmation(
        &self,
        confirmation: &AutoroleConfirmation,
    ) -> Result<(), AutoroleError>;
}

pub struct AutoroleService<S: AutoroleStore> {
    store: S,
}

impl<S: AutoroleStore> AutoroleService<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    pub async fn get_autorole(
        &self,
        guild_id: u64,
        role_id: u64,
    ) -> Result<AutoroleConfiguration, AutoroleError> {
        self.store.get_autorole(guild_id, role_id).await?.ok_or_else(|| {
            AutoroleError::NotFound("No autorole configured for that role.".to_string())
        })
    }

    pub async fn get_guild_autoroles(
        &self,
        guild_id: u64,
    ) -> Result<Vec<AutoroleConfiguration>, AutoroleError> {
        self.store.get_guild_autoroles(guild_id).await
    }

    pub async fn create_autorole(
        &self,
        guild_id: u64,
        role_id: u64,
    ) -> Result<AutoroleConfiguration, AutoroleError> {
        if self.store.get_autorole(guild_id, role_id).await?.is_some() {
            return Err(AutoroleError::AlreadyExists(
                "An autorole is already configured for that role.".to_string(),
            ));
        }

        let mut autorole = AutoroleConfiguration::new(guild_id, role_id);
        autorole.id = self.store.insert_autorole(&autorole).await?;
        Ok(autorole)
    }

    pub async fn delete_autorole(
        &self,
        autorole: &AutoroleConfiguration,
    ) -> Result<(), AutoroleError> {
        self.store.delete_autorole(autorole.id).await
    }

    /// Enabling requires at least one condition, or the role would be
    /// granted to everyone.
    pub async fn enable_autorole(
        &self,
        autorole: &mut AutoroleConfiguration,
    ) -> Result<(), AutoroleError> {
        if autorole.is_enabled {
            return Err(AutoroleError::InvalidInput(
                "The autorole is already enabled.".to_string(),
            ));
        }

        if autorole.conditions.is_empty() {
            return Err(AutoroleError::InvalidInput(
                "The autorole needs at least one condition before it can be enabled."
                    .to_string(),
            ));
        }

        autorole.is_enabled = true;
        self.store.update_autorole(autorole).await
    }

    pub async fn disable_autorole(
        &self,
        autorole: &mut AutoroleConfiguration,
    ) -> Result<(), AutoroleError> {
        if !autorole.is_enabled {
            return Err(AutoroleError::InvalidInput(
                "The autorole is already disabled.".to_string(),
            ));
        }

        autorole.is_enabled = false;
        self.store.update_autorole(autorole).await
    }

    pub async fn set_requires_confirmation(
        &self,
        autorole: &mut AutoroleConfiguration,
        requires_confirmation: bool,
    ) -> Result<(), AutoroleError> {
        if autorole.requires_confirmation == requires_confirmation {
            return Err(AutoroleError::InvalidInput(
                "That's already the autorole's confirmation setting.".to_string(),
            ));
        }

        autorole.requires_confirmation = requires_confirmation;
        self.store.update_autorole(autorole).await
    }

    pub async fn add_condition(
        &self,
        autorole: &mut AutoroleConfiguration,
        condition: AutoroleCondition,
    ) -> Result<(), AutoroleError> {
        if autorole
            .conditions
            .iter()
            .any(|existing| existing.collides_with(&condition))
        {
            return Err(AutoroleError::AlreadyExists(
                "The autorole already has a condition of that type for that target."
                    .to_string(),
            ));
        }

        autorole.conditions.push(condition);
        self.store.update_autorole(autorole).await
    }

    /// Removes a condition by its position in the configured list.
    pub async fn remove_condition(
        &self,
        autorole: &mut AutoroleConfiguration,
        index: usize,
    ) -> Result<AutoroleCondition, AutoroleError> {
        if index >= autorole.conditions.len() {
            return Err(AutoroleError::NotFound(
                "The autorole doesn't have a condition with that ID.".to_string(),
            ));
        }

        let removed = autorole.conditions.remove(index);
        self.store.update_autorole(autorole).await?;
        Ok(removed)
    }

    /// Whether a user meets every configured condition. Disabled
    /// autoroles never qualify anyone.
    pub fn is_user_qualified(
        &self,
        autorole: &AutoroleConfiguration,
        context: &QualificationContext,
    ) -> bool {
        let now = Utc::now();
        autorole.is_enabled
            && !autorole.conditions.is_empty()
            && autorole
                .conditions
                .iter()
                .all(|c| c.is_fulfilled(context, now))
    }

    /// Queues a qualified user for manual sign-off. Idempotent per
    /// user and autorole.
    pub async fn get_or_create_confirmation(
        &self,
        autorole: &AutoroleConfiguration,
        user_id: u64,
    ) -> Result<AutoroleConfirmation, AutoroleError> {
        if let Some(existing) = self.store.get_confirmation(autorole.id, user_id).await? {
            return Ok(existing);
        }

        let mut confirmation = AutoroleConfirmation {
            id: 0,
            autorole_id: autorole.id,
            user_id,
            status: ConfirmationStatus::Pending,
        };
        confirmation.id = self.store.insert_confirmation(&confirmation).await?;
        Ok(confirmation)
    }

    pub async fn get_pending_confirmations(
        &self,
        autorole: &AutoroleConfiguration,
    ) -> Result<Vec<AutoroleConfirmation>, AutoroleError> {
        self.store.get_pending_confirmations(autorole.id).await
    }

    /// Marks a queued confirmation as affirmed or denied by a moderator.
    pub async fn set_confirmation(
        &self,
        autorole: &AutoroleConfiguration,
        user_id: u64,
        status: ConfirmationStatus,
    ) -> Result<AutoroleConfirmation, AutoroleError> {
        let mut confirmation = self
            .store
            .get_confirmation(autorole.id, user_id)
            .await?
            .ok_or_else(|| {
                AutoroleError::NotFound(
                    "The user doesn't have a pending confirmation for that autorole."
                        .to_string(),
                )
            })?;

        if confirmation.status == status {
            return Err(AutoroleError::InvalidInput(
                "The confirmation is already in that state.".to_string(),
            ));
        }

        confirmation.status = status;
        self.store.update_confirmation(&confirmation).await?;
        Ok(confirmation)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dashmap::DashMap;
    use std::sync::atomic::{AtomicI64, Ordering};

    #[derive(Default)]
    struct MockAutoroleStore {
        autoroles: DashMap<i64, AutoroleConfiguration>,
        confirmations: DashMap<i64, AutoroleConfirmation>,
        next_id: AtomicI64,
    }

    #[async_trait]
    impl AutoroleStore for MockAutoroleStore {
        async fn get_autorole(
            &self,
            guild_id: u64,
            role_id: u64,
        ) -> Result<Option<AutoroleConfiguration>, AutoroleError> {
            Ok(self
                .autoroles
                .iter()
                .find(|a| a.guild_id == guild_id && a.role_id == role_id)
                .map(|a| a.clone()))
        }

        async fn get_guild_autoroles(
            &self,
            guild_id: u64,
        ) -> Result<Vec<AutoroleConfiguration>, AutoroleError> {
            Ok(self
                .autoroles
                .iter()
                .filter(|a| a.guild_id == guild_id)
                .map(|a| a.clone())
                .collect())
        }

        async fn insert_autorole(
            &self,
            autorole: &AutoroleConfiguration,
        ) -> Result<i64, AutoroleError> {
            let id = self.next_id.fetch_add(1, Ordering::SeqCst) + 1;
            let mut stored = autorole.clone();
            stored.id = id;
            self.autoroles.insert(id, stored);
            Ok(id)
        }

        async fn update_autorole(
            &self,
            autorole: &AutoroleConfiguration,
        ) -> Result<(), AutoroleError> {
            self.autoroles.insert(autorole.id, autorole.clone());
            Ok(())
        }

        async fn delete_autorole(&self, autorole_id: i64) -> Result<(), AutoroleError> {
            self.autoroles.remove(&autorole_id);
            Ok(())
        }

        async fn get_confirmation(
            &self,
            autorole_id: i64,
            user_id: u64,
        ) -> Result<Option<AutoroleConfirmation>, AutoroleError> {
            Ok(self
                .confirmations
                .iter()
                .find(|c| c.autorole_id == autorole_id && c.user_id == user_id)
                .map(|c| c.clone()))
        }

        async fn get_pending_confirmations(
            &self,
            autorole_id: i64,
        ) -> Result<Vec<AutoroleConfirmation>, AutoroleError> {
            Ok(self
                .confirmations
                .iter()
                .filter(|c| {
                    c.autorole_id == autorole_id && c.status == ConfirmationStatus::Pending
                })
                .map(|c| c.clone())
                .collect())
        }

        async fn insert_confirmation(
            &self,
            confirmation: &AutoroleConfirmation,
        ) -> Result<i64, AutoroleError> {
            let id = self.next_id.fetch_add(1, Ordering::SeqCst) + 1;
            let mut stored = confirmation.clone();
            stored.id = id;
            self.confirmations.insert(id, stored);
            Ok(id)
        }

        async fn update_confirmation(
            &self,
            confirmation: &AutoroleConfirmation,
        ) -> Result<(), AutoroleError> {
            self.confirmations.insert(confirmation.id, confirmation.clone());
            Ok(())
        }
    }

    fn service() -> AutoroleService<MockAutoroleStore> {
        AutoroleService::new(MockAutoroleStore::default())
    }

    #[tokio::test]
    async fn one_autorole_per_role() {
        let service = service();

        service.create_autorole(1, 100).await.unwrap();
        let result = service.create_autorole(1, 100).await;
        assert!(matches!(result, Err(AutoroleError::AlreadyExists(_))));

        // Same role id in a different guild is fine
        service.create_autorole(2, 100).await.unwrap();
    }

    #[tokio::test]
    async fn enabling_requires_conditions() {
        let service = service();
        let mut autorole = service.create_autorole(1, 100).await.unwrap();

        let result = service.enable_autorole(&mut autorole).await;
        assert!(matches!(result, Err(AutoroleError::InvalidInput(_))));

        service
            .add_condition(
                &mut autorole,
                AutoroleCondition::MessageCountInGuild { count: 10 },
            )
            .await
            .unwrap();
        service.enable_autorole(&mut autorole).await.unwrap();
        assert!(autorole.is_enabled);
    }

    #[tokio::test]
    async fn duplicate_conditions_are_rejected() {
        let service = service();
        let mut autorole = service.create_autorole(1, 100).await.unwrap();

        service
            .add_condition(
                &mut autorole,
                AutoroleCondition::MessageCountInGuild { count: 10 },
            )
            .await
            .unwrap();

        let result = service
            .add_condition(
                &mut autorole,
                AutoroleCondition::MessageCountInGuild { count: 20 },
            )
            .await;
        assert!(matches!(result, Err(AutoroleError::AlreadyExists(_))));

        // Different target, same kind, is allowed
        service
            .add_condition(
                &mut autorole,
                AutoroleCondition::HasRole { role_id: 5 },
            )
            .await
            .unwrap();
        service
            .add_condition(
                &mut autorole,
                AutoroleCondition::HasRole { role_id: 6 },
            )
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn qualification_requires_all_conditions() {
        let service = service();
        let mut autorole = service.create_autorole(1, 100).await.unwrap();

        service
            .add_condition(
                &mut autorole,
                AutoroleCondition::MessageCountInGuild { count: 5 },
            )
            .await
            .unwrap();
        service
            .add_condition(
                &mut autorole,
                AutoroleCondition::HasRole { role_id: 7 },
            )
            .await
            .unwrap();
        service.enable_autorole(&mut autorole).await.unwrap();

        let mut context = QualificationContext::default();
        context.statistics.total_message_count = 10;
        assert!(!service.is_user_qualified(&autorole, &context));

        context.role_ids.push(7);
        assert!(service.is_user_qualified(&autorole, &context));

        service.disable_autorole(&mut autorole).await.unwrap();
        assert!(!service.is_user_qualified(&autorole, &context));
    }

    #[tokio::test]
    async fn confirmation_queue_flow() {
        let service = service();
        let autorole = service.create_autorole(1, 100).await.unwrap();

        let first = service
            .get_or_create_confirmation(&autorole, 10)
            .await
            .unwrap();
        let second = service
            .get_or_create_confirmation(&autorole, 10)
            .await
            .unwrap();
        assert_eq!(first.id, second.id);

        let pending = service.get_pending_confirmations(&autorole).await.unwrap();
        assert_eq!(pending.len(), 1);

        let affirmed = service
            .set_confirmation(&autorole, 10, ConfirmationStatus::Affirmed)
            .await
            .unwrap();
        assert_eq!(affirmed.status, ConfirmationStatus::Affirmed);

        let pending = service.get_pending_confirmations(&autorole).await.unwrap();
        assert!(pending.is_empty());
    }

    #[tokio::test]
    async fn denied_users_leave_the_queue_but_stay_recorded() {
        let service = service();
        let autorole = service.create_autorole(1, 100).await.unwrap();

        service
            .get_or_create_confirmation(&autorole, 10)
            .await
            .unwrap();
        service
            .set_confirmation(&autorole, 10, ConfirmationStatus::Denied)
            .await
            .unwrap();

        let pending = service.get_pending_confirmations(&autorole).await.unwrap();
        assert!(pending.is_empty());

        // Qualifying again must not put the denied user back in the queue.
        let requeued = service
            .get_or_create_confirmation(&autorole, 10)
            .await
            .unwrap();
        assert_eq!(requeued.status, ConfirmationStatus::Denied);
    }
}
