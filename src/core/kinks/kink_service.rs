// Kink preference tracking - core business logic.
//
// The catalogue is imported from F-List and shared; preferences are
// per-user rows referencing catalogue entries. Name lookups are fuzzy
// (best Levenshtein match), since names arrive via chat.
//
// NO Discord dependencies here - just pure domain logic.

use super::kink_models::{Kink, KinkCategory, KinkPreference, UserKink};
use super::matching;
use async_trait::async_trait;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum KinkError {
    #[error("Storage error: {0}")]
    Storage(String),

    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    AlreadyExists(String),
}

/// Trait for persisting the catalogue and user preferences.
#[async_trait]
pub trait KinkStore: Send + Sync {
    async fn get_all_kinks(&self) -> Result<Vec<Kink>, KinkError>;

    async fn get_kink_by_flist_id(&self, flist_id: i64) -> Result<Option<Kink>, KinkError>;

    async fn get_kinks_by_category(
        &self,
        category: KinkCategory,
    ) -> Result<Vec<Kink>, KinkError>;

    /// Insert or update a catalogue entry keyed by its F-List id. Returns
    /// true when the row was created or its contents changed.
    async fn upsert_kink(&self, kink: &Kink) -> Result<bool, KinkError>;

    async fn get_user_kinks(&self, user_id: u64) -> Result<Vec<UserKink>, KinkError>;

    /// Insert or update a preference row.
    async fn set_user_kink(
        &self,
        user_id: u64,
        kink_id: i64,
        preference: KinkPreference,
    ) -> Result<(), KinkError>;

    /// Remove all of a user's preference rows. Returns the number removed.
    async fn clear_user_kinks(&self, user_id: u64) -> Result<u64, KinkError>;
}

pub struct KinkService<S: KinkStore> {
    store: S,
}

impl<S: KinkStore> KinkService<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    /// Best fuzzy match for a kink name across the whole catalogue.
    pub async fn get_kink_by_name(&self, name: &str) -> Result<Kink, KinkError> {
        let kinks = self.store.get_all_kinks().await?;
        matching::best_match_by(&kinks, name, |k| &k.name)
            .cloned()
            .ok_or_else(|| KinkError::NotFound("The kink catalogue is empty.".to_string()))
    }

    pub async fn get_kink_by_flist_id(&self, flist_id: i64) -> Result<Kink, KinkError> {
        self.store
            .get_kink_by_flist_id(flist_id)
            .await?
            .ok_or_else(|| KinkError::NotFound("No kink with that ID found.".to_string()))
    }

    pub async fn get_kinks_by_category(
        &self,
        category: KinkCategory,
    ) -> Result<Vec<Kink>, KinkError> {
        let kinks = self.store.get_kinks_by_category(category).await?;
        if kinks.is_empty() {
            return Err(KinkError::NotFound(
                "There are no kinks in that category.".to_string(),
            ));
        }

        Ok(kinks)
    }

    /// Categories that actually have catalogue entries, sorted.
    pub async fn get_categories(&self) -> Result<Vec<KinkCategory>, KinkError> {
        let kinks = self.store.get_all_kinks().await?;
        let mut categories: Vec<_> = kinks.iter().map(|k| k.category).collect();
        categories.sort();
        categories.dedup();
        Ok(categories)
    }

    pub async fn get_user_kinks(&self, user_id: u64) -> Result<Vec<UserKink>, KinkError> {
        self.store.get_user_kinks(user_id).await
    }

    pub async fn get_user_kinks_by_category(
        &self,
        user_id: u64,
        category: KinkCategory,
    ) -> Result<Vec<UserKink>, KinkError> {
        let mut kinks: Vec<_> = self
            .store
            .get_user_kinks(user_id)
            .await?
            .into_iter()
            .filter(|uk| uk.kink.category == category)
            .collect();
        kinks.sort_by(|a, b| a.kink.name.cmp(&b.kink.name));
        Ok(kinks)
    }

    /// A user's preference for the catalogue entry best matching `name`.
    pub async fn get_user_kink_by_name(
        &self,
        user_id: u64,
        name: &str,
    ) -> Result<UserKink, KinkError> {
        let user_kinks = self.store.get_user_kinks(user_id).await?;
        matching::best_match_by(&user_kinks, name, |uk| &uk.kink.name)
            .cloned()
            .ok_or_else(|| {
                KinkError::NotFound("The user doesn't have any set preferences.".to_string())
            })
    }

    /// Sets a user's preference for a kink, creating the row on first set.
    pub async fn set_preference(
        &self,
        user_id: u64,
        kink: &Kink,
        preference: KinkPreference,
    ) -> Result<(), KinkError> {
        self.store.set_user_kink(user_id, kink.id, preference).await
    }

    /// Removes all of a user's preferences. Returns the number removed.
    pub async fn reset_user_kinks(&self, user_id: u64) -> Result<u64, KinkError> {
        self.store.clear_user_kinks(user_id).await
    }

    /// Kinks both users have positive (favourite/like/maybe) preferences
    /// for.
    pub async fn get_overlap(
        &self,
        first_user: u64,
        second_user: u64,
    ) -> Result<Vec<Kink>, KinkError> {
        let first: Vec<_> = self
            .store
            .get_user_kinks(first_user)
            .await?
            .into_iter()
            .filter(|uk| uk.preference.is_positive())
            .collect();

        let second: Vec<_> = self
            .store
            .get_user_kinks(second_user)
            .await?
            .into_iter()
            .filter(|uk| uk.preference.is_positive())
            .collect();

        Ok(first
            .into_iter()
            .filter(|uk| second.iter().any(|other| other.kink.id == uk.kink.id))
            .map(|uk| uk.kink)
            .collect())
    }

    /// The first catalogue entry in a category the user hasn't set a real
    /// preference for. Drives the preference-setting wizard.
    pub async fn get_first_kink_without_preference(
        &self,
        user_id: u64,
        category: KinkCategory,
    ) -> Result<Kink, KinkError> {
        let kinks = self.get_kinks_by_category(category).await?;
        let user_kinks = self.get_user_kinks_by_category(user_id, category).await?;

        let unset = kinks.into_iter().find(|k| {
            user_kinks
                .iter()
                .find(|uk| uk.kink.id == k.id)
                .map(|uk| uk.preference == KinkPreference::NoPreference)
                .unwrap_or(true)
        });

        unset.ok_or_else(|| {
            KinkError::NotFound("No kink without a set preference found.".to_string())
        })
    }

    pub async fn get_first_kink_in_category(
        &self,
        category: KinkCategory,
    ) -> Result<Kink, KinkError> {
        let kinks = self.get_kinks_by_category(category).await?;
        Ok(kinks.into_iter().next().expect("category was non-empty"))
    }

    /// The entry following the given one within its category, by F-List
    /// id order.
    pub async fn get_next_kink_in_category(
        &self,
        preceding_flist_id: i64,
    ) -> Result<Kink, KinkError> {
        let current = self.get_kink_by_flist_id(preceding_flist_id).await?;
        let kinks = self.get_kinks_by_category(current.category).await?;

        kinks
            .into_iter()
            .skip_while(|k| k.flist_id != preceding_flist_id)
            .nth(1)
            .ok_or_else(|| {
                KinkError::NotFound(
                    "The current kink was the last one in the category.".to_string(),
                )
            })
    }

    /// Bulk-import catalogue entries, upserting by F-List id. Returns the
    /// number of new or changed rows.
    pub async fn update_kinks(&self, new_kinks: &[Kink]) -> Result<u64, KinkError> {
        let mut altered = 0;
        for kink in new_kinks {
            if self.store.upsert_kink(kink).await? {
                altered += 1;
            }
        }

        Ok(altered)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dashmap::DashMap;
    use std::sync::atomic::{AtomicI64, Ordering};

    struct MockKinkStore {
        kinks: DashMap<i64, Kink>,
        preferences: DashMap<(u64, i64), KinkPreference>,
        next_id: AtomicI64,
    }

    impl MockKinkStore {
        fn new() -> Self {
            Self {
                kinks: DashMap::new(),
                preferences: DashMap::new(),
                next_id: AtomicI64::new(1),
            }
        }
    }

    #[async_trait]
    impl KinkStore for MockKinkStore {
        async fn get_all_kinks(&self) -> Result<Vec<Kink>, KinkError> {
            let mut kinks: Vec<_> = self.kinks.iter().map(|k| k.clone()).collect();
            kinks.sort_by_key(|k| k.flist_id);
            Ok(kinks)
        }

        async fn get_kink_by_flist_id(&self, flist_id: i64) -> Result<Option<Kink>, KinkError> {
            Ok(self
                .kinks
                .iter()
                .find(|k| k.flist_id == flist_id)
                .map(|k| k.clone()))
        }

        async fn get_kinks_by_category(
            &self,
            category: KinkCategory,
        ) -> Result<Vec<Kink>, KinkError> {
            let mut kinks: Vec<_> = self
                .kinks
                .iter()
                .filter(|k| k.category == category)
                .map(|k| k.clone())
                .collect();
            kinks.sort_by_key(|k| k.flist_id);
            Ok(kinks)
        }

        async fn upsert_kink(&self, kink: &Kink) -> Result<bool, KinkError> {
            let existing = self
                .kinks
                .iter()
                .find(|k| k.flist_id == kink.flist_id)
                .map(|k| k.clone());

            match existing {
                Some(old) => {
                    if old.name == kink.name
                        && old.description == kink.description
                        && old.category == kink.category
                    {
                        return Ok(false);
                    }

                    let mut updated = kink.clone();
                    updated.id = old.id;
                    self.kinks.insert(old.id, updated);
                    Ok(true)
                }
                None => {
                    let mut inserted = kink.clone();
                    inserted.id = self.next_id.fetch_add(1, Ordering::SeqCst);
                    self.kinks.insert(inserted.id, inserted);
                    Ok(true)
                }
            }
        }

        async fn get_user_kinks(&self, user_id: u64) -> Result<Vec<UserKink>, KinkError> {
            Ok(self
                .preferences
                .iter()
                .filter(|e| e.key().0 == user_id)
                .filter_map(|e| {
                    self.kinks.get(&e.key().1).map(|k| UserKink {
                        user_id,
                        kink: k.clone(),
                        preference: *e.value(),
                    })
                })
                .collect())
        }

        async fn set_user_kink(
            &self,
            user_id: u64,
            kink_id: i64,
            preference: KinkPreference,
        ) -> Result<(), KinkError> {
            self.preferences.insert((user_id, kink_id), preference);
            Ok(())
        }

        async fn clear_user_kinks(&self, user_id: u64) -> Result<u64, KinkError> {
            let keys: Vec<_> = self
                .preferences
                .iter()
                .filter(|e| e.key().0 == user_id)
                .map(|e| *e.key())
                .collect();

            for key in &keys {
                self.preferences.remove(key);
            }

            Ok(keys.len() as u64)
        }
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

    async fn seeded_service() -> KinkService<MockKinkStore> {
        let service = KinkService::new(MockKinkStore::new());
        service
            .update_kinks(&[
                kink(1, "bondage", KinkCategory::General),
                kink(2, "petplay", KinkCategory::Roleplay),
                kink(3, "vore", KinkCategory::Themes),
                kink(4, "collars", KinkCategory::General),
            ])
            .await
            .unwrap();
        service
    }

    #[tokio::test]
    async fn fuzzy_lookup_tolerates_typos() {
        let service = seeded_service().await;

        let found = service.get_kink_by_name("bondoge").await.unwrap();
        assert_eq!(found.name, "bondage");
    }

    #[tokio::test]
    async fn import_is_idempotent() {
        let service = seeded_service().await;

        let altered = service
            .update_kinks(&[kink(1, "bondage", KinkCategory::General)])
            .await
            .unwrap();
        assert_eq!(altered, 0);

        // A changed description counts as an update
        let mut changed = kink(1, "bondage", KinkCategory::General);
        changed.description = "new text".to_string();
        let altered = service.update_kinks(&[changed]).await.unwrap();
        assert_eq!(altered, 1);
    }

    #[tokio::test]
    async fn preference_roundtrip() {
        let service = seeded_service().await;

        let bondage = service.get_kink_by_name("bondage").await.unwrap();
        service
            .set_preference(10, &bondage, KinkPreference::Favourite)
            .await
            .unwrap();

        let user_kink = service.get_user_kink_by_name(10, "bondage").await.unwrap();
        assert_eq!(user_kink.preference, KinkPreference::Favourite);
    }

    #[tokio::test]
    async fn overlap_requires_positive_preferences_on_both_sides() {
        let service = seeded_service().await;

        let bondage = service.get_kink_by_name("bondage").await.unwrap();
        let vore = service.get_kink_by_name("vore").await.unwrap();

        service
            .set_preference(10, &bondage, KinkPreference::Favourite)
            .await
            .unwrap();
        service
            .set_preference(10, &vore, KinkPreference::Like)
            .await
            .unwrap();

        service
            .set_preference(11, &bondage, KinkPreference::Maybe)
            .await
            .unwrap();
        service
            .set_preference(11, &vore, KinkPreference::No)
            .await
            .unwrap();

        let overlap = service.get_overlap(10, 11).await.unwrap();
        assert_eq!(overlap.len(), 1);
        assert_eq!(overlap[0].name, "bondage");
    }

    #[tokio::test]
    async fn reset_clears_preferences() {
        let service = seeded_service().await;

        let bondage = service.get_kink_by_name("bondage").await.unwrap();
        service
            .set_preference(10, &bondage, KinkPreference::Like)
            .await
            .unwrap();

        let removed = service.reset_user_kinks(10).await.unwrap();
        assert_eq!(removed, 1);
        assert!(service.get_user_kinks(10).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn wizard_skips_kinks_with_set_preferences() {
        let service = seeded_service().await;

        // General category has flist ids 1 (bondage) and 4 (collars)
        let bondage = service.get_kink_by_name("bondage").await.unwrap();
        service
            .set_preference(10, &bondage, KinkPreference::Like)
            .await
            .unwrap();

        let next = service
            .get_first_kink_without_preference(10, KinkCategory::General)
            .await
            .unwrap();
        assert_eq!(next.name, "collars");
    }

    #[tokio::test]
    async fn next_kink_walks_the_category() {
        let service = seeded_service().await;

        let next = service.get_next_kink_in_category(1).await.unwrap();
        assert_eq!(next.flist_id, 4);

        // collars is the last entry in General
        let result = service.get_next_kink_in_category(4).await;
        assert!(matches!(result, Err(KinkError::NotFound(_))));
    }
}
