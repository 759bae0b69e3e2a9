// Dossier management - titled PDF documents kept on disk, with their
// metadata in the database.
//
// Titles double as file names, so they are validated against path
// separators and must be unique (case-insensitive).
//
// NO Discord dependencies here - just pure domain logic.

use super::dossier_models::Dossier;
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use thiserror::Error;

pub const MAX_TITLE_LEN: usize = 100;
pub const MAX_SUMMARY_LEN: usize = 800;

#[derive(Debug, Error)]
pub enum DossierError {
    #[error("Storage error: {0}")]
    Storage(String),

    #[error("File error: {0}")]
    File(String),

    #[error("{0}")]
    InvalidInput(String),

    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    AlreadyExists(String),
}

/// Trait for persisting dossier metadata.
#[async_trait]
pub trait DossierStore: Send + Sync {
    async fn get_dossiers(&self) -> Result<Vec<Dossier>, DossierError>;

    /// Case-insensitive title lookup.
    async fn get_dossier_by_title(&self, title: &str) -> Result<Option<Dossier>, DossierError>;

    async fn insert_dossier(&self, dossier: &Dossier) -> Result<i64, DossierError>;

    async fn update_dossier(&self, dossier: &Dossier) -> Result<(), DossierError>;

    async fn delete_dossier(&self, dossier_id: i64) -> Result<(), DossierError>;
}

pub struct DossierService<S: DossierStore> {
    store: S,
    /// Directory the PDF files live in.
    base_path: PathBuf,
}

impl<S: DossierStore> DossierService<S> {
    pub fn new(store: S, base_path: impl Into<PathBuf>) -> Self {
        Self {
            store,
            base_path: base_path.into(),
        }
    }

    /// On-disk path of a dossier's PDF.
    pub fn get_dossier_data_path(&self, dossier: &Dossier) -> PathBuf {
        self.base_path.join(format!("{}.pdf", dossier.title))
    }

    pub async fn get_dossiers(&self) -> Result<Vec<Dossier>, DossierError> {
        self.store.get_dossiers().await
    }

    pub async fn get_dossier_by_title(&self, title: &str) -> Result<Dossier, DossierError> {
        self.store
            .get_dossier_by_title(title)
            .await?
            .ok_or_else(|| DossierError::NotFound("No dossier with that title found.".to_string()))
    }

    pub async fn create_dossier(&self, title: &str) -> Result<Dossier, DossierError> {
        let title = validate_title(title)?;

        if self.store.get_dossier_by_title(&title).await?.is_some() {
            return Err(DossierError::AlreadyExists(
                "A dossier with that title already exists.".to_string(),
            ));
        }

        let mut dossier = Dossier::new(title);
        dossier.id = self.store.insert_dossier(&dossier).await?;
        Ok(dossier)
    }

    /// Renames a dossier, moving its PDF if one has been uploaded.
    pub async fn set_dossier_title(
        &self,
        dossier: &mut Dossier,
        new_title: &str,
    ) -> Result<(), DossierError> {
        let new_title = validate_title(new_title)?;

        if dossier.title == new_title {
            return Err(DossierError::InvalidInput(
                "The dossier already has that title.".to_string(),
            ));
        }

        if let Some(existing) = self.store.get_dossier_by_title(&new_title).await? {
            if existing.id != dossier.id {
                return Err(DossierError::AlreadyExists(
                    "A dossier with that title already exists.".to_string(),
                ));
            }
        }

        let old_path = self.get_dossier_data_path(dossier);
        dossier.title = new_title;
        let new_path = self.get_dossier_data_path(dossier);

        if old_path.exists() {
            tokio::fs::rename(&old_path, &new_path)
                .await
                .map_err(|e| DossierError::File(e.to_string()))?;
        }

        self.store.update_dossier(dossier).await
    }

    pub async fn set_dossier_summary(
        &self,
        dossier: &mut Dossier,
        summary: &str,
    ) -> Result<(), DossierError> {
        let summary = summary.trim();
        if summary.is_empty() {
            return Err(DossierError::InvalidInput(
                "The summary must not be empty.".to_string(),
            ));
        }

        if summary.len() > MAX_SUMMARY_LEN {
            return Err(DossierError::InvalidInput(format!(
                "The summary must be at most {} characters.",
                MAX_SUMMARY_LEN
            )));
        }

        if dossier.summary == summary {
            return Err(DossierError::InvalidInput(
                "That's already the dossier's summary.".to_string(),
            ));
        }

        dossier.summary = summary.to_string();
        self.store.update_dossier(dossier).await
    }

    /// Writes the dossier's PDF contents, replacing any previous upload.
    pub async fn set_dossier_data(
        &self,
        dossier: &Dossier,
        data: &[u8],
    ) -> Result<(), DossierError> {
        if !data.starts_with(b"%PDF") {
            return Err(DossierError::InvalidInput(
                "The uploaded file doesn't look like a PDF.".to_string(),
            ));
        }

        tokio::fs::create_dir_all(&self.base_path)
            .await
            .map_err(|e| DossierError::File(e.to_string()))?;

        let path = self.get_dossier_data_path(dossier);
        tokio::fs::write(&path, data)
            .await
            .map_err(|e| DossierError::File(e.to_string()))
    }

    /// Reads the dossier's PDF contents, if uploaded.
    pub async fn get_dossier_data(&self, dossier: &Dossier) -> Result<Vec<u8>, DossierError> {
        let path = self.get_dossier_data_path(dossier);
        if !path.exists() {
            return Err(DossierError::NotFound(
                "The dossier doesn't have any uploaded data.".to_string(),
            ));
        }

        tokio::fs::read(&path)
            .await
            .map_err(|e| DossierError::File(e.to_string()))
    }

    /// Deletes the dossier and its PDF, if any.
    pub async fn delete_dossier(&self, dossier: &Dossier) -> Result<(), DossierError> {
        let path = self.get_dossier_data_path(dossier);
        if path.exists() {
            tokio::fs::remove_file(&path)
                .await
                .map_err(|e| DossierError::File(e.to_string()))?;
        }

        self.store.delete_dossier(dossier.id).await
    }
}

fn validate_title(title: &str) -> Result<String, DossierError> {
    let title = title.trim();

    if title.is_empty() {
        return Err(DossierError::InvalidInput(
            "The title must not be empty.".to_string(),
        ));
    }

    if title.len() > MAX_TITLE_LEN {
        return Err(DossierError::InvalidInput(format!(
            "The title must be at most {} characters.",
            MAX_TITLE_LEN
        )));
    }

    // Titles become file names, so path separators are right out
    if title.contains(['/', '\\']) || Path::new(title).components().count() != 1 {
        return Err(DossierError::InvalidInput(
            "The title must not contain path separators.".to_string(),
        ));
    }

    Ok(title.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use dashmap::DashMap;
    use std::sync::atomic::{AtomicI64, Ordering};

    struct MockDossierStore {
        dossiers: DashMap<i64, Dossier>,
        next_id: AtomicI64,
    }

    impl MockDossierStore {
        fn new() -> Self {
            Self {
                dossiers: DashMap::new(),
                next_id: AtomicI64::new(1),
            }
        }
    }

    #[async_trait]
    impl DossierStore for MockDossierStore {
        async fn get_dossiers(&self) -> Result<Vec<Dossier>, DossierError> {
            let mut dossiers: Vec<_> = self.dossiers.iter().map(|d| d.clone()).collect();
            dossiers.sort_by(|a, b| a.title.cmp(&b.title));
            Ok(dossiers)
        }

        async fn get_dossier_by_title(
            &self,
            title: &str,
        ) -> Result<Option<Dossier>, DossierError> {
            Ok(self
                .dossiers
                .iter()
                .find(|d| d.title.eq_ignore_ascii_case(title))
                .map(|d| d.clone()))
        }

        async fn insert_dossier(&self, dossier: &Dossier) -> Result<i64, DossierError> {
            let id = self.next_id.fetch_add(1, Ordering::SeqCst);
            let mut stored = dossier.clone();
            stored.id = id;
            self.dossiers.insert(id, stored);
            Ok(id)
        }

        async fn update_dossier(&self, dossier: &Dossier) -> Result<(), DossierError> {
            self.dossiers.insert(dossier.id, dossier.clone());
            Ok(())
        }

        async fn delete_dossier(&self, dossier_id: i64) -> Result<(), DossierError> {
            self.dossiers.remove(&dossier_id);
            Ok(())
        }
    }

    fn service_in(dir: &Path) -> DossierService<MockDossierStore> {
        DossierService::new(MockDossierStore::new(), dir)
    }

    #[tokio::test]
    async fn titles_are_unique_case_insensitive() {
        let dir = tempfile::tempdir().unwrap();
        let service = service_in(dir.path());

        service.create_dossier("Rules").await.unwrap();
        let result = service.create_dossier("rules").await;
        assert!(matches!(result, Err(DossierError::AlreadyExists(_))));
    }

    #[tokio::test]
    async fn titles_reject_path_separators() {
        let dir = tempfile::tempdir().unwrap();
        let service = service_in(dir.path());

        let result = service.create_dossier("../escape").await;
        assert!(matches!(result, Err(DossierError::InvalidInput(_))));

        let result = service.create_dossier("a/b").await;
        assert!(matches!(result, Err(DossierError::InvalidInput(_))));
    }

    #[tokio::test]
    async fn data_roundtrip_requires_pdf_magic() {
        let dir = tempfile::tempdir().unwrap();
        let service = service_in(dir.path());

        let dossier = service.create_dossier("Rules").await.unwrap();

        let result = service.set_dossier_data(&dossier, b"not a pdf").await;
        assert!(matches!(result, Err(DossierError::InvalidInput(_))));

        service
            .set_dossier_data(&dossier, b"%PDF-1.7 fake contents")
            .await
            .unwrap();
        let data = service.get_dossier_data(&dossier).await.unwrap();
        assert!(data.starts_with(b"%PDF"));
    }

    #[tokio::test]
    async fn summaries_default_until_set() {
        let dir = tempfile::tempdir().unwrap();
        let service = service_in(dir.path());

        let mut dossier = service.create_dossier("Rules").await.unwrap();
        assert_eq!(dossier.summary, "No summary set.");

        service
            .set_dossier_summary(&mut dossier, "House rules.")
            .await
            .unwrap();
        assert_eq!(dossier.summary, "House rules.");

        let result = service.set_dossier_summary(&mut dossier, "House rules.").await;
        assert!(matches!(result, Err(DossierError::InvalidInput(_))));
    }

    #[tokio::test]
    async fn rename_moves_the_file() {
        let dir = tempfile::tempdir().unwrap();
        let service = service_in(dir.path());

        let mut dossier = service.create_dossier("Old").await.unwrap();
        service
            .set_dossier_data(&dossier, b"%PDF-1.7")
            .await
            .unwrap();

        service
            .set_dossier_title(&mut dossier, "New")
            .await
            .unwrap();

        assert!(dir.path().join("New.pdf").exists());
        assert!(!dir.path().join("Old.pdf").exists());
    }

    #[tokio::test]
    async fn delete_removes_file_and_row() {
        let dir = tempfile::tempdir().unwrap();
        let service = service_in(dir.path());

        let dossier = service.create_dossier("Rules").await.unwrap();
        service
            .set_dossier_data(&dossier, b"%PDF-1.7")
            .await
            .unwrap();

        service.delete_dossier(&dossier).await.unwrap();
        assert!(!dir.path().join("Rules.pdf").exists());
        assert!(service.get_dossier_by_title("Rules").await.is_err());
    }
}
