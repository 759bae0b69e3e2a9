pub mod dossier_models;
pub mod dossier_service;

pub use dossier_models::Dossier;
pub use dossier_service::{DossierError, DossierService, DossierStore};
