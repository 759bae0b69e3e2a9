pub mod anonymail_models;
pub mod anonymail_service;

pub use anonymail_models::Mailbox;
pub use anonymail_service::{AnonymailError, AnonymailService, AnonymailStore};
