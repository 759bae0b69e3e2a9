// Core moderation module - notes, warnings, and bans with expiry.

pub mod moderation_models;
pub mod moderation_service;

pub use moderation_models::*;
pub use moderation_service::*;
