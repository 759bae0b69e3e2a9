pub mod roleplay_models;
pub mod roleplay_service;

pub use roleplay_models::{ParticipantStatus, Roleplay, RoleplayMessage, RoleplayParticipant};
pub use roleplay_service::{RoleplayError, RoleplayService, RoleplayStore};
