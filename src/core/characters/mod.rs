pub mod character_models;
pub mod character_service;
pub mod pronouns;

pub use character_models::{Character, CharacterImage};
pub use character_service::{CharacterError, CharacterService, CharacterStore};
