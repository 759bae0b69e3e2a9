pub mod kink_models;
pub mod kink_service;
pub mod matching;

pub use kink_models::{Kink, KinkCategory, KinkPreference, UserKink};
pub use kink_service::{KinkError, KinkService, KinkStore};
