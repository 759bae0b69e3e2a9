// Kink catalogue and user preference data types.
//
// The catalogue mirrors the F-List kink list; entries carry the upstream
// F-List id so imports can be re-run without duplicating rows.

use serde::{Deserialize, Serialize};

/// A catalogue entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Kink {
    /// Database row id.
    #[serde(default)]
    pub id: i64,
    pub name: String,
    pub description: String,
    pub category: KinkCategory,
    /// Upstream F-List id. Import upserts key on this.
    pub flist_id: i64,
}

/// F-List kink categories.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum KinkCategory {
    Anatomy,
    Bodies,
    Clothing,
    Gender,
    General,
    Roleplay,
    Species,
    Themes,
    Other,
}

impl KinkCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            KinkCategory::Anatomy => "anatomy",
            KinkCategory::Bodies => "bodies",
            KinkCategory::Clothing => "clothing",
            KinkCategory::Gender => "gender",
            KinkCategory::General => "general",
            KinkCategory::Roleplay => "roleplay",
            KinkCategory::Species => "species",
            KinkCategory::Themes => "themes",
            KinkCategory::Other => "other",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value.to_ascii_lowercase().as_str() {
            "anatomy" => Some(KinkCategory::Anatomy),
            "bodies" => Some(KinkCategory::Bodies),
            "clothing" => Some(KinkCategory::Clothing),
            "gender" => Some(KinkCategory::Gender),
            "general" => Some(KinkCategory::General),
            "roleplay" => Some(KinkCategory::Roleplay),
            "species" => Some(KinkCategory::Species),
            "themes" => Some(KinkCategory::Themes),
            "other" => Some(KinkCategory::Other),
            _ => None,
        }
    }

    pub fn all() -> &'static [KinkCategory] {
        &[
            KinkCategory::Anatomy,
            KinkCategory::Bodies,
            KinkCategory::Clothing,
            KinkCategory::Gender,
            KinkCategory::General,
            KinkCategory::Roleplay,
            KinkCategory::Species,
            KinkCategory::Themes,
            KinkCategory::Other,
        ]
    }
}

/// How a user feels about a kink.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum KinkPreference {
    Favourite,
    Like,
    Maybe,
    No,
    #[default]
    NoPreference,
}

impl KinkPreference {
    pub fn as_str(&self) -> &'static str {
        match self {
            KinkPreference::Favourite => "favourite",
            KinkPreference::Like => "like",
            KinkPreference::Maybe => "maybe",
            KinkPreference::No => "no",
            KinkPreference::NoPreference => "no preference",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value.to_ascii_lowercase().as_str() {
            "favourite" | "favorite" => Some(KinkPreference::Favourite),
            "like" => Some(KinkPreference::Like),
            "maybe" => Some(KinkPreference::Maybe),
            "no" => Some(KinkPreference::No),
            "no preference" | "nopreference" => Some(KinkPreference::NoPreference),
            _ => None,
        }
    }

    /// Whether this preference counts when computing overlap between two
    /// users.
    pub fn is_positive(&self) -> bool {
        matches!(
            self,
            KinkPreference::Favourite | KinkPreference::Like | KinkPreference::Maybe
        )
    }
}

/// A user's preference for a catalogue entry.
#[derive(Debug, Clone, PartialEq)]
pub struct UserKink {
    pub user_id: u64,
    pub kink: Kink,
    pub preference: KinkPreference,
}
