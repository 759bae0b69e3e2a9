// Character profile data types.

/// A roleplay character owned by a user on a particular server.
#[derive(Debug, Clone, PartialEq)]
pub struct Character {
    /// Database row id.
    pub id: i64,
    pub guild_id: u64,
    pub owner_id: u64,
    pub name: String,
    /// The nickname the owner assumes while this character is current.
    pub nickname: Option<String>,
    pub summary: Option<String>,
    pub description: Option<String>,
    pub avatar_url: Option<String>,
    /// Key into the pronoun provider table.
    pub pronoun_family: String,
    pub is_nsfw: bool,
    /// Whether the owner is currently playing this character.
    pub is_current: bool,
    /// Whether this character is assumed automatically when the owner's
    /// current character is cleared.
    pub is_default: bool,
}

/// A gallery image attached to a character.
#[derive(Debug, Clone, PartialEq)]
pub struct CharacterImage {
    pub id: i64,
    pub character_id: i64,
    pub name: String,
    pub caption: Option<String>,
    pub url: String,
    pub is_nsfw: bool,
}
