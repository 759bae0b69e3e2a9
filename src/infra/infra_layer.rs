// The infra module contains implementations of core traits.
// Each feature implementation goes in its own submodule.

#[path = "servers/sqlite_server_store.rs"]
pub mod servers;

#[path = "users/sqlite_user_store.rs"]
pub mod users;

#[path = "characters/sqlite_character_store.rs"]
pub mod characters;

#[path = "roleplays/sqlite_roleplay_store.rs"]
pub mod roleplays;

#[path = "moderation/sqlite_moderation_store.rs"]
pub mod moderation;

#[path = "kinks/mod.rs"]
pub mod kinks;

#[path = "dossiers/sqlite_dossier_store.rs"]
pub mod dossiers;

#[path = "autorole/mod.rs"]
pub mod autorole;

#[path = "anonymail/sqlite_anonymail_store.rs"]
pub mod anonymail;
