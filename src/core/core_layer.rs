// The core module contains all business logic.
// Each feature gets its own submodule.

#[path = "servers/server_service.rs"]
pub mod servers;

#[path = "users/user_service.rs"]
pub mod users;

#[path = "characters/mod.rs"]
pub mod characters;

#[path = "roleplays/mod.rs"]
pub mod roleplays;

#[path = "moderation/mod.rs"]
pub mod moderation;

#[path = "kinks/mod.rs"]
pub mod kinks;

#[path = "dossiers/mod.rs"]
pub mod dossiers;

#[path = "autorole/mod.rs"]
pub mod autorole;

#[path = "anonymail/mod.rs"]
pub mod anonymail;
