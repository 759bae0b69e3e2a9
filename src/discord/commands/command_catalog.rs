// Discord commands module.
// Each feature gets its own command file.

pub mod anonymail;
pub mod autorole;
pub mod character;
pub mod dossier;
pub mod kink;
pub mod moderation;
pub mod roleplay;
pub mod server;
pub mod user;

use crate::core::anonymail::AnonymailService;
use crate::core::autorole::{AutoroleService, StatisticsService};
use crate::core::characters::CharacterService;
use crate::core::dossiers::DossierService;
use crate::core::kinks::KinkService;
use crate::core::moderation::ModerationService;
use crate::core::roleplays::RoleplayService;
use crate::core::servers::ServerService;
use crate::core::users::UserService;
use crate::infra::anonymail::SqliteAnonymailStore;
use crate::infra::autorole::{SqliteAutoroleStore, SqliteStatisticsStore};
use crate::infra::characters::SqliteCharacterStore;
use crate::infra::dossiers::SqliteDossierStore;
use crate::infra::kinks::{FlistClient, SqliteKinkStore};
use crate::infra::moderation::SqliteModerationStore;
use crate::infra::roleplays::SqliteRoleplayStore;
use crate::infra::servers::SqliteServerStore;
use crate::infra::users::SqliteUserStore;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use std::sync::Arc;

pub type Error = Box<dyn std::error::Error + Send + Sync>;
pub type Context<'a> = poise::Context<'a, Data, Error>;

/// Data shared across all commands and event handlers.
/// This is where we store our services.
pub struct Data {
    pub servers: Arc<ServerService<SqliteServerStore>>,
    pub users: Arc<UserService<SqliteUserStore>>,
    pub characters: Arc<CharacterService<SqliteCharacterStore>>,
    pub roleplays: Arc<RoleplayService<SqliteRoleplayStore>>,
    pub moderation: Arc<ModerationService<SqliteModerationStore>>,
    pub kinks: Arc<KinkService<SqliteKinkStore>>,
    pub flist: Arc<FlistClient>,
    pub dossiers: Arc<DossierService<SqliteDossierStore>>,
    pub autorole: Arc<AutoroleService<SqliteAutoroleStore>>,
    pub statistics: Arc<StatisticsService<SqliteStatisticsStore>>,
    pub anonymail: Arc<AnonymailService<SqliteAnonymailStore>>,
    /// Last autorole qualification check per (guild, user). Statistics
    /// are recorded for every message, but conditions are only
    /// re-evaluated once per user per interval.
    pub activity_gate: DashMap<(u64, u64), DateTime<Utc>>,
}
