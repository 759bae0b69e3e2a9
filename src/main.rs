// This is the entry point of the Discord bot.
//
// **Architecture Overview:**
// - `core/` = Business logic (platform-agnostic)
// - `infra/` = Implementations of core traits (databases, APIs)
// - `discord/` = Discord-specific adapters (commands, events)
//
// This file's job is to:
// 1. Load configuration
// 2. Initialize services (dependency injection)
// 3. Set up the Discord framework
// 4. Register commands and event handlers

// These attrs point each module declaration at a more descriptive root file
// so we don't end up with half a dozen mod.rs files that all look the same.
#[path = "core/core_layer.rs"]
mod core;
#[path = "discord/discord_layer.rs"]
mod discord;
#[path = "infra/infra_layer.rs"]
mod infra;

use std::sync::Arc;

use crate::core::anonymail::AnonymailService;
use crate::core::autorole::{AutoroleService, StatisticsService};
use crate::core::characters::CharacterService;
use crate::core::dossiers::DossierService;
use crate::core::kinks::KinkService;
use crate::core::moderation::ModerationService;
use crate::core::roleplays::RoleplayService;
use crate::core::servers::ServerService;
use crate::core::users::UserService;
use crate::discord::{behaviours, events, Data, Error};
use crate::infra::anonymail::SqliteAnonymailStore;
use crate::infra::autorole::{SqliteAutoroleStore, SqliteStatisticsStore};
use crate::infra::characters::SqliteCharacterStore;
use crate::infra::dossiers::SqliteDossierStore;
use crate::infra::kinks::{FlistClient, SqliteKinkStore};
use crate::infra::moderation::SqliteModerationStore;
use crate::infra::roleplays::SqliteRoleplayStore;
use crate::infra::servers::SqliteServerStore;
use crate::infra::users::SqliteUserStore;
use dashmap::DashMap;
use poise::serenity_prelude as serenity;

/// Event handler for non-command Discord events.
async fn event_handler(
    ctx: &serenity::Context,
    event: &serenity::FullEvent,
    _framework: poise::FrameworkContext<'_, Data, Error>,
    data: &Data,
) -> Result<(), Error> {
    match event {
        serenity::FullEvent::Message { new_message } => {
            if let Err(e) = events::handle_message(ctx, data, new_message).await {
                tracing::error!("Error handling message: {}", e);
            }
        }
        serenity::FullEvent::MessageUpdate {
            old_if_available: _,
            new,
            event: _,
        } => {
            if let Err(e) = events::handle_message_update(data, new.as_ref()).await {
                tracing::error!("Error handling message edit: {}", e);
            }
        }
        serenity::FullEvent::ReactionAdd { add_reaction } => {
            if let Err(e) = events::handle_reaction_add(ctx, data, add_reaction).await {
                tracing::error!("Error handling reaction: {}", e);
            }
        }
        serenity::FullEvent::GuildMemberAddition { new_member } => {
            if let Err(e) = events::handle_member_join(ctx, data, new_member).await {
                tracing::error!("Error handling member join: {}", e);
            }
        }
        serenity::FullEvent::GuildMemberRemoval {
            guild_id,
            user,
            member_data_if_available: _,
        } => {
            if let Err(e) = events::handle_member_removal(ctx, data, *guild_id, user).await {
                tracing::error!("Error handling member removal: {}", e);
            }
        }
        _ => {}
    }

    Ok(())
}

#[tokio::main]
async fn main() {
    // Initialize logging so we can see what's happening
    tracing_subscriber::fmt::init();

    // Load environment variables from .env file (if it exists)
    dotenv::dotenv().ok();

    let token = std::env::var("DISCORD_TOKEN").expect(
        "Missing DISCORD_TOKEN environment variable! Create a .env file with your bot token.",
    );

    // Keep runtime data in a dedicated folder so the repo root stays tidy.
    let data_dir = "data";
    std::fs::create_dir_all(data_dir).expect("Failed to create data directory");
    let dossier_dir = format!("{}/dossiers", data_dir);
    std::fs::create_dir_all(&dossier_dir).expect("Failed to create dossier directory");

    // ========================================================================
    // DEPENDENCY INJECTION
    // ========================================================================
    // All stores share one SQLite pool; each migrates its own tables.

    let db_path = format!("{}/ambassador.db", data_dir);
    let pool = sqlx::sqlite::SqlitePoolOptions::new()
        .connect(&format!("sqlite://{}?mode=rwc", db_path))
        .await
        .expect("Failed to connect to database");

    let server_store = SqliteServerStore::new(pool.clone());
    server_store.migrate().await.expect("Failed to migrate server tables");
    let server_service = Arc::new(ServerService::new(server_store));

    let user_store = SqliteUserStore::new(pool.clone());
    user_store.migrate().await.expect("Failed to migrate user tables");
    let user_service = Arc::new(UserService::new(user_store));

    let character_store = SqliteCharacterStore::new(pool.clone());
    character_store.migrate().await.expect("Failed to migrate character tables");
    let character_service = Arc::new(CharacterService::new(character_store));

    let roleplay_store = SqliteRoleplayStore::new(pool.clone());
    roleplay_store.migrate().await.expect("Failed to migrate roleplay tables");
    let roleplay_service = Arc::new(RoleplayService::new(roleplay_store));

    let moderation_store = SqliteModerationStore::new(pool.clone());
    moderation_store.migrate().await.expect("Failed to migrate moderation tables");
    let moderation_service = Arc::new(ModerationService::new(moderation_store));

    let kink_store = SqliteKinkStore::new(pool.clone());
    kink_store.migrate().await.expect("Failed to migrate kink tables");
    let kink_service = Arc::new(KinkService::new(kink_store));

    let flist_client = Arc::new(FlistClient::new().expect("Failed to create F-List client"));

    let dossier_store = SqliteDossierStore::new(pool.clone());
    dossier_store.migrate().await.expect("Failed to migrate dossier tables");
    let dossier_service = Arc::new(DossierService::new(dossier_store, dossier_dir));

    let autorole_store = SqliteAutoroleStore::new(pool.clone());
    autorole_store.migrate().await.expect("Failed to migrate autorole tables");
    let autorole_service = Arc::new(AutoroleService::new(autorole_store));

    let statistics_store = SqliteStatisticsStore::new(pool.clone());
    statistics_store.migrate().await.expect("Failed to migrate statistics tables");
    let statistics_service = Arc::new(StatisticsService::new(statistics_store));

    let anonymail_store = SqliteAnonymailStore::new(pool.clone());
    anonymail_store.migrate().await.expect("Failed to migrate anonymail tables");
    let anonymail_service = Arc::new(AnonymailService::new(anonymail_store));

    // Create the data structure that will be shared across all commands
    let data = Data {
        servers: Arc::clone(&server_service),
        users: Arc::clone(&user_service),
        characters: Arc::clone(&character_service),
        roleplays: Arc::clone(&roleplay_service),
        moderation: Arc::clone(&moderation_service),
        kinks: Arc::clone(&kink_service),
        flist: Arc::clone(&flist_client),
        dossiers: Arc::clone(&dossier_service),
        autorole: Arc::clone(&autorole_service),
        statistics: Arc::clone(&statistics_service),
        anonymail: Arc::clone(&anonymail_service),
        activity_gate: DashMap::new(),
    };

    // ========================================================================
    // DISCORD FRAMEWORK SETUP
    // ========================================================================

    let intents = serenity::GatewayIntents::GUILD_MESSAGES
        | serenity::GatewayIntents::MESSAGE_CONTENT // Required to read message content
        | serenity::GatewayIntents::GUILDS
        | serenity::GatewayIntents::GUILD_MEMBERS
        | serenity::GatewayIntents::GUILD_MESSAGE_REACTIONS;

    let framework = poise::Framework::builder()
        .options(poise::FrameworkOptions {
            commands: vec![
                discord::commands::server::server(),
                discord::commands::user::profile(),
                discord::commands::character::character(),
                discord::commands::roleplay::roleplay(),
                discord::commands::moderation::moderation(),
                discord::commands::moderation::note(),
                discord::commands::moderation::warning(),
                discord::commands::moderation::ban(),
                discord::commands::kink::kink(),
                discord::commands::dossier::dossier(),
                discord::commands::autorole::autorole(),
                discord::commands::anonymail::mail(),
            ],
            event_handler: |ctx, event, framework, data| {
                Box::pin(event_handler(ctx, event, framework, data))
            },
            ..Default::default()
        })
        .setup(|ctx, _ready, framework| {
            Box::pin(async move {
                tracing::info!("Bot is starting up...");

                // Register slash commands globally (can take up to an hour to propagate)
                poise::builtins::register_globally(ctx, &framework.options().commands).await?;
                tracing::info!("Commands registered");

                // Background sweep for idle roleplays.
                tokio::spawn(behaviours::run_roleplay_timeout_sweep(
                    ctx.http.clone(),
                    ctx.cache.clone(),
                    Arc::clone(&data.roleplays),
                ));

                // Background sweep for expired warnings and bans.
                tokio::spawn(behaviours::run_expiration_sweep(
                    ctx.http.clone(),
                    ctx.cache.clone(),
                    Arc::clone(&data.moderation),
                ));

                tracing::info!("Bot is ready");
                Ok(data)
            })
        })
        .build();

    let mut client = serenity::ClientBuilder::new(token, intents)
        .framework(framework)
        .await
        .expect("Error creating client");

    client.start().await.expect("Error running bot");
}
