// Background behaviours - periodic sweeps spawned at startup.

use std::sync::Arc;
use std::time::Duration as StdDuration;

use chrono::{Duration, Utc};
use poise::serenity_prelude as serenity;
use tokio::time::sleep;

use crate::core::moderation::ModerationService;
use crate::core::roleplays::RoleplayService;
use crate::infra::moderation::SqliteModerationStore;
use crate::infra::roleplays::SqliteRoleplayStore;

/// How long a roleplay may sit without a message before it is stopped.
const ROLEPLAY_MAX_IDLE_HOURS: i64 = 72;

const ROLEPLAY_SWEEP_INTERVAL_SECS: u64 = 60;
const EXPIRATION_SWEEP_INTERVAL_SECS: u64 = 3600;

/// Stops active roleplays that have gone quiet and tells their channel.
/// Runs forever; spawn it.
pub async fn run_roleplay_timeout_sweep(
    http: Arc<serenity::Http>,
    cache: Arc<serenity::Cache>,
    roleplays: Arc<RoleplayService<SqliteRoleplayStore>>,
) {
    loop {
        let guild_ids: Vec<u64> = cache.guilds().iter().map(|g| g.get()).collect();
        let now = Utc::now();
        let max_idle = Duration::hours(ROLEPLAY_MAX_IDLE_HOURS);

        for guild_id in guild_ids {
            let timed_out = match roleplays.get_timed_out_roleplays(guild_id, now, max_idle).await {
                Ok(timed_out) => timed_out,
                Err(e) => {
                    tracing::error!("Roleplay timeout sweep failed for guild {}: {}", guild_id, e);
                    continue;
                }
            };

            for roleplay in timed_out {
                let channel_id = roleplay.active_channel_id;

                if let Err(e) = roleplays.stop_roleplay(&roleplay).await {
                    tracing::error!("Failed to stop timed out roleplay: {}", e);
                    continue;
                }

                tracing::info!("Stopped idle roleplay \"{}\"", roleplay.name);

                if let Some(channel_id) = channel_id {
                    let notice = serenity::CreateMessage::new().content(format!(
                        "\"{}\" was stopped after {} hours without a message.",
                        roleplay.name, ROLEPLAY_MAX_IDLE_HOURS
                    ));
                    if let Err(e) = serenity::ChannelId::new(channel_id)
                        .send_message(&http, notice)
                        .await
                    {
                        tracing::warn!("Failed to announce roleplay timeout: {}", e);
                    }
                }
            }
        }

        sleep(StdDuration::from_secs(ROLEPLAY_SWEEP_INTERVAL_SECS)).await;
    }
}

/// Lifts expired warnings and bans and logs each expiry to the guild's
/// moderation log channel. Runs forever; spawn it.
pub async fn run_expiration_sweep(
    http: Arc<serenity::Http>,
    cache: Arc<serenity::Cache>,
    moderation: Arc<ModerationService<SqliteModerationStore>>,
) {
    loop {
        let guild_ids: Vec<u64> = cache.guilds().iter().map(|g| g.get()).collect();
        let now = Utc::now();

        for guild_id in guild_ids {
            if let Err(e) = sweep_guild(&http, &moderation, guild_id, now).await {
                tracing::error!("Expiration sweep failed for guild {}: {}", guild_id, e);
            }
        }

        sleep(StdDuration::from_secs(EXPIRATION_SWEEP_INTERVAL_SECS)).await;
    }
}

async fn sweep_guild(
    http: &serenity::Http,
    moderation: &ModerationService<SqliteModerationStore>,
    guild_id: u64,
    now: chrono::DateTime<Utc>,
) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let settings = moderation.get_or_create_settings(guild_id).await?;
    let log_channel = settings.moderation_log_channel;

    for warning in moderation.get_expired_warnings(guild_id, now).await? {
        moderation.delete_warning(&warning).await?;
        post_log(
            http,
            log_channel,
            format!(
                "Warning #{} for <@{}> expired and was removed.",
                warning.id, warning.user_id
            ),
        )
        .await;
    }

    for ban in moderation.get_expired_bans(guild_id, now).await? {
        moderation.delete_ban(&ban).await?;

        let unban = http
            .remove_ban(
                serenity::GuildId::new(guild_id),
                serenity::UserId::new(ban.user_id),
                Some("Temporary ban expired"),
            )
            .await;

        match unban {
            Ok(()) => {
                post_log(
                    http,
                    log_channel,
                    format!("Ban #{} expired, <@{}> was unbanned.", ban.id, ban.user_id),
                )
                .await;
            }
            // The ban may already have been lifted by hand.
            Err(serenity::Error::Http(serenity::HttpError::UnsuccessfulRequest(response)))
                if response.status_code == serenity::StatusCode::NOT_FOUND =>
            {
                tracing::debug!("Ban {} was already lifted on Discord", ban.id);
            }
            Err(e) => {
                tracing::warn!("Failed to unban user {}: {}", ban.user_id, e);
            }
        }
    }

    Ok(())
}

async fn post_log(http: &serenity::Http, channel_id: Option<u64>, content: String) {
    let Some(channel_id) = channel_id else {
        return;
    };

    if let Err(e) = serenity::ChannelId::new(channel_id)
        .send_message(http, serenity::CreateMessage::new().content(content))
        .await
    {
        tracing::warn!("Failed to post to the moderation log: {}", e);
    }
}
