// Discord event handlers - roleplay transcript capture, activity
// statistics, join handling, and autorole qualification checks.

use chrono::{Duration, Utc};
use poise::serenity_prelude as serenity;

use crate::core::autorole::{AutoroleConfiguration, QualificationContext};
use crate::discord::{Data, Error};

/// How often a single user can trigger the qualification sweep. Message
/// counts are still recorded for every message.
const QUALIFICATION_CHECK_INTERVAL_SECS: i64 = 300;

/// Handle a regular guild message: log it to any roleplay running in the
/// channel, bump the author's statistics, and re-check autoroles.
pub async fn handle_message(
    ctx: &serenity::Context,
    data: &Data,
    msg: &serenity::Message,
) -> Result<(), Error> {
    if msg.author.bot {
        return Ok(());
    }

    let guild_id = match msg.guild_id {
        Some(id) => id,
        None => return Ok(()),
    };

    log_roleplay_message(data, guild_id.get(), msg).await;

    if let Err(e) = data
        .statistics
        .record_message(guild_id.get(), msg.author.id.get(), msg.channel_id.get())
        .await
    {
        tracing::error!("Failed to record message statistics: {}", e);
    }

    // The qualification sweep reads every autorole and the member's full
    // statistics, so it is throttled per user.
    let gate_key = (guild_id.get(), msg.author.id.get());
    let now = Utc::now();
    let due = data
        .activity_gate
        .get(&gate_key)
        .map(|last| now - *last >= Duration::seconds(QUALIFICATION_CHECK_INTERVAL_SECS))
        .unwrap_or(true);

    if due {
        data.activity_gate.insert(gate_key, now);
        check_autoroles(ctx, data, guild_id, msg.author.id, &[]).await;
    }

    Ok(())
}

/// Append a message to the transcript of the roleplay running in its
/// channel, speaking as the author's current character if they have one.
async fn log_roleplay_message(data: &Data, guild_id: u64, msg: &serenity::Message) {
    let roleplay = match data
        .roleplays
        .get_active_in_channel(guild_id, msg.channel_id.get())
        .await
    {
        Ok(Some(roleplay)) => roleplay,
        Ok(None) => return,
        Err(e) => {
            tracing::error!("Failed to look up active roleplay: {}", e);
            return;
        }
    };

    let nickname = match data
        .characters
        .get_current_character(guild_id, msg.author.id.get())
        .await
    {
        Ok(Some(character)) => character.nickname.unwrap_or(character.name),
        Ok(None) => msg.author.name.clone(),
        Err(e) => {
            tracing::error!("Failed to look up current character: {}", e);
            msg.author.name.clone()
        }
    };

    if let Err(e) = data
        .roleplays
        .log_message(
            &roleplay,
            msg.id.get(),
            msg.author.id.get(),
            &nickname,
            &msg.content,
        )
        .await
    {
        tracing::error!("Failed to log roleplay message: {}", e);
    }
}

/// Handle an edited message by re-logging it; the transcript stores one
/// row per Discord message id.
pub async fn handle_message_update(
    data: &Data,
    new: Option<&serenity::Message>,
) -> Result<(), Error> {
    let Some(msg) = new else {
        return Ok(());
    };

    if msg.author.bot {
        return Ok(());
    }

    if let Some(guild_id) = msg.guild_id {
        log_roleplay_message(data, guild_id.get(), msg).await;
    }

    Ok(())
}

/// Handle a reaction by re-checking autoroles with the reacted message
/// in scope. Reaction conditions can only be satisfied here.
pub async fn handle_reaction_add(
    ctx: &serenity::Context,
    data: &Data,
    reaction: &serenity::Reaction,
) -> Result<(), Error> {
    let (Some(guild_id), Some(user_id)) = (reaction.guild_id, reaction.user_id) else {
        return Ok(());
    };

    if let Err(e) = data.statistics.record_activity(guild_id.get(), user_id.get()).await {
        tracing::error!("Failed to record reaction activity: {}", e);
    }

    check_autoroles(ctx, data, guild_id, user_id, &[reaction.message_id.get()]).await;
    Ok(())
}

/// Greet a new member and mirror the join to the monitoring channel.
pub async fn handle_member_join(
    ctx: &serenity::Context,
    data: &Data,
    member: &serenity::Member,
) -> Result<(), Error> {
    let guild_id = member.guild_id.get();

    let server = data
        .servers
        .get_or_register_server(guild_id)
        .await
        .map_err(|e| Error::from(e.to_string()))?;

    if server.send_join_message {
        if let Some(join_message) = &server.join_message {
            if let Err(e) = member
                .user
                .direct_message(
                    &ctx.http,
                    serenity::CreateMessage::new().content(join_message.clone()),
                )
                .await
            {
                // Closed DMs are common, not a fault.
                tracing::debug!("Could not DM join message: {}", e);
            }
        }
    }

    let settings = data
        .moderation
        .get_or_create_settings(guild_id)
        .await
        .map_err(|e| Error::from(e.to_string()))?;

    if let Some(channel_id) = settings.monitoring_channel {
        let notice = serenity::CreateMessage::new()
            .content(format!("<@{}> joined the server.", member.user.id));
        if let Err(e) = serenity::ChannelId::new(channel_id)
            .send_message(&ctx.http, notice)
            .await
        {
            tracing::warn!("Failed to post join notice: {}", e);
        }
    }

    Ok(())
}

/// Mirror a member leaving to the monitoring channel.
pub async fn handle_member_removal(
    ctx: &serenity::Context,
    data: &Data,
    guild_id: serenity::GuildId,
    user: &serenity::User,
) -> Result<(), Error> {
    let settings = data
        .moderation
        .get_or_create_settings(guild_id.get())
        .await
        .map_err(|e| Error::from(e.to_string()))?;

    if let Some(channel_id) = settings.monitoring_channel {
        let notice = serenity::CreateMessage::new()
            .content(format!("{} ({}) left the server.", user.name, user.id));
        if let Err(e) = serenity::ChannelId::new(channel_id)
            .send_message(&ctx.http, notice)
            .await
        {
            tracing::warn!("Failed to post leave notice: {}", e);
        }
    }

    Ok(())
}

/// Re-evaluate every enabled autorole for one user, granting roles or
/// queueing confirmations as configured.
async fn check_autoroles(
    ctx: &serenity::Context,
    data: &Data,
    guild_id: serenity::GuildId,
    user_id: serenity::UserId,
    reacted_message_ids: &[u64],
) {
    let autoroles = match data.autorole.get_guild_autoroles(guild_id.get()).await {
        Ok(autoroles) => autoroles,
        Err(e) => {
            tracing::error!("Failed to load autoroles: {}", e);
            return;
        }
    };

    let candidates: Vec<&AutoroleConfiguration> =
        autoroles.iter().filter(|a| a.is_enabled).collect();
    if candidates.is_empty() {
        return;
    }

    let member = match guild_id.member(&ctx.http, user_id).await {
        Ok(member) => member,
        Err(e) => {
            tracing::debug!("Could not fetch member for autorole check: {}", e);
            return;
        }
    };

    if member.user.bot {
        return;
    }

    let statistics = match data
        .statistics
        .get_user_statistics(guild_id.get(), user_id.get())
        .await
    {
        Ok(statistics) => statistics,
        Err(e) => {
            tracing::error!("Failed to load user statistics: {}", e);
            return;
        }
    };

    let context = QualificationContext {
        joined_at: member.joined_at.map(|ts| *ts),
        role_ids: member.roles.iter().map(|r| r.get()).collect(),
        reacted_message_ids: reacted_message_ids.to_vec(),
        statistics,
    };

    for autorole in candidates {
        if context.role_ids.contains(&autorole.role_id) {
            continue;
        }

        if !data.autorole.is_user_qualified(autorole, &context) {
            continue;
        }

        if autorole.requires_confirmation {
            if let Err(e) = data
                .autorole
                .get_or_create_confirmation(autorole, user_id.get())
                .await
            {
                tracing::error!("Failed to queue autorole confirmation: {}", e);
            }
            continue;
        }

        if let Err(e) = ctx
            .http
            .add_member_role(
                guild_id,
                user_id,
                serenity::RoleId::new(autorole.role_id),
                Some("Autorole conditions met"),
            )
            .await
        {
            tracing::warn!("Failed to grant autorole: {}", e);
        }
    }
}
