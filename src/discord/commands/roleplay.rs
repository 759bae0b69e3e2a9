// Roleplay slash commands.

use crate::core::roleplays::{ParticipantStatus, Roleplay};
use crate::discord::{Context, Error};
use poise::serenity_prelude as serenity;

/// Roleplay management.
///
/// Create, run, and replay collaborative roleplays.
#[poise::command(
    slash_command,
    subcommands(
        "create",
        "delete",
        "show",
        "list",
        "invite",
        "join",
        "leave",
        "kick",
        "start",
        "stop",
        "rename",
        "set_summary",
        "set_public",
        "set_nsfw",
        "transfer",
        "replay"
    ),
    guild_only
)]
pub async fn roleplay(_ctx: Context<'_>) -> Result<(), Error> {
    // Parent command - shows help
    Ok(())
}

/// Looks up a roleplay on this server by name.
async fn named_roleplay(ctx: &Context<'_>, name: &str) -> Result<Roleplay, String> {
    let guild_id = ctx.guild_id().ok_or("Must be used in a server")?;

    ctx.data()
        .roleplays
        .get_by_name(guild_id.get(), name)
        .await
        .map_err(|e| e.to_string())
}

/// Create a new roleplay.
#[poise::command(slash_command, guild_only)]
pub async fn create(
    ctx: Context<'_>,
    #[description = "The roleplay's name"] name: String,
    #[description = "A short summary"] summary: Option<String>,
    #[description = "Whether the roleplay is NSFW"] nsfw: Option<bool>,
    #[description = "Whether anyone can join"] public: Option<bool>,
) -> Result<(), Error> {
    let guild_id = ctx.guild_id().ok_or("Must be used in a server")?;

    match ctx
        .data()
        .roleplays
        .create_roleplay(
            guild_id.get(),
            ctx.author().id.get(),
            &name,
            summary.as_deref(),
            nsfw.unwrap_or(false),
            public.unwrap_or(true),
        )
        .await
    {
        Ok(roleplay) => {
            ctx.say(format!("Roleplay \"{}\" created.", roleplay.name))
                .await?
        }
        Err(e) => ctx.say(e.to_string()).await?,
    };
    Ok(())
}

/// Delete a roleplay you own.
#[poise::command(slash_command, guild_only)]
pub async fn delete(
    ctx: Context<'_>,
    #[description = "The roleplay's name"] name: String,
) -> Result<(), Error> {
    let roleplay = match named_roleplay(&ctx, &name).await {
        Ok(roleplay) => roleplay,
        Err(message) => {
            ctx.say(message).await?;
            return Ok(());
        }
    };

    if roleplay.owner_id != ctx.author().id.get() {
        ctx.say("Only the owner can delete a roleplay.").await?;
        return Ok(());
    }

    match ctx.data().roleplays.delete_roleplay(&roleplay).await {
        Ok(()) => {
            ctx.say(format!("Roleplay \"{}\" deleted.", roleplay.name))
                .await?
        }
        Err(e) => ctx.say(e.to_string()).await?,
    };
    Ok(())
}

/// Show a roleplay's details.
#[poise::command(slash_command, guild_only)]
pub async fn show(
    ctx: Context<'_>,
    #[description = "The roleplay's name"] name: String,
) -> Result<(), Error> {
    let roleplay = match named_roleplay(&ctx, &name).await {
        Ok(roleplay) => roleplay,
        Err(message) => {
            ctx.say(message).await?;
            return Ok(());
        }
    };

    let participants = ctx
        .data()
        .roleplays
        .get_participants(&roleplay)
        .await
        .map_err(|e| Error::from(e.to_string()))?;

    let joined: Vec<String> = participants
        .iter()
        .filter(|p| p.status == ParticipantStatus::Joined)
        .map(|p| format!("<@{}>", p.user_id))
        .collect();

    let embed = serenity::CreateEmbed::new()
        .title(&roleplay.name)
        .color(0xE67E22)
        .field(
            "Summary",
            roleplay
                .summary
                .clone()
                .unwrap_or_else(|| "No summary set.".to_string()),
            false,
        )
        .field("Owner", format!("<@{}>", roleplay.owner_id), true)
        .field(
            "Status",
            if roleplay.is_active {
                "Running"
            } else {
                "Stopped"
            },
            true,
        )
        .field(
            "Visibility",
            if roleplay.is_public {
                "Public"
            } else {
                "Invite-only"
            },
            true,
        )
        .field(
            "Participants",
            if joined.is_empty() {
                "Nobody yet".to_string()
            } else {
                joined.join(", ")
            },
            false,
        );

    ctx.send(poise::CreateReply::default().embed(embed)).await?;
    Ok(())
}

/// List the roleplays on this server.
#[poise::command(slash_command, guild_only)]
pub async fn list(ctx: Context<'_>) -> Result<(), Error> {
    let guild_id = ctx.guild_id().ok_or("Must be used in a server")?;

    let roleplays = ctx
        .data()
        .roleplays
        .get_server_roleplays(guild_id.get())
        .await
        .map_err(|e| Error::from(e.to_string()))?;

    if roleplays.is_empty() {
        ctx.say("There are no roleplays on this server.").await?;
        return Ok(());
    }

    let lines: Vec<String> = roleplays
        .iter()
        .map(|r| {
            let mut line = format!("**{}**", r.name);
            if r.is_active {
                line.push_str(" (running)");
            }
            if !r.is_public {
                line.push_str(" (invite-only)");
            }
            line
        })
        .collect();

    let embed = serenity::CreateEmbed::new()
        .title("Roleplays")
        .color(0xE67E22)
        .description(lines.join("\n"));

    ctx.send(poise::CreateReply::default().embed(embed)).await?;
    Ok(())
}

/// Invite a user to a roleplay you own.
#[poise::command(slash_command, guild_only)]
pub async fn invite(
    ctx: Context<'_>,
    #[description = "The roleplay's name"] name: String,
    #[description = "The user to invite"] user: serenity::User,
) -> Result<(), Error> {
    let roleplay = match named_roleplay(&ctx, &name).await {
        Ok(roleplay) => roleplay,
        Err(message) => {
            ctx.say(message).await?;
            return Ok(());
        }
    };

    if roleplay.owner_id != ctx.author().id.get() {
        ctx.say("Only the owner can invite users.").await?;
        return Ok(());
    }

    match ctx
        .data()
        .roleplays
        .invite_user(&roleplay, user.id.get())
        .await
    {
        Ok(()) => {
            ctx.say(format!("{} has been invited to \"{}\".", user.name, roleplay.name))
                .await?
        }
        Err(e) => ctx.say(e.to_string()).await?,
    };
    Ok(())
}

/// Join a roleplay.
#[poise::command(slash_command, guild_only)]
pub async fn join(
    ctx: Context<'_>,
    #[description = "The roleplay's name"] name: String,
) -> Result<(), Error> {
    let roleplay = match named_roleplay(&ctx, &name).await {
        Ok(roleplay) => roleplay,
        Err(message) => {
            ctx.say(message).await?;
            return Ok(());
        }
    };

    match ctx
        .data()
        .roleplays
        .join_roleplay(&roleplay, ctx.author().id.get())
        .await
    {
        Ok(()) => ctx.say(format!("You joined \"{}\".", roleplay.name)).await?,
        Err(e) => ctx.say(e.to_string()).await?,
    };
    Ok(())
}

/// Leave a roleplay.
#[poise::command(slash_command, guild_only)]
pub async fn leave(
    ctx: Context<'_>,
    #[description = "The roleplay's name"] name: String,
) -> Result<(), Error> {
    let roleplay = match named_roleplay(&ctx, &name).await {
        Ok(roleplay) => roleplay,
        Err(message) => {
            ctx.say(message).await?;
            return Ok(());
        }
    };

    match ctx
        .data()
        .roleplays
        .leave_roleplay(&roleplay, ctx.author().id.get())
        .await
    {
        Ok(()) => ctx.say(format!("You left \"{}\".", roleplay.name)).await?,
        Err(e) => ctx.say(e.to_string()).await?,
    };
    Ok(())
}

/// Kick a user from a roleplay you own.
#[poise::command(slash_command, guild_only)]
pub async fn kick(
    ctx: Context<'_>,
    #[description = "The roleplay's name"] name: String,
    #[description = "The user to kick"] user: serenity::User,
) -> Result<(), Error> {
    let roleplay = match named_roleplay(&ctx, &name).await {
        Ok(roleplay) => roleplay,
        Err(message) => {
            ctx.say(message).await?;
            return Ok(());
        }
    };

    if roleplay.owner_id != ctx.author().id.get() {
        ctx.say("Only the owner can kick users.").await?;
        return Ok(());
    }

    match ctx.data().roleplays.kick_user(&roleplay, user.id.get()).await {
        Ok(()) => {
            ctx.say(format!("{} was kicked from \"{}\".", user.name, roleplay.name))
                .await?
        }
        Err(e) => ctx.say(e.to_string()).await?,
    };
    Ok(())
}

/// Start a roleplay in the current channel.
#[poise::command(slash_command, guild_only)]
pub async fn start(
    ctx: Context<'_>,
    #[description = "The roleplay's name"] name: String,
) -> Result<(), Error> {
    let roleplay = match named_roleplay(&ctx, &name).await {
        Ok(roleplay) => roleplay,
        Err(message) => {
            ctx.say(message).await?;
            return Ok(());
        }
    };

    if roleplay.owner_id != ctx.author().id.get() {
        ctx.say("Only the owner can start a roleplay.").await?;
        return Ok(());
    }

    let channel_is_nsfw = ctx
        .channel_id()
        .to_channel(ctx.http())
        .await
        .ok()
        .and_then(|channel| channel.guild())
        .map(|channel| channel.nsfw)
        .unwrap_or(false);

    match ctx
        .data()
        .roleplays
        .start_roleplay(&roleplay, ctx.channel_id().get(), channel_is_nsfw)
        .await
    {
        Ok(()) => {
            ctx.say(format!(
                "\"{}\" is now running in this channel. Messages here will be logged.",
                roleplay.name
            ))
            .await?
        }
        Err(e) => ctx.say(e.to_string()).await?,
    };
    Ok(())
}

/// Stop a running roleplay.
#[poise::command(slash_command, guild_only)]
pub async fn stop(
    ctx: Context<'_>,
    #[description = "The roleplay's name"] name: String,
) -> Result<(), Error> {
    let roleplay = match named_roleplay(&ctx, &name).await {
        Ok(roleplay) => roleplay,
        Err(message) => {
            ctx.say(message).await?;
            return Ok(());
        }
    };

    if roleplay.owner_id != ctx.author().id.get() {
        ctx.say("Only the owner can stop a roleplay.").await?;
        return Ok(());
    }

    match ctx.data().roleplays.stop_roleplay(&roleplay).await {
        Ok(()) => ctx.say(format!("\"{}\" stopped.", roleplay.name)).await?,
        Err(e) => ctx.say(e.to_string()).await?,
    };
    Ok(())
}

/// Rename a roleplay.
#[poise::command(slash_command, guild_only)]
pub async fn rename(
    ctx: Context<'_>,
    #[description = "The roleplay's current name"] name: String,
    #[description = "The new name"] new_name: String,
) -> Result<(), Error> {
    let roleplay = match named_roleplay(&ctx, &name).await {
        Ok(roleplay) => roleplay,
        Err(message) => {
            ctx.say(message).await?;
            return Ok(());
        }
    };

    if roleplay.owner_id != ctx.author().id.get() {
        ctx.say("Only the owner can rename a roleplay.").await?;
        return Ok(());
    }

    match ctx.data().roleplays.set_name(&roleplay, &new_name).await {
        Ok(()) => {
            ctx.say(format!("\"{}\" is now \"{}\".", name, new_name))
                .await?
        }
        Err(e) => ctx.say(e.to_string()).await?,
    };
    Ok(())
}

/// Set a roleplay's summary.
#[poise::command(slash_command, guild_only)]
pub async fn set_summary(
    ctx: Context<'_>,
    #[description = "The roleplay's name"] name: String,
    #[description = "The new summary"] summary: String,
) -> Result<(), Error> {
    let roleplay = match named_roleplay(&ctx, &name).await {
        Ok(roleplay) => roleplay,
        Err(message) => {
            ctx.say(message).await?;
            return Ok(());
        }
    };

    if roleplay.owner_id != ctx.author().id.get() {
        ctx.say("Only the owner can change a roleplay.").await?;
        return Ok(());
    }

    match ctx.data().roleplays.set_summary(&roleplay, &summary).await {
        Ok(()) => ctx.say("Summary set.").await?,
        Err(e) => ctx.say(e.to_string()).await?,
    };
    Ok(())
}

/// Make a roleplay public or invite-only.
#[poise::command(slash_command, guild_only)]
pub async fn set_public(
    ctx: Context<'_>,
    #[description = "The roleplay's name"] name: String,
    #[description = "Whether anyone can join"] public: bool,
) -> Result<(), Error> {
    let roleplay = match named_roleplay(&ctx, &name).await {
        Ok(roleplay) => roleplay,
        Err(message) => {
            ctx.say(message).await?;
            return Ok(());
        }
    };

    if roleplay.owner_id != ctx.author().id.get() {
        ctx.say("Only the owner can change a roleplay.").await?;
        return Ok(());
    }

    match ctx.data().roleplays.set_is_public(&roleplay, public).await {
        Ok(()) => ctx.say("Visibility updated.").await?,
        Err(e) => ctx.say(e.to_string()).await?,
    };
    Ok(())
}

/// Mark a roleplay as NSFW or not.
#[poise::command(slash_command, guild_only)]
pub async fn set_nsfw(
    ctx: Context<'_>,
    #[description = "The roleplay's name"] name: String,
    #[description = "Whether the roleplay is NSFW"] nsfw: bool,
) -> Result<(), Error> {
    let roleplay = match named_roleplay(&ctx, &name).await {
        Ok(roleplay) => roleplay,
        Err(message) => {
            ctx.say(message).await?;
            return Ok(());
        }
    };

    if roleplay.owner_id != ctx.author().id.get() {
        ctx.say("Only the owner can change a roleplay.").await?;
        return Ok(());
    }

    match ctx.data().roleplays.set_is_nsfw(&roleplay, nsfw).await {
        Ok(()) => ctx.say("NSFW setting updated.").await?,
        Err(e) => ctx.say(e.to_string()).await?,
    };
    Ok(())
}

/// Hand a roleplay over to another user.
#[poise::command(slash_command, guild_only)]
pub async fn transfer(
    ctx: Context<'_>,
    #[description = "The roleplay's name"] name: String,
    #[description = "The new owner"] new_owner: serenity::User,
) -> Result<(), Error> {
    let roleplay = match named_roleplay(&ctx, &name).await {
        Ok(roleplay) => roleplay,
        Err(message) => {
            ctx.say(message).await?;
            return Ok(());
        }
    };

    if roleplay.owner_id != ctx.author().id.get() {
        ctx.say("Only the owner can transfer a roleplay.").await?;
        return Ok(());
    }

    match ctx
        .data()
        .roleplays
        .transfer_ownership(&roleplay, new_owner.id.get())
        .await
    {
        Ok(()) => {
            ctx.say(format!(
                "\"{}\" now belongs to {}.",
                roleplay.name, new_owner.name
            ))
            .await?
        }
        Err(e) => ctx.say(e.to_string()).await?,
    };
    Ok(())
}

/// Export a roleplay's transcript as a text file.
#[poise::command(slash_command, guild_only)]
pub async fn replay(
    ctx: Context<'_>,
    #[description = "The roleplay's name"] name: String,
) -> Result<(), Error> {
    let roleplay = match named_roleplay(&ctx, &name).await {
        Ok(roleplay) => roleplay,
        Err(message) => {
            ctx.say(message).await?;
            return Ok(());
        }
    };

    let transcript = match ctx
        .data()
        .roleplays
        .export_transcript(&roleplay, ctx.author().id.get())
        .await
    {
        Ok(transcript) => transcript,
        Err(e) => {
            ctx.say(e.to_string()).await?;
            return Ok(());
        }
    };

    let attachment = serenity::CreateAttachment::bytes(
        transcript.into_bytes(),
        format!("{}.txt", roleplay.name),
    );

    ctx.send(
        poise::CreateReply::default()
            .content(format!("Transcript of \"{}\".", roleplay.name))
            .attachment(attachment),
    )
    .await?;
    Ok(())
}
