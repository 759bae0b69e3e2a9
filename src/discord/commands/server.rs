// Server configuration slash commands.

use crate::discord::{Context, Error};
use poise::serenity_prelude as serenity;

/// Server settings.
///
/// Look at or change how the bot behaves on this server.
#[poise::command(
    slash_command,
    subcommands(
        "show",
        "set_description",
        "set_join_message",
        "toggle_join_message",
        "toggle_nsfw",
        "toggle_permission_warnings"
    ),
    guild_only
)]
pub async fn server(_ctx: Context<'_>) -> Result<(), Error> {
    // Parent command - shows help
    Ok(())
}

/// Show the server's current settings.
#[poise::command(slash_command, guild_only)]
pub async fn show(ctx: Context<'_>) -> Result<(), Error> {
    let guild_id = ctx.guild_id().ok_or("Must be used in a server")?;

    let server = ctx
        .data()
        .servers
        .get_or_register_server(guild_id.get())
        .await
        .map_err(|e| Error::from(e.to_string()))?;

    let embed = serenity::CreateEmbed::new()
        .title("Server Settings")
        .color(0x5865F2)
        .field(
            "Description",
            server
                .description
                .unwrap_or_else(|| "Not set".to_string()),
            false,
        )
        .field(
            "Join message",
            server
                .join_message
                .unwrap_or_else(|| "Not set".to_string()),
            false,
        )
        .field(
            "Sends join messages",
            if server.send_join_message { "Yes" } else { "No" },
            true,
        )
        .field("NSFW", if server.is_nsfw { "Yes" } else { "No" }, true);

    ctx.send(poise::CreateReply::default().embed(embed)).await?;
    Ok(())
}

/// Set the server's description.
#[poise::command(slash_command, guild_only, required_permissions = "MANAGE_GUILD")]
pub async fn set_description(
    ctx: Context<'_>,
    #[description = "The new description"] description: String,
) -> Result<(), Error> {
    let guild_id = ctx.guild_id().ok_or("Must be used in a server")?;

    match ctx
        .data()
        .servers
        .set_description(guild_id.get(), &description)
        .await
    {
        Ok(()) => ctx.say("Description set.").await?,
        Err(e) => ctx.say(e.to_string()).await?,
    };
    Ok(())
}

/// Set the message sent to new members when they join.
#[poise::command(slash_command, guild_only, required_permissions = "MANAGE_GUILD")]
pub async fn set_join_message(
    ctx: Context<'_>,
    #[description = "The new join message"] message: String,
) -> Result<(), Error> {
    let guild_id = ctx.guild_id().ok_or("Must be used in a server")?;

    match ctx
        .data()
        .servers
        .set_join_message(guild_id.get(), &message)
        .await
    {
        Ok(()) => ctx.say("Join message set.").await?,
        Err(e) => ctx.say(e.to_string()).await?,
    };
    Ok(())
}

/// Turn join messages on or off.
#[poise::command(slash_command, guild_only, required_permissions = "MANAGE_GUILD")]
pub async fn toggle_join_message(
    ctx: Context<'_>,
    #[description = "Whether to send join messages"] enabled: bool,
) -> Result<(), Error> {
    let guild_id = ctx.guild_id().ok_or("Must be used in a server")?;

    match ctx
        .data()
        .servers
        .set_send_join_message(guild_id.get(), enabled)
        .await
    {
        Ok(()) => {
            ctx.say(if enabled {
                "Join messages enabled."
            } else {
                "Join messages disabled."
            })
            .await?
        }
        Err(e) => ctx.say(e.to_string()).await?,
    };
    Ok(())
}

/// Mark the server as NSFW or not.
#[poise::command(slash_command, guild_only, required_permissions = "MANAGE_GUILD")]
pub async fn toggle_nsfw(
    ctx: Context<'_>,
    #[description = "Whether the server is NSFW"] nsfw: bool,
) -> Result<(), Error> {
    let guild_id = ctx.guild_id().ok_or("Must be used in a server")?;

    match ctx.data().servers.set_is_nsfw(guild_id.get(), nsfw).await {
        Ok(()) => ctx.say("Server NSFW setting updated.").await?,
        Err(e) => ctx.say(e.to_string()).await?,
    };
    Ok(())
}

/// Turn missing-permission warnings on or off.
#[poise::command(slash_command, guild_only, required_permissions = "MANAGE_GUILD")]
pub async fn toggle_permission_warnings(
    ctx: Context<'_>,
    #[description = "Whether to warn when the bot lacks permissions"] enabled: bool,
) -> Result<(), Error> {
    let guild_id = ctx.guild_id().ok_or("Must be used in a server")?;

    match ctx
        .data()
        .servers
        .set_suppress_permission_warnings(guild_id.get(), !enabled)
        .await
    {
        Ok(()) => {
            ctx.say(if enabled {
                "Permission warnings enabled."
            } else {
                "Permission warnings suppressed."
            })
            .await?
        }
        Err(e) => ctx.say(e.to_string()).await?,
    };
    Ok(())
}
