// Autorole slash commands - automatic role grants with configurable
// conditions and optional moderator sign-off.

use poise::serenity_prelude as serenity;

use crate::core::autorole::{AutoroleCondition, AutoroleConfiguration, ConfirmationStatus};
use crate::discord::{Context, Error};

/// Automatic role grants.
#[poise::command(
    slash_command,
    subcommands(
        "create",
        "delete",
        "list",
        "show",
        "enable",
        "disable",
        "set_confirmation",
        "add_guild_messages",
        "add_channel_messages",
        "add_membership_time",
        "add_recent_activity",
        "add_required_role",
        "add_reaction",
        "remove_condition",
        "pending",
        "affirm",
        "deny"
    ),
    guild_only,
    required_permissions = "MANAGE_ROLES"
)]
pub async fn autorole(_ctx: Context<'_>) -> Result<(), Error> {
    // Parent command - shows help
    Ok(())
}

/// Looks up the autorole configured for a role on this server.
async fn configured_autorole(
    ctx: &Context<'_>,
    role: &serenity::Role,
) -> Result<AutoroleConfiguration, String> {
    let guild_id = ctx.guild_id().ok_or("Must be used in a server")?;

    ctx.data()
        .autorole
        .get_autorole(guild_id.get(), role.id.get())
        .await
        .map_err(|e| e.to_string())
}

fn describe_condition(condition: &AutoroleCondition) -> String {
    match condition {
        AutoroleCondition::MessageCountInGuild { count } => {
            format!("At least {} messages in the server", count)
        }
        AutoroleCondition::MessageCountInChannel { channel_id, count } => {
            format!("At least {} messages in <#{}>", count, channel_id)
        }
        AutoroleCondition::TimeSinceJoin { seconds } => {
            format!("Member for at least {} day(s)", seconds / 86400)
        }
        AutoroleCondition::TimeSinceLastActivity { seconds } => {
            format!("Active within the last {} day(s)", seconds / 86400)
        }
        AutoroleCondition::HasRole { role_id } => format!("Holds <@&{}>", role_id),
        AutoroleCondition::ReactionToMessage { message_id } => {
            format!("Reacted to message {}", message_id)
        }
    }
}

/// Configure a role to be granted automatically.
#[poise::command(slash_command, guild_only, required_permissions = "MANAGE_ROLES")]
pub async fn create(
    ctx: Context<'_>,
    #[description = "The role to grant"] role: serenity::Role,
) -> Result<(), Error> {
    let guild_id = ctx.guild_id().ok_or("Must be used in a server")?;

    match ctx
        .data()
        .autorole
        .create_autorole(guild_id.get(), role.id.get())
        .await
    {
        Ok(_) => {
            ctx.say(format!(
                "Autorole for {} created. Add conditions, then enable it.",
                role.name
            ))
            .await?
        }
        Err(e) => ctx.say(e.to_string()).await?,
    };
    Ok(())
}

/// Remove a role's autorole configuration.
#[poise::command(slash_command, guild_only, required_permissions = "MANAGE_ROLES")]
pub async fn delete(
    ctx: Context<'_>,
    #[description = "The configured role"] role: serenity::Role,
) -> Result<(), Error> {
    let autorole = match configured_autorole(&ctx, &role).await {
        Ok(autorole) => autorole,
        Err(message) => {
            ctx.say(message).await?;
            return Ok(());
        }
    };

    match ctx.data().autorole.delete_autorole(&autorole).await {
        Ok(()) => {
            ctx.say(format!("Autorole for {} deleted.", role.name))
                .await?
        }
        Err(e) => ctx.say(e.to_string()).await?,
    };
    Ok(())
}

/// List this server's autoroles.
#[poise::command(slash_command, guild_only, required_permissions = "MANAGE_ROLES")]
pub async fn list(ctx: Context<'_>) -> Result<(), Error> {
    let guild_id = ctx.guild_id().ok_or("Must be used in a server")?;

    let autoroles = ctx
        .data()
        .autorole
        .get_guild_autoroles(guild_id.get())
        .await
        .map_err(|e| Error::from(e.to_string()))?;

    if autoroles.is_empty() {
        ctx.say("There are no autoroles on this server.").await?;
        return Ok(());
    }

    let lines: Vec<String> = autoroles
        .iter()
        .map(|a| {
            format!(
                "<@&{}> ({}, {} condition(s){})",
                a.role_id,
                if a.is_enabled { "enabled" } else { "disabled" },
                a.conditions.len(),
                if a.requires_confirmation {
                    ", needs sign-off"
                } else {
                    ""
                }
            )
        })
        .collect();

    let embed = serenity::CreateEmbed::new()
        .title("Autoroles")
        .color(0x3498DB)
        .description(lines.join("\n"));

    ctx.send(poise::CreateReply::default().embed(embed)).await?;
    Ok(())
}

/// Show an autorole's conditions.
#[poise::command(slash_command, guild_only, required_permissions = "MANAGE_ROLES")]
pub async fn show(
    ctx: Context<'_>,
    #[description = "The configured role"] role: serenity::Role,
) -> Result<(), Error> {
    let autorole = match configured_autorole(&ctx, &role).await {
        Ok(autorole) => autorole,
        Err(message) => {
            ctx.say(message).await?;
            return Ok(());
        }
    };

    let conditions = if autorole.conditions.is_empty() {
        "No conditions configured.".to_string()
    } else {
        autorole
            .conditions
            .iter()
            .enumerate()
            .map(|(i, c)| format!("{}. {}", i + 1, describe_condition(c)))
            .collect::<Vec<_>>()
            .join("\n")
    };

    let embed = serenity::CreateEmbed::new()
        .title(format!("Autorole: {}", role.name))
        .color(0x3498DB)
        .field(
            "Status",
            if autorole.is_enabled {
                "Enabled"
            } else {
                "Disabled"
            },
            true,
        )
        .field(
            "Sign-off",
            if autorole.requires_confirmation {
                "Required"
            } else {
                "Automatic"
            },
            true,
        )
        .field("Conditions", conditions, false);

    ctx.send(poise::CreateReply::default().embed(embed)).await?;
    Ok(())
}

/// Enable an autorole.
#[poise::command(slash_command, guild_only, required_permissions = "MANAGE_ROLES")]
pub async fn enable(
    ctx: Context<'_>,
    #[description = "The configured role"] role: serenity::Role,
) -> Result<(), Error> {
    let mut autorole = match configured_autorole(&ctx, &role).await {
        Ok(autorole) => autorole,
        Err(message) => {
            ctx.say(message).await?;
            return Ok(());
        }
    };

    match ctx.data().autorole.enable_autorole(&mut autorole).await {
        Ok(()) => {
            ctx.say(format!("Autorole for {} enabled.", role.name))
                .await?
        }
        Err(e) => ctx.say(e.to_string()).await?,
    };
    Ok(())
}

/// Disable an autorole.
#[poise::command(slash_command, guild_only, required_permissions = "MANAGE_ROLES")]
pub async fn disable(
    ctx: Context<'_>,
    #[description = "The configured role"] role: serenity::Role,
) -> Result<(), Error> {
    let mut autorole = match configured_autorole(&ctx, &role).await {
        Ok(autorole) => autorole,
        Err(message) => {
            ctx.say(message).await?;
            return Ok(());
        }
    };

    match ctx.data().autorole.disable_autorole(&mut autorole).await {
        Ok(()) => {
            ctx.say(format!("Autorole for {} disabled.", role.name))
                .await?
        }
        Err(e) => ctx.say(e.to_string()).await?,
    };
    Ok(())
}

/// Require or drop moderator sign-off before the role is granted.
#[poise::command(slash_command, guild_only, required_permissions = "MANAGE_ROLES")]
pub async fn set_confirmation(
    ctx: Context<'_>,
    #[description = "The configured role"] role: serenity::Role,
    #[description = "Whether a moderator must sign off"] required: bool,
) -> Result<(), Error> {
    let mut autorole = match configured_autorole(&ctx, &role).await {
        Ok(autorole) => autorole,
        Err(message) => {
            ctx.say(message).await?;
            return Ok(());
        }
    };

    match ctx
        .data()
        .autorole
        .set_requires_confirmation(&mut autorole, required)
        .await
    {
        Ok(()) => {
            ctx.say(if required {
                "Qualified users will be queued for sign-off."
            } else {
                "The role will be granted automatically."
            })
            .await?
        }
        Err(e) => ctx.say(e.to_string()).await?,
    };
    Ok(())
}

async fn add_condition(
    ctx: &Context<'_>,
    role: &serenity::Role,
    condition: AutoroleCondition,
) -> Result<(), Error> {
    let mut autorole = match configured_autorole(ctx, role).await {
        Ok(autorole) => autorole,
        Err(message) => {
            ctx.say(message).await?;
            return Ok(());
        }
    };

    let description = describe_condition(&condition);
    match ctx
        .data()
        .autorole
        .add_condition(&mut autorole, condition)
        .await
    {
        Ok(()) => {
            ctx.say(format!("Condition added to {}: {}", role.name, description))
                .await?
        }
        Err(e) => ctx.say(e.to_string()).await?,
    };
    Ok(())
}

/// Require a number of messages anywhere in the server.
#[poise::command(slash_command, guild_only, required_permissions = "MANAGE_ROLES")]
pub async fn add_guild_messages(
    ctx: Context<'_>,
    #[description = "The configured role"] role: serenity::Role,
    #[description = "Messages required"] #[min = 1] count: u64,
) -> Result<(), Error> {
    add_condition(&ctx, &role, AutoroleCondition::MessageCountInGuild { count }).await
}

/// Require a number of messages in one channel.
#[poise::command(slash_command, guild_only, required_permissions = "MANAGE_ROLES")]
pub async fn add_channel_messages(
    ctx: Context<'_>,
    #[description = "The configured role"] role: serenity::Role,
    #[description = "The channel to count in"]
    #[channel_types("Text")]
    channel: serenity::GuildChannel,
    #[description = "Messages required"] #[min = 1] count: u64,
) -> Result<(), Error> {
    add_condition(
        &ctx,
        &role,
        AutoroleCondition::MessageCountInChannel {
            channel_id: channel.id.get(),
            count,
        },
    )
    .await
}

/// Require a minimum membership age.
#[poise::command(slash_command, guild_only, required_permissions = "MANAGE_ROLES")]
pub async fn add_membership_time(
    ctx: Context<'_>,
    #[description = "The configured role"] role: serenity::Role,
    #[description = "Days since joining"] #[min = 1] days: u32,
) -> Result<(), Error> {
    add_condition(
        &ctx,
        &role,
        AutoroleCondition::TimeSinceJoin {
            seconds: i64::from(days) * 86400,
        },
    )
    .await
}

/// Require activity within a recent window.
#[poise::command(slash_command, guild_only, required_permissions = "MANAGE_ROLES")]
pub async fn add_recent_activity(
    ctx: Context<'_>,
    #[description = "The configured role"] role: serenity::Role,
    #[description = "Maximum days since last activity"] #[min = 1] days: u32,
) -> Result<(), Error> {
    add_condition(
        &ctx,
        &role,
        AutoroleCondition::TimeSinceLastActivity {
            seconds: i64::from(days) * 86400,
        },
    )
    .await
}

/// Require the user to hold another role.
#[poise::command(slash_command, guild_only, required_permissions = "MANAGE_ROLES")]
pub async fn add_required_role(
    ctx: Context<'_>,
    #[description = "The configured role"] role: serenity::Role,
    #[description = "The role the user must already hold"] required: serenity::Role,
) -> Result<(), Error> {
    add_condition(
        &ctx,
        &role,
        AutoroleCondition::HasRole {
            role_id: required.id.get(),
        },
    )
    .await
}

/// Require a reaction to a specific message.
#[poise::command(slash_command, guild_only, required_permissions = "MANAGE_ROLES")]
pub async fn add_reaction(
    ctx: Context<'_>,
    #[description = "The configured role"] role: serenity::Role,
    #[description = "The message's ID"] message_id: String,
) -> Result<(), Error> {
    let message_id: u64 = match message_id.parse() {
        Ok(id) => id,
        Err(_) => {
            ctx.say("That isn't a valid message ID.").await?;
            return Ok(());
        }
    };

    add_condition(&ctx, &role, AutoroleCondition::ReactionToMessage { message_id }).await
}

/// Remove a condition by its number in /autorole show.
#[poise::command(slash_command, guild_only, required_permissions = "MANAGE_ROLES")]
pub async fn remove_condition(
    ctx: Context<'_>,
    #[description = "The configured role"] role: serenity::Role,
    #[description = "The condition's number"] #[min = 1] number: usize,
) -> Result<(), Error> {
    let mut autorole = match configured_autorole(&ctx, &role).await {
        Ok(autorole) => autorole,
        Err(message) => {
            ctx.say(message).await?;
            return Ok(());
        }
    };

    match ctx
        .data()
        .autorole
        .remove_condition(&mut autorole, number - 1)
        .await
    {
        Ok(removed) => {
            ctx.say(format!("Removed: {}", describe_condition(&removed)))
                .await?
        }
        Err(e) => ctx.say(e.to_string()).await?,
    };
    Ok(())
}

/// List users waiting for sign-off.
#[poise::command(slash_command, guild_only, required_permissions = "MANAGE_ROLES")]
pub async fn pending(
    ctx: Context<'_>,
    #[description = "The configured role"] role: serenity::Role,
) -> Result<(), Error> {
    let autorole = match configured_autorole(&ctx, &role).await {
        Ok(autorole) => autorole,
        Err(message) => {
            ctx.say(message).await?;
            return Ok(());
        }
    };

    let pending = ctx
        .data()
        .autorole
        .get_pending_confirmations(&autorole)
        .await
        .map_err(|e| Error::from(e.to_string()))?;

    if pending.is_empty() {
        ctx.say(format!("Nobody is waiting for {}.", role.name))
            .await?;
        return Ok(());
    }

    let mentions: Vec<String> = pending
        .iter()
        .map(|c| format!("<@{}>", c.user_id))
        .collect();

    ctx.say(format!(
        "Waiting for {}: {}",
        role.name,
        mentions.join(", ")
    ))
    .await?;
    Ok(())
}

/// Sign off a queued user and grant them the role.
#[poise::command(slash_command, guild_only, required_permissions = "MANAGE_ROLES")]
pub async fn affirm(
    ctx: Context<'_>,
    #[description = "The configured role"] role: serenity::Role,
    #[description = "The user to sign off"] user: serenity::User,
) -> Result<(), Error> {
    let guild_id = ctx.guild_id().ok_or("Must be used in a server")?;

    let autorole = match configured_autorole(&ctx, &role).await {
        Ok(autorole) => autorole,
        Err(message) => {
            ctx.say(message).await?;
            return Ok(());
        }
    };

    if let Err(e) = ctx
        .data()
        .autorole
        .set_confirmation(&autorole, user.id.get(), ConfirmationStatus::Affirmed)
        .await
    {
        ctx.say(e.to_string()).await?;
        return Ok(());
    }

    if let Err(e) = ctx
        .http()
        .add_member_role(guild_id, user.id, role.id, Some("Autorole signed off"))
        .await
    {
        ctx.say(format!(
            "Signed off, but granting the role failed: {}",
            e
        ))
        .await?;
        return Ok(());
    }

    ctx.say(format!("{} now has {}.", user.name, role.name))
        .await?;
    Ok(())
}

/// Deny a queued user.
#[poise::command(slash_command, guild_only, required_permissions = "MANAGE_ROLES")]
pub async fn deny(
    ctx: Context<'_>,
    #[description = "The configured role"] role: serenity::Role,
    #[description = "The user to deny"] user: serenity::User,
) -> Result<(), Error> {
    let autorole = match configured_autorole(&ctx, &role).await {
        Ok(autorole) => autorole,
        Err(message) => {
            ctx.say(message).await?;
            return Ok(());
        }
    };

    match ctx
        .data()
        .autorole
        .set_confirmation(&autorole, user.id.get(), ConfirmationStatus::Denied)
        .await
    {
        Ok(_) => {
            ctx.say(format!("{} will not be granted {}.", user.name, role.name))
                .await?
        }
        Err(e) => ctx.say(e.to_string()).await?,
    };
    Ok(())
}
