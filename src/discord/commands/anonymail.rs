// Anonymous mail slash commands.
//
// Mail is relayed to a mailbox's channel under a short sender tag
// instead of the sender's name. Moderators can block a tag without ever
// learning who is behind it.

use poise::serenity_prelude as serenity;

use crate::discord::{Context, Error};

/// Anonymous mailboxes.
#[poise::command(
    slash_command,
    subcommands("list", "send", "create", "delete", "block", "unblock"),
    guild_only
)]
pub async fn mail(_ctx: Context<'_>) -> Result<(), Error> {
    // Parent command - shows help
    Ok(())
}

/// List this server's mailboxes.
#[poise::command(slash_command, guild_only)]
pub async fn list(ctx: Context<'_>) -> Result<(), Error> {
    let guild_id = ctx.guild_id().ok_or("Must be used in a server")?;

    let mailboxes = ctx
        .data()
        .anonymail
        .get_guild_mailboxes(guild_id.get())
        .await
        .map_err(|e| Error::from(e.to_string()))?;

    if mailboxes.is_empty() {
        ctx.say("There are no mailboxes on this server.").await?;
        return Ok(());
    }

    let lines: Vec<String> = mailboxes
        .iter()
        .map(|m| format!("**{}** (delivers to <#{}>)", m.name, m.channel_id))
        .collect();

    let embed = serenity::CreateEmbed::new()
        .title("Mailboxes")
        .color(0x607D8B)
        .description(lines.join("\n"));

    ctx.send(poise::CreateReply::default().embed(embed)).await?;
    Ok(())
}

/// Send anonymous mail to a mailbox.
#[poise::command(slash_command, guild_only, ephemeral)]
pub async fn send(
    ctx: Context<'_>,
    #[description = "The mailbox's name"] mailbox: String,
    #[description = "What to send"] contents: String,
) -> Result<(), Error> {
    let guild_id = ctx.guild_id().ok_or("Must be used in a server")?;

    let mailbox = match ctx
        .data()
        .anonymail
        .get_mailbox(guild_id.get(), &mailbox)
        .await
    {
        Ok(mailbox) => mailbox,
        Err(e) => {
            ctx.say(e.to_string()).await?;
            return Ok(());
        }
    };

    let mail = match ctx
        .data()
        .anonymail
        .prepare_mail(&mailbox, ctx.author().id.get(), &contents)
        .await
    {
        Ok(mail) => mail,
        Err(e) => {
            ctx.say(e.to_string()).await?;
            return Ok(());
        }
    };

    let message = serenity::CreateMessage::new().content(format!(
        "**Anonymous ({})**: {}",
        mail.sender_tag, mail.contents
    ));

    if let Err(e) = serenity::ChannelId::new(mail.channel_id)
        .send_message(ctx.http(), message)
        .await
    {
        ctx.say(format!("Delivering the mail failed: {}", e)).await?;
        return Ok(());
    }

    ctx.say(format!("Delivered to \"{}\".", mailbox.name)).await?;
    Ok(())
}

/// Create a mailbox delivering to a channel.
#[poise::command(slash_command, guild_only, required_permissions = "MANAGE_GUILD")]
pub async fn create(
    ctx: Context<'_>,
    #[description = "The mailbox's name"] name: String,
    #[description = "The channel mail is delivered to"]
    #[channel_types("Text")]
    channel: serenity::GuildChannel,
) -> Result<(), Error> {
    let guild_id = ctx.guild_id().ok_or("Must be used in a server")?;

    match ctx
        .data()
        .anonymail
        .create_mailbox(guild_id.get(), &name, channel.id.get())
        .await
    {
        Ok(mailbox) => {
            ctx.say(format!(
                "Mailbox \"{}\" created, delivering to <#{}>.",
                mailbox.name, channel.id
            ))
            .await?
        }
        Err(e) => ctx.say(e.to_string()).await?,
    };
    Ok(())
}

/// Delete a mailbox.
#[poise::command(slash_command, guild_only, required_permissions = "MANAGE_GUILD")]
pub async fn delete(
    ctx: Context<'_>,
    #[description = "The mailbox's name"] name: String,
) -> Result<(), Error> {
    let guild_id = ctx.guild_id().ok_or("Must be used in a server")?;

    let mailbox = match ctx
        .data()
        .anonymail
        .get_mailbox(guild_id.get(), &name)
        .await
    {
        Ok(mailbox) => mailbox,
        Err(e) => {
            ctx.say(e.to_string()).await?;
            return Ok(());
        }
    };

    match ctx.data().anonymail.delete_mailbox(&mailbox).await {
        Ok(()) => {
            ctx.say(format!("Mailbox \"{}\" deleted.", mailbox.name))
                .await?
        }
        Err(e) => ctx.say(e.to_string()).await?,
    };
    Ok(())
}

/// Block a sender by the tag shown on their mail.
#[poise::command(slash_command, guild_only, required_permissions = "MANAGE_MESSAGES")]
pub async fn block(
    ctx: Context<'_>,
    #[description = "The mailbox's name"] mailbox: String,
    #[description = "The sender tag to block"] tag: String,
) -> Result<(), Error> {
    let guild_id = ctx.guild_id().ok_or("Must be used in a server")?;

    let mailbox = match ctx
        .data()
        .anonymail
        .get_mailbox(guild_id.get(), &mailbox)
        .await
    {
        Ok(mailbox) => mailbox,
        Err(e) => {
            ctx.say(e.to_string()).await?;
            return Ok(());
        }
    };

    match ctx.data().anonymail.block_sender(&mailbox, &tag).await {
        Ok(()) => {
            ctx.say(format!("Sender {} blocked from \"{}\".", tag, mailbox.name))
                .await?
        }
        Err(e) => ctx.say(e.to_string()).await?,
    };
    Ok(())
}

/// Unblock a previously blocked sender tag.
#[poise::command(slash_command, guild_only, required_permissions = "MANAGE_MESSAGES")]
pub async fn unblock(
    ctx: Context<'_>,
    #[description = "The mailbox's name"] mailbox: String,
    #[description = "The sender tag to unblock"] tag: String,
) -> Result<(), Error> {
    let guild_id = ctx.guild_id().ok_or("Must be used in a server")?;

    let mailbox = match ctx
        .data()
        .anonymail
        .get_mailbox(guild_id.get(), &mailbox)
        .await
    {
        Ok(mailbox) => mailbox,
        Err(e) => {
            ctx.say(e.to_string()).await?;
            return Ok(());
        }
    };

    match ctx.data().anonymail.unblock_sender(&mailbox, &tag).await {
        Ok(()) => {
            ctx.say(format!("Sender {} unblocked from \"{}\".", tag, mailbox.name))
                .await?
        }
        Err(e) => ctx.say(e.to_string()).await?,
    };
    Ok(())
}
