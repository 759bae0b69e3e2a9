// Dossier slash commands - shared PDF documents with titles and
// summaries.

use poise::serenity_prelude as serenity;

use crate::discord::{Context, Error};

/// Shared PDF dossiers.
#[poise::command(
    slash_command,
    subcommands(
        "list",
        "show",
        "create",
        "delete",
        "rename",
        "set_summary",
        "upload"
    ),
    guild_only
)]
pub async fn dossier(_ctx: Context<'_>) -> Result<(), Error> {
    // Parent command - shows help
    Ok(())
}

/// List all dossiers.
#[poise::command(slash_command, guild_only)]
pub async fn list(ctx: Context<'_>) -> Result<(), Error> {
    let dossiers = ctx
        .data()
        .dossiers
        .get_dossiers()
        .await
        .map_err(|e| Error::from(e.to_string()))?;

    if dossiers.is_empty() {
        ctx.say("There are no dossiers yet.").await?;
        return Ok(());
    }

    let lines: Vec<String> = dossiers
        .iter()
        .map(|d| format!("**{}**: {}", d.title, d.summary))
        .collect();

    let embed = serenity::CreateEmbed::new()
        .title("Dossiers")
        .color(0x1F8B4C)
        .description(lines.join("\n"));

    ctx.send(poise::CreateReply::default().embed(embed)).await?;
    Ok(())
}

/// Show a dossier and attach its document.
#[poise::command(slash_command, guild_only)]
pub async fn show(
    ctx: Context<'_>,
    #[description = "The dossier's title"] title: String,
) -> Result<(), Error> {
    let dossier = match ctx.data().dossiers.get_dossier_by_title(&title).await {
        Ok(dossier) => dossier,
        Err(e) => {
            ctx.say(e.to_string()).await?;
            return Ok(());
        }
    };

    let mut reply = poise::CreateReply::default()
        .content(format!("**{}**\n{}", dossier.title, dossier.summary));

    match ctx.data().dossiers.get_dossier_data(&dossier).await {
        Ok(data) => {
            reply = reply.attachment(serenity::CreateAttachment::bytes(
                data,
                format!("{}.pdf", dossier.title),
            ));
        }
        Err(_) => {
            reply = reply.content(format!(
                "**{}**\n{}\n\nNo document has been uploaded yet.",
                dossier.title, dossier.summary
            ));
        }
    }

    ctx.send(reply).await?;
    Ok(())
}

/// Create a new dossier.
#[poise::command(slash_command, guild_only, required_permissions = "MANAGE_GUILD")]
pub async fn create(
    ctx: Context<'_>,
    #[description = "The dossier's title"] title: String,
) -> Result<(), Error> {
    match ctx.data().dossiers.create_dossier(&title).await {
        Ok(dossier) => {
            ctx.say(format!(
                "Dossier \"{}\" created. Upload a document with /dossier upload.",
                dossier.title
            ))
            .await?
        }
        Err(e) => ctx.say(e.to_string()).await?,
    };
    Ok(())
}

/// Delete a dossier and its document.
#[poise::command(slash_command, guild_only, required_permissions = "MANAGE_GUILD")]
pub async fn delete(
    ctx: Context<'_>,
    #[description = "The dossier's title"] title: String,
) -> Result<(), Error> {
    let dossier = match ctx.data().dossiers.get_dossier_by_title(&title).await {
        Ok(dossier) => dossier,
        Err(e) => {
            ctx.say(e.to_string()).await?;
            return Ok(());
        }
    };

    match ctx.data().dossiers.delete_dossier(&dossier).await {
        Ok(()) => {
            ctx.say(format!("Dossier \"{}\" deleted.", dossier.title))
                .await?
        }
        Err(e) => ctx.say(e.to_string()).await?,
    };
    Ok(())
}

/// Rename a dossier.
#[poise::command(slash_command, guild_only, required_permissions = "MANAGE_GUILD")]
pub async fn rename(
    ctx: Context<'_>,
    #[description = "The dossier's current title"] title: String,
    #[description = "The new title"] new_title: String,
) -> Result<(), Error> {
    let mut dossier = match ctx.data().dossiers.get_dossier_by_title(&title).await {
        Ok(dossier) => dossier,
        Err(e) => {
            ctx.say(e.to_string()).await?;
            return Ok(());
        }
    };

    match ctx
        .data()
        .dossiers
        .set_dossier_title(&mut dossier, &new_title)
        .await
    {
        Ok(()) => {
            ctx.say(format!("\"{}\" is now \"{}\".", title, new_title))
                .await?
        }
        Err(e) => ctx.say(e.to_string()).await?,
    };
    Ok(())
}

/// Set a dossier's summary.
#[poise::command(slash_command, guild_only, required_permissions = "MANAGE_GUILD")]
pub async fn set_summary(
    ctx: Context<'_>,
    #[description = "The dossier's title"] title: String,
    #[description = "The new summary"] summary: String,
) -> Result<(), Error> {
    let mut dossier = match ctx.data().dossiers.get_dossier_by_title(&title).await {
        Ok(dossier) => dossier,
        Err(e) => {
            ctx.say(e.to_string()).await?;
            return Ok(());
        }
    };

    match ctx
        .data()
        .dossiers
        .set_dossier_summary(&mut dossier, &summary)
        .await
    {
        Ok(()) => ctx.say("Summary set.").await?,
        Err(e) => ctx.say(e.to_string()).await?,
    };
    Ok(())
}

/// Upload a dossier's PDF document.
#[poise::command(slash_command, guild_only, required_permissions = "MANAGE_GUILD")]
pub async fn upload(
    ctx: Context<'_>,
    #[description = "The dossier's title"] title: String,
    #[description = "The PDF to attach"] document: serenity::Attachment,
) -> Result<(), Error> {
    let dossier = match ctx.data().dossiers.get_dossier_by_title(&title).await {
        Ok(dossier) => dossier,
        Err(e) => {
            ctx.say(e.to_string()).await?;
            return Ok(());
        }
    };

    // Attachment downloads can take a moment.
    ctx.defer().await?;

    let data = match document.download().await {
        Ok(data) => data,
        Err(e) => {
            ctx.say(format!("Downloading the attachment failed: {}", e))
                .await?;
            return Ok(());
        }
    };

    match ctx.data().dossiers.set_dossier_data(&dossier, &data).await {
        Ok(()) => {
            ctx.say(format!("Document for \"{}\" stored.", dossier.title))
                .await?
        }
        Err(e) => ctx.say(e.to_string()).await?,
    };
    Ok(())
}
