// User profile slash commands - bios and timezones.

use crate::discord::{Context, Error};
use poise::serenity_prelude as serenity;

/// Your user profile.
///
/// Look at or change your bio and timezone.
#[poise::command(
    slash_command,
    subcommands("show", "set_bio", "set_timezone")
)]
pub async fn profile(_ctx: Context<'_>) -> Result<(), Error> {
    // Parent command - shows help
    Ok(())
}

/// Show a user's profile.
#[poise::command(slash_command)]
pub async fn show(
    ctx: Context<'_>,
    #[description = "User to look at (defaults to you)"] user: Option<serenity::User>,
) -> Result<(), Error> {
    let target = user.as_ref().unwrap_or_else(|| ctx.author());

    if target.bot {
        ctx.say("Bots don't have profiles.").await?;
        return Ok(());
    }

    let profile = ctx
        .data()
        .users
        .get_or_register_user(target.id.get())
        .await
        .map_err(|e| Error::from(e.to_string()))?;

    let timezone = profile
        .timezone_offset
        .map(|offset| format!("UTC{:+}", offset))
        .unwrap_or_else(|| "Not set".to_string());

    let embed = serenity::CreateEmbed::new()
        .title(format!("Profile of {}", target.name))
        .color(0x5865F2)
        .thumbnail(target.face())
        .field(
            "Bio",
            profile.bio.unwrap_or_else(|| "Not set".to_string()),
            false,
        )
        .field("Timezone", timezone, true);

    ctx.send(poise::CreateReply::default().embed(embed)).await?;
    Ok(())
}

/// Set your bio.
#[poise::command(slash_command)]
pub async fn set_bio(
    ctx: Context<'_>,
    #[description = "Your new bio"] bio: String,
) -> Result<(), Error> {
    match ctx.data().users.set_bio(ctx.author().id.get(), &bio).await {
        Ok(()) => ctx.say("Bio set.").await?,
        Err(e) => ctx.say(e.to_string()).await?,
    };
    Ok(())
}

/// Set your timezone as a UTC offset.
#[poise::command(slash_command)]
pub async fn set_timezone(
    ctx: Context<'_>,
    #[description = "Hours offset from UTC, -12 to 14"] offset: i32,
) -> Result<(), Error> {
    match ctx
        .data()
        .users
        .set_timezone(ctx.author().id.get(), offset)
        .await
    {
        Ok(()) => ctx.say(format!("Timezone set to UTC{:+}.", offset)).await?,
        Err(e) => ctx.say(e.to_string()).await?,
    };
    Ok(())
}
