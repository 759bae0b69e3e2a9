// Character profile slash commands.
//
// **Notice the pattern:**
// 1. Extract primitive data from Discord types
// 2. Call core service
// 3. Format the response based on the result
//
// This layer is THIN - no business logic, just translation.

use crate::core::characters::{pronouns, Character};
use crate::discord::{Context, Error};
use poise::serenity_prelude as serenity;

/// Character management.
///
/// Create, browse, and play roleplay characters.
#[poise::command(
    slash_command,
    subcommands(
        "create",
        "delete",
        "show",
        "list",
        "assume",
        "clear",
        "set_default",
        "clear_default",
        "set_summary",
        "set_description",
        "set_nickname",
        "set_avatar",
        "set_pronouns",
        "set_nsfw",
        "transfer",
        "add_image",
        "remove_image"
    ),
    guild_only
)]
pub async fn character(_ctx: Context<'_>) -> Result<(), Error> {
    // Parent command - shows help
    Ok(())
}

/// Looks up one of the invoker's characters by name.
async fn own_character(ctx: &Context<'_>, name: &str) -> Result<Character, String> {
    let guild_id = ctx.guild_id().ok_or("Must be used in a server")?;

    ctx.data()
        .characters
        .get_user_character_by_name(guild_id.get(), ctx.author().id.get(), name)
        .await
        .map_err(|e| e.to_string())
}

/// Create a new character.
#[poise::command(slash_command, guild_only)]
pub async fn create(
    ctx: Context<'_>,
    #[description = "The character's name"] name: String,
) -> Result<(), Error> {
    let guild_id = ctx.guild_id().ok_or("Must be used in a server")?;

    match ctx
        .data()
        .characters
        .create_character(guild_id.get(), ctx.author().id.get(), &name)
        .await
    {
        Ok(character) => {
            ctx.say(format!("Character \"{}\" created.", character.name))
                .await?
        }
        Err(e) => ctx.say(e.to_string()).await?,
    };
    Ok(())
}

/// Delete one of your characters.
#[poise::command(slash_command, guild_only)]
pub async fn delete(
    ctx: Context<'_>,
    #[description = "The character's name"] name: String,
) -> Result<(), Error> {
    let character = match own_character(&ctx, &name).await {
        Ok(character) => character,
        Err(message) => {
            ctx.say(message).await?;
            return Ok(());
        }
    };

    match ctx.data().characters.delete_character(&character).await {
        Ok(()) => {
            ctx.say(format!("Character \"{}\" deleted.", character.name))
                .await?
        }
        Err(e) => ctx.say(e.to_string()).await?,
    };
    Ok(())
}

/// Show a character's profile.
#[poise::command(slash_command, guild_only)]
pub async fn show(
    ctx: Context<'_>,
    #[description = "The character's name"] name: String,
    #[description = "The character's owner, if the name is ambiguous"] owner: Option<
        serenity::User,
    >,
) -> Result<(), Error> {
    let guild_id = ctx.guild_id().ok_or("Must be used in a server")?;

    let result = match &owner {
        Some(owner) => {
            ctx.data()
                .characters
                .get_user_character_by_name(guild_id.get(), owner.id.get(), &name)
                .await
        }
        None => {
            ctx.data()
                .characters
                .get_named_character(guild_id.get(), &name)
                .await
        }
    };

    let character = match result {
        Ok(character) => character,
        Err(e) => {
            ctx.say(e.to_string()).await?;
            return Ok(());
        }
    };

    // NSFW profiles stay in NSFW channels
    if character.is_nsfw && !is_nsfw_channel(&ctx).await {
        ctx.say("That character is NSFW and can only be shown in NSFW channels.")
            .await?;
        return Ok(());
    }

    let mut embed = serenity::CreateEmbed::new()
        .title(&character.name)
        .color(0x9B59B6)
        .field(
            "Summary",
            character
                .summary
                .clone()
                .unwrap_or_else(|| "No summary set.".to_string()),
            false,
        )
        .field(
            "Pronouns",
            pronouns::get_provider(&character.pronoun_family)
                .map(|p| p.display())
                .unwrap_or_else(|| character.pronoun_family.clone()),
            true,
        )
        .field("Owner", format!("<@{}>", character.owner_id), true);

    if let Some(description) = &character.description {
        embed = embed.description(description);
    }
    if let Some(avatar_url) = &character.avatar_url {
        embed = embed.thumbnail(avatar_url);
    }
    if let Some(nickname) = &character.nickname {
        embed = embed.field("Nickname", nickname, true);
    }

    ctx.send(poise::CreateReply::default().embed(embed)).await?;
    Ok(())
}

/// List a user's characters.
#[poise::command(slash_command, guild_only)]
pub async fn list(
    ctx: Context<'_>,
    #[description = "User to list characters for (defaults to you)"] user: Option<serenity::User>,
) -> Result<(), Error> {
    let guild_id = ctx.guild_id().ok_or("Must be used in a server")?;
    let target = user.as_ref().unwrap_or_else(|| ctx.author());

    let characters = ctx
        .data()
        .characters
        .get_user_characters(guild_id.get(), target.id.get())
        .await
        .map_err(|e| Error::from(e.to_string()))?;

    if characters.is_empty() {
        ctx.say(format!("{} doesn't have any characters.", target.name))
            .await?;
        return Ok(());
    }

    let lines: Vec<String> = characters
        .iter()
        .map(|c| {
            let mut line = format!("**{}**", c.name);
            if c.is_current {
                line.push_str(" (current)");
            }
            if c.is_default {
                line.push_str(" (default)");
            }
            if let Some(summary) = &c.summary {
                line.push_str(&format!(" - {}", summary));
            }
            line
        })
        .collect();

    let embed = serenity::CreateEmbed::new()
        .title(format!("Characters of {}", target.name))
        .color(0x9B59B6)
        .description(lines.join("\n"));

    ctx.send(poise::CreateReply::default().embed(embed)).await?;
    Ok(())
}

/// Start playing one of your characters.
#[poise::command(slash_command, guild_only, rename = "become")]
pub async fn assume(
    ctx: Context<'_>,
    #[description = "The character's name"] name: String,
) -> Result<(), Error> {
    let character = match own_character(&ctx, &name).await {
        Ok(character) => character,
        Err(message) => {
            ctx.say(message).await?;
            return Ok(());
        }
    };

    if let Err(e) = ctx.data().characters.become_character(&character).await {
        ctx.say(e.to_string()).await?;
        return Ok(());
    }

    apply_character_nickname(&ctx, character.nickname.as_deref()).await;
    ctx.say(format!("You're now playing {}.", character.name))
        .await?;
    Ok(())
}

/// Stop playing your current character.
#[poise::command(slash_command, guild_only)]
pub async fn clear(ctx: Context<'_>) -> Result<(), Error> {
    let guild_id = ctx.guild_id().ok_or("Must be used in a server")?;

    match ctx
        .data()
        .characters
        .clear_current_character(guild_id.get(), ctx.author().id.get())
        .await
    {
        Ok(Some(fallback)) => {
            apply_character_nickname(&ctx, fallback.nickname.as_deref()).await;
            ctx.say(format!(
                "Character cleared. You're now playing your default character, {}.",
                fallback.name
            ))
            .await?
        }
        Ok(None) => {
            apply_character_nickname(&ctx, None).await;
            ctx.say("Character cleared.").await?
        }
        Err(e) => ctx.say(e.to_string()).await?,
    };
    Ok(())
}

/// Set one of your characters as your default.
#[poise::command(slash_command, guild_only)]
pub async fn set_default(
    ctx: Context<'_>,
    #[description = "The character's name"] name: String,
) -> Result<(), Error> {
    let character = match own_character(&ctx, &name).await {
        Ok(character) => character,
        Err(message) => {
            ctx.say(message).await?;
            return Ok(());
        }
    };

    match ctx.data().characters.set_default_character(&character).await {
        Ok(()) => {
            ctx.say(format!("{} is now your default character.", character.name))
                .await?
        }
        Err(e) => ctx.say(e.to_string()).await?,
    };
    Ok(())
}

/// Clear your default character.
#[poise::command(slash_command, guild_only)]
pub async fn clear_default(ctx: Context<'_>) -> Result<(), Error> {
    let guild_id = ctx.guild_id().ok_or("Must be used in a server")?;

    match ctx
        .data()
        .characters
        .clear_default_character(guild_id.get(), ctx.author().id.get())
        .await
    {
        Ok(()) => ctx.say("Default character cleared.").await?,
        Err(e) => ctx.say(e.to_string()).await?,
    };
    Ok(())
}

/// Set a character's summary.
#[poise::command(slash_command, guild_only)]
pub async fn set_summary(
    ctx: Context<'_>,
    #[description = "The character's name"] name: String,
    #[description = "The new summary"] summary: String,
) -> Result<(), Error> {
    let character = match own_character(&ctx, &name).await {
        Ok(character) => character,
        Err(message) => {
            ctx.say(message).await?;
            return Ok(());
        }
    };

    let result = ctx.data().characters.set_summary(&character, &summary).await;
    report_update(&ctx, result).await
}

/// Set a character's description.
#[poise::command(slash_command, guild_only)]
pub async fn set_description(
    ctx: Context<'_>,
    #[description = "The character's name"] name: String,
    #[description = "The new description"] description: String,
) -> Result<(), Error> {
    let character = match own_character(&ctx, &name).await {
        Ok(character) => character,
        Err(message) => {
            ctx.say(message).await?;
            return Ok(());
        }
    };

    let result = ctx
        .data()
        .characters
        .set_description(&character, &description)
        .await;
    report_update(&ctx, result).await
}

/// Set the nickname you take on while playing a character.
#[poise::command(slash_command, guild_only)]
pub async fn set_nickname(
    ctx: Context<'_>,
    #[description = "The character's name"] name: String,
    #[description = "The new nickname"] nickname: String,
) -> Result<(), Error> {
    let character = match own_character(&ctx, &name).await {
        Ok(character) => character,
        Err(message) => {
            ctx.say(message).await?;
            return Ok(());
        }
    };

    let result = ctx
        .data()
        .characters
        .set_nickname(&character, &nickname)
        .await;
    report_update(&ctx, result).await
}

/// Set a character's avatar.
#[poise::command(slash_command, guild_only)]
pub async fn set_avatar(
    ctx: Context<'_>,
    #[description = "The character's name"] name: String,
    #[description = "The avatar image URL"] url: String,
) -> Result<(), Error> {
    let character = match own_character(&ctx, &name).await {
        Ok(character) => character,
        Err(message) => {
            ctx.say(message).await?;
            return Ok(());
        }
    };

    let result = ctx.data().characters.set_avatar(&character, &url).await;
    report_update(&ctx, result).await
}

/// Set a character's pronouns.
#[poise::command(slash_command, guild_only)]
pub async fn set_pronouns(
    ctx: Context<'_>,
    #[description = "The character's name"] name: String,
    #[description = "The pronoun family, e.g. \"they\" or \"she\""] pronouns: String,
) -> Result<(), Error> {
    let character = match own_character(&ctx, &name).await {
        Ok(character) => character,
        Err(message) => {
            ctx.say(message).await?;
            return Ok(());
        }
    };

    let result = ctx
        .data()
        .characters
        .set_pronouns(&character, &pronouns)
        .await;
    report_update(&ctx, result).await
}

/// Mark a character as NSFW or not.
#[poise::command(slash_command, guild_only)]
pub async fn set_nsfw(
    ctx: Context<'_>,
    #[description = "The character's name"] name: String,
    #[description = "Whether the character is NSFW"] nsfw: bool,
) -> Result<(), Error> {
    let character = match own_character(&ctx, &name).await {
        Ok(character) => character,
        Err(message) => {
            ctx.say(message).await?;
            return Ok(());
        }
    };

    let result = ctx.data().characters.set_is_nsfw(&character, nsfw).await;
    report_update(&ctx, result).await
}

/// Give one of your characters to another user.
#[poise::command(slash_command, guild_only)]
pub async fn transfer(
    ctx: Context<'_>,
    #[description = "The character's name"] name: String,
    #[description = "The new owner"] new_owner: serenity::User,
) -> Result<(), Error> {
    let character = match own_character(&ctx, &name).await {
        Ok(character) => character,
        Err(message) => {
            ctx.say(message).await?;
            return Ok(());
        }
    };

    match ctx
        .data()
        .characters
        .transfer_ownership(&character, new_owner.id.get())
        .await
    {
        Ok(()) => {
            ctx.say(format!(
                "{} now belongs to {}.",
                character.name, new_owner.name
            ))
            .await?
        }
        Err(e) => ctx.say(e.to_string()).await?,
    };
    Ok(())
}

/// Add an image to a character's gallery.
#[poise::command(slash_command, guild_only)]
pub async fn add_image(
    ctx: Context<'_>,
    #[description = "The character's name"] name: String,
    #[description = "A name for the image"] image_name: String,
    #[description = "The image URL"] url: String,
    #[description = "An optional caption"] caption: Option<String>,
    #[description = "Whether the image is NSFW"] nsfw: Option<bool>,
) -> Result<(), Error> {
    let character = match own_character(&ctx, &name).await {
        Ok(character) => character,
        Err(message) => {
            ctx.say(message).await?;
            return Ok(());
        }
    };

    match ctx
        .data()
        .characters
        .add_image(
            &character,
            &image_name,
            &url,
            caption.as_deref(),
            nsfw.unwrap_or(false),
        )
        .await
    {
        Ok(image) => {
            ctx.say(format!("Image \"{}\" added.", image.name)).await?
        }
        Err(e) => ctx.say(e.to_string()).await?,
    };
    Ok(())
}

/// Remove an image from a character's gallery.
#[poise::command(slash_command, guild_only)]
pub async fn remove_image(
    ctx: Context<'_>,
    #[description = "The character's name"] name: String,
    #[description = "The image's name"] image_name: String,
) -> Result<(), Error> {
    let character = match own_character(&ctx, &name).await {
        Ok(character) => character,
        Err(message) => {
            ctx.say(message).await?;
            return Ok(());
        }
    };

    match ctx
        .data()
        .characters
        .remove_image(&character, &image_name)
        .await
    {
        Ok(()) => ctx.say(format!("Image \"{}\" removed.", image_name)).await?,
        Err(e) => ctx.say(e.to_string()).await?,
    };
    Ok(())
}

/// Shared response for the setter commands.
async fn report_update(
    ctx: &Context<'_>,
    result: Result<(), crate::core::characters::CharacterError>,
) -> Result<(), Error> {
    match result {
        Ok(()) => ctx.say("Character updated.").await?,
        Err(e) => ctx.say(e.to_string()).await?,
    };
    Ok(())
}

/// Best-effort nickname change when assuming or clearing a character.
/// Warns the user once unless the server suppresses permission warnings.
async fn apply_character_nickname(ctx: &Context<'_>, nickname: Option<&str>) {
    let Some(guild_id) = ctx.guild_id() else {
        return;
    };

    let builder = serenity::EditMember::new().nickname(nickname.unwrap_or_default());
    if let Err(e) = guild_id
        .edit_member(ctx.http(), ctx.author().id, builder)
        .await
    {
        tracing::debug!("Could not update nickname: {}", e);

        let suppress = ctx
            .data()
            .servers
            .get_or_register_server(guild_id.get())
            .await
            .map(|s| s.suppress_permission_warnings)
            .unwrap_or(true);

        if !suppress {
            let _ = ctx
                .say("I couldn't change your nickname. I may be missing permissions, or you outrank me.")
                .await;
        }
    }
}

async fn is_nsfw_channel(ctx: &Context<'_>) -> bool {
    ctx.channel_id()
        .to_channel(ctx.http())
        .await
        .ok()
        .and_then(|channel| channel.guild())
        .map(|channel| channel.nsfw)
        .unwrap_or(false)
}
