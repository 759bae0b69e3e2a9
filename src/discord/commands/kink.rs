// Kink preference slash commands.
//
// Preference listings go out as ephemeral replies in SFW channels so
// nobody's list ends up on display by accident.

use poise::serenity_prelude as serenity;

use crate::core::kinks::{KinkCategory, KinkPreference, UserKink};
use crate::discord::{Context, Error};

/// Category choices for slash command parameters.
#[derive(Debug, Clone, Copy, poise::ChoiceParameter)]
pub enum CategoryChoice {
    Anatomy,
    Bodies,
    Clothing,
    Gender,
    General,
    Roleplay,
    Species,
    Themes,
    Other,
}

impl From<CategoryChoice> for KinkCategory {
    fn from(choice: CategoryChoice) -> Self {
        match choice {
            CategoryChoice::Anatomy => KinkCategory::Anatomy,
            CategoryChoice::Bodies => KinkCategory::Bodies,
            CategoryChoice::Clothing => KinkCategory::Clothing,
            CategoryChoice::Gender => KinkCategory::Gender,
            CategoryChoice::General => KinkCategory::General,
            CategoryChoice::Roleplay => KinkCategory::Roleplay,
            CategoryChoice::Species => KinkCategory::Species,
            CategoryChoice::Themes => KinkCategory::Themes,
            CategoryChoice::Other => KinkCategory::Other,
        }
    }
}

/// Preference choices for slash command parameters.
#[derive(Debug, Clone, Copy, poise::ChoiceParameter)]
pub enum PreferenceChoice {
    Favourite,
    Like,
    Maybe,
    No,
    #[name = "No preference"]
    NoPreference,
}

impl From<PreferenceChoice> for KinkPreference {
    fn from(choice: PreferenceChoice) -> Self {
        match choice {
            PreferenceChoice::Favourite => KinkPreference::Favourite,
            PreferenceChoice::Like => KinkPreference::Like,
            PreferenceChoice::Maybe => KinkPreference::Maybe,
            PreferenceChoice::No => KinkPreference::No,
            PreferenceChoice::NoPreference => KinkPreference::NoPreference,
        }
    }
}

/// Kink catalogue and preferences.
#[poise::command(
    slash_command,
    subcommands(
        "show",
        "categories",
        "list",
        "set",
        "mine",
        "overlap",
        "next",
        "reset",
        "import"
    ),
    guild_only
)]
pub async fn kink(_ctx: Context<'_>) -> Result<(), Error> {
    // Parent command - shows help
    Ok(())
}

/// Look up a kink by name.
#[poise::command(slash_command, guild_only)]
pub async fn show(
    ctx: Context<'_>,
    #[description = "The kink's name"] name: String,
) -> Result<(), Error> {
    let kink = match ctx.data().kinks.get_kink_by_name(&name).await {
        Ok(kink) => kink,
        Err(e) => {
            ctx.say(e.to_string()).await?;
            return Ok(());
        }
    };

    let embed = serenity::CreateEmbed::new()
        .title(&kink.name)
        .color(0xAD1457)
        .description(&kink.description)
        .field("Category", kink.category.as_str(), true);

    ctx.send(poise::CreateReply::default().embed(embed).ephemeral(true))
        .await?;
    Ok(())
}

/// List the kink categories.
#[poise::command(slash_command, guild_only)]
pub async fn categories(ctx: Context<'_>) -> Result<(), Error> {
    let categories = ctx
        .data()
        .kinks
        .get_categories()
        .await
        .map_err(|e| Error::from(e.to_string()))?;

    if categories.is_empty() {
        ctx.say("The catalogue is empty. Run /kink import first.")
            .await?;
        return Ok(());
    }

    let names: Vec<&str> = categories.iter().map(|c| c.as_str()).collect();
    ctx.say(format!("Categories: {}", names.join(", "))).await?;
    Ok(())
}

/// List the kinks in a category.
#[poise::command(slash_command, guild_only)]
pub async fn list(
    ctx: Context<'_>,
    #[description = "The category to list"] category: CategoryChoice,
) -> Result<(), Error> {
    let category = KinkCategory::from(category);

    let kinks = match ctx.data().kinks.get_kinks_by_category(category).await {
        Ok(kinks) => kinks,
        Err(e) => {
            ctx.say(e.to_string()).await?;
            return Ok(());
        }
    };

    let names: Vec<String> = kinks.iter().map(|k| k.name.clone()).collect();

    let embed = serenity::CreateEmbed::new()
        .title(format!("Kinks in {}", category.as_str()))
        .color(0xAD1457)
        .description(names.join(", "));

    ctx.send(poise::CreateReply::default().embed(embed).ephemeral(true))
        .await?;
    Ok(())
}

/// Set your preference for a kink.
#[poise::command(slash_command, guild_only)]
pub async fn set(
    ctx: Context<'_>,
    #[description = "The kink's name"] name: String,
    #[description = "How you feel about it"] preference: PreferenceChoice,
) -> Result<(), Error> {
    let kink = match ctx.data().kinks.get_kink_by_name(&name).await {
        Ok(kink) => kink,
        Err(e) => {
            ctx.say(e.to_string()).await?;
            return Ok(());
        }
    };

    let preference = KinkPreference::from(preference);

    match ctx
        .data()
        .kinks
        .set_preference(ctx.author().id.get(), &kink, preference)
        .await
    {
        Ok(()) => {
            ctx.send(
                poise::CreateReply::default()
                    .content(format!("{}: {}.", kink.name, preference.as_str()))
                    .ephemeral(true),
            )
            .await?
        }
        Err(e) => ctx.say(e.to_string()).await?,
    };
    Ok(())
}

/// Show your preferences, or someone else's.
#[poise::command(slash_command, guild_only)]
pub async fn mine(
    ctx: Context<'_>,
    #[description = "User to look at (defaults to you)"] user: Option<serenity::User>,
    #[description = "Only show one category"] category: Option<CategoryChoice>,
) -> Result<(), Error> {
    let target = user.as_ref().unwrap_or_else(|| ctx.author());

    let user_kinks = match category {
        Some(category) => {
            ctx.data()
                .kinks
                .get_user_kinks_by_category(target.id.get(), category.into())
                .await
        }
        None => ctx.data().kinks.get_user_kinks(target.id.get()).await,
    };

    let user_kinks = match user_kinks {
        Ok(user_kinks) => user_kinks,
        Err(e) => {
            ctx.say(e.to_string()).await?;
            return Ok(());
        }
    };

    if user_kinks.is_empty() {
        ctx.send(
            poise::CreateReply::default()
                .content(format!("{} has no set preferences.", target.name))
                .ephemeral(true),
        )
        .await?;
        return Ok(());
    }

    let embed = serenity::CreateEmbed::new()
        .title(format!("Preferences of {}", target.name))
        .color(0xAD1457)
        .description(format_preferences(&user_kinks));

    ctx.send(poise::CreateReply::default().embed(embed).ephemeral(true))
        .await?;
    Ok(())
}

/// Kinks you and another user both like.
#[poise::command(slash_command, guild_only)]
pub async fn overlap(
    ctx: Context<'_>,
    #[description = "The user to compare with"] user: serenity::User,
) -> Result<(), Error> {
    let shared = match ctx
        .data()
        .kinks
        .get_overlap(ctx.author().id.get(), user.id.get())
        .await
    {
        Ok(shared) => shared,
        Err(e) => {
            ctx.say(e.to_string()).await?;
            return Ok(());
        }
    };

    if shared.is_empty() {
        ctx.send(
            poise::CreateReply::default()
                .content(format!("You and {} have no overlapping kinks.", user.name))
                .ephemeral(true),
        )
        .await?;
        return Ok(());
    }

    let names: Vec<String> = shared.iter().map(|k| k.name.clone()).collect();

    let embed = serenity::CreateEmbed::new()
        .title(format!("Shared with {}", user.name))
        .color(0xAD1457)
        .description(names.join(", "));

    ctx.send(poise::CreateReply::default().embed(embed).ephemeral(true))
        .await?;
    Ok(())
}

/// Walk through a category one kink at a time.
///
/// Shows the first kink you haven't set a preference for yet; set one
/// with /kink set and run this again for the next.
#[poise::command(slash_command, guild_only)]
pub async fn next(
    ctx: Context<'_>,
    #[description = "The category to walk through"] category: CategoryChoice,
) -> Result<(), Error> {
    let kink = match ctx
        .data()
        .kinks
        .get_first_kink_without_preference(ctx.author().id.get(), category.into())
        .await
    {
        Ok(kink) => kink,
        Err(e) => {
            ctx.send(
                poise::CreateReply::default()
                    .content(e.to_string())
                    .ephemeral(true),
            )
            .await?;
            return Ok(());
        }
    };

    let embed = serenity::CreateEmbed::new()
        .title(&kink.name)
        .color(0xAD1457)
        .description(&kink.description)
        .footer(serenity::CreateEmbedFooter::new(
            "Set a preference with /kink set, then run /kink next again.",
        ));

    ctx.send(poise::CreateReply::default().embed(embed).ephemeral(true))
        .await?;
    Ok(())
}

/// Wipe all of your preferences.
#[poise::command(slash_command, guild_only)]
pub async fn reset(
    ctx: Context<'_>,
    #[description = "Type \"confirm\" to really wipe everything"] confirm: String,
) -> Result<(), Error> {
    if confirm != "confirm" {
        ctx.send(
            poise::CreateReply::default()
                .content("Nothing was changed. Pass \"confirm\" to wipe your preferences.")
                .ephemeral(true),
        )
        .await?;
        return Ok(());
    }

    match ctx.data().kinks.reset_user_kinks(ctx.author().id.get()).await {
        Ok(removed) => {
            ctx.send(
                poise::CreateReply::default()
                    .content(format!("Removed {} preference(s).", removed))
                    .ephemeral(true),
            )
            .await?
        }
        Err(e) => ctx.say(e.to_string()).await?,
    };
    Ok(())
}

/// Refresh the catalogue from F-List.
#[poise::command(slash_command, guild_only, required_permissions = "MANAGE_GUILD")]
pub async fn import(ctx: Context<'_>) -> Result<(), Error> {
    // The fetch can take a few seconds.
    ctx.defer().await?;

    let fetched = match ctx.data().flist.fetch_kinks().await {
        Ok(fetched) => fetched,
        Err(e) => {
            ctx.say(format!("Import failed: {}", e)).await?;
            return Ok(());
        }
    };

    match ctx.data().kinks.update_kinks(&fetched).await {
        Ok(altered) => {
            ctx.say(format!(
                "Imported {} kinks, {} new or changed.",
                fetched.len(),
                altered
            ))
            .await?
        }
        Err(e) => ctx.say(e.to_string()).await?,
    };
    Ok(())
}

fn format_preferences(user_kinks: &[UserKink]) -> String {
    let mut lines: Vec<String> = user_kinks
        .iter()
        .map(|uk| format!("**{}**: {}", uk.kink.name, uk.preference.as_str()))
        .collect();
    lines.sort();
    lines.join("\n")
}
