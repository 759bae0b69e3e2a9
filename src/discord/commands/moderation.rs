// Moderation slash commands - notes, warnings, ban records, settings.

use chrono::{DateTime, Utc};
use poise::serenity_prelude as serenity;

use crate::discord::{Context, Error};

/// Moderation settings.
#[poise::command(
    slash_command,
    subcommands(
        "show",
        "set_log_channel",
        "set_monitoring_channel",
        "set_warning_threshold"
    ),
    guild_only,
    required_permissions = "MANAGE_GUILD"
)]
pub async fn moderation(_ctx: Context<'_>) -> Result<(), Error> {
    // Parent command - shows help
    Ok(())
}

/// Show this server's moderation settings.
#[poise::command(slash_command, guild_only, required_permissions = "MANAGE_GUILD")]
pub async fn show(ctx: Context<'_>) -> Result<(), Error> {
    let guild_id = ctx.guild_id().ok_or("Must be used in a server")?;

    let settings = ctx
        .data()
        .moderation
        .get_or_create_settings(guild_id.get())
        .await
        .map_err(|e| Error::from(e.to_string()))?;

    let channel = |id: Option<u64>| {
        id.map(|id| format!("<#{}>", id))
            .unwrap_or_else(|| "Not set".to_string())
    };

    let embed = serenity::CreateEmbed::new()
        .title("Moderation Settings")
        .color(0x992D22)
        .field("Log channel", channel(settings.moderation_log_channel), true)
        .field(
            "Monitoring channel",
            channel(settings.monitoring_channel),
            true,
        )
        .field(
            "Warning threshold",
            settings.warning_threshold.to_string(),
            true,
        );

    ctx.send(poise::CreateReply::default().embed(embed)).await?;
    Ok(())
}

/// Set the channel moderation events are logged to.
#[poise::command(slash_command, guild_only, required_permissions = "MANAGE_GUILD")]
pub async fn set_log_channel(
    ctx: Context<'_>,
    #[description = "The log channel"]
    #[channel_types("Text")]
    channel: serenity::GuildChannel,
) -> Result<(), Error> {
    let guild_id = ctx.guild_id().ok_or("Must be used in a server")?;

    match ctx
        .data()
        .moderation
        .set_moderation_log_channel(guild_id.get(), channel.id.get())
        .await
    {
        Ok(()) => {
            ctx.say(format!("Moderation events will be logged to <#{}>.", channel.id))
                .await?
        }
        Err(e) => ctx.say(e.to_string()).await?,
    };
    Ok(())
}

/// Set the channel member joins and leaves are mirrored to.
#[poise::command(slash_command, guild_only, required_permissions = "MANAGE_GUILD")]
pub async fn set_monitoring_channel(
    ctx: Context<'_>,
    #[description = "The monitoring channel"]
    #[channel_types("Text")]
    channel: serenity::GuildChannel,
) -> Result<(), Error> {
    let guild_id = ctx.guild_id().ok_or("Must be used in a server")?;

    match ctx
        .data()
        .moderation
        .set_monitoring_channel(guild_id.get(), channel.id.get())
        .await
    {
        Ok(()) => {
            ctx.say(format!("Member events will be mirrored to <#{}>.", channel.id))
                .await?
        }
        Err(e) => ctx.say(e.to_string()).await?,
    };
    Ok(())
}

/// Set the warning count at which moderators are alerted.
#[poise::command(slash_command, guild_only, required_permissions = "MANAGE_GUILD")]
pub async fn set_warning_threshold(
    ctx: Context<'_>,
    #[description = "Number of warnings"] threshold: i32,
) -> Result<(), Error> {
    let guild_id = ctx.guild_id().ok_or("Must be used in a server")?;

    match ctx
        .data()
        .moderation
        .set_warning_threshold(guild_id.get(), threshold)
        .await
    {
        Ok(()) => ctx.say(format!("Warning threshold set to {}.", threshold)).await?,
        Err(e) => ctx.say(e.to_string()).await?,
    };
    Ok(())
}

// ----------------------------------------------------------------------
// Notes
// ----------------------------------------------------------------------

/// Moderator notes about users.
#[poise::command(
    slash_command,
    subcommands("note_add", "note_edit", "note_delete", "note_list"),
    guild_only,
    required_permissions = "MANAGE_MESSAGES"
)]
pub async fn note(_ctx: Context<'_>) -> Result<(), Error> {
    // Parent command - shows help
    Ok(())
}

/// Add a note about a user.
#[poise::command(slash_command, rename = "add", guild_only, required_permissions = "MANAGE_MESSAGES")]
pub async fn note_add(
    ctx: Context<'_>,
    #[description = "The user the note is about"] user: serenity::User,
    #[description = "The note"] content: String,
) -> Result<(), Error> {
    let guild_id = ctx.guild_id().ok_or("Must be used in a server")?;

    match ctx
        .data()
        .moderation
        .add_note(guild_id.get(), user.id.get(), ctx.author().id.get(), &content)
        .await
    {
        Ok(note) => {
            ctx.say(format!("Note #{} added for {}.", note.id, user.name))
                .await?
        }
        Err(e) => ctx.say(e.to_string()).await?,
    };
    Ok(())
}

/// Rewrite an existing note.
#[poise::command(slash_command, rename = "edit", guild_only, required_permissions = "MANAGE_MESSAGES")]
pub async fn note_edit(
    ctx: Context<'_>,
    #[description = "The note's ID"] note_id: i64,
    #[description = "The new contents"] content: String,
) -> Result<(), Error> {
    let note = match ctx.data().moderation.get_note(note_id).await {
        Ok(note) => note,
        Err(e) => {
            ctx.say(e.to_string()).await?;
            return Ok(());
        }
    };

    match ctx.data().moderation.set_note_contents(&note, &content).await {
        Ok(()) => ctx.say(format!("Note #{} updated.", note.id)).await?,
        Err(e) => ctx.say(e.to_string()).await?,
    };
    Ok(())
}

/// Delete a note.
#[poise::command(slash_command, rename = "delete", guild_only, required_permissions = "MANAGE_MESSAGES")]
pub async fn note_delete(
    ctx: Context<'_>,
    #[description = "The note's ID"] note_id: i64,
) -> Result<(), Error> {
    let note = match ctx.data().moderation.get_note(note_id).await {
        Ok(note) => note,
        Err(e) => {
            ctx.say(e.to_string()).await?;
            return Ok(());
        }
    };

    match ctx.data().moderation.delete_note(&note).await {
        Ok(()) => ctx.say(format!("Note #{} deleted.", note.id)).await?,
        Err(e) => ctx.say(e.to_string()).await?,
    };
    Ok(())
}

/// List the notes about a user.
#[poise::command(slash_command, rename = "list", guild_only, required_permissions = "MANAGE_MESSAGES")]
pub async fn note_list(
    ctx: Context<'_>,
    #[description = "The user to look up"] user: serenity::User,
) -> Result<(), Error> {
    let guild_id = ctx.guild_id().ok_or("Must be used in a server")?;

    let notes = ctx
        .data()
        .moderation
        .get_user_notes(guild_id.get(), user.id.get())
        .await
        .map_err(|e| Error::from(e.to_string()))?;

    if notes.is_empty() {
        ctx.say(format!("There are no notes about {}.", user.name))
            .await?;
        return Ok(());
    }

    let lines: Vec<String> = notes
        .iter()
        .map(|n| {
            format!(
                "**#{}** by <@{}> on {}: {}",
                n.id,
                n.author_id,
                n.created_at.format("%Y-%m-%d"),
                n.content
            )
        })
        .collect();

    let embed = serenity::CreateEmbed::new()
        .title(format!("Notes about {}", user.name))
        .color(0x992D22)
        .description(lines.join("\n"));

    ctx.send(poise::CreateReply::default().embed(embed)).await?;
    Ok(())
}

// ----------------------------------------------------------------------
// Warnings
// ----------------------------------------------------------------------

/// Warnings issued to users.
#[poise::command(
    slash_command,
    subcommands(
        "warning_add",
        "warning_set_reason",
        "warning_set_expiry",
        "warning_delete",
        "warning_list"
    ),
    guild_only,
    required_permissions = "MODERATE_MEMBERS"
)]
pub async fn warning(_ctx: Context<'_>) -> Result<(), Error> {
    // Parent command - shows help
    Ok(())
}

/// Warn a user.
#[poise::command(slash_command, rename = "add", guild_only, required_permissions = "MODERATE_MEMBERS")]
pub async fn warning_add(
    ctx: Context<'_>,
    #[description = "The user to warn"] user: serenity::User,
    #[description = "Why they are being warned"] reason: String,
    #[description = "How long the warning lasts, like \"30d\" (permanent if omitted)"]
    expires_in: Option<String>,
) -> Result<(), Error> {
    let guild_id = ctx.guild_id().ok_or("Must be used in a server")?;

    let expires_on = match parse_expiry(expires_in.as_deref()) {
        Ok(expiry) => expiry,
        Err(message) => {
            ctx.say(message).await?;
            return Ok(());
        }
    };

    let (warning, count) = match ctx
        .data()
        .moderation
        .add_warning(
            guild_id.get(),
            user.id.get(),
            ctx.author().id.get(),
            &reason,
            None,
            expires_on,
        )
        .await
    {
        Ok(result) => result,
        Err(e) => {
            ctx.say(e.to_string()).await?;
            return Ok(());
        }
    };

    ctx.say(format!(
        "Warning #{} issued to {}. They now have {} warning{}.",
        warning.id,
        user.name,
        count,
        if count == 1 { "" } else { "s" }
    ))
    .await?;

    // Alert moderators once the user crosses the configured threshold.
    let settings = ctx
        .data()
        .moderation
        .get_or_create_settings(guild_id.get())
        .await
        .map_err(|e| Error::from(e.to_string()))?;

    if count as i32 >= settings.warning_threshold {
        if let Some(log_channel) = settings.moderation_log_channel {
            let message = serenity::CreateMessage::new().content(format!(
                "<@{}> has reached {} warnings (threshold is {}). Latest: {}",
                user.id, count, settings.warning_threshold, warning.reason
            ));
            if let Err(e) = serenity::ChannelId::new(log_channel)
                .send_message(ctx.http(), message)
                .await
            {
                tracing::warn!("Failed to post warning threshold alert: {}", e);
            }
        }
    }

    Ok(())
}

/// Change a warning's reason.
#[poise::command(slash_command, rename = "set_reason", guild_only, required_permissions = "MODERATE_MEMBERS")]
pub async fn warning_set_reason(
    ctx: Context<'_>,
    #[description = "The warning's ID"] warning_id: i64,
    #[description = "The new reason"] reason: String,
) -> Result<(), Error> {
    let warning = match ctx.data().moderation.get_warning(warning_id).await {
        Ok(warning) => warning,
        Err(e) => {
            ctx.say(e.to_string()).await?;
            return Ok(());
        }
    };

    match ctx
        .data()
        .moderation
        .set_warning_reason(&warning, &reason)
        .await
    {
        Ok(()) => ctx.say(format!("Warning #{} updated.", warning.id)).await?,
        Err(e) => ctx.say(e.to_string()).await?,
    };
    Ok(())
}

/// Change when a warning expires.
#[poise::command(slash_command, rename = "set_expiry", guild_only, required_permissions = "MODERATE_MEMBERS")]
pub async fn warning_set_expiry(
    ctx: Context<'_>,
    #[description = "The warning's ID"] warning_id: i64,
    #[description = "How long from now, like \"30d\" (permanent if omitted)"]
    expires_in: Option<String>,
) -> Result<(), Error> {
    let warning = match ctx.data().moderation.get_warning(warning_id).await {
        Ok(warning) => warning,
        Err(e) => {
            ctx.say(e.to_string()).await?;
            return Ok(());
        }
    };

    let expires_on = match parse_expiry(expires_in.as_deref()) {
        Ok(expiry) => expiry,
        Err(message) => {
            ctx.say(message).await?;
            return Ok(());
        }
    };

    match ctx
        .data()
        .moderation
        .set_warning_expiry(&warning, expires_on)
        .await
    {
        Ok(()) => ctx.say(format!("Warning #{} updated.", warning.id)).await?,
        Err(e) => ctx.say(e.to_string()).await?,
    };
    Ok(())
}

/// Rescind a warning.
#[poise::command(slash_command, rename = "delete", guild_only, required_permissions = "MODERATE_MEMBERS")]
pub async fn warning_delete(
    ctx: Context<'_>,
    #[description = "The warning's ID"] warning_id: i64,
) -> Result<(), Error> {
    let warning = match ctx.data().moderation.get_warning(warning_id).await {
        Ok(warning) => warning,
        Err(e) => {
            ctx.say(e.to_string()).await?;
            return Ok(());
        }
    };

    match ctx.data().moderation.delete_warning(&warning).await {
        Ok(()) => ctx.say(format!("Warning #{} rescinded.", warning.id)).await?,
        Err(e) => ctx.say(e.to_string()).await?,
    };
    Ok(())
}

/// List a user's warnings.
#[poise::command(slash_command, rename = "list", guild_only, required_permissions = "MODERATE_MEMBERS")]
pub async fn warning_list(
    ctx: Context<'_>,
    #[description = "The user to look up"] user: serenity::User,
) -> Result<(), Error> {
    let guild_id = ctx.guild_id().ok_or("Must be used in a server")?;

    let warnings = ctx
        .data()
        .moderation
        .get_user_warnings(guild_id.get(), user.id.get())
        .await
        .map_err(|e| Error::from(e.to_string()))?;

    if warnings.is_empty() {
        ctx.say(format!("{} has no warnings.", user.name)).await?;
        return Ok(());
    }

    let lines: Vec<String> = warnings
        .iter()
        .map(|w| {
            let expiry = match w.expires_on {
                Some(expiry) => format!("expires {}", expiry.format("%Y-%m-%d")),
                None => "permanent".to_string(),
            };
            format!(
                "**#{}** by <@{}> on {} ({}): {}",
                w.id,
                w.author_id,
                w.created_at.format("%Y-%m-%d"),
                expiry,
                w.reason
            )
        })
        .collect();

    let embed = serenity::CreateEmbed::new()
        .title(format!("Warnings for {}", user.name))
        .color(0x992D22)
        .description(lines.join("\n"));

    ctx.send(poise::CreateReply::default().embed(embed)).await?;
    Ok(())
}

// ----------------------------------------------------------------------
// Bans
// ----------------------------------------------------------------------

/// Ban records, including temporary bans.
#[poise::command(
    slash_command,
    subcommands(
        "ban_add",
        "ban_set_reason",
        "ban_set_expiry",
        "ban_delete",
        "ban_list"
    ),
    guild_only,
    required_permissions = "BAN_MEMBERS"
)]
pub async fn ban(_ctx: Context<'_>) -> Result<(), Error> {
    // Parent command - shows help
    Ok(())
}

/// Ban a user and record why.
#[poise::command(slash_command, rename = "add", guild_only, required_permissions = "BAN_MEMBERS")]
pub async fn ban_add(
    ctx: Context<'_>,
    #[description = "The user to ban"] user: serenity::User,
    #[description = "Why they are being banned"] reason: String,
    #[description = "How long the ban lasts, like \"30d\" (permanent if omitted)"]
    expires_in: Option<String>,
) -> Result<(), Error> {
    let guild_id = ctx.guild_id().ok_or("Must be used in a server")?;

    let expires_on = match parse_expiry(expires_in.as_deref()) {
        Ok(expiry) => expiry,
        Err(message) => {
            ctx.say(message).await?;
            return Ok(());
        }
    };

    let ban = match ctx
        .data()
        .moderation
        .add_ban(
            guild_id.get(),
            user.id.get(),
            ctx.author().id.get(),
            &reason,
            None,
            expires_on,
        )
        .await
    {
        Ok(ban) => ban,
        Err(e) => {
            ctx.say(e.to_string()).await?;
            return Ok(());
        }
    };

    if let Err(e) = guild_id
        .ban_with_reason(ctx.http(), user.id, 0, &reason)
        .await
    {
        ctx.say(format!(
            "Ban #{} recorded, but applying the Discord ban failed: {}",
            ban.id, e
        ))
        .await?;
        return Ok(());
    }

    let lifetime = match ban.expires_on {
        Some(expiry) => format!("until {}", expiry.format("%Y-%m-%d %H:%M UTC")),
        None => "permanently".to_string(),
    };
    ctx.say(format!("{} banned {} (ban #{}).", user.name, lifetime, ban.id))
        .await?;
    Ok(())
}

/// Change a ban's recorded reason.
#[poise::command(slash_command, rename = "set_reason", guild_only, required_permissions = "BAN_MEMBERS")]
pub async fn ban_set_reason(
    ctx: Context<'_>,
    #[description = "The ban's ID"] ban_id: i64,
    #[description = "The new reason"] reason: String,
) -> Result<(), Error> {
    let ban = match ctx.data().moderation.get_ban(ban_id).await {
        Ok(ban) => ban,
        Err(e) => {
            ctx.say(e.to_string()).await?;
            return Ok(());
        }
    };

    match ctx.data().moderation.set_ban_reason(&ban, &reason).await {
        Ok(()) => ctx.say(format!("Ban #{} updated.", ban.id)).await?,
        Err(e) => ctx.say(e.to_string()).await?,
    };
    Ok(())
}

/// Change when a ban expires.
#[poise::command(slash_command, rename = "set_expiry", guild_only, required_permissions = "BAN_MEMBERS")]
pub async fn ban_set_expiry(
    ctx: Context<'_>,
    #[description = "The ban's ID"] ban_id: i64,
    #[description = "How long from now, like \"30d\" (permanent if omitted)"]
    expires_in: Option<String>,
) -> Result<(), Error> {
    let ban = match ctx.data().moderation.get_ban(ban_id).await {
        Ok(ban) => ban,
        Err(e) => {
            ctx.say(e.to_string()).await?;
            return Ok(());
        }
    };

    let expires_on = match parse_expiry(expires_in.as_deref()) {
        Ok(expiry) => expiry,
        Err(message) => {
            ctx.say(message).await?;
            return Ok(());
        }
    };

    match ctx.data().moderation.set_ban_expiry(&ban, expires_on).await {
        Ok(()) => ctx.say(format!("Ban #{} updated.", ban.id)).await?,
        Err(e) => ctx.say(e.to_string()).await?,
    };
    Ok(())
}

/// Lift a ban and delete its record.
#[poise::command(slash_command, rename = "delete", guild_only, required_permissions = "BAN_MEMBERS")]
pub async fn ban_delete(
    ctx: Context<'_>,
    #[description = "The ban's ID"] ban_id: i64,
) -> Result<(), Error> {
    let guild_id = ctx.guild_id().ok_or("Must be used in a server")?;

    let ban = match ctx.data().moderation.get_ban(ban_id).await {
        Ok(ban) => ban,
        Err(e) => {
            ctx.say(e.to_string()).await?;
            return Ok(());
        }
    };

    if let Err(e) = ctx.data().moderation.delete_ban(&ban).await {
        ctx.say(e.to_string()).await?;
        return Ok(());
    }

    // The user may already be unbanned; a missing ban is not an error here.
    if let Err(e) = guild_id
        .unban(ctx.http(), serenity::UserId::new(ban.user_id))
        .await
    {
        tracing::debug!("Unban after deleting ban record failed: {}", e);
    }

    ctx.say(format!("Ban #{} lifted.", ban.id)).await?;
    Ok(())
}

/// List a user's ban records.
#[poise::command(slash_command, rename = "list", guild_only, required_permissions = "BAN_MEMBERS")]
pub async fn ban_list(
    ctx: Context<'_>,
    #[description = "The user to look up"] user: serenity::User,
) -> Result<(), Error> {
    let guild_id = ctx.guild_id().ok_or("Must be used in a server")?;

    let bans = ctx
        .data()
        .moderation
        .get_user_bans(guild_id.get(), user.id.get())
        .await
        .map_err(|e| Error::from(e.to_string()))?;

    if bans.is_empty() {
        ctx.say(format!("{} has no ban records.", user.name)).await?;
        return Ok(());
    }

    let lines: Vec<String> = bans
        .iter()
        .map(|b| {
            let expiry = match b.expires_on {
                Some(expiry) => format!("expires {}", expiry.format("%Y-%m-%d")),
                None => "permanent".to_string(),
            };
            format!(
                "**#{}** by <@{}> on {} ({}): {}",
                b.id,
                b.author_id,
                b.created_at.format("%Y-%m-%d"),
                expiry,
                b.reason
            )
        })
        .collect();

    let embed = serenity::CreateEmbed::new()
        .title(format!("Ban records for {}", user.name))
        .color(0x992D22)
        .description(lines.join("\n"));

    ctx.send(poise::CreateReply::default().embed(embed)).await?;
    Ok(())
}

/// Turns an optional duration string like "30d" or "2 weeks" into an
/// absolute expiry timestamp.
fn parse_expiry(input: Option<&str>) -> Result<Option<DateTime<Utc>>, String> {
    let Some(input) = input else {
        return Ok(None);
    };

    let duration = parse_duration(input)
        .ok_or_else(|| format!("I couldn't read \"{}\" as a duration. Try \"30d\" or \"2 weeks\".", input))?;

    let duration = chrono::Duration::from_std(duration)
        .map_err(|_| "That duration is too long.".to_string())?;

    Ok(Some(Utc::now() + duration))
}

/// Parse a duration string like "30 minutes", "2h", "1 day" into a Duration.
fn parse_duration(input: &str) -> Option<std::time::Duration> {
    let input = input.trim().to_lowercase();

    if let Some(duration) = parse_compact_format(&input) {
        return Some(duration);
    }

    if let Some(duration) = parse_verbose_format(&input) {
        return Some(duration);
    }

    None
}

/// Parse compact formats like "30m", "2h", "1d", "45s"
fn parse_compact_format(input: &str) -> Option<std::time::Duration> {
    let input = input.trim();

    let (num_str, multiplier) = if input.ends_with('s') && !input.ends_with("seconds") {
        let num_part = input.trim_end_matches('s').trim();
        if num_part.chars().all(|c| c.is_ascii_digit()) {
            (num_part, 1u64)
        } else {
            return None;
        }
    } else if input.ends_with('m') && !input.ends_with("minutes") {
        (input.trim_end_matches('m').trim(), 60)
    } else if input.ends_with('h') {
        (input.trim_end_matches('h').trim(), 3600)
    } else if input.ends_with('d') {
        (input.trim_end_matches('d').trim(), 86400)
    } else if input.ends_with('w') {
        (input.trim_end_matches('w').trim(), 604800)
    } else {
        return None;
    };

    let number: u64 = num_str.parse().ok()?;
    Some(std::time::Duration::from_secs(number * multiplier))
}

/// Parse verbose formats like "30 minutes", "2 hours", "1 day"
fn parse_verbose_format(input: &str) -> Option<std::time::Duration> {
    let parts: Vec<&str> = input.split_whitespace().collect();

    if parts.len() != 2 {
        return None;
    }

    let number: u64 = parts[0].parse().ok()?;
    let unit = parts[1];

    let multiplier = match unit {
        "second" | "seconds" | "sec" | "secs" => 1,
        "minute" | "minutes" | "min" | "mins" => 60,
        "hour" | "hours" | "hr" | "hrs" => 3600,
        "day" | "days" => 86400,
        "week" | "weeks" => 604800,
        _ => return None,
    };

    Some(std::time::Duration::from_secs(number * multiplier))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_compact_durations() {
        assert_eq!(
            parse_duration("30d"),
            Some(std::time::Duration::from_secs(30 * 86400))
        );
        assert_eq!(
            parse_duration("2h"),
            Some(std::time::Duration::from_secs(7200))
        );
    }

    #[test]
    fn parses_verbose_durations() {
        assert_eq!(
            parse_duration("2 weeks"),
            Some(std::time::Duration::from_secs(2 * 604800))
        );
    }

    #[test]
    fn rejects_nonsense_durations() {
        assert!(parse_duration("soon").is_none());
        assert!(parse_expiry(Some("whenever")).is_err());
    }

    #[test]
    fn missing_duration_means_permanent() {
        assert_eq!(parse_expiry(None), Ok(None));
    }
}
