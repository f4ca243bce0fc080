// Gateway events that feed the username spam filter.

use crate::core::spam_filter::{FilterVerdict, MemberDirectory, ServerRef};
use crate::discord::spam_filter::serenity_directory::SerenityDirectory;
use crate::discord::Data;
use anyhow::Result;
use poise::serenity_prelude::{self as serenity, Context};

fn server_ref(ctx: &Context, guild_id: serenity::GuildId) -> ServerRef {
    let name = ctx
        .cache
        .guild(guild_id)
        .map(|g| g.name.clone())
        .unwrap_or_else(|| guild_id.to_string());
    ServerRef {
        id: guild_id.get(),
        name,
    }
}

async fn run_filter(ctx: &Context, data: &Data, member: &serenity::Member) -> Result<FilterVerdict> {
    let server = server_ref(ctx, member.guild_id);
    let snapshot = SerenityDirectory::new(ctx).to_member(member);
    let verdict = data.spam_filter(ctx).run(&server, &snapshot).await?;

    if verdict.banned() {
        tracing::info!(
            guild_id = server.id,
            user_id = snapshot.id,
            "Username spam filter banned {}",
            snapshot.tag
        );
    }
    Ok(verdict)
}

pub async fn handle_member_join(
    ctx: &Context,
    data: &Data,
    member: &serenity::Member,
) -> Result<()> {
    if member.user.bot {
        return Ok(());
    }

    run_filter(ctx, data, member).await?;
    Ok(())
}

/// Only nickname changes are re-checked; role or avatar edits are ignored.
pub async fn handle_member_update(
    ctx: &Context,
    data: &Data,
    old: Option<&serenity::Member>,
    new: Option<&serenity::Member>,
    event: &serenity::GuildMemberUpdateEvent,
) -> Result<()> {
    if event.user.bot {
        return Ok(());
    }

    // Uncached previous state counts as a change
    if old.is_some_and(|o| o.nick == event.nick) {
        return Ok(());
    }

    match new {
        Some(member) => {
            run_filter(ctx, data, member).await?;
        }
        None => {
            let server = server_ref(ctx, event.guild_id);
            let snapshot = SerenityDirectory::new(ctx)
                .fetch_member(event.guild_id.get(), event.user.id.get())
                .await?;
            data.spam_filter(ctx).run(&server, &snapshot).await?;
        }
    }
    Ok(())
}

/// A manual unban means a moderator vouched for the user.
pub async fn handle_ban_removal(
    ctx: &Context,
    data: &Data,
    guild_id: serenity::GuildId,
    user: &serenity::User,
) -> Result<()> {
    let server = server_ref(ctx, guild_id);
    data.spam_filter(ctx)
        .grant_unban_allowlist(&server, user.id.get(), &user.tag())
        .await?;

    tracing::info!(
        guild_id = server.id,
        user_id = user.id.get(),
        "Allowlisted unbanned user {}",
        user.tag()
    );
    Ok(())
}
