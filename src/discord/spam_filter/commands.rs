// `/spam-filter` slash commands.
//
// `config` drives the DM-based configuration workflow; the rest are small
// admin helpers for inspecting and editing the allowlist.

use crate::core::spam_filter::{
    AllowlistSubject, ConfigurationWorkflow, ConfusableTable, FilterEntry, MatchEngine,
    NameNormalizer, ProtectedRoleSource, RoleRef, ServerRef, SpamFilterSettings, UsernameSpamFilter,
    WorkflowCaller, WorkflowError,
};
use crate::discord::spam_filter::serenity_directory::SerenityDirectory;
use crate::infra::spam_filter::SqliteFilterStore;
use poise::serenity_prelude as serenity;
use std::sync::Arc;

/// Type alias for our bot's context.
/// This is what every command receives as its first parameter.
pub type Error = Box<dyn std::error::Error + Send + Sync>;
pub type Context<'a> = poise::Context<'a, Data, Error>;

const GENERIC_FAILURE: &str = "Sorry something is not working and our devs are looking into it.";

/// Data that's shared across all commands and event handlers.
pub struct Data {
    pub store: Arc<SqliteFilterStore>,
    pub role_source: Arc<dyn ProtectedRoleSource>,
    pub confusables: Arc<ConfusableTable>,
    pub settings: SpamFilterSettings,
}

impl Data {
    /// Filter bound to the gateway context of the current event.
    pub fn spam_filter(
        &self,
        ctx: &serenity::Context,
    ) -> UsernameSpamFilter<SqliteFilterStore, SerenityDirectory> {
        UsernameSpamFilter::new(
            Arc::clone(&self.store),
            Arc::new(SerenityDirectory::new(ctx)),
            Arc::clone(&self.role_source),
            MatchEngine::new(NameNormalizer::new(Arc::clone(&self.confusables))),
            self.settings.escalation_contacts,
        )
    }

    pub fn config_workflow(
        &self,
        ctx: &serenity::Context,
    ) -> ConfigurationWorkflow<SqliteFilterStore, SerenityDirectory, SerenityDirectory> {
        let adapter = Arc::new(SerenityDirectory::new(ctx));
        ConfigurationWorkflow::new(Arc::clone(&self.store), Arc::clone(&adapter), adapter)
            .with_decision_timeout(self.settings.prompt_timeout)
    }
}

/// Guild the command was invoked in, with its display name.
fn current_server(ctx: Context<'_>) -> Result<ServerRef, Error> {
    let guild_id = ctx.guild_id().ok_or("Must be in a guild")?;
    let name = ctx
        .guild()
        .map(|g| g.name.clone())
        .unwrap_or_else(|| guild_id.to_string());
    Ok(ServerRef {
        id: guild_id.get(),
        name,
    })
}

async fn reply(ctx: Context<'_>, content: impl Into<String>) {
    let reply = poise::CreateReply::default()
        .content(content)
        .ephemeral(true);
    if let Err(e) = ctx.send(reply).await {
        tracing::warn!("Failed to reply to spam-filter command: {}", e);
    }
}

fn list_or_none(entries: &[FilterEntry], mention: impl Fn(u64) -> String) -> String {
    if entries.is_empty() {
        return "None".to_string();
    }
    entries
        .iter()
        .map(|e| format!("• {} ({})", mention(e.object_id), e.object_name))
        .collect::<Vec<_>>()
        .join("\n")
}

fn role_names(roles: &[RoleRef]) -> String {
    roles
        .iter()
        .map(|r| r.name.as_str())
        .collect::<Vec<_>>()
        .join(", ")
}

/// Username spam filter settings.
#[poise::command(
    slash_command,
    guild_only,
    rename = "spam-filter",
    subcommands(
        "config",
        "status",
        "allow_user",
        "allow_role",
        "disallow_user",
        "disallow_role"
    )
)]
pub async fn spam_filter(_ctx: Context<'_>) -> Result<(), Error> {
    Ok(())
}

/// Configure the high-ranking roles the username spam filter protects.
#[poise::command(slash_command, guild_only)]
pub async fn config(
    ctx: Context<'_>,
    #[rename = "role-1"]
    #[description = "High ranking role to protect"]
    role_1: Option<serenity::Role>,
    #[rename = "role-2"]
    #[description = "High ranking role to protect"]
    role_2: Option<serenity::Role>,
    #[rename = "role-3"]
    #[description = "High ranking role to protect"]
    role_3: Option<serenity::Role>,
) -> Result<(), Error> {
    if ctx.author().bot {
        return Ok(());
    }

    let server = current_server(ctx)?;
    let permissions = ctx
        .author_member()
        .await
        .and_then(|m| m.permissions)
        .unwrap_or_else(serenity::Permissions::empty);
    let caller = WorkflowCaller {
        user_id: ctx.author().id.get(),
        is_administrator: permissions.administrator(),
        can_manage_server: permissions.manage_guild(),
    };
    let role_ids: Vec<u64> = [role_1, role_2, role_3]
        .into_iter()
        .flatten()
        .map(|r| r.id.get())
        .collect();

    ctx.defer_ephemeral().await?;

    let workflow = ctx.data().config_workflow(ctx.serenity_context());
    let outcome = match workflow.begin(&server, &caller, &role_ids).await {
        Ok(pending) => {
            tracing::debug!(
                guild_id = server.id,
                user_id = caller.user_id,
                roles = %role_names(pending.roles()),
                "Sent spam filter configuration prompt"
            );
            reply(ctx, format!("Hey <@{}>, I just sent you a DM!", caller.user_id)).await;
            pending.decide().await
        }
        Err(e) => Err(e),
    };

    match outcome {
        Ok(outcome) => {
            tracing::info!(
                guild_id = server.id,
                user_id = caller.user_id,
                state = ?outcome.state(),
                roles = %role_names(outcome.roles()),
                "Username spam filter configured"
            );
            reply(ctx, "Successfully configured username spam filter.").await
        }
        Err(WorkflowError::Validation(msg)) | Err(WorkflowError::EarlyTermination(msg)) => {
            reply(ctx, msg).await
        }
        Err(e) => {
            tracing::error!(
                guild_id = server.id,
                user_id = caller.user_id,
                "Spam filter configuration failed: {}",
                e
            );
            reply(ctx, GENERIC_FAILURE).await
        }
    }
    Ok(())
}

/// Show the username spam filter configuration for this server.
#[poise::command(slash_command, guild_only, required_permissions = "MANAGE_GUILD")]
pub async fn status(ctx: Context<'_>) -> Result<(), Error> {
    let server = current_server(ctx)?;
    let overview = ctx
        .data()
        .spam_filter(ctx.serenity_context())
        .overview(server.id)
        .await?;

    let state = if overview.is_active() {
        "Active"
    } else {
        "Inactive (no protected roles)"
    };

    let embed = serenity::CreateEmbed::default()
        .title("Username Spam Filter")
        .color(serenity::Color::BLURPLE)
        .field("Status", state, false)
        .field(
            "Protected Roles",
            list_or_none(&overview.protected_roles, |id| format!("<@&{}>", id)),
            false,
        )
        .field(
            "Allowlisted Users",
            list_or_none(&overview.allowlisted_users, |id| format!("<@{}>", id)),
            false,
        )
        .field(
            "Allowlisted Roles",
            list_or_none(&overview.allowlisted_roles, |id| format!("<@&{}>", id)),
            false,
        )
        .footer(serenity::CreateEmbedFooter::new(format!(
            "Guild ID: {}",
            server.id
        )))
        .timestamp(serenity::Timestamp::now());

    ctx.send(poise::CreateReply::default().embed(embed).ephemeral(true))
        .await?;
    Ok(())
}

/// Never run the username spam filter against this user.
#[poise::command(
    slash_command,
    guild_only,
    rename = "allow-user",
    required_permissions = "MANAGE_GUILD"
)]
pub async fn allow_user(
    ctx: Context<'_>,
    #[description = "User to allowlist"] user: serenity::User,
) -> Result<(), Error> {
    let server = current_server(ctx)?;
    let added = ctx
        .data()
        .spam_filter(ctx.serenity_context())
        .add_allowlist(&server, AllowlistSubject::User, user.id.get(), &user.tag())
        .await?;

    if added {
        reply(ctx, format!("✅ <@{}> is now allowlisted.", user.id)).await;
    } else {
        reply(ctx, format!("<@{}> is already allowlisted.", user.id)).await;
    }
    Ok(())
}

/// Never run the username spam filter against holders of this role.
#[poise::command(
    slash_command,
    guild_only,
    rename = "allow-role",
    required_permissions = "MANAGE_GUILD"
)]
pub async fn allow_role(
    ctx: Context<'_>,
    #[description = "Role to allowlist"] role: serenity::Role,
) -> Result<(), Error> {
    let server = current_server(ctx)?;
    let added = ctx
        .data()
        .spam_filter(ctx.serenity_context())
        .add_allowlist(&server, AllowlistSubject::Role, role.id.get(), &role.name)
        .await?;

    if added {
        reply(ctx, format!("✅ <@&{}> is now allowlisted.", role.id)).await;
    } else {
        reply(ctx, format!("<@&{}> is already allowlisted.", role.id)).await;
    }
    Ok(())
}

/// Remove a user from the username spam filter allowlist.
#[poise::command(
    slash_command,
    guild_only,
    rename = "disallow-user",
    required_permissions = "MANAGE_GUILD"
)]
pub async fn disallow_user(
    ctx: Context<'_>,
    #[description = "User to remove from the allowlist"] user: serenity::User,
) -> Result<(), Error> {
    let server = current_server(ctx)?;
    let removed = ctx
        .data()
        .spam_filter(ctx.serenity_context())
        .remove_allowlist(&server, AllowlistSubject::User, user.id.get())
        .await?;

    if removed {
        reply(ctx, format!("🛑 <@{}> is no longer allowlisted.", user.id)).await;
    } else {
        reply(ctx, format!("<@{}> was not allowlisted.", user.id)).await;
    }
    Ok(())
}

/// Remove a role from the username spam filter allowlist.
#[poise::command(
    slash_command,
    guild_only,
    rename = "disallow-role",
    required_permissions = "MANAGE_GUILD"
)]
pub async fn disallow_role(
    ctx: Context<'_>,
    #[description = "Role to remove from the allowlist"] role: serenity::Role,
) -> Result<(), Error> {
    let server = current_server(ctx)?;
    let removed = ctx
        .data()
        .spam_filter(ctx.serenity_context())
        .remove_allowlist(&server, AllowlistSubject::Role, role.id.get())
        .await?;

    if removed {
        reply(ctx, format!("🛑 <@&{}> is no longer allowlisted.", role.id)).await;
    } else {
        reply(ctx, format!("<@&{}> was not allowlisted.", role.id)).await;
    }
    Ok(())
}
