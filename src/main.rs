// This is the entry point of the username spam filter bot.
//
// **Architecture Overview:**
// - `core/` = Business logic (platform-agnostic)
// - `infra/` = Implementations of core traits (databases)
// - `discord/` = Discord-specific adapters (commands, events)
//
// This file's job is to:
// 1. Load configuration
// 2. Initialize services (dependency injection)
// 3. Set up the Discord framework
// 4. Register commands and event handlers

// These attrs point each module declaration at a more descriptive root file
// so we don't end up with half a dozen mod.rs files that all look the same.
#[path = "core/core_layer.rs"]
mod core;
#[path = "discord/discord_layer.rs"]
mod discord;
#[path = "infra/infra_layer.rs"]
mod infra;

use crate::core::spam_filter::{
    ConfiguredRoleSource, ConfusableTable, FixedRoleSource, ProtectedRoleSource,
    SpamFilterSettings,
};
use crate::discord::spam_filter::events as spam_filter_events;
use crate::discord::{Data, Error};
use crate::infra::spam_filter::SqliteFilterStore;
use poise::serenity_prelude as serenity;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

/// Event handler for non-command Discord events.
async fn event_handler(
    ctx: &serenity::Context,
    event: &serenity::FullEvent,
    _framework: poise::FrameworkContext<'_, Data, Error>,
    data: &Data,
) -> Result<(), Error> {
    match event {
        serenity::FullEvent::GuildMemberAddition { new_member } => {
            if let Err(e) = spam_filter_events::handle_member_join(ctx, data, new_member).await {
                tracing::error!(
                    guild_id = new_member.guild_id.get(),
                    user_id = new_member.user.id.get(),
                    "Error running username spam filter on join: {}",
                    e
                );
            }
        }
        serenity::FullEvent::GuildMemberUpdate {
            old_if_available,
            new,
            event,
        } => {
            if let Err(e) = spam_filter_events::handle_member_update(
                ctx,
                data,
                old_if_available.as_ref(),
                new.as_ref(),
                event,
            )
            .await
            {
                tracing::error!(
                    guild_id = event.guild_id.get(),
                    user_id = event.user.id.get(),
                    "Error running username spam filter on update: {}",
                    e
                );
            }
        }
        serenity::FullEvent::GuildBanRemoval {
            guild_id,
            unbanned_user,
        } => {
            if let Err(e) =
                spam_filter_events::handle_ban_removal(ctx, data, *guild_id, unbanned_user).await
            {
                tracing::error!(
                    guild_id = guild_id.get(),
                    user_id = unbanned_user.id.get(),
                    "Error allowlisting unbanned user: {}",
                    e
                );
            }
        }

        _ => {}
    }

    Ok(())
}

#[tokio::main]
async fn main() {
    // Load environment variables from .env file (if it exists)
    dotenv::dotenv().ok();

    // Initialize logging so we can see what's happening (RUST_LOG overrides)
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    // Get Discord bot token from environment
    let token = std::env::var("DISCORD_TOKEN").expect(
        "Missing DISCORD_TOKEN environment variable! Create a .env file with your bot token.",
    );

    let settings = SpamFilterSettings::from_env();

    // ========================================================================
    // DEPENDENCY INJECTION
    // ========================================================================
    // Create our services with their dependencies.
    // This is the "composition root" where we wire everything together.

    let store = Arc::new(
        SqliteFilterStore::open(&settings.database_path)
            .await
            .expect("Failed to initialize username spam filter database"),
    );

    // Built once, shared read-only by every filter run
    let confusables = Arc::new(ConfusableTable::new());
    tracing::info!(entries = confusables.len(), "Loaded confusable table");

    let role_source: Arc<dyn ProtectedRoleSource> = match &settings.fixed_roles {
        Some(role_ids) => {
            tracing::info!(
                roles = role_ids.len(),
                guild_id = ?settings.fixed_guild,
                "Using fixed protected roles"
            );
            Arc::new(FixedRoleSource::new(role_ids.iter().copied(), settings.fixed_guild))
        }
        None => Arc::new(ConfiguredRoleSource::new(Arc::clone(&store))),
    };

    // Create the data structure that will be shared across all commands
    let data = Data {
        store,
        role_source,
        confusables,
        settings,
    };

    // ========================================================================
    // DISCORD FRAMEWORK SETUP
    // ========================================================================

    let intents = serenity::GatewayIntents::GUILDS
        | serenity::GatewayIntents::GUILD_MEMBERS // join/update events and member listing
        | serenity::GatewayIntents::GUILD_MODERATION // unban events
        | serenity::GatewayIntents::DIRECT_MESSAGES
        | serenity::GatewayIntents::DIRECT_MESSAGE_REACTIONS; // configuration prompt answers

    let framework = poise::Framework::builder()
        .options(poise::FrameworkOptions {
            commands: vec![discord::spam_filter::commands::spam_filter()],
            event_handler: |ctx, event, framework, data| {
                Box::pin(event_handler(ctx, event, framework, data))
            },
            ..Default::default()
        })
        .setup(|ctx, _ready, framework| {
            Box::pin(async move {
                tracing::info!("Bot is starting up...");

                // Register slash commands globally (can take up to an hour to propagate)
                poise::builtins::register_globally(ctx, &framework.options().commands).await?;

                tracing::info!("Commands registered, bot is ready");
                Ok(data)
            })
        })
        .build();

    let mut client = serenity::ClientBuilder::new(token, intents)
        .framework(framework)
        .await
        .expect("Error creating client");

    client.start().await.expect("Error running bot");
}
