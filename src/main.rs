use std::sync::Arc;

use anyhow::Context as AnyhowContext;
use parking_lot::RwLock;
use serenity::{Client, model::prelude::GatewayIntents};
use tracing::{error, info};

use switchcord::{
    bot::Bot,
    commands::CommandRegistry,
    config::Configuration,
    lua::{ClientInfo, LuaHost},
    router::{HandlerFailure, Router},
    telemetry,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Configuration::load()?;

    telemetry::init(&config.logging.filter);

    let discord_token = config
        .authentication
        .discord_token
        .as_deref()
        .context("Expected authentication.discord_token to be filled in config")?;

    let host = LuaHost::new(ClientInfo {
        name: config.discord.bot_name.clone(),
        prefix: config.discord.prefix.clone(),
        admin_ids: config
            .discord
            .admin_ids
            .iter()
            .map(|id| id.to_string())
            .collect(),
    });

    let (failure_tx, failure_rx) = flume::unbounded::<HandlerFailure>();
    tokio::spawn(async move {
        while let Ok(failure) = failure_rx.recv_async().await {
            error!(
                family = failure.family,
                key = %failure.key,
                error = ?failure.error,
                "handler failed"
            );
        }
    });

    let registry = Arc::new(RwLock::new(CommandRegistry::new(
        host.clone(),
        config.discord.application_permissions,
        config.discord.guild(),
    )));
    let router = Arc::new(Router::new(
        host,
        registry,
        config.discord.admins(),
        failure_tx,
    ));
    router
        .load_all(&config.handlers)
        .context("Error loading handlers")?;
    info!(
        commands = router.commands().read().commands().map_or(0, |c| c.len()),
        "handlers loaded"
    );

    let mut client = Client::builder(
        discord_token,
        GatewayIntents::default()
            | GatewayIntents::GUILD_MESSAGES
            | GatewayIntents::DIRECT_MESSAGES
            | GatewayIntents::GUILD_MESSAGE_REACTIONS
            | GatewayIntents::GUILD_MEMBERS
            | GatewayIntents::MESSAGE_CONTENT,
    )
    .event_handler(Bot::new(config.clone(), router))
    .await
    .context("Error creating client")?;

    client.start().await.context("Client error")?;

    Ok(())
}
