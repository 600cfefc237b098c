mod config;
mod handler;
mod links;
mod platform;
mod player;
mod relay;
mod replies;
mod resolver;
mod startup;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::config::Config;
use crate::handler::Handler;
use crate::links::LinkValidator;
use crate::platform::telegram::{self, ChannelSink};
use crate::player::PlayerLink;
use crate::relay::FileRelay;
use crate::resolver::ResolverClient;
use crate::startup::RetryPolicy;

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,terabox_relay=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration
    // A path given on the command line must exist; config.toml is optional
    let explicit_path = std::env::args().nth(1).map(PathBuf::from);
    let config_path = explicit_path
        .clone()
        .unwrap_or_else(|| PathBuf::from("config.toml"));

    info!("Loading configuration from: {}", config_path.display());
    let config = Config::load(&config_path, explicit_path.is_some())
        .with_context(|| format!("Failed to load config from {}", config_path.display()))?;

    info!("Configuration loaded successfully");
    info!("  Target channel: {}", config.telegram.target_channel_id);
    info!("  Resolver: {}", config.resolver.endpoint);
    info!("  Domains: {:?}", config.resolver.supported_domains);

    let bot = telegram::build_bot(&config.telegram)?;

    let me = startup::with_retry(RetryPolicy::from(&config.startup), || {
        telegram::connect(&bot)
    })
    .await
    .context("Could not connect to Telegram")?;
    info!("Connected as @{}", me.username());

    if config.player.serve {
        let bind_address = config.player.bind_address.clone();
        tokio::spawn(async move {
            if let Err(e) = player::serve(&bind_address).await {
                error!("Player server stopped: {:#}", e);
            }
        });
    }

    let resolver = ResolverClient::new(&config.resolver)?;
    let relay = FileRelay::from_config(
        &config.relay,
        ChannelSink::new(bot.clone(), config.telegram.target_channel_id),
    )?;
    let handler = Arc::new(Handler::new(
        LinkValidator::new(&config.resolver.supported_domains),
        Arc::new(resolver),
        Arc::new(relay),
        PlayerLink::new(config.player.base_url.clone()),
    ));

    info!("Bot is starting...");
    telegram::run(bot, handler).await?;

    Ok(())
}
