//! Embed Generator bot - runs the actions behind interactive message components.
//!
//! Connects to the Discord gateway and dispatches every button click and
//! select menu submission to the action sets stored for the message.

#[cfg(feature = "discord")]
use embedg_actions::{Dispatcher, open_action_sets};
use embedg_actions::{EmbedgConfig, load_seed_file};
#[cfg(feature = "discord")]
use embedg_bot::{InteractionHandler, SerenityPlatform};
use clap::Parser;
use std::path::PathBuf;
#[cfg(feature = "discord")]
use std::sync::Arc;
#[cfg(feature = "discord")]
use std::time::Duration;
use tracing::{info, warn};
#[cfg(feature = "discord")]
use tracing::debug;
use tracing_subscriber::EnvFilter;

#[cfg(feature = "discord")]
use serenity::all::{Client, GatewayIntents};

#[cfg(feature = "discord")]
const PURGE_INTERVAL: Duration = Duration::from_secs(300);

/// Command-line arguments for the bot.
#[derive(Parser, Debug)]
#[command(name = "embedg-bot")]
#[command(about = "Embed Generator bot - interactive message components")]
#[command(version)]
struct Args {
    /// Path to configuration file
    #[arg(short, long, default_value = "embedg.toml")]
    config: PathBuf,

    /// Discord bot token
    #[arg(long, env = "DISCORD_TOKEN")]
    #[cfg(feature = "discord")]
    discord_token: Option<String>,

    /// Validate configuration and exit
    #[arg(long)]
    dry_run: bool,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();
    info!("Starting Embed Generator bot");
    info!(config_file = ?args.config, "Loading configuration");

    let config = if args.config.exists() {
        EmbedgConfig::from_file(&args.config)?
    } else {
        info!("Configuration file not found, using defaults");
        EmbedgConfig::default()
    };
    info!(
        cooldown_seconds = config.dispatch().cooldown_seconds(),
        protected_roles = config.dispatch().protected_roles().len(),
        action_set_ttl_hours = config.store().action_set_ttl_hours(),
        backend = %config.store().backend(),
        "Configuration loaded"
    );

    if args.dry_run {
        info!("DRY RUN MODE - not connecting to Discord");
        if let Some(seed) = config.store().seed_file() {
            let sets = load_seed_file(seed)?;
            info!(sets = sets.len(), "Seed file is valid");
        }
        info!("Configuration validation complete");
        return Ok(());
    }

    #[cfg(feature = "discord")]
    {
        let token = args
            .discord_token
            .ok_or("DISCORD_TOKEN must be set to connect to Discord")?;

        let (store, handle) = open_action_sets(config.store()).await?;
        let platform = Arc::new(SerenityPlatform::from_token(&token));
        let dispatcher = Arc::new(Dispatcher::from_settings(
            store,
            platform,
            config.dispatch(),
        ));

        tokio::spawn(async move {
            let mut interval = tokio::time::interval(PURGE_INTERVAL);
            loop {
                interval.tick().await;
                match handle.purge_expired().await {
                    Ok(0) => {}
                    Ok(purged) => debug!(purged, "Purged expired store entries"),
                    Err(e) => warn!(error = %e, "Failed to purge expired store entries"),
                }
            }
        });

        let mut client = Client::builder(&token, GatewayIntents::GUILDS)
            .event_handler(InteractionHandler::new(dispatcher))
            .await?;

        info!("Connecting to Discord gateway");
        client.start().await?;
    }

    #[cfg(not(feature = "discord"))]
    {
        warn!("Built without the discord feature; nothing to run");
    }

    Ok(())
}
