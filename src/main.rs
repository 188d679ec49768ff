//! Daily Reminder Bot - Telegram daemon
//!
//! Loads `BOT_TOKEN` from the environment (or `.env`), starts the reminder
//! scheduler and polls Telegram until Ctrl-C.

use anyhow::Context;
use clap::Parser;
use daily_reminder_bot::config::{self, Config};
use daily_reminder_bot::telegram;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

/// Daily Reminder Bot
#[derive(Parser)]
#[command(name = "daily-reminder-bot")]
#[command(about = "Telegram bot sending one self-chosen reminder every day")]
struct Cli {
    /// How often due reminders are checked, in milliseconds
    #[arg(long, value_parser = parse_tick)]
    tick_ms: Option<u64>,

    /// Process updates that arrived while the bot was offline
    #[arg(long)]
    keep_pending_updates: bool,
}

fn parse_tick(raw: &str) -> Result<u64, String> {
    config::parse_tick_ms(raw).map_err(|e| e.to_string())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    dotenvy::dotenv().ok();

    // Initialize logging
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let mut config = match Config::from_env() {
        Ok(config) => config,
        Err(e) => {
            error!("{}. Set it in the environment or in a .env file", e);
            std::process::exit(1);
        }
    };

    if let Some(tick_ms) = cli.tick_ms {
        config.tick_interval_ms = tick_ms;
    }
    if cli.keep_pending_updates {
        config.drop_pending_updates = false;
    }

    info!(
        "Daily reminder bot starting (tick {} ms, drop pending updates: {})",
        config.tick_interval_ms, config.drop_pending_updates
    );

    telegram::run(config).await.context("bot stopped with an error")?;

    Ok(())
}
