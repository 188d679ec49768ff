//! Configuration from the environment

use crate::error::{Error, Result};
use std::time::Duration;

pub const BOT_TOKEN_VAR: &str = "BOT_TOKEN";
pub const TICK_MS_VAR: &str = "REMINDER_TICK_MS";

/// Runtime settings
#[derive(Debug, Clone)]
pub struct Config {
    pub bot_token: String,
    pub tick_interval_ms: u64,
    pub drop_pending_updates: bool,
}

impl Config {
    pub const DEFAULT_TICK_MS: u64 = 1000;

    /// Read config from process environment (call `dotenvy::dotenv()` first)
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build config from any key lookup
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let bot_token = lookup(BOT_TOKEN_VAR)
            .map(|token| token.trim().to_string())
            .filter(|token| !token.is_empty())
            .ok_or(Error::MissingConfiguration(BOT_TOKEN_VAR))?;

        let tick_interval_ms = match lookup(TICK_MS_VAR) {
            Some(raw) => parse_tick_ms(&raw)?,
            None => Self::DEFAULT_TICK_MS,
        };

        Ok(Self {
            bot_token,
            tick_interval_ms,
            drop_pending_updates: true,
        })
    }

    /// Create config for testing
    pub fn for_test() -> Self {
        Self {
            bot_token: "123456:TEST-TOKEN".to_string(),
            tick_interval_ms: 10,
            drop_pending_updates: false,
        }
    }

    pub fn tick_interval(&self) -> Duration {
        Duration::from_millis(self.tick_interval_ms)
    }
}

pub fn parse_tick_ms(raw: &str) -> Result<u64> {
    match raw.trim().parse::<u64>() {
        Ok(ms) if ms > 0 => Ok(ms),
        _ => Err(Error::Config(format!(
            "{} must be a positive number of milliseconds, got {:?}",
            TICK_MS_VAR, raw
        ))),
    }
}
