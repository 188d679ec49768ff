//! Error types for daily-reminder-bot

use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Missing configuration: {0} is not set")]
    MissingConfiguration(&'static str),

    #[error("Invalid time format: {0:?}")]
    InvalidTimeFormat(String),

    #[error("Schedule error: {0}")]
    Schedule(String),

    #[error("Telegram request failed: {0}")]
    Telegram(#[from] teloxide::RequestError),

    #[error("Config error: {0}")]
    Config(String),
}

pub type Result<T> = std::result::Result<T, Error>;
