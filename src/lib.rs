//! Daily Reminder Bot
//!
//! A Telegram bot that asks each user for a time of day and a text, then
//! sends that text back to them every day at that time.

pub mod config;
pub mod controller;
pub mod error;
pub mod replies;
pub mod scheduler;
pub mod session;
pub mod telegram;
pub mod time_of_day;

pub use error::{Error, Result};
