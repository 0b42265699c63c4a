//! # manager-telegram
//!
//! Telegram Bot API implementation of [`manager_core::BotClient`]: webhook registration, getUpdates
//! with offset tracking, update adapters over teloxide types, a command registry and a request
//! limiter.

pub mod adapters;
pub mod client;
pub mod commands;
pub mod config;
pub mod limiter;

pub use adapters::{message_type, to_core_update};
pub use client::{AnalyticsSettings, TelegramClient};
pub use commands::{parse_command, Command, CommandContext, CommandRegistry};
pub use config::{TelegramConfig, DEFAULT_API_URL};
pub use limiter::RequestLimiter;
