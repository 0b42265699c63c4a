//! # manager-core
//!
//! Core types and traits for the bot manager: [`BotClient`], the Bot API response envelope
//! [`ApiResponse`], the update summary [`Update`], error types and logging sinks.
//! Transport-agnostic; used by manager-telegram and bot-manager.

pub mod bot;
pub mod error;
pub mod logger;
pub mod types;

pub use bot::BotClient;
pub use error::{ManagerError, Result};
pub use logger::{init_tracing, LogSinks, UPDATE_TARGET};
pub use types::{ApiResponse, StorageCredentials, Update, WebhookInfo, WebhookOptions};
