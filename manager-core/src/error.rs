//! Error types for the bot manager.
//!
//! Every [`ManagerError`] is fatal to the current invocation. Remote API failures are not errors:
//! they travel as [`crate::ApiResponse`] values with `ok == false`.

use thiserror::Error;

/// Top-level error (action, parameters, access, webhook, config, bot transport, IO).
#[derive(Error, Debug)]
pub enum ManagerError {
    #[error("Invalid action: {0}")]
    InvalidAction(String),

    #[error("Some vital info is missing: {0}")]
    InvalidParams(String),

    #[error("Invalid access")]
    InvalidAccess,

    #[error("Invalid webhook")]
    InvalidWebhook,

    #[error("Config error: {0}")]
    Config(String),

    #[error("Bot error: {0}")]
    Bot(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for manager operations; uses [`ManagerError`].
pub type Result<T> = std::result::Result<T, ManagerError>;
