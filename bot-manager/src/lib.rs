//! # Bot manager
//!
//! Configuration-driven orchestration for a Telegram bot: resolves the requested [`Action`],
//! merges startup and transport parameters into a [`ParamSet`], validates the caller and
//! dispatches to the webhook, polling or cron controller. The bot platform itself is reached
//! through [`manager_core::BotClient`].

pub mod action;
pub mod cron;
pub mod manager;
pub mod output;
pub mod params;
pub mod polling;
pub mod request;
pub mod validator;
pub mod webhook;

pub use action::Action;
pub use manager::{BotManager, DEFAULT_RESET_PAUSE};
pub use output::OutputBuffer;
pub use params::{
    BotParams, CommandsParams, CronParams, LimiterParams, ParamSet, PathsParams, WebhookParams,
};
pub use polling::UpdatesCallback;
pub use request::RequestContext;
pub use validator::RequestValidator;

pub use manager_core::{
    ApiResponse, BotClient, LogSinks, ManagerError, Result, StorageCredentials, Update,
    WebhookInfo, WebhookOptions,
};
