//! # manager-cli
//!
//! `botmgr` foundation: argument parsing, config loading and the webhook endpoint.

pub mod cli;
pub mod serve;

pub use cli::{apply_env_overrides, load_config, log_sinks, telegram_client, Cli, Commands};
pub use serve::{build_router, serve, ServeState};
