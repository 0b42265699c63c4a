//! CLI parser and config loading.

use std::net::SocketAddr;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use manager_core::LogSinks;
use manager_telegram::{TelegramClient, TelegramConfig};
use serde_json::Value;

#[derive(Parser)]
#[command(name = "botmgr")]
#[command(about = "Telegram bot manager: webhook, polling and cron actions", long_about = None)]
#[command(version)]
pub struct Cli {
    /// JSON file with the bot parameters.
    #[arg(short, long, global = true, env = "BOT_MANAGER_CONFIG", default_value = "bot-manager.json")]
    pub config: PathBuf,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run one invocation; parameters are key=value tokens (a, s, l, i, g).
    Run {
        params: Vec<String>,
    },
    /// Serve the webhook endpoint; every GET/POST on the path is one invocation.
    Serve {
        #[arg(short, long, default_value = "127.0.0.1:8080")]
        listen: SocketAddr,
        #[arg(short, long, default_value = "/hook")]
        path: String,
    },
}

/// Reads the bot parameters from `path`, then applies BOT_TOKEN / BOT_SECRET from the environment.
pub fn load_config(path: &Path) -> Result<Value> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("Read bot manager config {}", path.display()))?;
    let mut config: Value = serde_json::from_str(&raw)
        .with_context(|| format!("Parse bot manager config {} as JSON", path.display()))?;
    apply_env_overrides(
        &mut config,
        std::env::var("BOT_TOKEN").ok(),
        std::env::var("BOT_SECRET").ok(),
    );
    Ok(config)
}

/// Overrides `api_key` and `secret` with non-empty values. Non-object configs are left alone.
pub fn apply_env_overrides(config: &mut Value, token: Option<String>, secret: Option<String>) {
    let Some(map) = config.as_object_mut() else {
        return;
    };
    if let Some(token) = token.filter(|t| !t.is_empty()) {
        map.insert("api_key".to_string(), Value::from(token));
    }
    if let Some(secret) = secret.filter(|s| !s.is_empty()) {
        map.insert("secret".to_string(), Value::from(secret));
    }
}

/// Log sinks from the `logging` section; none when absent or malformed.
pub fn log_sinks(config: &Value) -> LogSinks {
    config
        .get("logging")
        .and_then(|logging| serde_json::from_value(logging.clone()).ok())
        .unwrap_or_default()
}

/// Telegram client for the configured token and username, with the environment API URL override.
pub fn telegram_client(config: &Value) -> manager_core::Result<TelegramClient> {
    let api_key = config
        .get("api_key")
        .and_then(Value::as_str)
        .unwrap_or_default();
    let bot_username = config
        .get("bot_username")
        .and_then(Value::as_str)
        .map(str::to_string);
    let telegram = TelegramConfig::new(api_key)
        .with_bot_username(bot_username)
        .with_env_overrides();
    TelegramClient::new(telegram)
}
