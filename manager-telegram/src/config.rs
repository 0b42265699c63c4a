//! Telegram 连接配置：token、API 地址、bot 用户名。
//! 环境变量覆盖：BOT_TOKEN、TELEGRAM_API_URL（或 TELOXIDE_API_URL）、BOT_USERNAME。

use manager_core::{ManagerError, Result};
use std::env;

/// 官方 Bot API 地址。
pub const DEFAULT_API_URL: &str = "https://api.telegram.org";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TelegramConfig {
    pub api_key: String,
    pub api_url: String,
    pub bot_username: Option<String>,
}

impl TelegramConfig {
    /// 使用给定 token，指向官方 API。
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            api_url: DEFAULT_API_URL.to_string(),
            bot_username: None,
        }
    }

    /// 从环境变量加载：BOT_TOKEN 必填，其余可选。
    pub fn from_env() -> Result<Self> {
        let api_key = env::var("BOT_TOKEN")
            .map_err(|_| ManagerError::Config("BOT_TOKEN not set".to_string()))?;
        Ok(Self::new(api_key).with_env_overrides())
    }

    /// 设置了 TELEGRAM_API_URL / TELOXIDE_API_URL 或 BOT_USERNAME 时覆盖对应字段。
    pub fn with_env_overrides(mut self) -> Self {
        if let Ok(url) = env::var("TELEGRAM_API_URL").or_else(|_| env::var("TELOXIDE_API_URL")) {
            self.api_url = url;
        }
        if let Ok(username) = env::var("BOT_USERNAME") {
            self.bot_username = Some(username);
        }
        self
    }

    pub fn with_api_url(mut self, api_url: impl Into<String>) -> Self {
        self.api_url = api_url.into();
        self
    }

    pub fn with_bot_username(mut self, bot_username: Option<String>) -> Self {
        self.bot_username = bot_username.filter(|name| !name.is_empty());
        self
    }

    /// `<api_url>/bot<token>/<method>`.
    pub fn method_url(&self, method: &str) -> String {
        format!(
            "{}/bot{}/{}",
            self.api_url.trim_end_matches('/'),
            self.api_key,
            method
        )
    }
}
