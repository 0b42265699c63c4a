//! Bot client abstraction used by the manager.
//!
//! [`BotClient`] is transport-agnostic; manager-telegram implements it over the Telegram Bot API,
//! tests substitute a stub.

use crate::error::Result;
use crate::types::{ApiResponse, StorageCredentials, Update, WebhookInfo, WebhookOptions};
use async_trait::async_trait;
use serde_json::{Map, Value};

/// Operations the manager performs against the remote bot platform, plus feature setters applied
/// before handling updates. Setters default to no-ops so a client only overrides what it supports.
#[async_trait]
pub trait BotClient: Send + Sync {
    /// Registers `url` as the webhook. The description carries the remote status text.
    async fn set_webhook(&self, url: &str, options: &WebhookOptions) -> ApiResponse<bool>;
    /// Removes the webhook.
    async fn delete_webhook(&self) -> ApiResponse<bool>;
    /// Fetches the current webhook status.
    async fn get_webhook_info(&self) -> ApiResponse<WebhookInfo>;
    /// Handles one pushed update. `body` is the raw request body (ignored when custom input is set).
    async fn handle_webhook_request(&self, body: Option<&str>) -> Result<()>;
    /// Fetches pending updates (getUpdates).
    async fn fetch_updates(&self) -> ApiResponse<Vec<Update>>;
    /// Runs the given commands once, in order.
    async fn run_commands(&self, commands: &[String]) -> Result<()>;

    fn enable_admins(&mut self, _admins: &[i64]) {}
    fn enable_storage(&mut self, _credentials: &StorageCredentials) {}
    fn enable_limiter(&mut self, _enabled: bool, _options: &Map<String, Value>) {}
    fn enable_analytics(&mut self, _token: &str, _options: &Map<String, Value>) {}
    fn add_commands_paths(&mut self, _paths: &[String]) {}
    fn set_command_config(&mut self, _command: &str, _config: &Value) {}
    fn set_custom_input(&mut self, _input: &str) {}
    fn set_download_path(&mut self, _path: &str) {}
    fn set_upload_path(&mut self, _path: &str) {}
}
