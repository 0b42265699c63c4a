//! [`TelegramClient`]: [`BotClient`] over the Telegram Bot API.
//!
//! Webhook and update calls go through reqwest so the API's `description` text reaches the
//! manager unchanged; update payloads are read through teloxide types in [`crate::adapters`].

use std::path::PathBuf;
use std::sync::atomic::{AtomicI64, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use manager_core::{
    ApiResponse, BotClient, ManagerError, Result, StorageCredentials, Update, WebhookInfo,
    WebhookOptions, UPDATE_TARGET,
};
use reqwest::multipart::{Form, Part};
use serde::de::DeserializeOwned;
use serde_json::{json, Map, Value};
use tracing::{debug, info, instrument, warn};

use crate::adapters::{parse_update, to_core_update, update_message};
use crate::commands::{parse_command, CommandRegistry};
use crate::config::TelegramConfig;
use crate::limiter::RequestLimiter;

/// Per-request HTTP timeout.
pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(60);

/// Analytics token and options as configured.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AnalyticsSettings {
    pub token: String,
    pub options: Map<String, Value>,
}

pub struct TelegramClient {
    config: TelegramConfig,
    http: reqwest::Client,
    /// Next getUpdates offset; 0 until the first batch is seen.
    offset: AtomicI64,
    limiter: Option<RequestLimiter>,
    commands: CommandRegistry,
    custom_input: Option<String>,
    storage: Option<StorageCredentials>,
    analytics: Option<AnalyticsSettings>,
    download_path: Option<PathBuf>,
    upload_path: Option<PathBuf>,
}

impl TelegramClient {
    pub fn new(config: TelegramConfig) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| ManagerError::Bot(format!("cannot build HTTP client: {}", e)))?;
        Ok(Self {
            config,
            http,
            offset: AtomicI64::new(0),
            limiter: None,
            commands: CommandRegistry::new(),
            custom_input: None,
            storage: None,
            analytics: None,
            download_path: None,
            upload_path: None,
        })
    }

    pub fn config(&self) -> &TelegramConfig {
        &self.config
    }

    pub fn commands(&self) -> &CommandRegistry {
        &self.commands
    }

    /// Registry for adding commands before the client is handed to the manager.
    pub fn commands_mut(&mut self) -> &mut CommandRegistry {
        &mut self.commands
    }

    pub fn limiter(&self) -> Option<&RequestLimiter> {
        self.limiter.as_ref()
    }

    pub fn storage(&self) -> Option<&StorageCredentials> {
        self.storage.as_ref()
    }

    pub fn analytics(&self) -> Option<&AnalyticsSettings> {
        self.analytics.as_ref()
    }

    pub fn custom_input(&self) -> Option<&str> {
        self.custom_input.as_deref()
    }

    pub fn download_path(&self) -> Option<&PathBuf> {
        self.download_path.as_ref()
    }

    pub fn upload_path(&self) -> Option<&PathBuf> {
        self.upload_path.as_ref()
    }

    /// Next getUpdates offset, if a batch has been seen.
    pub fn offset(&self) -> Option<i64> {
        match self.offset.load(Ordering::SeqCst) {
            0 => None,
            offset => Some(offset),
        }
    }

    /// POSTs `payload` as JSON to `method` and decodes the Bot API envelope. Transport and decode
    /// failures become `ok: false` responses.
    async fn call<T: DeserializeOwned>(&self, method: &str, payload: &Value) -> ApiResponse<T> {
        if let Some(limiter) = &self.limiter {
            limiter.wait().await;
        }
        debug!(method = %method, "step: calling Bot API");

        let request = self.http.post(self.config.method_url(method)).json(payload);
        Self::decode(method, request.send().await).await
    }

    async fn call_multipart<T: DeserializeOwned>(&self, method: &str, form: Form) -> ApiResponse<T> {
        if let Some(limiter) = &self.limiter {
            limiter.wait().await;
        }
        debug!(method = %method, "step: calling Bot API (multipart)");

        let request = self.http.post(self.config.method_url(method)).multipart(form);
        Self::decode(method, request.send().await).await
    }

    async fn decode<T: DeserializeOwned>(
        method: &str,
        sent: std::result::Result<reqwest::Response, reqwest::Error>,
    ) -> ApiResponse<T> {
        let response = match sent {
            Ok(response) => response,
            Err(e) => {
                warn!(method = %method, error = %e, "step: Bot API request failed");
                return ApiResponse::failure(format!("request failed: {}", e), None);
            }
        };

        let status = response.status();
        match response.json::<ApiResponse<T>>().await {
            Ok(decoded) => {
                if !decoded.is_ok() {
                    warn!(method = %method, error = %decoded.error_text(), "step: Bot API returned an error");
                }
                decoded
            }
            Err(e) => {
                warn!(method = %method, status = %status, error = %e, "step: undecodable Bot API response");
                ApiResponse::failure(
                    format!("invalid response (HTTP {}): {}", status.as_u16(), e),
                    Some(i64::from(status.as_u16())),
                )
            }
        }
    }

    /// Sends a plain text message.
    #[instrument(skip(self, text))]
    pub async fn send_message(&self, chat_id: i64, text: &str) -> ApiResponse<Value> {
        self.call("sendMessage", &json!({"chat_id": chat_id, "text": text}))
            .await
    }

    /// Logs one raw update and runs the command it carries, if any.
    async fn process_update(&self, raw: &Value) -> Result<()> {
        info!(target: UPDATE_TARGET, update = %raw, "incoming update");

        let Some(update) = parse_update(raw) else {
            debug!("step: update not understood, skipping command dispatch");
            return Ok(());
        };
        let Some(msg) = update_message(&update.kind) else {
            return Ok(());
        };
        let Some(text) = msg.text() else {
            return Ok(());
        };
        let Some((name, args)) = parse_command(text, self.config.bot_username.as_deref()) else {
            return Ok(());
        };

        let chat_id = msg.chat.id.0;
        let user_id = msg.from.as_ref().map(|user| user.id.0 as i64);
        if let Some(reply) = self
            .commands
            .execute(&name, args, Some(chat_id), user_id, false)
            .await?
        {
            let sent = self.send_message(chat_id, &reply).await;
            if !sent.is_ok() {
                warn!(chat_id, error = %sent.error_text(), "step: reply not delivered");
            }
        }
        Ok(())
    }

    async fn set_webhook_with_certificate(
        &self,
        url: &str,
        options: &WebhookOptions,
        certificate: &str,
    ) -> ApiResponse<bool> {
        let bytes = match tokio::fs::read(certificate).await {
            Ok(bytes) => bytes,
            Err(e) => {
                warn!(certificate = %certificate, error = %e, "step: cannot read certificate");
                return ApiResponse::failure(
                    format!("cannot read certificate {}: {}", certificate, e),
                    None,
                );
            }
        };

        let file_name = std::path::Path::new(certificate)
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| "certificate.pem".to_string());
        let mut form = Form::new()
            .text("url", url.to_string())
            .part("certificate", Part::bytes(bytes).file_name(file_name));
        if let Some(max) = options.max_connections {
            form = form.text("max_connections", max.to_string());
        }
        if let Some(allowed) = &options.allowed_updates {
            form = form.text("allowed_updates", Value::from(allowed.clone()).to_string());
        }

        self.call_multipart("setWebhook", form).await
    }
}

#[async_trait]
impl BotClient for TelegramClient {
    #[instrument(skip(self, url, options))]
    async fn set_webhook(&self, url: &str, options: &WebhookOptions) -> ApiResponse<bool> {
        if let Some(certificate) = options.certificate.as_deref() {
            return self
                .set_webhook_with_certificate(url, options, certificate)
                .await;
        }

        let mut payload = match serde_json::to_value(options) {
            Ok(Value::Object(map)) => map,
            _ => Map::new(),
        };
        payload.insert("url".to_string(), Value::from(url));
        self.call("setWebhook", &Value::Object(payload)).await
    }

    #[instrument(skip(self))]
    async fn delete_webhook(&self) -> ApiResponse<bool> {
        self.call("deleteWebhook", &json!({})).await
    }

    #[instrument(skip(self))]
    async fn get_webhook_info(&self) -> ApiResponse<WebhookInfo> {
        self.call("getWebhookInfo", &json!({})).await
    }

    #[instrument(skip(self, body))]
    async fn handle_webhook_request(&self, body: Option<&str>) -> Result<()> {
        let input = self
            .custom_input
            .as_deref()
            .or(body)
            .map(str::trim)
            .filter(|input| !input.is_empty())
            .ok_or_else(|| ManagerError::Bot("Input is empty!".to_string()))?;

        let raw: Value = serde_json::from_str(input)
            .map_err(|e| ManagerError::Bot(format!("invalid update JSON: {}", e)))?;
        if to_core_update(&raw).is_none() {
            return Err(ManagerError::Bot("update without update_id".to_string()));
        }

        self.process_update(&raw).await
    }

    #[instrument(skip(self))]
    async fn fetch_updates(&self) -> ApiResponse<Vec<Update>> {
        let mut payload = Map::new();
        if let Some(offset) = self.offset() {
            payload.insert("offset".to_string(), Value::from(offset));
        }

        let response: ApiResponse<Vec<Value>> =
            self.call("getUpdates", &Value::Object(payload)).await;
        let ApiResponse {
            ok,
            result,
            description,
            error_code,
        } = response;

        let Some(raw_updates) = result.filter(|_| ok) else {
            return ApiResponse {
                ok,
                result: None,
                description,
                error_code,
            };
        };

        let mut updates = Vec::with_capacity(raw_updates.len());
        for raw in &raw_updates {
            let Some(update) = to_core_update(raw) else {
                warn!(update = %raw, "step: skipping update without update_id");
                continue;
            };
            self.offset
                .fetch_max(update.update_id + 1, Ordering::SeqCst);
            if let Err(e) = self.process_update(raw).await {
                warn!(update_id = update.update_id, error = %e, "step: update processing failed");
            }
            updates.push(update);
        }

        info!(count = updates.len(), offset = ?self.offset(), "step: updates fetched");
        ApiResponse {
            ok,
            result: Some(updates),
            description,
            error_code,
        }
    }

    #[instrument(skip(self))]
    async fn run_commands(&self, commands: &[String]) -> Result<()> {
        if commands.is_empty() {
            warn!("step: no commands to run");
            return Ok(());
        }

        for line in commands {
            let line = line.trim();
            let line = if line.starts_with('/') {
                line.to_string()
            } else {
                format!("/{}", line)
            };
            let Some((name, args)) = parse_command(&line, self.config.bot_username.as_deref())
            else {
                warn!(command = %line, "step: invalid command skipped");
                continue;
            };
            if let Some(reply) = self.commands.execute(&name, args, None, None, true).await? {
                info!(command = %name, reply = %reply, "step: command finished");
            }
        }
        Ok(())
    }

    fn enable_admins(&mut self, admins: &[i64]) {
        info!(count = admins.len(), "step: admins enabled");
        self.commands.set_admins(admins);
    }

    fn enable_storage(&mut self, credentials: &StorageCredentials) {
        info!(host = %credentials.host, database = %credentials.database, "step: storage enabled");
        self.storage = Some(credentials.clone());
    }

    fn enable_limiter(&mut self, enabled: bool, options: &Map<String, Value>) {
        self.limiter = enabled.then(|| RequestLimiter::from_options(options));
        info!(enabled, interval = ?self.limiter.as_ref().map(RequestLimiter::interval), "step: limiter configured");
    }

    fn enable_analytics(&mut self, token: &str, options: &Map<String, Value>) {
        info!("step: analytics enabled");
        self.analytics = Some(AnalyticsSettings {
            token: token.to_string(),
            options: options.clone(),
        });
    }

    fn add_commands_paths(&mut self, paths: &[String]) {
        self.commands.add_paths(paths);
    }

    fn set_command_config(&mut self, command: &str, config: &Value) {
        self.commands.set_config(command, config);
    }

    fn set_custom_input(&mut self, input: &str) {
        self.custom_input = Some(input.to_string());
    }

    fn set_download_path(&mut self, path: &str) {
        self.download_path = Some(PathBuf::from(path));
    }

    fn set_upload_path(&mut self, path: &str) {
        self.upload_path = Some(PathBuf::from(path));
    }
}
