//! StubClient: in-memory `BotClient` for orchestrator tests.
//!
//! - Records every call (name plus arguments) in order.
//! - Webhook set/delete return canned descriptions from queues, falling back to a fixed text.
//! - Clones share state, so a test keeps one handle while the manager owns the other.

#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use bot_manager::{ApiResponse, BotClient, Result, StorageCredentials, Update, WebhookInfo, WebhookOptions};
use serde_json::{Map, Value};

#[derive(Debug, Default)]
struct StubState {
    calls: Vec<String>,
    set_replies: VecDeque<ApiResponse<bool>>,
    delete_replies: VecDeque<ApiResponse<bool>>,
    update_replies: VecDeque<ApiResponse<Vec<Update>>>,
    webhook_info: Option<ApiResponse<WebhookInfo>>,
    set_options: Vec<WebhookOptions>,
    handled_bodies: Vec<Option<String>>,
    commands_run: Vec<Vec<String>>,
}

#[derive(Debug, Clone, Default)]
pub struct StubClient {
    state: Arc<Mutex<StubState>>,
}

impl StubClient {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queues descriptions returned by successive `set_webhook` calls.
    pub fn with_set_replies(self, replies: &[&str]) -> Self {
        self.state.lock().unwrap().set_replies.extend(
            replies
                .iter()
                .map(|d| ApiResponse::success(true, Some(d.to_string()))),
        );
        self
    }

    /// Queues descriptions returned by successive `delete_webhook` calls.
    pub fn with_delete_replies(self, replies: &[&str]) -> Self {
        self.state.lock().unwrap().delete_replies.extend(
            replies
                .iter()
                .map(|d| ApiResponse::success(true, Some(d.to_string()))),
        );
        self
    }

    /// Queues a `fetch_updates` result.
    pub fn with_updates(self, reply: ApiResponse<Vec<Update>>) -> Self {
        self.state.lock().unwrap().update_replies.push_back(reply);
        self
    }

    pub fn with_webhook_info(self, reply: ApiResponse<WebhookInfo>) -> Self {
        self.state.lock().unwrap().webhook_info = Some(reply);
        self
    }

    /// All recorded calls, e.g. `delete_webhook`, `set_webhook https://...`.
    pub fn calls(&self) -> Vec<String> {
        self.state.lock().unwrap().calls.clone()
    }

    /// Recorded calls whose name starts with `prefix`.
    pub fn calls_matching(&self, prefix: &str) -> Vec<String> {
        self.calls()
            .into_iter()
            .filter(|c| c.starts_with(prefix))
            .collect()
    }

    pub fn set_options(&self) -> Vec<WebhookOptions> {
        self.state.lock().unwrap().set_options.clone()
    }

    pub fn handled_bodies(&self) -> Vec<Option<String>> {
        self.state.lock().unwrap().handled_bodies.clone()
    }

    pub fn commands_run(&self) -> Vec<Vec<String>> {
        self.state.lock().unwrap().commands_run.clone()
    }

    fn record(&self, call: String) {
        self.state.lock().unwrap().calls.push(call);
    }
}

#[async_trait]
impl BotClient for StubClient {
    async fn set_webhook(&self, url: &str, options: &WebhookOptions) -> ApiResponse<bool> {
        self.record(format!("set_webhook {}", url));
        let mut state = self.state.lock().unwrap();
        state.set_options.push(options.clone());
        state
            .set_replies
            .pop_front()
            .unwrap_or_else(|| ApiResponse::success(true, Some("Webhook was set".to_string())))
    }

    async fn delete_webhook(&self) -> ApiResponse<bool> {
        self.record("delete_webhook".to_string());
        self.state
            .lock()
            .unwrap()
            .delete_replies
            .pop_front()
            .unwrap_or_else(|| ApiResponse::success(true, Some("Webhook was deleted".to_string())))
    }

    async fn get_webhook_info(&self) -> ApiResponse<WebhookInfo> {
        self.record("get_webhook_info".to_string());
        self.state
            .lock()
            .unwrap()
            .webhook_info
            .clone()
            .unwrap_or_else(|| ApiResponse::success(WebhookInfo::default(), None))
    }

    async fn handle_webhook_request(&self, body: Option<&str>) -> Result<()> {
        self.record("handle_webhook_request".to_string());
        self.state
            .lock()
            .unwrap()
            .handled_bodies
            .push(body.map(str::to_string));
        Ok(())
    }

    async fn fetch_updates(&self) -> ApiResponse<Vec<Update>> {
        self.record("fetch_updates".to_string());
        self.state
            .lock()
            .unwrap()
            .update_replies
            .pop_front()
            .unwrap_or_else(|| ApiResponse::success(Vec::new(), None))
    }

    async fn run_commands(&self, commands: &[String]) -> Result<()> {
        self.record(format!("run_commands {}", commands.join(",")));
        self.state
            .lock()
            .unwrap()
            .commands_run
            .push(commands.to_vec());
        Ok(())
    }

    fn enable_admins(&mut self, admins: &[i64]) {
        self.record(format!("enable_admins {:?}", admins));
    }

    fn enable_storage(&mut self, credentials: &StorageCredentials) {
        self.record(format!("enable_storage {}", credentials.database));
    }

    fn enable_limiter(&mut self, enabled: bool, options: &Map<String, Value>) {
        self.record(format!(
            "enable_limiter {} {}",
            enabled,
            Value::Object(options.clone())
        ));
    }

    fn enable_analytics(&mut self, token: &str, _options: &Map<String, Value>) {
        self.record(format!("enable_analytics {}", token));
    }

    fn add_commands_paths(&mut self, paths: &[String]) {
        self.record(format!("add_commands_paths {}", paths.join(",")));
    }

    fn set_command_config(&mut self, command: &str, config: &Value) {
        self.record(format!("set_command_config {} {}", command, config));
    }

    fn set_custom_input(&mut self, input: &str) {
        self.record(format!("set_custom_input {}", input));
    }

    fn set_download_path(&mut self, path: &str) {
        self.record(format!("set_download_path {}", path));
    }

    fn set_upload_path(&mut self, path: &str) {
        self.record(format!("set_upload_path {}", path));
    }
}
