//! Orchestrator: one [`BotManager`] per invocation.
//!
//! `run` validates the caller, then dispatches on the action: `webhookinfo` prints the remote
//! status, `set`/`unset`/`reset` go to the webhook controller, and `handle`/`cron` first forward
//! the configured features to the client.

use std::time::Duration;

use manager_core::{ApiResponse, BotClient, ManagerError, Result, Update};
use serde_json::Value;
use tracing::{debug, info, instrument};

use crate::action::Action;
use crate::cron::{run_cron, DEFAULT_CRON_GROUP};
use crate::output::OutputBuffer;
use crate::params::ParamSet;
use crate::polling::{fetch_loop, fetch_once, loop_interval_seconds, loop_seconds, UpdatesCallback};
use crate::request::RequestContext;
use crate::validator::RequestValidator;
use crate::webhook::apply_webhook_action;

/// Pause between delete and set on `reset`.
pub const DEFAULT_RESET_PAUSE: Duration = Duration::from_secs(1);

/// Per-invocation orchestrator. Not shared across invocations: build a new one per request.
pub struct BotManager<C: BotClient> {
    params: ParamSet,
    action: Action,
    request: RequestContext,
    client: C,
    output: OutputBuffer,
    updates_callback: Option<UpdatesCallback>,
    reset_pause: Duration,
}

impl<C: BotClient> BotManager<C> {
    /// Resolves parameters, then the action (`a`). Missing vitals fail before the action is read.
    pub fn new(config: Value, request: RequestContext, client: C) -> Result<Self> {
        let params = ParamSet::new(config, &request)?;
        let action = Action::new(params.script_param("a"))?;
        debug!(action = %action, cli = request.is_cli(), "step: manager created");

        Ok(Self {
            params,
            action,
            request,
            client,
            output: OutputBuffer::new(),
            updates_callback: None,
            reset_pause: DEFAULT_RESET_PAUSE,
        })
    }

    /// Overrides the pause between delete and set on `reset`.
    pub fn with_reset_pause(mut self, pause: Duration) -> Self {
        self.reset_pause = pause;
        self
    }

    /// Replaces the default polling output with `callback`, which receives each raw fetch result.
    pub fn set_custom_get_updates_callback<F>(&mut self, callback: F) -> &mut Self
    where
        F: Fn(&ApiResponse<Vec<Update>>) -> String + Send + Sync + 'static,
    {
        self.updates_callback = Some(Box::new(callback));
        self
    }

    pub fn params(&self) -> &ParamSet {
        &self.params
    }

    pub fn action(&self) -> Action {
        self.action
    }

    pub fn request(&self) -> &RequestContext {
        &self.request
    }

    pub fn client(&self) -> &C {
        &self.client
    }

    pub fn client_mut(&mut self) -> &mut C {
        &mut self.client
    }

    /// Runs the invocation. Every step short-circuits on error; output buffered before the error
    /// stays readable through [`BotManager::output`]. `webhookinfo` also writes into that buffer.
    #[instrument(skip(self), fields(action = %self.action))]
    pub async fn run(&mut self) -> Result<()> {
        let validator = RequestValidator::new(&self.params, &self.request);
        validator.validate_secret(false)?;
        validator.validate_request()?;

        if self.action == Action::WebhookInfo {
            return self.handle_webhook_info().await;
        }

        if self.action.is_webhook_action() {
            return apply_webhook_action(
                &self.client,
                self.action,
                &self.params,
                &mut self.output,
                self.reset_pause,
            )
            .await;
        }

        self.set_bot_extras();

        match self.action {
            Action::Handle => self.handle_request().await,
            Action::Cron => {
                let groups = self.params.script_param("g").unwrap_or(DEFAULT_CRON_GROUP);
                run_cron(&self.client, &self.params, groups).await
            }
            _ => Ok(()),
        }
    }

    /// Drains the accumulated output.
    pub fn output(&mut self) -> String {
        self.output.take()
    }

    /// Appends text to the output.
    pub fn handle_output(&mut self, text: &str) -> &mut Self {
        self.output.push(text);
        self
    }

    /// Whether this invocation passes the origin check.
    pub fn is_valid_request(&self) -> bool {
        RequestValidator::new(&self.params, &self.request).is_valid_request()
    }

    /// Forwards every configured optional feature to the client; absent ones are skipped.
    pub fn set_bot_extras(&mut self) -> &mut Self {
        let bot = self.params.bot();

        if !bot.admins.is_empty() {
            self.client.enable_admins(&bot.admins);
        }
        if let Some(credentials) = &bot.mysql {
            self.client.enable_storage(credentials);
        }
        if let Some(limiter) = &bot.limiter {
            if limiter.enabled() || !limiter.options().is_empty() {
                self.client.enable_limiter(limiter.enabled(), &limiter.options());
            }
        }
        if let Some(analytics) = &bot.botan {
            self.client.enable_analytics(&analytics.token, &analytics.options);
        }
        if let Some(commands) = &bot.commands {
            if !commands.paths.is_empty() {
                self.client.add_commands_paths(&commands.paths);
            }
            for (command, config) in &commands.configs {
                self.client.set_command_config(command, config);
            }
        }
        if let Some(input) = &bot.custom_input {
            self.client.set_custom_input(input);
        }
        if let Some(paths) = &bot.paths {
            if let Some(download) = &paths.download {
                self.client.set_download_path(download);
            }
            if let Some(upload) = &paths.upload {
                self.client.set_upload_path(upload);
            }
        }

        debug!("step: bot extras applied");
        self
    }

    /// `handle`: webhook request when a webhook URL is configured, otherwise polling (looped when
    /// `l` resolves to more than zero seconds).
    async fn handle_request(&mut self) -> Result<()> {
        if self.params.bot().webhook_url().is_some() {
            info!("step: handling webhook request");
            return self.client.handle_webhook_request(self.request.body()).await;
        }

        let callback = self.updates_callback.as_ref();
        let total = loop_seconds(&self.params);
        if total > 0 {
            let total = Duration::from_secs(total);
            let interval = Duration::from_secs(loop_interval_seconds(&self.params));
            fetch_loop(&self.client, callback, &mut self.output, total, interval).await;
        } else {
            fetch_once(&self.client, callback, &mut self.output).await;
        }
        Ok(())
    }

    async fn handle_webhook_info(&mut self) -> Result<()> {
        let response = self.client.get_webhook_info().await;
        match &response.result {
            Some(info) if response.is_ok() => {
                let rendered = serde_json::to_string_pretty(info)
                    .map_err(|e| ManagerError::Bot(format!("cannot render webhook info: {}", e)))?;
                self.output.push_line(&rendered);
            }
            _ => {
                self.output.push_line(&format!(
                    "Failed to get webhook info: {}",
                    response.error_text()
                ));
            }
        }
        Ok(())
    }
}
