//! Webhook controller: set, unset and reset the remote webhook registration.
//!
//! `unset` and `reset` delete first; `set` and `reset` then register
//! `<url>?a=handle&s=<secret>`. Each remote call appends its description as one output line.

use std::time::Duration;

use manager_core::{BotClient, ManagerError, Result, WebhookOptions};
use tracing::{info, instrument};

use crate::action::Action;
use crate::output::OutputBuffer;
use crate::params::ParamSet;

/// Builds the `setWebhook` options from the configured webhook parameters. Empty certificate and
/// zero max connections are dropped; `allowed_updates` is kept even when empty.
pub fn webhook_options(params: &ParamSet) -> WebhookOptions {
    let Some(webhook) = params.bot().webhook.as_ref() else {
        return WebhookOptions::default();
    };

    WebhookOptions {
        certificate: webhook
            .certificate
            .clone()
            .filter(|certificate| !certificate.is_empty()),
        max_connections: webhook.max_connections.filter(|max| *max > 0),
        allowed_updates: webhook.allowed_updates.clone(),
    }
}

/// URL registered with the platform: the configured URL plus the action and secret the manager
/// expects on incoming calls.
pub fn webhook_target(url: &str, secret: &str) -> String {
    format!("{}?a=handle&s={}", url, secret)
}

/// Applies a `set`, `unset` or `reset` action. The URL is checked before anything is deleted;
/// `reset` pauses for `reset_pause` between delete and set. Other actions are a no-op.
#[instrument(skip(client, params, output))]
pub async fn apply_webhook_action<C>(
    client: &C,
    action: Action,
    params: &ParamSet,
    output: &mut OutputBuffer,
    reset_pause: Duration,
) -> Result<()>
where
    C: BotClient + ?Sized,
{
    if !action.is_webhook_action() {
        return Ok(());
    }

    let url = params.bot().webhook_url();
    if url.is_none() && action.is_action(["set", "reset"]) {
        return Err(ManagerError::InvalidWebhook);
    }

    if action.is_action(["unset", "reset"]) {
        info!(action = %action, "step: deleting webhook");
        let response = client.delete_webhook().await;
        output.push_line(response.description());

        if action == Action::Reset {
            tokio::time::sleep(reset_pause).await;
        }
    }

    if action.is_action(["set", "reset"]) {
        let url = url.ok_or(ManagerError::InvalidWebhook)?;
        let secret = params.bot().secret.as_deref().unwrap_or("");
        let options = webhook_options(params);
        info!(action = %action, url = %url, "step: setting webhook");
        let response = client
            .set_webhook(&webhook_target(url, secret), &options)
            .await;
        output.push_line(response.description());
    }

    Ok(())
}
