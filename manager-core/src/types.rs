//! Core types: Bot API response envelope, update summary, webhook options and info, storage credentials.

use serde::{Deserialize, Serialize};

/// Standard Bot API envelope: `{"ok": .., "result": .., "description": .., "error_code": ..}`.
///
/// Remote failures are carried here (`ok == false`) instead of being raised, so callers decide
/// whether a failure is fatal.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(bound(deserialize = "T: Deserialize<'de>"))]
pub struct ApiResponse<T> {
    pub ok: bool,
    #[serde(default)]
    pub result: Option<T>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub error_code: Option<i64>,
}

impl<T> ApiResponse<T> {
    /// Successful response with a result and optional description.
    pub fn success(result: T, description: Option<String>) -> Self {
        Self {
            ok: true,
            result: Some(result),
            description,
            error_code: None,
        }
    }

    /// Failed response with a description and optional error code.
    pub fn failure(description: impl Into<String>, error_code: Option<i64>) -> Self {
        Self {
            ok: false,
            result: None,
            description: Some(description.into()),
            error_code,
        }
    }

    pub fn is_ok(&self) -> bool {
        self.ok
    }

    /// Description returned by the API, or an empty string.
    pub fn description(&self) -> &str {
        self.description.as_deref().unwrap_or("")
    }

    /// Human-readable error text: `Error <code>: <description>` when a code is present.
    pub fn error_text(&self) -> String {
        let description = self.description.as_deref().unwrap_or("unknown error");
        match self.error_code {
            Some(code) => format!("Error {}: {}", code, description),
            None => description.to_string(),
        }
    }
}

/// Transport-agnostic summary of one incoming update.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Update {
    pub update_id: i64,
    /// Bot API update type, e.g. `message`, `inline_query`, `callback_query`.
    pub update_type: String,
    /// Chat id for messages, sender id for inline queries; `None` when not applicable.
    pub chat_id: Option<i64>,
    /// Content-type tag for messages (`text`, `photo`, ...), query text for inline queries.
    pub content: Option<String>,
}

/// Optional `setWebhook` fields. Only non-empty values are set, except `allowed_updates`
/// where an empty list is meaningful ("no update types").
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct WebhookOptions {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub certificate: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_connections: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub allowed_updates: Option<Vec<String>>,
}

/// Result of `getWebhookInfo`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WebhookInfo {
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub has_custom_certificate: bool,
    #[serde(default)]
    pub pending_update_count: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ip_address: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_error_date: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_error_message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_connections: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub allowed_updates: Option<Vec<String>>,
}

/// Storage credentials forwarded to the bot client (`mysql` bot parameter).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StorageCredentials {
    #[serde(default)]
    pub host: String,
    #[serde(default)]
    pub port: Option<u16>,
    #[serde(default)]
    pub user: String,
    #[serde(default)]
    pub password: String,
    #[serde(default)]
    pub database: String,
    #[serde(default)]
    pub table_prefix: Option<String>,
}
