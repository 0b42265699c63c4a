//! The single action requested for an invocation, restricted to a fixed vocabulary.

use std::fmt;
use std::str::FromStr;

use manager_core::{ManagerError, Result};
use serde_json::Value;

const VALID_ACTIONS: [&str; 6] = ["set", "unset", "reset", "handle", "cron", "webhookinfo"];

/// Requested action. Empty or absent input means `handle`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum Action {
    Set,
    Unset,
    Reset,
    #[default]
    Handle,
    Cron,
    WebhookInfo,
}

impl Action {
    /// Resolves the raw transport value (`a`). Fails with [`ManagerError::InvalidAction`] outside
    /// the vocabulary.
    pub fn new(raw: Option<&str>) -> Result<Self> {
        match raw {
            None | Some("") => Ok(Action::Handle),
            Some(s) => s.parse(),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Action::Set => "set",
            Action::Unset => "unset",
            Action::Reset => "reset",
            Action::Handle => "handle",
            Action::Cron => "cron",
            Action::WebhookInfo => "webhookinfo",
        }
    }

    /// True iff the action equals one of `candidates` (exact match, no trimming or case folding).
    pub fn is_action<I, S>(&self, candidates: I) -> bool
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        candidates.into_iter().any(|c| c.as_ref() == self.as_str())
    }

    /// Same as [`Action::is_action`] for loosely typed input: a string or a list of strings.
    /// Non-string values (null, booleans, numbers) never match.
    pub fn is_action_value(&self, candidates: &Value) -> bool {
        match candidates {
            Value::String(s) => s == self.as_str(),
            Value::Array(items) => items.iter().any(|item| self.is_action_value_item(item)),
            _ => false,
        }
    }

    fn is_action_value_item(&self, item: &Value) -> bool {
        matches!(item, Value::String(s) if s == self.as_str())
    }

    /// Whether this action manages the webhook registration.
    pub fn is_webhook_action(&self) -> bool {
        matches!(self, Action::Set | Action::Unset | Action::Reset)
    }

    /// The whole vocabulary, in canonical order.
    pub fn valid_actions() -> &'static [&'static str] {
        &VALID_ACTIONS
    }
}

impl FromStr for Action {
    type Err = ManagerError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "set" => Ok(Action::Set),
            "unset" => Ok(Action::Unset),
            "reset" => Ok(Action::Reset),
            "handle" => Ok(Action::Handle),
            "cron" => Ok(Action::Cron),
            "webhookinfo" => Ok(Action::WebhookInfo),
            other => Err(ManagerError::InvalidAction(other.to_string())),
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
