//! Command registry: named commands triggered by `/name` messages or by cron runs.
//!
//! Each command sees its entry from `commands.configs` and whether the caller is an admin.
//! Admin-only commands are refused for everyone else; cron runs count as admin.

use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use manager_core::Result;
use serde_json::Value;
use tracing::{info, warn};

/// Invocation context handed to [`Command::execute`].
#[derive(Debug, Clone)]
pub struct CommandContext<'a> {
    /// Chat the command came from; `None` for cron runs.
    pub chat_id: Option<i64>,
    pub user_id: Option<i64>,
    /// Text after the command name, trimmed.
    pub args: &'a str,
    /// The command's `commands.configs.<name>` entry.
    pub config: Option<&'a Value>,
    pub is_admin: bool,
}

/// A named bot command.
#[async_trait]
pub trait Command: Send + Sync {
    /// Name without the leading `/`, lowercase.
    fn name(&self) -> &str;

    fn description(&self) -> &str {
        ""
    }

    fn admin_only(&self) -> bool {
        false
    }

    /// Runs the command; a returned text is sent back to the chat.
    async fn execute(&self, ctx: &CommandContext<'_>) -> Result<Option<String>>;
}

/// Splits `/name@bot args` into `(name, args)`. `None` if `text` is not a command or is addressed
/// to another bot.
pub fn parse_command<'a>(text: &'a str, bot_username: Option<&str>) -> Option<(String, &'a str)> {
    let rest = text.strip_prefix('/')?;
    let (head, args) = match rest.split_once(char::is_whitespace) {
        Some((head, args)) => (head, args.trim()),
        None => (rest, ""),
    };

    let name = match head.split_once('@') {
        Some((name, target)) => {
            let ours = bot_username
                .map(|bot| bot.trim_start_matches('@').eq_ignore_ascii_case(target))
                .unwrap_or(false);
            if !ours {
                return None;
            }
            name
        }
        None => head,
    };

    if name.is_empty() {
        return None;
    }
    Some((name.to_lowercase(), args))
}

#[derive(Default, Clone)]
pub struct CommandRegistry {
    commands: BTreeMap<String, Arc<dyn Command>>,
    configs: BTreeMap<String, Value>,
    admins: Vec<i64>,
    paths: Vec<String>,
}

impl CommandRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `command` under its lowercase name, replacing any previous one.
    pub fn register(&mut self, command: Arc<dyn Command>) {
        let name = command.name().trim_start_matches('/').to_lowercase();
        info!(command = %name, "step: command registered");
        self.commands.insert(name, command);
    }

    pub fn get(&self, name: &str) -> Option<&Arc<dyn Command>> {
        self.commands.get(&name.trim_start_matches('/').to_lowercase())
    }

    /// Registered names, sorted.
    pub fn names(&self) -> Vec<&str> {
        self.commands.keys().map(String::as_str).collect()
    }

    pub fn set_admins(&mut self, admins: &[i64]) {
        self.admins = admins.to_vec();
    }

    pub fn is_admin(&self, user_id: Option<i64>) -> bool {
        user_id.is_some_and(|id| self.admins.contains(&id))
    }

    pub fn set_config(&mut self, command: &str, config: &Value) {
        self.configs.insert(command.to_lowercase(), config.clone());
    }

    pub fn config(&self, command: &str) -> Option<&Value> {
        self.configs.get(&command.to_lowercase())
    }

    /// Records directories holding command definitions. Paths are kept in insertion order without
    /// duplicates.
    pub fn add_paths(&mut self, paths: &[String]) {
        for path in paths {
            if !self.paths.contains(path) {
                self.paths.push(path.clone());
            }
        }
    }

    pub fn paths(&self) -> &[String] {
        &self.paths
    }

    /// Executes `name`. Unknown commands and refused admin-only commands return `Ok(None)`.
    pub async fn execute(
        &self,
        name: &str,
        args: &str,
        chat_id: Option<i64>,
        user_id: Option<i64>,
        force_admin: bool,
    ) -> Result<Option<String>> {
        let Some(command) = self.get(name) else {
            warn!(command = %name, "step: unknown command skipped");
            return Ok(None);
        };

        let is_admin = force_admin || self.is_admin(user_id);
        if command.admin_only() && !is_admin {
            warn!(command = %name, user_id = ?user_id, "step: admin command refused");
            return Ok(None);
        }

        let ctx = CommandContext {
            chat_id,
            user_id,
            args,
            config: self.config(command.name()),
            is_admin,
        };
        info!(command = %command.name(), chat_id = ?chat_id, "step: executing command");
        command.execute(&ctx).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Echo;

    #[async_trait]
    impl Command for Echo {
        fn name(&self) -> &str {
            "echo"
        }

        async fn execute(&self, ctx: &CommandContext<'_>) -> Result<Option<String>> {
            let prefix = ctx
                .config
                .and_then(|c| c.get("prefix"))
                .and_then(Value::as_str)
                .unwrap_or("");
            Ok(Some(format!("{}{}", prefix, ctx.args)))
        }
    }

    struct Cleanup;

    #[async_trait]
    impl Command for Cleanup {
        fn name(&self) -> &str {
            "cleanup"
        }

        fn admin_only(&self) -> bool {
            true
        }

        async fn execute(&self, _ctx: &CommandContext<'_>) -> Result<Option<String>> {
            Ok(Some("cleaned".to_string()))
        }
    }

    fn registry() -> CommandRegistry {
        let mut registry = CommandRegistry::new();
        registry.register(Arc::new(Echo));
        registry.register(Arc::new(Cleanup));
        registry.set_admins(&[1]);
        registry.set_config("echo", &serde_json::json!({"prefix": "> "}));
        registry
    }

    #[test]
    fn test_parse_command() {
        assert_eq!(parse_command("/start", None), Some(("start".to_string(), "")));
        assert_eq!(
            parse_command("/Echo  hello world ", None),
            Some(("echo".to_string(), "hello world"))
        );
        assert_eq!(
            parse_command("/echo@test_bot hi", Some("test_bot")),
            Some(("echo".to_string(), "hi"))
        );
        assert_eq!(parse_command("/echo@other_bot hi", Some("test_bot")), None);
        assert_eq!(parse_command("/echo@test_bot hi", None), None);
        assert_eq!(parse_command("hello", None), None);
        assert_eq!(parse_command("/", None), None);
    }

    #[tokio::test]
    async fn test_execute_with_config() {
        let reply = registry()
            .execute("/echo", "hi", Some(10), Some(2), false)
            .await
            .unwrap();
        assert_eq!(reply.as_deref(), Some("> hi"));
    }

    /// **Test: admin-only commands run for admins and cron, not for other users.**
    #[tokio::test]
    async fn test_admin_only() {
        let registry = registry();
        assert_eq!(
            registry.execute("cleanup", "", Some(10), Some(2), false).await.unwrap(),
            None
        );
        assert_eq!(
            registry
                .execute("cleanup", "", Some(10), Some(1), false)
                .await
                .unwrap()
                .as_deref(),
            Some("cleaned")
        );
        assert_eq!(
            registry
                .execute("cleanup", "", None, None, true)
                .await
                .unwrap()
                .as_deref(),
            Some("cleaned")
        );
    }

    #[tokio::test]
    async fn test_unknown_command_skipped() {
        assert_eq!(
            registry().execute("nope", "", None, None, true).await.unwrap(),
            None
        );
    }

    #[test]
    fn test_paths_deduplicated() {
        let mut registry = CommandRegistry::new();
        registry.add_paths(&["/a".to_string(), "/b".to_string()]);
        registry.add_paths(&["/a".to_string()]);
        assert_eq!(registry.paths(), ["/a", "/b"]);
        assert_eq!(self::registry().names(), vec!["cleanup", "echo"]);
    }
}
