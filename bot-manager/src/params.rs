//! Parameter store: startup bot parameters plus per-invocation transport parameters.
//!
//! Bot parameters are filtered to the recognized top-level keys, kept as a JSON tree for dotted
//! lookup (`commands.configs.weather.owm_api_key`) and deserialized into the typed [`BotParams`].
//! Transport parameters come from the query string and, for command-line runs, `key=value` argv
//! tokens; only the whitelisted keys survive.

use std::collections::BTreeMap;

use manager_core::{LogSinks, ManagerError, Result, StorageCredentials};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};
use tracing::debug;

use crate::request::RequestContext;

/// Transport keys: secret, action, loop seconds, loop interval, cron groups.
const SCRIPT_PARAMS: [&str; 5] = ["s", "a", "l", "i", "g"];

/// Checked in this order; `secret` only becomes vital when a webhook is configured.
const VITAL_BOT_PARAM: &str = "api_key";
const WEBHOOK_VITAL_BOT_PARAM: &str = "secret";

const OPTIONAL_BOT_PARAMS: [&str; 14] = [
    "bot_username",
    "secret",
    "validate_request",
    "valid_ips",
    "webhook",
    "logging",
    "limiter",
    "admins",
    "mysql",
    "paths",
    "commands",
    "botan",
    "custom_input",
    "cron",
];

/// Typed view of the recognized bot parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BotParams {
    pub api_key: String,
    #[serde(default)]
    pub bot_username: Option<String>,
    #[serde(default)]
    pub secret: Option<String>,
    /// Only accept webhook calls from Telegram's source range (and `valid_ips`). Default on.
    #[serde(default = "default_true")]
    pub validate_request: bool,
    /// Extra trusted addresses or CIDR ranges.
    #[serde(default, deserialize_with = "one_or_many")]
    pub valid_ips: Vec<String>,
    #[serde(default)]
    pub webhook: Option<WebhookParams>,
    #[serde(default)]
    pub logging: Option<LogSinks>,
    #[serde(default)]
    pub limiter: Option<LimiterParams>,
    #[serde(default, deserialize_with = "one_or_many")]
    pub admins: Vec<i64>,
    #[serde(default)]
    pub mysql: Option<StorageCredentials>,
    #[serde(default)]
    pub paths: Option<PathsParams>,
    #[serde(default)]
    pub commands: Option<CommandsParams>,
    /// Analytics token and options.
    #[serde(default)]
    pub botan: Option<AnalyticsParams>,
    /// Raw update JSON used instead of the request body.
    #[serde(default)]
    pub custom_input: Option<String>,
    #[serde(default)]
    pub cron: Option<CronParams>,
}

impl BotParams {
    /// Configured webhook URL, if non-empty.
    pub fn webhook_url(&self) -> Option<&str> {
        self.webhook
            .as_ref()
            .and_then(|w| w.url.as_deref())
            .filter(|url| !url.is_empty())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WebhookParams {
    #[serde(default)]
    pub url: Option<String>,
    /// Path to a self-signed certificate.
    #[serde(default)]
    pub certificate: Option<String>,
    #[serde(default)]
    pub max_connections: Option<u32>,
    #[serde(default)]
    pub allowed_updates: Option<Vec<String>>,
}

/// Rate limiter: either a plain flag or `{ "enabled": .., "options": {..} }`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum LimiterParams {
    Flag(bool),
    Settings {
        #[serde(default = "default_true")]
        enabled: bool,
        #[serde(default)]
        options: Map<String, Value>,
    },
}

impl LimiterParams {
    pub fn enabled(&self) -> bool {
        match self {
            LimiterParams::Flag(enabled) => *enabled,
            LimiterParams::Settings { enabled, .. } => *enabled,
        }
    }

    /// Limiter options; empty for the flag form.
    pub fn options(&self) -> Map<String, Value> {
        match self {
            LimiterParams::Flag(_) => Map::new(),
            LimiterParams::Settings { options, .. } => options.clone(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PathsParams {
    #[serde(default)]
    pub download: Option<String>,
    #[serde(default)]
    pub upload: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CommandsParams {
    #[serde(default, deserialize_with = "one_or_many")]
    pub paths: Vec<String>,
    /// Per-command config maps, keyed by command name.
    #[serde(default)]
    pub configs: Map<String, Value>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AnalyticsParams {
    pub token: String,
    #[serde(default)]
    pub options: Map<String, Value>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CronParams {
    /// Group name -> command names.
    #[serde(default)]
    pub groups: BTreeMap<String, Vec<String>>,
}

fn default_true() -> bool {
    true
}

#[derive(Deserialize)]
#[serde(untagged)]
enum OneOrMany<T> {
    One(T),
    Many(Vec<T>),
    Null,
}

/// Accepts a single value, a list or null.
fn one_or_many<'de, D, T>(deserializer: D) -> std::result::Result<Vec<T>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Ok(match OneOrMany::deserialize(deserializer)? {
        OneOrMany::One(value) => vec![value],
        OneOrMany::Many(values) => values,
        OneOrMany::Null => Vec::new(),
    })
}

/// Bot parameters plus transport parameters for one invocation.
#[derive(Debug, Clone)]
pub struct ParamSet {
    tree: Map<String, Value>,
    bot: BotParams,
    script: BTreeMap<String, String>,
}

impl ParamSet {
    /// Validates and stores the bot parameters, then resolves the transport parameters of
    /// `request`. Fails with [`ManagerError::InvalidParams`] naming the first missing vital key.
    pub fn new(config: Value, request: &RequestContext) -> Result<Self> {
        let Value::Object(input) = config else {
            return Err(ManagerError::Config(
                "bot parameters must be a JSON object".to_string(),
            ));
        };

        let tree = Self::filter_bot_params(input);
        Self::check_vitals(&tree)?;

        let bot: BotParams = serde_json::from_value(Value::Object(tree.clone()))
            .map_err(|e| ManagerError::Config(format!("invalid bot parameters: {}", e)))?;

        let script = Self::script_params_from(request);
        debug!(
            bot_params = tree.len(),
            script_params = ?script.keys().collect::<Vec<_>>(),
            "step: parameters resolved"
        );

        Ok(Self { tree, bot, script })
    }

    /// Keeps recognized top-level keys; a `null` value counts as absent.
    fn filter_bot_params(input: Map<String, Value>) -> Map<String, Value> {
        input
            .into_iter()
            .filter(|(key, value)| {
                (key == VITAL_BOT_PARAM || OPTIONAL_BOT_PARAMS.contains(&key.as_str()))
                    && !value.is_null()
            })
            .collect()
    }

    fn check_vitals(tree: &Map<String, Value>) -> Result<()> {
        if !tree.contains_key(VITAL_BOT_PARAM) {
            return Err(ManagerError::InvalidParams(VITAL_BOT_PARAM.to_string()));
        }
        if tree.contains_key("webhook") && !tree.contains_key(WEBHOOK_VITAL_BOT_PARAM) {
            return Err(ManagerError::InvalidParams(
                WEBHOOK_VITAL_BOT_PARAM.to_string(),
            ));
        }
        Ok(())
    }

    /// Query parameters, overlaid by `key=value` argv tokens on the command line, then whitelisted.
    /// Tokens without `=` or with an empty key are dropped; an empty value is kept.
    fn script_params_from(request: &RequestContext) -> BTreeMap<String, String> {
        let mut params = request.query().clone();

        if let Some(argv) = request.argv() {
            for arg in argv.iter().skip(1) {
                match arg.split_once('=') {
                    Some((key, value)) if !key.is_empty() => {
                        params.insert(key.to_string(), value.to_string());
                    }
                    _ => debug!(arg = %arg, "step: dropped malformed argument"),
                }
            }
        }

        params.retain(|key, _| SCRIPT_PARAMS.contains(&key.as_str()));
        params
    }

    /// Dotted-path lookup into the bot parameters. `None` as soon as a segment is missing or the
    /// terminal value is `null`. List elements are addressed by index.
    pub fn bot_param(&self, path: &str) -> Option<&Value> {
        let mut segments = path.split('.');
        let first = segments.next()?;
        let mut current = self.tree.get(first)?;

        for segment in segments {
            current = match current {
                Value::Object(map) => map.get(segment)?,
                Value::Array(items) => items.get(segment.parse::<usize>().ok()?)?,
                _ => return None,
            };
        }

        (!current.is_null()).then_some(current)
    }

    /// [`ParamSet::bot_param`] with a caller-supplied default.
    pub fn bot_param_or(&self, path: &str, default: Value) -> Value {
        self.bot_param(path).cloned().unwrap_or(default)
    }

    /// Dotted-path lookup deserialized into `T`; `None` when absent or of another shape.
    pub fn bot_param_as<T: DeserializeOwned>(&self, path: &str) -> Option<T> {
        self.bot_param(path)
            .and_then(|value| serde_json::from_value(value.clone()).ok())
    }

    /// All recognized bot parameters as given.
    pub fn bot_params(&self) -> &Map<String, Value> {
        &self.tree
    }

    /// Typed bot parameters.
    pub fn bot(&self) -> &BotParams {
        &self.bot
    }

    pub fn script_param(&self, key: &str) -> Option<&str> {
        self.script.get(key).map(String::as_str)
    }

    pub fn script_params(&self) -> &BTreeMap<String, String> {
        &self.script
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn vitals() -> Value {
        json!({
            "api_key": "12345:api_key",
            "bot_username": "test_bot",
            "secret": "secret_12345",
        })
    }

    fn with(extra: Value) -> Value {
        let mut params = vitals();
        let map = params.as_object_mut().unwrap();
        for (k, v) in extra.as_object().unwrap() {
            map.insert(k.clone(), v.clone());
        }
        params
    }

    fn cli(args: &[&str]) -> RequestContext {
        RequestContext::cli(std::iter::once("botmgr").chain(args.iter().copied()))
    }

    #[test]
    fn test_construct_with_vitals() {
        let params = ParamSet::new(vitals(), &RequestContext::default()).unwrap();
        assert_eq!(params.bot().api_key, "12345:api_key");
        assert!(params.bot().validate_request);
        assert!(params.script_params().is_empty());
    }

    #[test]
    fn test_missing_api_key_fails() {
        let err = ParamSet::new(json!({"secret": "s"}), &RequestContext::default()).unwrap_err();
        assert!(matches!(err, ManagerError::InvalidParams(_)));
        assert!(err.to_string().contains("api_key"));

        let err = ParamSet::new(json!({}), &RequestContext::default()).unwrap_err();
        assert_eq!(err.to_string(), "Some vital info is missing: api_key");
    }

    #[test]
    fn test_api_key_checked_before_secret() {
        let err = ParamSet::new(
            json!({"webhook": {"url": "https://example.com/hook"}}),
            &RequestContext::default(),
        )
        .unwrap_err();
        assert!(err.to_string().contains("api_key"));
    }

    #[test]
    fn test_webhook_makes_secret_vital() {
        let err = ParamSet::new(
            json!({"api_key": "k", "webhook": {"url": "https://example.com/hook"}}),
            &RequestContext::default(),
        )
        .unwrap_err();
        assert!(matches!(err, ManagerError::InvalidParams(_)));
        assert!(err.to_string().contains("secret"));

        // Without a webhook the secret is optional.
        ParamSet::new(json!({"api_key": "k"}), &RequestContext::default()).unwrap();
        // A null webhook is no webhook.
        ParamSet::new(json!({"api_key": "k", "webhook": null}), &RequestContext::default())
            .unwrap();
    }

    #[test]
    fn test_unknown_keys_dropped() {
        let params = ParamSet::new(
            with(json!({"admins": [1], "paths": {"upload": "/upload/path"}, "paramX": "something"})),
            &RequestContext::default(),
        )
        .unwrap();
        assert_eq!(params.bot_param("admins"), Some(&json!([1])));
        assert_eq!(params.bot_param("paths.upload"), Some(&json!("/upload/path")));
        assert!(params.bot_param("paramX").is_none());
        assert!(!params.bot_params().contains_key("paramX"));
    }

    #[test]
    fn test_all_bot_params_kept() {
        let all = with(json!({
            "validate_request": true,
            "valid_ips": ["1.2.3.4", "10.0.0.0/8"],
            "webhook": {
                "url": "https://php.telegram.bot/manager.php",
                "certificate": "/tmp/server.crt",
                "max_connections": 20,
                "allowed_updates": ["message", "edited_channel_post", "callback_query"]
            },
            "logging": {"debug": "/tmp/debug.log"},
            "limiter": false,
            "admins": [1],
            "mysql": {"host": "127.0.0.1", "user": "root", "password": "root", "database": "telegram_bot"},
            "paths": {"download": "/tmp/Download", "upload": "/tmp/Upload"},
            "commands": {
                "paths": ["/tmp/CustomCommands"],
                "configs": {
                    "weather": {"owm_api_key": "owm_api_key_12345"},
                    "sendtochannel": {"your_channel": "@my_channel"}
                }
            },
            "botan": {"token": "botan_12345", "options": {"timeout": 3}},
            "custom_input": "{\"some\":\"raw\", \"json\":\"update\"}",
            "cron": {"groups": {"default": ["/start"]}}
        }));
        let params = ParamSet::new(all.clone(), &RequestContext::default()).unwrap();

        assert_eq!(&Value::Object(params.bot_params().clone()), &all);
        let bot = params.bot();
        assert_eq!(bot.webhook_url(), Some("https://php.telegram.bot/manager.php"));
        assert_eq!(bot.admins, vec![1]);
        assert_eq!(bot.limiter, Some(LimiterParams::Flag(false)));
        assert_eq!(bot.mysql.as_ref().unwrap().database, "telegram_bot");
        assert_eq!(bot.commands.as_ref().unwrap().paths, vec!["/tmp/CustomCommands"]);
        assert_eq!(bot.botan.as_ref().unwrap().token, "botan_12345");
        assert_eq!(
            bot.cron.as_ref().unwrap().groups.get("default"),
            Some(&vec!["/start".to_string()])
        );
    }

    #[test]
    fn test_dotted_lookup_with_default() {
        let params = ParamSet::new(
            with(json!({
                "commands": {"configs": {"weather": {"owm_api_key": "X"}}},
                "webhook": {"url": "https://example.com/hook", "max_connections": null}
            })),
            &RequestContext::default(),
        )
        .unwrap();

        assert_eq!(
            params.bot_param("commands.configs.weather.owm_api_key"),
            Some(&json!("X"))
        );
        assert_eq!(
            params.bot_param_or("commands.configs.weather.owm_api_key", json!("default")),
            json!("X")
        );
        for missing in [
            "commands.configs.weather.missing",
            "commands.configs.missing.owm_api_key",
            "commands.missing.weather.owm_api_key",
            "missing.configs.weather.owm_api_key",
            "commands.configs.weather.owm_api_key.deeper",
            "webhook.max_connections",
            "",
        ] {
            assert_eq!(params.bot_param_or(missing, json!("default")), json!("default"));
        }
    }

    #[test]
    fn test_dotted_lookup_indexes_lists() {
        let params = ParamSet::new(
            with(json!({"cron": {"groups": {"maintenance": ["/cleanup", "/stats"]}}})),
            &RequestContext::default(),
        )
        .unwrap();
        assert_eq!(params.bot_param("cron.groups.maintenance.1"), Some(&json!("/stats")));
        assert!(params.bot_param("cron.groups.maintenance.2").is_none());
        assert!(params.bot_param("cron.groups.maintenance.x").is_none());
        assert_eq!(
            params.bot_param_as::<Vec<String>>("cron.groups.maintenance"),
            Some(vec!["/cleanup".to_string(), "/stats".to_string()])
        );
    }

    #[test]
    fn test_type_mismatch_is_config_error() {
        let err = ParamSet::new(with(json!({"validate_request": "yes"})), &RequestContext::default())
            .unwrap_err();
        assert!(matches!(err, ManagerError::Config(_)));

        let err = ParamSet::new(json!(["api_key"]), &RequestContext::default()).unwrap_err();
        assert!(matches!(err, ManagerError::Config(_)));
    }

    #[test]
    fn test_single_values_accepted_for_lists() {
        let params = ParamSet::new(
            with(json!({"admins": 1, "valid_ips": "1.2.3.4", "commands": {"paths": "/tmp/cmds"}})),
            &RequestContext::default(),
        )
        .unwrap();
        assert_eq!(params.bot().admins, vec![1]);
        assert_eq!(params.bot().valid_ips, vec!["1.2.3.4"]);
        assert_eq!(params.bot().commands.as_ref().unwrap().paths, vec!["/tmp/cmds"]);
    }

    #[test]
    fn test_limiter_shapes() {
        let flag = ParamSet::new(with(json!({"limiter": true})), &RequestContext::default())
            .unwrap();
        let limiter = flag.bot().limiter.clone().unwrap();
        assert!(limiter.enabled());
        assert!(limiter.options().is_empty());

        let settings = ParamSet::new(
            with(json!({"limiter": {"options": {"interval": 0.5}}})),
            &RequestContext::default(),
        )
        .unwrap();
        let limiter = settings.bot().limiter.clone().unwrap();
        assert!(limiter.enabled());
        assert_eq!(limiter.options().get("interval"), Some(&json!(0.5)));

        let disabled = ParamSet::new(
            with(json!({"limiter": {"enabled": false}})),
            &RequestContext::default(),
        )
        .unwrap();
        assert!(!disabled.bot().limiter.clone().unwrap().enabled());
    }

    #[test]
    fn test_script_params_invalid_format_dropped() {
        let params = ParamSet::new(vitals(), &cli(&["invalid-param-format", "=value"])).unwrap();
        assert!(params.script_params().is_empty());
    }

    #[test]
    fn test_script_params_from_argv() {
        let params = ParamSet::new(vitals(), &cli(&[])).unwrap();
        assert!(params.script_params().is_empty());

        let params = ParamSet::new(vitals(), &cli(&["l="])).unwrap();
        assert_eq!(params.script_param("l"), Some(""));
        assert_eq!(params.script_params().len(), 1);

        let params = ParamSet::new(vitals(), &cli(&["a=handle", "s=secret_12345"])).unwrap();
        assert_eq!(params.script_param("a"), Some("handle"));
        assert_eq!(params.script_param("s"), Some("secret_12345"));
        assert_eq!(params.script_params().len(), 2);
        assert!(params.script_param("non-existent").is_none());
    }

    #[test]
    fn test_script_value_keeps_later_equals_signs() {
        let params = ParamSet::new(vitals(), &cli(&["s=abc=def"])).unwrap();
        assert_eq!(params.script_param("s"), Some("abc=def"));
    }

    #[test]
    fn test_argv_overrides_query_and_whitelist_applies() {
        let request = cli(&["a=cron", "g=hourly", "x=ignored"])
            .with_query("a", "handle")
            .with_query("s", "from_query")
            .with_query("unknown", "dropped");
        let params = ParamSet::new(vitals(), &request).unwrap();
        assert_eq!(params.script_param("a"), Some("cron"));
        assert_eq!(params.script_param("s"), Some("from_query"));
        assert_eq!(params.script_param("g"), Some("hourly"));
        assert!(params.script_param("x").is_none());
        assert!(params.script_param("unknown").is_none());
    }

    #[test]
    fn test_http_ignores_argv_parsing() {
        let request = RequestContext::http([("l", "5"), ("i", "3"), ("foo", "bar")]);
        let params = ParamSet::new(vitals(), &request).unwrap();
        assert_eq!(params.script_param("l"), Some("5"));
        assert_eq!(params.script_param("i"), Some("3"));
        assert!(params.script_param("foo").is_none());
    }
}
