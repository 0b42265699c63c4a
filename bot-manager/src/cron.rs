//! Cron controller: run the commands of one or more named groups.

use manager_core::{BotClient, Result};
use tracing::{info, instrument, warn};

use crate::params::ParamSet;

/// Group run when `g` is not given.
pub const DEFAULT_CRON_GROUP: &str = "default";

/// Commands of the comma-separated `groups`, concatenated in the given order. Names are trimmed;
/// unknown groups contribute nothing.
pub fn resolve_commands(params: &ParamSet, groups: &str) -> Vec<String> {
    let mut commands = Vec::new();
    for group in groups.split(',').map(str::trim).filter(|g| !g.is_empty()) {
        match params.bot_param_as::<Vec<String>>(&format!("cron.groups.{}", group)) {
            Some(group_commands) => commands.extend(group_commands),
            None => warn!(group = %group, "step: cron group not configured"),
        }
    }
    commands
}

/// Runs all commands of `groups` in a single client call. Produces no output.
#[instrument(skip(client, params))]
pub async fn run_cron<C>(client: &C, params: &ParamSet, groups: &str) -> Result<()>
where
    C: BotClient + ?Sized,
{
    let commands = resolve_commands(params, groups);
    info!(count = commands.len(), "step: running cron commands");
    client.run_commands(&commands).await
}
