//! botmgr: run one bot manager invocation, or serve the webhook endpoint. Bot parameters come from
//! the JSON config; BOT_TOKEN and BOT_SECRET from the environment override them.

use anyhow::{Context, Result};
use bot_manager::{BotManager, RequestContext};
use clap::Parser;
use manager_cli::{load_config, log_sinks, serve, telegram_client, Cli, Commands, ServeState};
use manager_core::init_tracing;
use serde_json::Value;
use tracing::info;

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    let cli = Cli::parse();
    let config = load_config(&cli.config)?;
    init_tracing(&log_sinks(&config)).context("Initialize logging")?;

    match cli.command {
        Commands::Run { params } => run_once(config, params).await,
        Commands::Serve { listen, path } => {
            serve(listen, &path, ServeState::new(config, telegram_client)).await
        }
    }
}

/// One command-line invocation; the drained output goes to stdout even when the run fails.
async fn run_once(config: Value, params: Vec<String>) -> Result<()> {
    let client = telegram_client(&config).context("Create Telegram client")?;
    let request = RequestContext::cli(std::iter::once("botmgr".to_string()).chain(params));
    let mut manager = BotManager::new(config, request, client).context("Create bot manager")?;

    info!(action = %manager.action(), "step: running invocation");
    let result = manager.run().await;
    print!("{}", manager.output());
    result.context("Bot manager run failed")
}
