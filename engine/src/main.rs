// Clara task-graph orchestrator
// Main entry point for the clara binary

use clap::Parser;
use clara_engine::cli::{Cli, Command};
use clara_engine::config::Config;
use clara_engine::handlers::{
    handle_ask, handle_config, handle_plan, handle_tools, OutputFormat,
};
use clara_engine::telemetry::init_telemetry_with_level;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Parse CLI arguments
    let cli = Cli::parse();

    // Load configuration (or use custom path if provided)
    let mut config = if let Some(config_path) = &cli.config {
        Config::load_from_path(config_path)?
    } else {
        Config::load_or_create()?
    };

    // --log wins over the config file; RUST_LOG wins over both
    let log_level = cli.log.as_deref().unwrap_or(&config.core.log_level);
    init_telemetry_with_level(log_level);

    let version = env!("CARGO_PKG_VERSION");
    let commit = env!("GIT_COMMIT_HASH");
    let timestamp = env!("BUILD_TIMESTAMP");

    tracing::info!("Clara v{} ({} - {})", version, commit, timestamp);

    // Fail fast on missing credentials before any network work
    if cli.command.needs_credentials() {
        config.require_credentials()?;
    }

    // Determine output format
    let format = if cli.json {
        OutputFormat::Json
    } else {
        OutputFormat::Text
    };

    // Handle commands
    match cli.command {
        Command::Ask {
            request,
            offline,
            direct,
        } => {
            tracing::info!("Answering request: {}", request);
            handle_ask(request, offline, direct, &config, format).await
        }

        Command::Plan { request, offline } => {
            tracing::info!("Planning request: {}", request);
            handle_plan(request, offline, &config, format).await
        }

        Command::Tools => handle_tools(&config, format),

        Command::Config => handle_config(&config, format),
    }
}
