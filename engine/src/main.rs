// Parley dialogue engine
// Main entry point for the parley binary

use clap::Parser;
use parley_engine::cli::{Cli, Command, ConfigAction};
use parley_engine::config::Config;
use parley_engine::handlers::{
    handle_chat, handle_check, handle_config_show, handle_config_validate, handle_match,
    OutputFormat,
};
use parley_engine::telemetry::init_telemetry_with_level;

fn main() -> anyhow::Result<()> {
    // Parse CLI arguments
    let cli = Cli::parse();

    // Load configuration (or use custom path if provided)
    let config = if let Some(config_path) = &cli.config {
        Config::load_from_path(config_path)?
    } else {
        Config::load_or_create()?
    };

    // --log wins over the config; RUST_LOG wins over both
    init_telemetry_with_level(cli.log.as_deref().unwrap_or(&config.core.log_level));

    let version = env!("CARGO_PKG_VERSION");
    let commit = env!("GIT_COMMIT_HASH");
    let timestamp = env!("BUILD_TIMESTAMP");

    tracing::debug!("Parley v{} ({} - {})", version, commit, timestamp);

    // Determine output format
    let format = if cli.json {
        OutputFormat::Json
    } else {
        OutputFormat::Text
    };

    // Handle commands
    match cli.command {
        Command::Chat { graph, bindings } => {
            tracing::info!("Loading graph {}", graph.display());
            handle_chat(&graph, &bindings, &config, format)
        }

        Command::Check { graph } => {
            tracing::info!("Checking graph {}", graph.display());
            handle_check(&graph, &config, format)
        }

        Command::Match {
            graph,
            state,
            contexts,
            text,
        } => handle_match(&graph, state.as_deref(), &contexts, &text, &config, format),

        Command::Config { action } => {
            tracing::info!("Config management: {:?}", action);
            match action {
                ConfigAction::Show => handle_config_show(&config, format),
                ConfigAction::Validate => {
                    let path = match &cli.config {
                        Some(path) => path.clone(),
                        None => Config::default_config_path()?,
                    };
                    handle_config_validate(&path, format)
                }
            }
        }
    }
}
