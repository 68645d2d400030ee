//! Helmsman daemon entry point.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;

use helmsman::cli::{Cli, Commands, ConfigCommands};
use helmsman::domain::models::config::Config;
use helmsman::domain::ports::{
    Hooks, NullHibernationManager, NullRebalancer, StaticTopologySource, TopologySource,
};
use helmsman::infrastructure::config::ConfigLoader;
use helmsman::infrastructure::logging::LoggerImpl;
use helmsman::services::Orchestrator;
use helmsman::adapters::http::status;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Serve { config } => serve(config).await,
        Commands::Config { command } => match command {
            ConfigCommands::Validate { config } => {
                load_config(config)?;
                println!("configuration ok");
                Ok(())
            }
            ConfigCommands::Show { config } => {
                let config = load_config(config)?;
                if cli.json {
                    println!("{}", serde_json::to_string_pretty(&config)?);
                } else {
                    println!("{}", serde_yaml::to_string(&config)?);
                }
                Ok(())
            }
        },
    }
}

fn load_config(path: Option<PathBuf>) -> Result<Config> {
    match path {
        Some(path) => ConfigLoader::load_from_file(path),
        None => ConfigLoader::load(),
    }
    .context("Failed to load configuration")
}

async fn serve(config_path: Option<PathBuf>) -> Result<()> {
    let config = load_config(config_path)?;
    let _logger = LoggerImpl::init(&config.logging).context("Failed to initialize logging")?;

    // The standalone daemon runs against null collaborators; the hosting
    // index service wires real ones through the library API instead.
    let rebalancer = Arc::new(NullRebalancer::new());
    let hibernation = Arc::new(NullHibernationManager::new());
    let topology = Arc::new(StaticTopologySource::single_node(
        config.node.uuid.clone(),
        config.node.hostname.clone(),
    ));
    topology.set_task_orchestrator(true);

    let orchestrator = Orchestrator::new(
        config.node.clone(),
        Duration::from_secs(config.registry.wait_timeout_secs),
        rebalancer,
        hibernation,
        topology,
        Arc::new(Hooks::new()),
    );

    status::serve(&config.http, orchestrator).await
}
