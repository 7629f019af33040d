//! SecureGames resolver server
//!
//! Loads configuration, builds the resolver for the configured environment
//! and serves the HTTP API.

use clap::Parser;
use securegames::api::{init_tracing, ApiServer, AppState};
use securegames::config::{generate_sample_config, ConfigLoader, Environment};
use securegames::errors::ErrorCategory;
use securegames::resolver;
use std::sync::Arc;
use tracing::{error, info, warn};

#[derive(Parser, Debug)]
#[command(name = "securegames-resolver")]
#[command(about = "SecureGames resolver API server", long_about = None)]
struct Args {
    /// Path to a TOML configuration file
    #[arg(long)]
    config: Option<String>,

    /// Override the API host
    #[arg(long)]
    host: Option<String>,

    /// Override the API port
    #[arg(long)]
    port: Option<u16>,

    /// mock or live
    #[arg(long)]
    environment: Option<Environment>,

    /// Write a sample configuration to this path and exit
    #[arg(long)]
    generate_config: Option<String>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let args = Args::parse();
    init_tracing();

    if let Some(path) = args.generate_config {
        generate_sample_config(&path)?;
        info!("📝 Sample configuration written to {}", path);
        return Ok(());
    }

    let mut loader = ConfigLoader::new();
    if let Some(path) = &args.config {
        loader = loader.with_path(path);
    }
    let mut config = loader.load()?;

    if let Some(host) = args.host {
        config.api.host = host;
    }
    if let Some(port) = args.port {
        config.api.port = port;
    }
    if let Some(environment) = args.environment {
        config.resolver.environment = environment;
    }
    loader.validate(&config)?;

    let stack = resolver::build(&config)?;

    // A mismatched key cannot settle anything; report it loudly but keep
    // serving so the operator can inspect /health.
    match stack.resolver.verify().await {
        Ok(()) => info!("✅ Resolver key matches the contract resolver"),
        Err(e) if e.category() == ErrorCategory::Configuration => {
            error!("❌ {}", e);
            error!("   Every /resolve-game call will fail with 403 until the key is fixed");
        }
        Err(e) => warn!("⚠️  Could not verify the resolver address at startup: {}", e),
    }

    let state = Arc::new(AppState::new(
        stack.resolver,
        stack.gateway,
        config.resolver.cache_ttl(),
    ));

    ApiServer::new(config.api, state).run().await
}
