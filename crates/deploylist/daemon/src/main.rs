//! deploylistd - mirrors GitHub deployments into `ListGithubDeployments` status

use clap::Parser;
use deploylist_daemon::{DaemonConfig, DaemonError, DaemonResult, Server};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// deploylist daemon CLI
#[derive(Parser)]
#[command(name = "deploylistd")]
#[command(about = "deploylist daemon - mirrors GitHub deployments into object status", long_about = None)]
#[command(version)]
struct Cli {
    /// Configuration file path
    #[arg(short, long, env = "DEPLOYLIST_CONFIG")]
    config: Option<String>,

    /// Listen address, overrides the configuration file
    #[arg(short, long, env = "DEPLOYLIST_LISTEN_ADDR")]
    listen: Option<String>,

    /// Manifest file or directory, may be repeated
    #[arg(short, long = "manifest")]
    manifests: Vec<std::path::PathBuf>,

    /// Log level, overrides the configuration file
    #[arg(long, env = "DEPLOYLIST_LOG_LEVEL")]
    log_level: Option<String>,

    /// Enable JSON logging
    #[arg(long, env = "DEPLOYLIST_LOG_JSON")]
    json: bool,
}

#[tokio::main]
async fn main() -> DaemonResult<()> {
    let cli = Cli::parse();

    // Load configuration
    let mut config = DaemonConfig::load(cli.config.as_deref())
        .map_err(|e| DaemonError::Config(e.to_string()))?;

    // Override with CLI args
    if let Some(listen) = &cli.listen {
        config.server.listen_addr = listen
            .parse()
            .map_err(|e| DaemonError::Config(format!("Invalid listen address: {}", e)))?;
    }
    if let Some(level) = cli.log_level {
        config.logging.level = level;
    }
    config.logging.json |= cli.json;
    config.storage.manifests.extend(cli.manifests);

    // Initialize tracing
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| config.logging.level.clone().into());

    if config.logging.json {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(tracing_subscriber::fmt::layer().json())
            .init();
    } else {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(tracing_subscriber::fmt::layer())
            .init();
    }

    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        listen_addr = %config.server.listen_addr,
        api_url = %config.github.api_url,
        manifests = config.storage.manifests.len(),
        "Starting deploylist daemon"
    );

    // Create and run server
    let server = Server::new(config).await?;
    server.run().await
}
