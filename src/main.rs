//! mockoidc - Mock OpenID Connect provider
//!
#![doc = "mockoidc - Mock OpenID Connect provider"]
#![doc = "Main entry point for the mockoidc server binary."]

use std::path::Path;

use anyhow::{Context, Result};

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use mockoidc::cli::{Cli, Commands};
use mockoidc::config::{Config, LoggingConfig};
use mockoidc::keys::RsaKeypair;
use mockoidc::server::MockOidcServerBuilder;

const DEFAULT_CONFIG_PATH: &str = "config/mockoidc.yaml";

#[tokio::main]
async fn main() -> Result<()> {
    // Parse command line arguments
    let cli = Cli::parse_args();

    // Load configuration
    let config_path = cli.config.as_deref().unwrap_or(DEFAULT_CONFIG_PATH);
    let config = Config::load(config_path, &cli)?;

    init_tracing(&config.logging);

    if !Path::new(config_path).exists() {
        tracing::warn!("Config file not found at {}, using defaults", config_path);
    }

    // Validate configuration
    config.validate()?;

    match cli.command {
        Commands::Serve { .. } => serve(config).await,
        Commands::Keygen { out } => {
            let pem = tokio::task::spawn_blocking(RsaKeypair::generate)
                .await
                .context("key generation task failed")??
                .private_key_pem()?;
            match out {
                Some(path) => {
                    std::fs::write(&path, pem.as_bytes())
                        .with_context(|| format!("failed to write {}", path.display()))?;
                    tracing::info!("Wrote RSA private key to {}", path.display());
                }
                None => print!("{}", pem),
            }
            Ok(())
        }
    }
}

async fn serve(config: Config) -> Result<()> {
    let server = MockOidcServerBuilder::from_config(&config)?
        .spawn(config.bind_address()?)
        .await?;

    tracing::info!(
        issuer = %server.issuer(),
        discovery = %server.discovery_url(),
        client_id = %server.client_id(),
        client_secret = %server.client_secret(),
        "Ready"
    );

    tokio::signal::ctrl_c()
        .await
        .context("failed to listen for shutdown signal")?;
    tracing::info!("Shutdown signal received");
    server.shutdown().await;
    Ok(())
}

/// Initialize tracing subscriber with environment filter
fn init_tracing(logging: &LoggingConfig) {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("mockoidc={}", logging.level)));

    let registry = tracing_subscriber::registry().with(env_filter);
    if logging.json_format {
        registry
            .with(tracing_subscriber::fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        registry
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .init();
    }
}
