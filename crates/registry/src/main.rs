//! modprox registry binary.

use anyhow::{Context, Result};
use clap::Parser;
use figment::Figment;
use figment::providers::{Env, Format, Toml};
use modprox_core::config::RegistryConfig;
use modprox_registry::{AppState, create_router};
use std::net::SocketAddr;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// modprox registry - assigns serial IDs to module coordinates
#[derive(Parser, Debug)]
#[command(name = "modprox-registryd")]
#[command(version, about, long_about = None)]
struct Args {
    /// Path to configuration file
    #[arg(
        short,
        long,
        env = "MODPROX_REGISTRY_CONFIG",
        default_value = "config/registry.toml"
    )]
    config: String,
}

fn load_config(path: &str) -> Result<RegistryConfig> {
    let mut figment = Figment::new();
    if std::path::Path::new(path).exists() {
        tracing::info!(config_path = %path, "Loading configuration from file");
        figment = figment.merge(Toml::file(path));
    } else {
        tracing::info!("No config file found at {}, using defaults and environment", path);
    }

    let config: RegistryConfig = figment
        .merge(Env::prefixed("MODPROX_REGISTRY_").split("__"))
        .extract()
        .context("failed to load configuration")?;
    config
        .validate()
        .map_err(|e| anyhow::anyhow!("invalid configuration: {e}"))?;
    Ok(config)
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("modprox registry v{}", env!("CARGO_PKG_VERSION"));

    let config = load_config(&args.config)?;

    let catalog = modprox_registry::from_config(&config.catalog)
        .await
        .context("failed to initialize catalog")?;
    tracing::info!("Catalog initialized");

    let addr: SocketAddr = config.server.bind.parse().context("invalid bind address")?;
    let app = create_router(AppState::new(config, catalog));
    tracing::info!("Listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind to {}", addr))?;
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "failed to listen for shutdown signal");
        }
    })
    .await?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn load_config_defaults_without_file() {
        let config = load_config("/nonexistent/registry.toml").unwrap();
        assert_eq!(config.server.bind, "127.0.0.1:9100");
    }

    #[test]
    fn load_config_from_file() {
        let temp = tempfile::tempdir().unwrap();
        let path = temp.path().join("registry.toml");
        std::fs::write(
            &path,
            "[catalog]\ntype = \"postgres\"\nurl = \"postgres://localhost/registry\"\n",
        )
        .unwrap();
        let config = load_config(path.to_str().unwrap()).unwrap();
        assert!(matches!(
            config.catalog,
            modprox_core::config::DatabaseConfig::Postgres { .. }
        ));
    }
}
