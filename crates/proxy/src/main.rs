//! modprox proxy binary.

use anyhow::{Context, Result};
use clap::Parser;
use figment::Figment;
use figment::providers::{Env, Format, Toml};
use modprox_core::config::ProxyConfig;
use modprox_proxy::{AppState, HttpRegistryClient, ProblemTracker, Reconciler, create_router};
use modprox_upstream::{HttpClient, OpenProxyClient, Resolver, TransportClients, build_http_client};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// modprox - a module proxy kept in step with a registry
#[derive(Parser, Debug)]
#[command(name = "modproxd")]
#[command(version, about, long_about = None)]
struct Args {
    /// Path to configuration file
    #[arg(
        short,
        long,
        env = "MODPROX_CONFIG",
        default_value = "config/proxy.toml"
    )]
    config: String,
}

fn load_config(path: &str) -> Result<ProxyConfig> {
    let mut figment = Figment::new();
    if std::path::Path::new(path).exists() {
        tracing::info!(config_path = %path, "Loading configuration from file");
        figment = figment.merge(Toml::file(path));
    } else {
        tracing::info!("No config file found at {}, using defaults and environment", path);
    }

    let config: ProxyConfig = figment
        .merge(Env::prefixed("MODPROX_").split("__"))
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

    tracing::info!("modprox proxy v{}", env!("CARGO_PKG_VERSION"));

    let config = load_config(&args.config)?;

    modprox_proxy::metrics::register_metrics();

    let storage = modprox_storage::from_config(&config.storage)
        .await
        .context("failed to initialize storage")?;
    storage
        .health_check()
        .await
        .context("storage health check failed")?;
    tracing::info!(backend = storage.backend_name(), "Storage backend initialized");

    let index = modprox_index::from_config(&config.index)
        .await
        .context("failed to initialize index")?;
    tracing::info!("Index initialized");

    let problems = Arc::new(ProblemTracker::new());
    let state = AppState::new(config.clone(), storage, index, problems);

    let cancel = CancellationToken::new();
    let worker = if config.worker.enabled {
        let reconciler = build_reconciler(&config, &state)?;
        Some(Arc::new(reconciler).spawn(config.worker.interval(), cancel.clone()))
    } else {
        tracing::info!("Reconciliation worker disabled");
        None
    };

    let app = create_router(state);
    let addr: SocketAddr = config.server.bind.parse().context("invalid bind address")?;
    tracing::info!("Listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind to {}", addr))?;
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal(cancel))
    .await?;

    if let Some(worker) = worker {
        worker.await.context("reconciliation worker panicked")?;
    }
    Ok(())
}

fn build_reconciler(config: &ProxyConfig, state: &AppState) -> Result<Reconciler> {
    let http = build_http_client(config.upstream.timeout())
        .context("failed to build upstream http client")?;
    let resolver = Arc::new(Resolver::from_config(&config.upstream, &http));
    let upstream = Arc::new(TransportClients::new().register(Arc::new(HttpClient::new(http.clone()))));
    let registry = Arc::new(
        HttpRegistryClient::from_config(&config.registry)
            .context("failed to build registry client")?,
    );

    let mut reconciler = Reconciler::new(
        state.index.clone(),
        state.zips.clone(),
        registry,
        resolver,
        upstream,
        state.problems.clone(),
    );
    if config.upstream.open_proxy.enabled {
        let open_proxy = OpenProxyClient::new(&config.upstream.open_proxy.url, http)
            .context("invalid open proxy url")?;
        tracing::info!(url = %config.upstream.open_proxy.url, "Open proxy enabled");
        reconciler = reconciler.with_open_proxy(Arc::new(open_proxy));
    }
    Ok(reconciler)
}

/// Resolve on ctrl-c, stopping the worker before the server drains.
async fn shutdown_signal(cancel: CancellationToken) {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "failed to listen for shutdown signal");
        return;
    }
    tracing::info!("Shutdown requested");
    cancel.cancel();
}
