use std::net::SocketAddr;
use std::sync::Arc;

use clap::Parser;
use tracing::info;

use plaudit_core::config::PlauditConfig;
use plaudit_gateway::app;

/// Comment ingestion and live dashboard server.
#[derive(Debug, Parser)]
#[command(name = "plaudit", version, about)]
struct Cli {
    /// Path to plaudit.toml (falls back to PLAUDIT_CONFIG, then ~/.plaudit/plaudit.toml).
    #[arg(short, long)]
    config: Option<String>,

    /// Override `server.port`.
    #[arg(short, long)]
    port: Option<u16>,

    /// Override `server.bind`.
    #[arg(long)]
    bind: Option<String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                "plaudit_gateway=info,plaudit_store=info,tower_http=debug".into()
            }),
        )
        .init();

    let cli = Cli::parse();

    // load config: --config > PLAUDIT_CONFIG env > ~/.plaudit/plaudit.toml
    let config_path = cli
        .config
        .clone()
        .or_else(|| std::env::var("PLAUDIT_CONFIG").ok());
    let mut config = PlauditConfig::load(config_path.as_deref()).unwrap_or_else(|e| {
        tracing::warn!("Config load failed ({}), using defaults", e);
        PlauditConfig::default()
    });
    if let Some(port) = cli.port {
        config.server.port = port;
    }
    if let Some(bind) = cli.bind {
        config.server.bind = bind;
    }

    info!(
        backend = config.store.backend.as_str(),
        path = %config.store.path,
        "opening comment store"
    );
    let store = app::open_store(&config.store).await?;

    let addr: SocketAddr = format!("{}:{}", config.server.bind, config.server.port).parse()?;
    let state = Arc::new(app::AppState::new(config, store));
    let router = app::build_router(state);

    info!("Plaudit listening on {}", addr);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Plaudit stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!(error = %e, "could not listen for ctrl-c");
        std::future::pending::<()>().await;
    }
}
