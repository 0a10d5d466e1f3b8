use std::net::SocketAddr;
use std::sync::Arc;

use clap::Parser;
use logbus_broker::{Broadcast, NotifyListener};
use logbus_core::config::{LogbusConfig, NOTIFY_CHANNEL};
use logbus_store::{PgLogStore, PgSourceConnector, PgTokenAuthenticator};
use sqlx::postgres::PgPoolOptions;
use tracing::info;

mod app;
mod http;
mod ws;

#[derive(Debug, Parser)]
#[command(name = "logbus-gateway", about = "Streams newly created log records to WebSocket clients")]
struct Cli {
    /// Path to logbus.toml (defaults to ./logbus.toml; LOGBUS_* env vars
    /// override either way).
    #[arg(long)]
    config: Option<String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "logbus_gateway=info,logbus_broker=info,tower_http=debug".into()),
        )
        .init();

    let cli = Cli::parse();
    let config = LogbusConfig::load(cli.config.as_deref()).unwrap_or_else(|e| {
        tracing::warn!("Config load failed ({}), using defaults", e);
        LogbusConfig::default()
    });

    let bind = config.gateway.bind.clone();
    let port = config.gateway.port;

    info!(url = %config.database.url, "connecting to Postgres");
    let pool = PgPoolOptions::new()
        .max_connections(config.database.max_connections)
        .connect(&config.database.url)
        .await?;

    let bus = Arc::new(Broadcast::new());
    let listener = NotifyListener::new(
        Arc::clone(&bus),
        Arc::new(PgSourceConnector::new(pool.clone())),
        NOTIFY_CHANNEL,
    );
    let store = Arc::new(PgLogStore::new(pool.clone()));
    let auth = Arc::new(PgTokenAuthenticator::new(pool));

    let state = Arc::new(app::AppState::new(config, bus, listener, store, auth));
    let router = app::build_router(Arc::clone(&state));

    let addr: SocketAddr = format!("{}:{}", bind, port).parse()?;
    info!("logbus gateway listening on {}", addr);

    let tcp = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(tcp, router)
        .with_graceful_shutdown(shutdown_signal(Arc::clone(&state)))
        .await?;

    Ok(())
}

/// Resolve on ctrl-c / SIGTERM; stops the notification listener first so its
/// connection unlistens before the pool is torn down.
async fn shutdown_signal(state: Arc<app::AppState>) {
    let ctrl_c = async {
        let _ = tokio::signal::ctrl_c().await;
    };
    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(_) => std::future::pending().await,
        }
    };
    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
    }

    info!("shutdown signal received");
    state.listener.shutdown();
}
