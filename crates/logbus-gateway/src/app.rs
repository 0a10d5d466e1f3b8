use axum::{routing::get, Router};
use dashmap::DashMap;
use logbus_broker::{Broadcast, NotifyListener};
use logbus_core::config::LogbusConfig;
use logbus_store::{Authenticator, LogStore};
use std::sync::Arc;

/// Central shared state — passed as Arc<AppState> to all Axum handlers.
pub struct AppState {
    pub config: LogbusConfig,
    pub bus: Arc<Broadcast>,
    pub listener: NotifyListener,
    pub store: Arc<dyn LogStore>,
    pub auth: Arc<dyn Authenticator>,
    /// Active streaming connections: conn_id -> principal uuid.
    pub connections: DashMap<String, String>,
}

impl AppState {
    pub fn new(
        config: LogbusConfig,
        bus: Arc<Broadcast>,
        listener: NotifyListener,
        store: Arc<dyn LogStore>,
        auth: Arc<dyn Authenticator>,
    ) -> Self {
        Self {
            config,
            bus,
            listener,
            store,
            auth,
            connections: DashMap::new(),
        }
    }
}

/// Assemble the full Axum router.
pub fn build_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(crate::http::health::health_handler))
        .route("/websocket", get(crate::ws::connection::ws_handler))
        .with_state(state)
        .layer(tower_http::trace::TraceLayer::new_for_http())
}
