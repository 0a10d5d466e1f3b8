use axum::{
    extract::{ws::Message, ws::WebSocket, Query, State, WebSocketUpgrade},
    response::IntoResponse,
};
use futures_util::{SinkExt, StreamExt};
use logbus_core::config::DELIVERY_QUEUE_DEPTH;
use logbus_store::Principal;
use serde::Deserialize;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{info, warn};

use crate::app::AppState;
use crate::ws::{send, session};

/// Error frame sent to unauthenticated connections before closing.
pub const NOT_LOGGED_IN: &str = r#"{"error":"Not logged in"}"#;

#[derive(Debug, Deserialize)]
pub struct ConnectQuery {
    pub api_token: Option<String>,
}

/// Axum handler — upgrades HTTP to WebSocket at GET /websocket.
pub async fn ws_handler(
    ws: WebSocketUpgrade,
    Query(query): Query<ConnectQuery>,
    State(state): State<Arc<AppState>>,
) -> impl IntoResponse {
    ws.on_upgrade(move |socket| run_connection(socket, state, query.api_token))
}

/// Per-connection loop — lives for the entire streaming session.
async fn run_connection(mut socket: WebSocket, state: Arc<AppState>, token: Option<String>) {
    let conn_id = uuid::Uuid::new_v4().to_string();

    // Admission precedes every other side effect: no subscriber exists and
    // the listener is not started until a principal has resolved.
    let principal = match admit(&state, token.as_deref()).await {
        Some(p) => p,
        None => {
            let _ = socket.send(Message::Text(NOT_LOGGED_IN.into())).await;
            let _ = socket.close().await;
            info!(conn_id, "connection refused: not logged in");
            return;
        }
    };
    info!(conn_id, user = %principal.uuid, "streaming client admitted");
    state
        .connections
        .insert(conn_id.clone(), principal.uuid.clone());

    let (mut tx, mut rx) = socket.split();

    // Broadcast callback: push the raw payload into this connection's FIFO
    // queue. try_send keeps publish non-blocking; a full queue fails the
    // callback, which the channel logs and contains.
    let (delivery_tx, mut delivery_rx) = mpsc::channel::<String>(DELIVERY_QUEUE_DEPTH);
    let sub = state.bus.subscribe(Box::new(move |payload| {
        delivery_tx.try_send(payload.to_string()).map_err(|e| match e {
            mpsc::error::TrySendError::Full(_) => logbus_broker::DeliveryError::QueueFull,
            mpsc::error::TrySendError::Closed(_) => logbus_broker::DeliveryError::Disconnected,
        })
    }));
    state.listener.ensure_started();

    loop {
        tokio::select! {
            msg = rx.next() => {
                match msg {
                    // Clients have nothing to say on this endpoint; inbound
                    // text/binary frames are accepted and ignored.
                    Some(Ok(Message::Text(_))) | Some(Ok(Message::Binary(_))) => {}
                    Some(Ok(Message::Ping(data))) => {
                        let _ = tx.send(Message::Pong(data)).await;
                    }
                    Some(Ok(Message::Close(_))) | None => break,
                    Some(Err(e)) => {
                        warn!(conn_id, error = %e, "websocket read failed");
                        break;
                    }
                    _ => {}
                }
            }

            payload = delivery_rx.recv() => {
                let Some(payload) = payload else { break };
                let frames =
                    session::frames_for_payload(&payload, &principal, state.store.as_ref()).await;
                let mut write_failed = false;
                for frame in frames {
                    if send::text(&mut tx, frame).await.is_err() {
                        write_failed = true;
                        break;
                    }
                }
                if write_failed {
                    break;
                }
            }
        }
    }

    // Disconnect is the only cancellation signal: unsubscribe immediately so
    // no further publish can touch this connection's queue.
    state.bus.unsubscribe(sub);
    state.connections.remove(&conn_id);
    info!(conn_id, "streaming client disconnected");
}

/// Resolve the connection's principal. A resolver error is reported like a
/// missing login — the client cannot tell the difference, and admission must
/// stay side-effect free.
async fn admit(state: &AppState, token: Option<&str>) -> Option<Principal> {
    match state.auth.resolve_principal(token).await {
        Ok(Some(principal)) => Some(principal),
        Ok(None) => None,
        Err(e) => {
            warn!(error = %e, "principal resolution failed during admission");
            None
        }
    }
}
