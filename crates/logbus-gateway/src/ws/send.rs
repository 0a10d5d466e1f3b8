use axum::extract::ws::{Message, WebSocket};
use futures_util::SinkExt;

pub type WsSink = futures_util::stream::SplitSink<WebSocket, Message>;

/// Send one pre-serialized JSON document as a single text frame.
pub async fn text(tx: &mut WsSink, frame: String) -> Result<(), axum::Error> {
    tx.send(Message::Text(frame.into()))
        .await
        .map_err(axum::Error::new)
}
