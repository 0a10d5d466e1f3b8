use async_trait::async_trait;
use logbus_broker::{BrokerError, NotifySource, SourceConnector};
use sqlx::postgres::{PgListener, PgPool};
use tracing::info;

/// Checks the dedicated listen connection out of the shared pool.
///
/// The connection stays checked out for the entire life of the returned
/// source, so request traffic never touches it. It goes back to the pool
/// only when the source is dropped, after the broker has unlistened.
pub struct PgSourceConnector {
    pool: PgPool,
}

impl PgSourceConnector {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl SourceConnector for PgSourceConnector {
    async fn connect(&self) -> logbus_broker::Result<Box<dyn NotifySource>> {
        let listener = PgListener::connect_with(&self.pool)
            .await
            .map_err(|e| BrokerError::Connect(e.to_string()))?;
        Ok(Box::new(PgNotifySource { listener }))
    }
}

struct PgNotifySource {
    listener: PgListener,
}

#[async_trait]
impl NotifySource for PgNotifySource {
    async fn listen(&mut self, channel: &str) -> logbus_broker::Result<()> {
        self.listener
            .listen(channel)
            .await
            .map_err(|e| BrokerError::Listen(e.to_string()))?;
        info!(channel, "LISTEN issued on dedicated connection");
        Ok(())
    }

    async fn recv(&mut self) -> logbus_broker::Result<String> {
        // try_recv, not recv: sqlx's recv() reconnects silently, and a
        // reconnect gap drops notifications. This subsystem has no reconnect
        // semantics; a lost connection must surface as the fatal error it is.
        match self.listener.try_recv().await {
            Ok(Some(notification)) => Ok(notification.payload().to_string()),
            Ok(None) => Err(BrokerError::ConnectionLost(
                "listen connection dropped (notifications may have been missed)".to_string(),
            )),
            Err(e) => Err(BrokerError::ConnectionLost(e.to_string())),
        }
    }

    async fn unlisten(&mut self) -> logbus_broker::Result<()> {
        self.listener
            .unlisten_all()
            .await
            .map_err(|e| BrokerError::Listen(e.to_string()))
    }
}
