use async_trait::async_trait;

use crate::error::Result;

/// One dedicated backend connection in long-poll listen mode.
///
/// Implementations own the connection exclusively for the life of the value;
/// dropping it releases the connection (back to a pool, typically). The
/// listener guarantees `unlisten` is called before the drop on every exit
/// path so a released connection never carries a stale subscription.
#[async_trait]
pub trait NotifySource: Send {
    /// Issue the backend's "start listening on channel" command.
    async fn listen(&mut self, channel: &str) -> Result<()>;

    /// Block until the next notification arrives; returns its raw payload.
    async fn recv(&mut self) -> Result<String>;

    /// Tell the backend to stop delivering notifications on this connection.
    async fn unlisten(&mut self) -> Result<()>;
}

/// Acquires the dedicated listen connection.
///
/// Split from [`NotifySource`] so the listener can be handed a connector at
/// construction time and defer the actual connection until the first client
/// needs it.
#[async_trait]
pub trait SourceConnector: Send + Sync {
    async fn connect(&self) -> Result<Box<dyn NotifySource>>;
}
