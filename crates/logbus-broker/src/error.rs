use thiserror::Error;

/// Errors raised by the notification listener and its backend source.
#[derive(Debug, Error)]
pub enum BrokerError {
    /// The dedicated listen connection could not be acquired.
    #[error("listen connection failed: {0}")]
    Connect(String),

    /// The backend rejected the listen/unlisten command.
    #[error("listen command failed: {0}")]
    Listen(String),

    /// The listen connection dropped or errored while waiting for
    /// notifications. Fatal for the listener subsystem; there is no
    /// automatic reconnect.
    #[error("listen connection lost: {0}")]
    ConnectionLost(String),
}

/// Failure of a single subscriber's delivery callback.
///
/// Contained at the channel boundary: logged, never propagated to the
/// publishing task or to other subscribers.
#[derive(Debug, Error)]
pub enum DeliveryError {
    /// The subscriber's queue is full (it has fallen too far behind).
    #[error("delivery queue full")]
    QueueFull,

    /// The subscriber's receiving side is gone (connection tearing down).
    #[error("subscriber disconnected")]
    Disconnected,
}

pub type Result<T> = std::result::Result<T, BrokerError>;
