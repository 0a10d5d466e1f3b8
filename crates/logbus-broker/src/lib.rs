pub mod channel;
pub mod error;
pub mod listener;
pub mod source;

pub use channel::{Broadcast, SubscriberId};
pub use error::{BrokerError, DeliveryError, Result};
pub use listener::NotifyListener;
pub use source::{NotifySource, SourceConnector};
