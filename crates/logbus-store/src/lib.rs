pub mod auth;
pub mod error;
pub mod logs;
pub mod notify;
pub mod types;

pub use auth::{Authenticator, PgTokenAuthenticator};
pub use error::{Result, StoreError};
pub use logs::{LogStore, PgLogStore};
pub use notify::PgSourceConnector;
pub use types::{LogRecord, Principal};
