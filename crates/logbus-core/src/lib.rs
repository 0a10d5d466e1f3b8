pub mod config;
pub mod error;

pub use config::LogbusConfig;
pub use error::{LogbusError, Result};
