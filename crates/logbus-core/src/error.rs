use thiserror::Error;

#[derive(Debug, Error)]
pub enum LogbusError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

pub type Result<T> = std::result::Result<T, LogbusError>;
