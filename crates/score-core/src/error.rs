//! Error types for the BaseScore system.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("invalid wallet address: {0}")]
    InvalidWallet(String),

    #[error("all RPC transports exhausted: {0}")]
    ChainUnreachable(String),

    #[error("scan queue is full (depth {depth})")]
    QueueFull { depth: usize },

    #[error("operation timed out after {0} ms")]
    Timeout(u64),

    #[error("database error: {0}")]
    Store(#[from] sqlx::Error),

    #[error("database migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    #[error("HTTP request error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("configuration error: {message}")]
    Config { message: String },

    #[error("RPC error: {message}")]
    Rpc { message: String, code: Option<i64> },
}

impl Error {
    /// Stable machine-readable code for boundary serialization.
    pub fn code(&self) -> &'static str {
        match self {
            Error::InvalidWallet(_) => "invalid_wallet",
            Error::ChainUnreachable(_) => "chain_unreachable",
            Error::QueueFull { .. } => "queue_full",
            Error::Timeout(_) => "timeout",
            Error::Store(_) | Error::Migration(_) => "store_error",
            Error::Http(_) | Error::Rpc { .. } => "chain_unreachable",
            Error::Json(_) => "store_error",
            Error::Config { .. } => "config_error",
        }
    }

    /// Whether a transport-level error is worth retrying with backoff.
    pub fn is_transient(&self) -> bool {
        matches!(self, Error::Http(_) | Error::Timeout(_))
    }
}

pub type Result<T> = std::result::Result<T, Error>;
