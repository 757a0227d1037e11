use thiserror::Error;

pub type Result<T> = std::result::Result<T, AppError>;

/// Application-wide error taxonomy.
///
/// Creation-time errors (`Validation`, `DuplicateReference`,
/// `GatewayRejected`) are returned synchronously to the API caller.
/// `GatewayUnavailable` is transient and never mutates payment status;
/// callers reschedule instead of failing the transaction.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("validation error: {0}")]
    Validation(String),

    #[error("duplicate external reference: {0}")]
    DuplicateReference(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("gateway rejected the payment: {0}")]
    GatewayRejected(String),

    #[error("gateway unavailable: {0}")]
    GatewayUnavailable(String),

    #[error("webhook signature verification failed")]
    AuthenticationFailed,

    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("redis error: {0}")]
    Redis(#[from] redis::RedisError),

    #[error("configuration error: {0}")]
    Config(#[from] config::ConfigError),

    #[error("internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl AppError {
    /// True for transient conditions where the operation should be retried
    /// later rather than treated as a final outcome.
    pub fn is_transient(&self) -> bool {
        matches!(self, AppError::GatewayUnavailable(_))
    }
}
