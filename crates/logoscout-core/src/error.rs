use thiserror::Error;

/// Application-wide error types for logoscout.
#[derive(Error, Debug)]
pub enum AppError {
    /// HTTP request failed (fetching a page).
    #[error("HTTP error: {0}")]
    HttpError(String),

    /// Request timed out.
    #[error("Request timed out after {0} seconds")]
    Timeout(u64),

    /// Network/connection error (DNS, TLS, refused connection).
    #[error("Network error: {0}")]
    NetworkError(String),

    /// Page-cache operation failed. Never fails a task: the Extract stage
    /// logs these and falls back to the network.
    #[error("Cache error: {0}")]
    CacheError(String),

    /// Selector compilation or document processing failed.
    #[error("Transform error: {0}")]
    TransformError(String),

    /// Output sink write failed.
    #[error("Sink error: {0}")]
    SinkError(String),

    /// Invalid run configuration.
    #[error("Config error: {0}")]
    ConfigError(String),
}

impl AppError {
    /// Returns true for transport-level failures (DNS, timeout, connection),
    /// the failure class the Extract stage recovers from per task.
    pub fn is_transport(&self) -> bool {
        matches!(
            self,
            AppError::HttpError(_) | AppError::Timeout(_) | AppError::NetworkError(_)
        )
    }
}
