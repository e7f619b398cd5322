//! Gauge store error types
//!
//! Backend failures are always surfaced as errors. A missing or expired gauge
//! is not an error: reads report it as `Ok(None)`.

use std::time::Duration;

/// Gauge store error types
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// Invalid store configuration (bad address, unreadable CA file, ...)
    #[error("Store configuration error: {0}")]
    Configuration(String),

    /// Could not establish a connection to the backend
    #[error("Store connection failed: {0}")]
    ConnectionFailed(String),

    /// The backend rejected or failed an operation
    #[error("Store backend error: {0}")]
    Backend(String),

    /// The backend did not answer within the operation timeout
    #[error("Store operation timed out after {0:?}")]
    Timeout(Duration),

    /// Key failed validation before reaching the backend
    #[error("Invalid store key: {0}")]
    InvalidKey(String),

    /// A stored value could not be decoded as a gauge
    #[error("Corrupt gauge value {value:?} at key {key}")]
    Corrupt { key: String, value: String },
}

impl From<redis::RedisError> for StoreError {
    fn from(err: redis::RedisError) -> Self {
        if err.is_timeout() {
            StoreError::Backend(format!("timeout: {}", err))
        } else if err.is_connection_dropped() || err.is_connection_refusal() {
            StoreError::ConnectionFailed(err.to_string())
        } else {
            StoreError::Backend(err.to_string())
        }
    }
}
