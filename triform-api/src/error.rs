//! Error types for triform-api.

use thiserror::Error;

/// A failed remote call. No status-code taxonomy: the operation and a
/// human-readable message are all callers get.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ApiError {
    #[error("{operation} failed: {message}")]
    CallFailed { operation: String, message: String },
}

impl ApiError {
    pub fn call(operation: &str, message: impl Into<String>) -> Self {
        ApiError::CallFailed {
            operation: operation.to_string(),
            message: message.into(),
        }
    }

    pub fn operation(&self) -> &str {
        match self {
            ApiError::CallFailed { operation, .. } => operation,
        }
    }
}
