// Centralized error handling for the client

use reqwest::StatusCode;
use thiserror::Error;

/// Errors surfaced by the request pipeline
#[derive(Error, Debug)]
pub enum ApiError {
    /// The server answered 401. The session has already been cleared and the
    /// redirect announced by the time the caller sees this.
    #[error("Session expired or not authenticated")]
    Unauthorized,

    #[error("Request could not be completed: {0}")]
    Network(#[source] reqwest::Error),

    #[error("Request timed out")]
    Timeout,

    #[error("Invalid response (HTTP {status}): {reason}")]
    InvalidResponse { status: StatusCode, reason: String },

    #[error("Failed to encode request payload: {0}")]
    Encode(String),

    #[error("Session storage failure: {0}")]
    Storage(#[from] StorageError),
}

impl From<reqwest::Error> for ApiError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            ApiError::Timeout
        } else {
            ApiError::Network(err)
        }
    }
}

/// Errors from the persistent key/value layer
#[derive(Error, Debug)]
pub enum StorageError {
    #[error("Storage I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to serialize value: {0}")]
    Serialize(#[from] serde_json::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_storage_error_converts_into_api_error() {
        let io = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "read-only");
        let err: ApiError = StorageError::from(io).into();
        assert!(matches!(err, ApiError::Storage(StorageError::Io(_))));
        assert!(err.to_string().contains("read-only"));
    }

    #[test]
    fn test_invalid_response_message() {
        let err = ApiError::InvalidResponse {
            status: StatusCode::BAD_GATEWAY,
            reason: "expected value at line 1 column 1".to_string(),
        };
        let message = err.to_string();
        assert!(message.contains("502"));
        assert!(message.contains("expected value"));
    }
}
