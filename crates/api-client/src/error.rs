//! Error types for the API client

use dp_core::{BatchError, ChunkError};
use thiserror::Error;

/// Result type alias for API operations
pub type ApiResult<T> = Result<T, ApiError>;

/// API client errors
#[derive(Error, Debug)]
pub enum ApiError {
    /// HTTP request failed
    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// JSON serialization/deserialization failed
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Missing environment variable
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(String),

    /// API returned an error response
    #[error("API error ({status}): {message}")]
    ApiResponse {
        /// HTTP status code
        status: u16,
        /// Error message from API
        message: String,
    },

    /// The collection's `ETag` changed while it was being paged through
    #[error("ETag changed during batch fetch: expected {expected:?}, got {actual:?}")]
    ETagMismatch {
        /// `ETag` of the first page
        expected: Option<String>,
        /// `ETag` of the page that diverged
        actual: Option<String>,
    },

    /// A chunked update failed part way through
    #[error("update failed after {completed} successful requests: {source}")]
    PartialPatch {
        /// Number of requests that were applied before the failure
        completed: usize,
        /// Error from the failing request
        source: Box<ApiError>,
    },

    /// Invalid URL
    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    /// The server sent a body that could be decoded but cannot be used
    #[error("Invalid response: {0}")]
    InvalidResponse(String),
}

impl ApiError {
    /// Create a configuration error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Create a missing env var error
    pub fn missing_env(var: impl Into<String>) -> Self {
        Self::MissingEnvVar(var.into())
    }

    /// Create an API response error
    pub fn api_response(status: u16, message: impl Into<String>) -> Self {
        Self::ApiResponse {
            status,
            message: message.into(),
        }
    }

    /// HTTP status of the response, if the server answered with an error
    #[must_use]
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::ApiResponse { status, .. } => Some(*status),
            Self::PartialPatch { source, .. } => source.status(),
            _ => None,
        }
    }

    /// Check if this is a client error (4xx)
    #[must_use]
    pub fn is_client_error(&self) -> bool {
        self.status().is_some_and(|status| (400..500).contains(&status))
    }

    /// Check if this is a server error (5xx)
    #[must_use]
    pub fn is_server_error(&self) -> bool {
        self.status().is_some_and(|status| status >= 500)
    }

    /// Check if the failure was an optimistic-concurrency conflict
    ///
    /// Either the collection changed mid-fetch, or the server rejected an
    /// `If-Match` precondition.
    #[must_use]
    pub fn is_conflict(&self) -> bool {
        matches!(self, Self::ETagMismatch { .. }) || matches!(self.status(), Some(409 | 412))
    }
}

impl From<BatchError<ApiError>> for ApiError {
    fn from(err: BatchError<ApiError>) -> Self {
        match err {
            BatchError::Fetch { source, .. } | BatchError::Process { source, .. } => source,
            BatchError::TokenMismatch {
                expected, actual, ..
            } => Self::ETagMismatch { expected, actual },
        }
    }
}

impl From<ChunkError<ApiError>> for ApiError {
    fn from(err: ChunkError<ApiError>) -> Self {
        Self::PartialPatch {
            completed: err.completed,
            source: Box::new(err.source),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_batch_errors_unwrap_verbatim() {
        let err: ApiError = BatchError::Fetch {
            offset: 200,
            source: ApiError::api_response(503, "unavailable"),
        }
        .into();
        assert!(matches!(err, ApiError::ApiResponse { status: 503, .. }));
        assert!(err.is_server_error());

        let err: ApiError = BatchError::<ApiError>::TokenMismatch {
            offset: 100,
            expected: Some("a1".to_string()),
            actual: Some("b2".to_string()),
        }
        .into();
        assert!(err.is_conflict());
        assert!(!err.is_client_error());
    }

    #[test]
    fn test_partial_patch_keeps_status() {
        let err: ApiError = ChunkError {
            completed: 3,
            source: ApiError::api_response(412, "precondition failed"),
        }
        .into();

        assert!(matches!(err, ApiError::PartialPatch { completed: 3, .. }));
        assert_eq!(err.status(), Some(412));
        assert!(err.is_client_error());
        assert!(err.is_conflict());
    }
}
