//! Error types for the cache proxy
//!
//! Provides unified error handling using thiserror.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

// == Cache Error Enum ==
/// Failures reported by a cache backend.
///
/// None of these ever reach the client: reads fail open to the upstream and
/// writes/deletes are logged and dropped.
#[derive(Error, Debug)]
pub enum CacheError {
    /// The backend could not be reached or did not answer in time
    #[error("Cache unavailable: {0}")]
    Unavailable(String),

    /// The key cannot be addressed by the backend
    #[error("Invalid cache key: {0}")]
    InvalidKey(String),

    /// The value exceeds the backend's size limit
    #[error("Value of {size} bytes exceeds limit of {limit} bytes")]
    ValueTooLarge { size: usize, limit: usize },

    /// The backend answered with something we did not expect
    #[error("Cache protocol error: {0}")]
    Protocol(String),
}

impl From<std::io::Error> for CacheError {
    fn from(err: std::io::Error) -> Self {
        CacheError::Unavailable(err.to_string())
    }
}

impl From<tokio::time::error::Elapsed> for CacheError {
    fn from(_: tokio::time::error::Elapsed) -> Self {
        CacheError::Unavailable("operation timed out".to_string())
    }
}

// == Proxy Error Enum ==
/// Errors that terminate a proxied request.
#[derive(Error, Debug)]
pub enum ProxyError {
    /// The upstream round trip could not complete
    #[error("Call to {url} failed: {reason}")]
    UpstreamTransport { url: String, reason: String },

    /// The upstream answered but its body could not be read
    #[error("Failed to read body from {url}: {reason}")]
    UpstreamBody { url: String, reason: String },

    /// The inbound request body could not be read
    #[error("Failed to read request body: {0}")]
    RequestBody(String),

    /// A stored envelope is not decodable
    #[error("Corrupt cache entry: {0}")]
    Decode(String),
}

impl ProxyError {
    /// Status code reported to the client for this error.
    pub fn status_code(&self) -> StatusCode {
        match self {
            ProxyError::Decode(_) => StatusCode::INTERNAL_SERVER_ERROR,
            _ => StatusCode::BAD_GATEWAY,
        }
    }
}

// == IntoResponse Implementation ==
impl IntoResponse for ProxyError {
    fn into_response(self) -> Response {
        let body = Json(json!({
            "error": self.to_string()
        }));

        (self.status_code(), body).into_response()
    }
}

// == Result Type Aliases ==
/// Convenience Result type for cache backends.
pub type CacheResult<T> = std::result::Result<T, CacheError>;

/// Convenience Result type for proxying.
pub type Result<T> = std::result::Result<T, ProxyError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transport_error_is_bad_gateway() {
        let err = ProxyError::UpstreamTransport {
            url: "http://127.0.0.1:8000/nodes".to_string(),
            reason: "connection refused".to_string(),
        };
        assert_eq!(err.status_code(), StatusCode::BAD_GATEWAY);
        assert_eq!(
            err.to_string(),
            "Call to http://127.0.0.1:8000/nodes failed: connection refused"
        );
    }

    #[tokio::test]
    async fn test_error_body_is_json() {
        let response = ProxyError::RequestBody("length limit exceeded".to_string()).into_response();
        assert_eq!(response.status(), StatusCode::BAD_GATEWAY);

        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let json: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert!(json["error"]
            .as_str()
            .unwrap()
            .contains("length limit exceeded"));
    }

    #[test]
    fn test_io_error_maps_to_unavailable() {
        let err: CacheError = std::io::Error::new(std::io::ErrorKind::ConnectionRefused, "refused").into();
        assert!(matches!(err, CacheError::Unavailable(_)));
    }
}
