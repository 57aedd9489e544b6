//! Proxy Module
//!
//! The forwarding capability: buffered requests and responses exchanged with
//! the upstream API server.

mod forwarder;
mod headers;

use axum::{
    body::Body,
    http::{HeaderMap, Method, Request, StatusCode},
    response::{IntoResponse, Response},
};
use bytes::Bytes;

use crate::error::{ProxyError, Result};

pub use forwarder::{Forwarder, HttpForwarder};
pub use headers::{is_hop_by_hop, request_headers, response_headers};

// == Upstream Request ==
/// A fully buffered request bound for the upstream.
#[derive(Debug, Clone)]
pub struct UpstreamRequest {
    pub method: Method,
    /// Path plus `?query` when the inbound request had one
    pub path_and_query: String,
    pub headers: HeaderMap,
    pub body: Bytes,
}

impl UpstreamRequest {
    /// Buffers an inbound request, reading at most `max_body_bytes` of body.
    pub async fn from_request(request: Request<Body>, max_body_bytes: usize) -> Result<Self> {
        let (parts, body) = request.into_parts();
        let body = axum::body::to_bytes(body, max_body_bytes)
            .await
            .map_err(|e| ProxyError::RequestBody(e.to_string()))?;

        let path_and_query = parts
            .uri
            .path_and_query()
            .map(|pq| pq.as_str().to_string())
            .unwrap_or_else(|| "/".to_string());

        Ok(Self {
            method: parts.method,
            path_and_query,
            headers: parts.headers,
            body,
        })
    }
}

// == Upstream Response ==
/// A fully buffered upstream response.
#[derive(Debug, Clone)]
pub struct UpstreamResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Bytes,
}

impl IntoResponse for UpstreamResponse {
    fn into_response(self) -> Response {
        let mut response = Response::new(Body::from(self.body));
        *response.status_mut() = self.status;
        *response.headers_mut() = response_headers(&self.headers);
        response
    }
}
