//! Upstream Forwarder
//!
//! Sends buffered requests to the configured upstream host and buffers the
//! replies.

use std::time::Duration;

use async_trait::async_trait;
use tracing::error;

use crate::error::{ProxyError, Result};
use crate::proxy::{request_headers, UpstreamRequest, UpstreamResponse};

// == Forwarder ==
/// Performs one upstream round trip.
///
/// Dropping the returned future abandons the call, which is how a client
/// disconnect propagates to the upstream.
#[async_trait]
pub trait Forwarder: Send + Sync {
    async fn forward(&self, request: UpstreamRequest) -> Result<UpstreamResponse>;
}

// == HTTP Forwarder ==
/// [`Forwarder`] that rewrites the target to `http://host:port` and keeps
/// path, query, method, headers and body.
#[derive(Debug, Clone)]
pub struct HttpForwarder {
    client: reqwest::Client,
    /// `http://host:port`, no trailing slash
    base_url: String,
}

impl HttpForwarder {
    /// Builds a forwarder whose calls are bounded by `timeout`.
    ///
    /// Redirects are relayed to the client, never followed.
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> reqwest::Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .redirect(reqwest::redirect::Policy::none())
            .pool_idle_timeout(Duration::from_secs(90))
            .build()?;

        Ok(Self::with_client(client, base_url))
    }

    pub fn with_client(client: reqwest::Client, base_url: impl Into<String>) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Self { client, base_url }
    }

    /// Upstream URL for an inbound `path?query`.
    pub fn upstream_url(&self, path_and_query: &str) -> String {
        if path_and_query.starts_with('/') {
            format!("{}{}", self.base_url, path_and_query)
        } else {
            format!("{}/{}", self.base_url, path_and_query)
        }
    }
}

#[async_trait]
impl Forwarder for HttpForwarder {
    async fn forward(&self, request: UpstreamRequest) -> Result<UpstreamResponse> {
        let url = self.upstream_url(&request.path_and_query);

        let mut builder = self
            .client
            .request(request.method, url.as_str())
            .headers(request_headers(&request.headers));
        if !request.body.is_empty() {
            builder = builder.body(request.body);
        }

        let response = builder.send().await.map_err(|e| {
            error!(url = %url, error = %e, "Upstream call failed");
            ProxyError::UpstreamTransport {
                url: url.clone(),
                reason: e.to_string(),
            }
        })?;

        let status = response.status();
        let headers = response.headers().clone();
        let body = response.bytes().await.map_err(|e| {
            error!(url = %url, error = %e, "Upstream body read failed");
            ProxyError::UpstreamBody {
                url: url.clone(),
                reason: e.to_string(),
            }
        })?;

        Ok(UpstreamResponse {
            status,
            headers,
            body,
        })
    }
}
