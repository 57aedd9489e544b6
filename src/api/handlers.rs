//! API Handlers
//!
//! The cache-backed read path, the invalidating write path, and the admin
//! endpoints.

use std::sync::Arc;

use async_trait::async_trait;
use axum::{
    body::Body,
    extract::{Request, State},
    http::{header, Method, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use tracing::{debug, info, warn};

use crate::cache::{CacheBackend, CachedResponse, KeyDeriver, MemcachedBackend, MemoryBackend};
use crate::config::{CacheBackendKind, Config};
use crate::error::{CacheError, Result};
use crate::metrics::{MetricsRecorder, MetricsRegistry};
use crate::models::{HealthResponse, StatsResponse};
use crate::proxy::{Forwarder, HttpForwarder, UpstreamRequest, UpstreamResponse};

const PROMETHEUS_CONTENT_TYPE: &str = "text/plain; version=0.0.4";

/// Upstream statuses considered normal. Anything else is logged, not blocked.
pub const EXPECTED_STATUSES: [StatusCode; 2] = [StatusCode::OK, StatusCode::CREATED];

// == Request Handler ==
/// Handles one inbound request and produces exactly one response.
#[async_trait]
pub trait RequestHandler: Send + Sync {
    async fn handle(&self, request: Request<Body>) -> Response;
}

fn check_status(path: &str, response: &UpstreamResponse) {
    if !EXPECTED_STATUSES.contains(&response.status) {
        warn!(path, status = %response.status, "Unexpected upstream status");
    }
}

// == Cache Backed Handler ==
/// Serves reads from the cache, filling it from the upstream on a miss.
///
/// A lookup that fails, finds nothing, or finds an undecodable entry is a
/// miss. Store failures never affect the response. Concurrent misses on the
/// same key each reach the upstream; the last store wins.
pub struct CacheBackedHandler {
    cache: Arc<dyn CacheBackend>,
    forwarder: Arc<dyn Forwarder>,
    metrics: MetricsRecorder,
    deriver: KeyDeriver,
    max_body_bytes: usize,
}

impl CacheBackedHandler {
    pub fn new(
        cache: Arc<dyn CacheBackend>,
        forwarder: Arc<dyn Forwarder>,
        metrics: MetricsRecorder,
        deriver: KeyDeriver,
        max_body_bytes: usize,
    ) -> Self {
        Self {
            cache,
            forwarder,
            metrics,
            deriver,
            max_body_bytes,
        }
    }

    /// Returns the response to relay, from the cache or the upstream.
    pub async fn serve(&self, request: Request<Body>) -> Result<UpstreamResponse> {
        let path = request.uri().path().to_string();
        let key = self.deriver.derive(&path);

        if let Some(cached) = self.lookup(&path, &key).await {
            debug!(key = %key, "Cache hit");
            self.metrics.record_hit(&path);
            return Ok(cached);
        }

        debug!(key = %key, "Cache miss, calling upstream");
        self.metrics.record_miss(&path);

        let upstream_request = UpstreamRequest::from_request(request, self.max_body_bytes).await?;
        let response = self
            .metrics
            .upstream_timer(&path)
            .time(self.forwarder.forward(upstream_request))
            .await?;
        check_status(&path, &response);

        self.store(&key, &response).await;
        Ok(response)
    }

    async fn lookup(&self, path: &str, key: &str) -> Option<UpstreamResponse> {
        let result = self
            .metrics
            .query_timer(path)
            .time(self.cache.get(key))
            .await;

        let bytes = match result {
            Ok(Some(bytes)) => bytes,
            Ok(None) => return None,
            Err(e) => {
                warn!(key, error = %e, "Cache lookup failed, treating as miss");
                return None;
            }
        };

        match CachedResponse::decode(&bytes).and_then(CachedResponse::into_upstream) {
            Ok(response) => Some(response),
            Err(e) => {
                warn!(key, error = %e, "Discarding undecodable cache entry");
                None
            }
        }
    }

    async fn store(&self, key: &str, response: &UpstreamResponse) {
        let value = match CachedResponse::from_upstream(response).encode() {
            Ok(value) => value,
            Err(e) => {
                warn!(key, error = %e, "Failed to encode response for caching");
                return;
            }
        };

        match self.cache.set(key, value).await {
            Ok(()) => debug!(key, "Cached upstream response"),
            Err(e @ (CacheError::ValueTooLarge { .. } | CacheError::InvalidKey(_))) => {
                debug!(key, error = %e, "Response not cacheable");
            }
            Err(e) => warn!(key, error = %e, "Failed to store response in cache"),
        }
    }
}

#[async_trait]
impl RequestHandler for CacheBackedHandler {
    async fn handle(&self, request: Request<Body>) -> Response {
        match self.serve(request).await {
            Ok(response) => response.into_response(),
            Err(e) => e.into_response(),
        }
    }
}

// == Invalidation Handler ==
/// Clears the cache entry for a path, then relays the request upstream.
///
/// Never populates the cache.
pub struct InvalidationHandler {
    cache: Arc<dyn CacheBackend>,
    forwarder: Arc<dyn Forwarder>,
    deriver: KeyDeriver,
    max_body_bytes: usize,
}

impl InvalidationHandler {
    pub fn new(
        cache: Arc<dyn CacheBackend>,
        forwarder: Arc<dyn Forwarder>,
        deriver: KeyDeriver,
        max_body_bytes: usize,
    ) -> Self {
        Self {
            cache,
            forwarder,
            deriver,
            max_body_bytes,
        }
    }

    /// Deletes the entry, then returns the upstream's live response.
    pub async fn serve(&self, request: Request<Body>) -> Result<UpstreamResponse> {
        let path = request.uri().path().to_string();
        let key = self.deriver.derive(&path);

        info!(key = %key, method = %request.method(), "Invalidating cache");
        match self.cache.delete(&key).await {
            Ok(true) => debug!(key = %key, "Cache entry cleared"),
            Ok(false) => debug!(key = %key, "No cache entry to clear"),
            Err(e) => warn!(key = %key, error = %e, "Cache invalidation failed"),
        }

        // Untimed: `<key>.time` covers miss round trips only
        let upstream_request = UpstreamRequest::from_request(request, self.max_body_bytes).await?;
        let response = self.forwarder.forward(upstream_request).await?;
        check_status(&path, &response);

        Ok(response)
    }
}

#[async_trait]
impl RequestHandler for InvalidationHandler {
    async fn handle(&self, request: Request<Body>) -> Response {
        match self.serve(request).await {
            Ok(response) => response.into_response(),
            Err(e) => e.into_response(),
        }
    }
}

// == Pass-through Handler ==
/// Relays requests that neither read a cacheable document nor change one
/// (`HEAD`, `OPTIONS`, `TRACE`). The cache is never touched.
pub struct PassthroughHandler {
    forwarder: Arc<dyn Forwarder>,
    max_body_bytes: usize,
}

impl PassthroughHandler {
    pub fn new(forwarder: Arc<dyn Forwarder>, max_body_bytes: usize) -> Self {
        Self {
            forwarder,
            max_body_bytes,
        }
    }

    pub async fn serve(&self, request: Request<Body>) -> Result<UpstreamResponse> {
        let upstream_request = UpstreamRequest::from_request(request, self.max_body_bytes).await?;
        self.forwarder.forward(upstream_request).await
    }
}

#[async_trait]
impl RequestHandler for PassthroughHandler {
    async fn handle(&self, request: Request<Body>) -> Response {
        match self.serve(request).await {
            Ok(response) => response.into_response(),
            Err(e) => e.into_response(),
        }
    }
}

// == Application State ==
/// State shared by all routes.
#[derive(Clone)]
pub struct AppState {
    /// Read path
    pub cached: Arc<CacheBackedHandler>,
    /// Write path
    pub invalidate: Arc<InvalidationHandler>,
    /// Safe methods that are not cached
    pub passthrough: Arc<PassthroughHandler>,
    /// Registry behind the read path's metrics
    pub metrics: Arc<MetricsRegistry>,
}

impl AppState {
    /// Wires every handler to the same cache, forwarder and registry.
    pub fn new(
        cache: Arc<dyn CacheBackend>,
        forwarder: Arc<dyn Forwarder>,
        metrics: Arc<MetricsRegistry>,
        max_body_bytes: usize,
    ) -> Self {
        let deriver = KeyDeriver::default();
        let recorder = MetricsRecorder::new(metrics.clone(), deriver);

        Self {
            cached: Arc::new(CacheBackedHandler::new(
                cache.clone(),
                forwarder.clone(),
                recorder,
                deriver,
                max_body_bytes,
            )),
            invalidate: Arc::new(InvalidationHandler::new(
                cache,
                forwarder.clone(),
                deriver,
                max_body_bytes,
            )),
            passthrough: Arc::new(PassthroughHandler::new(forwarder, max_body_bytes)),
            metrics,
        }
    }

    /// Builds the configured cache backend and upstream forwarder.
    pub fn from_config(config: &Config) -> anyhow::Result<Self> {
        let cache: Arc<dyn CacheBackend> = match config.cache_backend {
            CacheBackendKind::Memcached => Arc::new(MemcachedBackend::new(
                config.memcached_addr.clone(),
                config.cache_timeout(),
                config.max_value_size,
            )),
            CacheBackendKind::Memory => Arc::new(MemoryBackend::new(
                config.max_entries,
                config.max_value_size,
            )),
        };
        let forwarder = Arc::new(HttpForwarder::new(
            config.upstream_base(),
            config.upstream_timeout(),
        )?);

        Ok(Self::new(
            cache,
            forwarder,
            Arc::new(MetricsRegistry::new()?),
            config.max_body_bytes,
        ))
    }

    /// Picks the handler for a request: `GET` is served through the cache,
    /// `HEAD`, `OPTIONS` and `TRACE` are relayed as is, and every other
    /// method invalidates.
    pub fn handler_for(&self, method: &Method) -> &dyn RequestHandler {
        let handler: &dyn RequestHandler = if *method == Method::GET {
            &*self.cached
        } else if [Method::HEAD, Method::OPTIONS, Method::TRACE].contains(method) {
            &*self.passthrough
        } else {
            &*self.invalidate
        };
        handler
    }
}

/// Fallback for every non-admin route.
pub async fn proxy_handler(State(state): State<AppState>, request: Request) -> Response {
    state.handler_for(request.method()).handle(request).await
}

/// Handler for GET /_cache/stats
///
/// Returns hit/miss totals and every registered metric.
pub async fn stats_handler(State(state): State<AppState>) -> Json<StatsResponse> {
    Json(StatsResponse::from_snapshot(state.metrics.snapshot()))
}

/// Handler for GET /_cache/metrics
///
/// Prometheus text exposition of every metric.
pub async fn metrics_handler(State(state): State<AppState>) -> Response {
    match state.metrics.export() {
        Ok(body) => ([(header::CONTENT_TYPE, PROMETHEUS_CONTENT_TYPE)], body).into_response(),
        Err(e) => {
            warn!(error = %e, "Failed to encode metrics");
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}

/// Handler for GET /_cache/health
pub async fn health_handler() -> Json<HealthResponse> {
    Json(HealthResponse::healthy())
}
