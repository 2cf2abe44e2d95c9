//! Prometheus metrics for the hosting server
//!
//! Tracks request counts and latencies for every handled request and
//! serves them on `/metrics` in the Prometheus text format. Metric
//! names are prefixed with the configured subsystem name.

use std::sync::Arc;
use std::time::{Duration, Instant};

use axum::extract::{MatchedPath, Request, State};
use axum::http::header::CONTENT_TYPE;
use axum::http::StatusCode;
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::Router;
use prometheus::{
    Encoder, HistogramOpts, HistogramVec, IntCounterVec, Opts, Registry, TextEncoder,
};

/// Shared handle to the server's metrics registry.
pub type SharedMetrics = Arc<Metrics>;

/// Prometheus registry with the request metrics recorded by the server.
pub struct Metrics {
    registry: Registry,
    requests_total: IntCounterVec,
    request_duration_seconds: HistogramVec,
}

impl Metrics {
    /// Create a registry. A non-empty `subsystem` becomes the metric
    /// namespace prefix.
    pub fn new(subsystem: &str) -> Result<SharedMetrics, prometheus::Error> {
        let registry = if subsystem.is_empty() {
            Registry::new()
        } else {
            Registry::new_custom(Some(subsystem.to_string()), None)?
        };

        let requests_total = IntCounterVec::new(
            Opts::new("http_requests_total", "Number of handled HTTP requests"),
            &["method", "path", "status"],
        )?;
        registry.register(Box::new(requests_total.clone()))?;

        let request_duration_seconds = HistogramVec::new(
            HistogramOpts::new(
                "http_request_duration_seconds",
                "HTTP request latency in seconds",
            ),
            &["method", "path"],
        )?;
        registry.register(Box::new(request_duration_seconds.clone()))?;

        Ok(Arc::new(Metrics {
            registry,
            requests_total,
            request_duration_seconds,
        }))
    }

    /// Record one handled request.
    pub fn observe_request(&self, method: &str, path: &str, status: u16, elapsed: Duration) {
        self.requests_total
            .with_label_values(&[method, path, &status.to_string()])
            .inc();
        self.request_duration_seconds
            .with_label_values(&[method, path])
            .observe(elapsed.as_secs_f64());
    }

    /// Encode the registry in the Prometheus text exposition format.
    pub fn encode(&self) -> Result<String, prometheus::Error> {
        let mut buffer = Vec::new();
        let encoder = TextEncoder::new();
        encoder.encode(&self.registry.gather(), &mut buffer)?;
        String::from_utf8(buffer).map_err(|e| prometheus::Error::Msg(e.to_string()))
    }
}

/// Route for the Prometheus scrape endpoint.
pub(crate) fn metrics_router(metrics: SharedMetrics) -> Router {
    Router::new()
        .route("/metrics", get(handle_metrics))
        .with_state(metrics)
}

/// Prometheus metrics handler, returning the text exposition format.
async fn handle_metrics(State(metrics): State<SharedMetrics>) -> Response {
    match metrics.encode() {
        Ok(body) => (
            StatusCode::OK,
            [(CONTENT_TYPE, "text/plain; version=0.0.4; charset=utf-8")],
            body,
        )
            .into_response(),
        Err(e) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            format!("Failed to encode metrics: {}", e),
        )
            .into_response(),
    }
}

/// Middleware recording request count and latency.
///
/// The path label uses the matched route template where available to
/// keep label cardinality bounded.
pub(crate) async fn track_requests(
    State(metrics): State<SharedMetrics>,
    request: Request,
    next: Next,
) -> Response {
    let started = Instant::now();
    let method = request.method().to_string();
    let path = request
        .extensions()
        .get::<MatchedPath>()
        .map(|matched| matched.as_str().to_string())
        .unwrap_or_else(|| request.uri().path().to_string());

    let response = next.run(request).await;

    metrics.observe_request(
        &method,
        &path,
        response.status().as_u16(),
        started.elapsed(),
    );
    response
}
