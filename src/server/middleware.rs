//! Request-boundary middleware: access logging and panic recovery.

use std::any::Any;
use std::time::Instant;

use axum::extract::Request;
use axum::http::StatusCode;
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use tracing::{error, info};

/// Paths excluded from the access log to keep probe scraping quiet.
const QUIET_PATHS: [&str; 3] = ["/healthz", "/readiness", "/metrics"];

/// Log one structured event per handled request.
pub(crate) async fn access_log(request: Request, next: Next) -> Response {
    let started = Instant::now();
    let method = request.method().to_string();
    let path = request.uri().path().to_string();

    let response = next.run(request).await;

    if !QUIET_PATHS.iter().any(|quiet| path.starts_with(quiet)) {
        info!(
            component = "http",
            method = %method,
            path = %path,
            status = response.status().as_u16(),
            elapsed = ?started.elapsed(),
            "request handled"
        );
    }
    response
}

/// Convert a panicking route handler into a 500 response.
///
/// The diagnostic is logged here; the process keeps serving.
pub(crate) fn handle_panic(panic: Box<dyn Any + Send + 'static>) -> Response {
    let message = if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else if let Some(s) = panic.downcast_ref::<&str>() {
        (*s).to_string()
    } else {
        "unknown panic".to_string()
    };
    error!(panic = %message, "Recovered from panic in request handler");

    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(json!({ "message": "internal server error" })),
    )
        .into_response()
}
