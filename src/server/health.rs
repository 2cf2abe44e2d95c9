//! Aggregated health and readiness probes
//!
//! Every registered service is checked on demand, never cached. The
//! probe response lists all failing services so operators see the full
//! picture in one call, sorted by service name for stable output.

use std::collections::BTreeMap;
use std::sync::Arc;

use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::get;
use axum::{Json, Router};
use serde::{Deserialize, Serialize};

use super::service::{Service, ServiceError};

/// Snapshot of the service registry taken when serving begins.
///
/// Sorted by service name, which fixes both probe output order and
/// lifecycle notification order.
pub(crate) type ServiceMap = BTreeMap<String, Arc<dyn Service>>;

/// One failing service in a probe response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceFailure {
    /// Name the service was registered under.
    pub service: String,
    /// Failure message reported by the service.
    pub message: String,
}

/// Routes for `/healthz` and `/readiness` over a registry snapshot.
pub(crate) fn probe_router(services: Arc<ServiceMap>) -> Router {
    Router::new()
        .route("/healthz", get(handle_healthz))
        .route("/readiness", get(handle_readiness))
        .with_state(services)
}

/// Liveness probe: 200 with `[]` when all registered services are
/// healthy, otherwise 500 with the failing services.
async fn handle_healthz(
    State(services): State<Arc<ServiceMap>>,
) -> (StatusCode, Json<Vec<ServiceFailure>>) {
    let failures = collect_failures(&services, |service| service.healthy());
    let status = if failures.is_empty() {
        StatusCode::OK
    } else {
        StatusCode::INTERNAL_SERVER_ERROR
    };
    (status, Json(failures))
}

/// Readiness probe: 200 with `[]` when all registered services are
/// ready to serve traffic, otherwise 503 with the failing services.
async fn handle_readiness(
    State(services): State<Arc<ServiceMap>>,
) -> (StatusCode, Json<Vec<ServiceFailure>>) {
    let failures = collect_failures(&services, |service| service.ready());
    let status = if failures.is_empty() {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };
    (status, Json(failures))
}

/// Run `check` against every service, collecting failures in name
/// order. Checks are synchronous by contract; a slow check delays this
/// probe response but not other connections.
fn collect_failures(
    services: &ServiceMap,
    check: impl Fn(&dyn Service) -> Result<(), ServiceError>,
) -> Vec<ServiceFailure> {
    services
        .iter()
        .filter_map(|(name, service)| {
            check(service.as_ref()).err().map(|e| ServiceFailure {
                service: name.clone(),
                message: e.to_string(),
            })
        })
        .collect()
}
