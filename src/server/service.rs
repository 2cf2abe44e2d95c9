//! Capability contract for hosted web services.

use axum::Router;
use thiserror::Error;

/// Failure signal returned by service health and readiness checks.
///
/// Carries a human-readable message that surfaces in the aggregated
/// probe response. Never fatal to the host.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ServiceError {
    /// The service is alive but malfunctioning.
    #[error("{0}")]
    Unhealthy(String),

    /// The service cannot accept traffic yet, or anymore.
    #[error("{0}")]
    NotReady(String),
}

/// A unit of web functionality that can be hosted by a server.
///
/// Implementations register their own routes against the shared router
/// and receive lifecycle notifications from the hosting server. Health
/// and readiness checks are synchronous and expected to return quickly;
/// the host imposes no timeout, so a slow check delays the probe
/// request that invoked it (but not other connections).
pub trait Service: Send + Sync {
    /// Add this service's routes to the shared router.
    ///
    /// Invoked exactly once, during registration.
    fn register_routes(&self, router: Router) -> Router;

    /// Notification that serving has begun. Invoked once per run cycle,
    /// after the listen address is bound and before the hosting server
    /// hands control back to its caller.
    fn begin_serving(&self);

    /// Notification that serving has stopped. Invoked once per run
    /// cycle, after the listener has closed and in-flight requests have
    /// drained (or the drain grace period expired). Never invoked
    /// before [`Service::begin_serving`].
    fn stop_serving(&self);

    /// Liveness check, aggregated into `/healthz`.
    fn healthy(&self) -> Result<(), ServiceError>;

    /// Readiness check, aggregated into `/readiness`.
    fn ready(&self) -> Result<(), ServiceError>;
}
