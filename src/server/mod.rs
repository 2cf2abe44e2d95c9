//! HTTP service host
//!
//! Serves an arbitrary collection of [`Service`]s behind one listening
//! process and provides Kubernetes probes:
//! - `/healthz` - liveness: every registered service reports healthy
//! - `/readiness` - readiness: every registered service reports ready
//! - `/metrics` - Prometheus metrics in text format
//!
//! Also provides graceful shutdown with a bounded drain period and
//! exactly-once begin/stop lifecycle notifications for every registered
//! service.

mod health;
mod metrics;
mod middleware;
#[allow(clippy::module_inception)]
mod server;
mod service;
pub mod shutdown;

pub use health::ServiceFailure;
pub use metrics::{Metrics, SharedMetrics};
pub use server::{CompletionCallback, Server, ServerConfig, ServerError};
pub use service::{Service, ServiceError};
pub use shutdown::wait_for_termination;

#[cfg(test)]
#[path = "health_test.rs"]
mod health_tests;

#[cfg(test)]
#[path = "metrics_test.rs"]
mod metrics_tests;

#[cfg(test)]
#[path = "server_test.rs"]
mod server_tests;
