//! RAUTA — HTTP service host
//!
//! Hosts an arbitrary collection of web services behind a single
//! listening process:
//! - `/healthz` - aggregated liveness probe over all registered services
//! - `/readiness` - aggregated readiness probe
//! - `/metrics` - Prometheus metrics in text format
//!
//! Services plug in through the [`Service`] trait: each registers its
//! own routes against the shared router and receives begin/stop
//! lifecycle notifications from the hosting [`Server`], which starts
//! serving on a background task and shuts down gracefully within a
//! bounded drain period.
//!
//! A loosely-coupled HTTP [`Client`] with a replaceable transport lives
//! in [`client`] for outbound requests and deterministic testing.

pub mod client;
pub mod logging;
pub mod server;

pub use client::{Client, ClientError, Responder};
pub use server::{Server, ServerConfig, ServerError, Service, ServiceError, ServiceFailure};
