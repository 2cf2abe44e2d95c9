//! HTTP client with a replaceable transport
//!
//! [`Client`] sends single requests through a pluggable [`Responder`].
//! The production responder performs a real network send; tests inject
//! in-memory responders for deterministic behavior without touching the
//! network.

mod client;

pub use client::{Client, ClientError, HttpResponder, Responder};

/// HTTP request method.
pub use reqwest::Method;
/// Outgoing HTTP request.
pub use reqwest::Request;
/// HTTP response as returned by a [`Responder`].
pub use reqwest::Response;
/// Ordered multi-map of header names to values.
pub type Header = reqwest::header::HeaderMap;

#[cfg(test)]
#[path = "client_test.rs"]
mod client_tests;
