//! Tests for Prometheus metrics exposition

use super::*;
use std::time::Duration;

/// Test that recorded requests show up in the encoded registry
#[test]
fn test_encode_contains_request_series() {
    let metrics = Metrics::new("").expect("registry should build");

    metrics.observe_request("GET", "/ping", 200, Duration::from_millis(5));
    metrics.observe_request("GET", "/ping", 500, Duration::from_millis(9));

    let body = metrics.encode().expect("encode should succeed");
    assert!(
        body.contains("http_requests_total"),
        "request counter should be exported"
    );
    assert!(
        body.contains("http_request_duration_seconds"),
        "latency histogram should be exported"
    );
    assert!(
        body.contains(r#"path="/ping""#),
        "path label should be exported"
    );
    assert!(
        body.contains(r#"status="500""#),
        "status label should distinguish outcomes"
    );
}

/// Test that a subsystem name prefixes the exported metric names
#[test]
fn test_subsystem_prefixes_metric_names() {
    let metrics = Metrics::new("rauta").expect("registry should build");

    metrics.observe_request("GET", "/ping", 200, Duration::from_millis(1));

    let body = metrics.encode().expect("encode should succeed");
    assert!(
        body.contains("rauta_http_requests_total"),
        "subsystem should namespace the counter"
    );
    assert!(
        body.contains("rauta_http_request_duration_seconds"),
        "subsystem should namespace the histogram"
    );
}

/// Test that an invalid subsystem name is rejected at construction
#[test]
fn test_invalid_subsystem_rejected() {
    assert!(
        Metrics::new("not a metric name").is_err(),
        "spaces are not allowed in metric names"
    );
}
