//! # Prometheus Metrics
//!
//! Metrics are recorded through the `metrics` facade and exported by
//! `metrics-exporter-prometheus`. HTTP request counts and latencies are
//! recorded here; domain counters (`carelink_disputes_*`,
//! `carelink_ledger_transactions_total`,
//! `carelink_resolution_compensations_total`) are recorded by the domain
//! crates at the point of the write.
//!
//! Without an installed recorder every macro is a no-op, which is what
//! tests run with.

use std::sync::OnceLock;
use std::time::Instant;

use axum::extract::Request;
use axum::middleware::Next;
use axum::response::Response;
use metrics::{counter, histogram};
use metrics_exporter_prometheus::{BuildError, PrometheusBuilder, PrometheusHandle};

const HTTP_REQUESTS_TOTAL: &str = "carelink_http_requests_total";
const HTTP_REQUEST_DURATION_SECONDS: &str = "carelink_http_request_duration_seconds";
const HTTP_ERRORS_TOTAL: &str = "carelink_http_errors_total";

static METRICS_HANDLE: OnceLock<PrometheusHandle> = OnceLock::new();

/// Install the process-wide Prometheus recorder. Call once at startup.
pub fn init_metrics() -> Result<(), BuildError> {
    let handle = PrometheusBuilder::new().install_recorder()?;
    let _ = METRICS_HANDLE.set(handle);
    Ok(())
}

/// Render the Prometheus text exposition, if a recorder is installed.
pub fn render_metrics() -> Option<String> {
    METRICS_HANDLE.get().map(PrometheusHandle::render)
}

/// Collapse UUID path segments so each route is one label value.
fn normalize_path(path: &str) -> String {
    path.split('/')
        .map(|segment| {
            if uuid::Uuid::parse_str(segment).is_ok() {
                "{id}"
            } else {
                segment
            }
        })
        .collect::<Vec<_>>()
        .join("/")
}

pub fn record_request(method: &str, path: &str, status: u16, seconds: f64) {
    counter!(
        HTTP_REQUESTS_TOTAL,
        "method" => method.to_string(),
        "path" => path.to_string(),
        "status" => status.to_string()
    )
    .increment(1);
    histogram!(
        HTTP_REQUEST_DURATION_SECONDS,
        "method" => method.to_string(),
        "path" => path.to_string()
    )
    .record(seconds);
    if status >= 400 {
        counter!(
            HTTP_ERRORS_TOTAL,
            "method" => method.to_string(),
            "path" => path.to_string(),
            "status" => status.to_string()
        )
        .increment(1);
    }
}

/// Middleware that records HTTP request metrics.
pub async fn metrics_middleware(request: Request, next: Next) -> Response {
    let method = request.method().to_string();
    let path = normalize_path(request.uri().path());
    let start = Instant::now();

    let response = next.run(request).await;

    record_request(
        &method,
        &path,
        response.status().as_u16(),
        start.elapsed().as_secs_f64(),
    );
    response
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn uuid_segments_are_collapsed() {
        assert_eq!(
            normalize_path("/disputes/6f1c2a9e-8d1b-4b7e-9d35-0c6a0f6f2b11/decide"),
            "/disputes/{id}/decide"
        );
        assert_eq!(normalize_path("/wallet/overview"), "/wallet/overview");
    }

    #[test]
    fn recording_without_recorder_is_harmless() {
        record_request("GET", "/health/liveness", 200, 0.001);
        record_request("POST", "/disputes", 503, 0.2);
    }
}
