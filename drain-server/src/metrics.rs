use std::time::Instant;

use axum::{
    body::Body, extract::MatchedPath, http::Request, middleware::Next, response::IntoResponse,
};
use metrics_exporter_prometheus::{BuildError, PrometheusBuilder, PrometheusHandle};

const EXPONENTIAL_SECONDS: &[f64] = &[
    0.0005, 0.001, 0.0025, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0,
];

pub fn setup_metrics_recorder() -> Result<PrometheusHandle, BuildError> {
    PrometheusBuilder::new()
        .set_buckets(EXPONENTIAL_SECONDS)?
        .install_recorder()
}

/// Count one marker operation, labelled by what it did to the marker.
pub fn record_marker_operation(operation: &'static str, outcome: &'static str) {
    metrics::counter!(
        "drain_marker_operations_total",
        "operation" => operation,
        "outcome" => outcome
    )
    .increment(1);
}

/// Names the drain operation a route performs, so dashboards don't need to know the
/// URL layout.
pub fn operation_for_path(path: &str) -> &'static str {
    match path {
        "/drain" => "start_drain",
        "/drain/stop" => "stop_drain",
        "/drain/status" => "drain_status",
        "/drain/safe_to_kill" => "safe_to_kill",
        "/" => "index",
        "/metrics" => "metrics",
        _ => "unmatched",
    }
}

/// Records request count and latency per drain operation and response status.
pub async fn track_metrics(req: Request<Body>, next: Next) -> impl IntoResponse {
    let start = Instant::now();

    // Unknown paths collapse into one label instead of one series per probe URL.
    let operation = match req.extensions().get::<MatchedPath>() {
        Some(matched_path) => operation_for_path(matched_path.as_str()),
        None => "unmatched",
    };
    let method = req.method().to_string();

    let response = next.run(req).await;

    let labels = [
        ("operation", operation.to_owned()),
        ("method", method),
        ("status", response.status().as_u16().to_string()),
    ];
    metrics::counter!("drain_http_requests_total", &labels).increment(1);
    metrics::histogram!("drain_http_request_duration_seconds", &labels)
        .record(start.elapsed().as_secs_f64());

    response
}
