use std::sync::Arc;

use axum::{routing, Router};
use metrics_exporter_prometheus::PrometheusHandle;
use tower_http::trace::TraceLayer;

use crate::marker::Marker;
use crate::metrics;
use crate::request_log::log_request;
use crate::time::TimeSource;

use super::drain;

#[derive(Clone)]
pub struct AppState {
    pub marker: Arc<Marker>,
    pub timesource: Arc<dyn TimeSource + Send + Sync>,
    pub grace: time::Duration,
}

impl AppState {
    pub fn new<T: TimeSource + Send + Sync + 'static>(
        marker: Marker,
        timesource: T,
        grace: time::Duration,
    ) -> Self {
        Self {
            marker: Arc::new(marker),
            timesource: Arc::new(timesource),
            grace,
        }
    }
}

pub fn app(
    state: AppState,
    max_logged_body_bytes: usize,
    metrics: Option<PrometheusHandle>,
) -> Router {
    let router = Router::new()
        .route("/", routing::get(index))
        .route("/drain", routing::any(drain::start))
        .route("/drain/stop", routing::any(drain::stop))
        .route("/drain/status", routing::any(drain::status))
        .route("/drain/safe_to_kill", routing::any(drain::safe_to_kill))
        .with_state(state);

    let router = match metrics {
        Some(recorder_handle) => router.route(
            "/metrics",
            routing::get(move || std::future::ready(recorder_handle.render())),
        ),
        None => router,
    };

    router
        .layer(axum::middleware::from_fn_with_state(
            max_logged_body_bytes,
            log_request,
        ))
        .layer(TraceLayer::new_for_http())
        .layer(axum::middleware::from_fn(metrics::track_metrics))
}

pub async fn index() -> &'static str {
    "drain-server"
}
