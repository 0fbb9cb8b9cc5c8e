use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use tracing::{debug, error};

use crate::marker::{DrainStatus, MarkerError, StartOutcome, StopOutcome};
use crate::metrics::record_marker_operation;

use super::AppState;

/// Any marker failure is reported to the caller as a bare 500.
#[derive(Debug)]
pub struct DrainError {
    operation: &'static str,
    source: MarkerError,
}

impl DrainError {
    fn during(operation: &'static str) -> impl FnOnce(MarkerError) -> Self {
        move |source| Self { operation, source }
    }
}

impl IntoResponse for DrainError {
    fn into_response(self) -> Response {
        error!("{} failed: {}", self.operation, self.source);
        record_marker_operation(self.operation, self.source.kind());
        StatusCode::INTERNAL_SERVER_ERROR.into_response()
    }
}

pub async fn start(State(state): State<AppState>) -> Result<StatusCode, DrainError> {
    let now = state.timesource.now();
    let outcome = state
        .marker
        .start(now)
        .await
        .map_err(DrainError::during("start_drain"))?;

    match outcome {
        StartOutcome::Created(_) => record_marker_operation("start_drain", "created"),
        StartOutcome::AlreadyDraining => {
            debug!("already draining, keeping the original start time");
            record_marker_operation("start_drain", "already_draining")
        }
    }
    Ok(StatusCode::OK)
}

pub async fn stop(State(state): State<AppState>) -> Result<StatusCode, DrainError> {
    let outcome = state
        .marker
        .stop()
        .await
        .map_err(DrainError::during("stop_drain"))?;

    match outcome {
        StopOutcome::Removed => record_marker_operation("stop_drain", "removed"),
        StopOutcome::NotDraining => record_marker_operation("stop_drain", "not_draining"),
    }
    Ok(StatusCode::OK)
}

pub async fn status(State(state): State<AppState>) -> Result<StatusCode, DrainError> {
    let status = state
        .marker
        .status()
        .await
        .map_err(DrainError::during("drain_status"))?;

    Ok(match status {
        DrainStatus::Draining => StatusCode::OK,
        DrainStatus::NotDraining => StatusCode::NOT_FOUND,
    })
}

/// 200 once draining has been going on for longer than the grace window, 400 while
/// still inside it or if draining never started.
pub async fn safe_to_kill(State(state): State<AppState>) -> Result<StatusCode, DrainError> {
    let Some(started_at) = state
        .marker
        .started_at()
        .await
        .map_err(DrainError::during("safe_to_kill"))?
    else {
        debug!("safe_to_kill queried while not draining");
        return Ok(StatusCode::BAD_REQUEST);
    };

    let elapsed = state.timesource.now() - started_at;
    if elapsed > state.grace {
        Ok(StatusCode::OK)
    } else {
        debug!(
            "drained for {}s, not past the {}s grace window yet",
            elapsed.whole_seconds(),
            state.grace.whole_seconds()
        );
        Ok(StatusCode::BAD_REQUEST)
    }
}
