use std::future::Future;

use eyre::Result;
use tokio::net::TcpListener;

use crate::config::Config;
use crate::handlers::{app, AppState};
use crate::marker::Marker;
use crate::metrics::setup_metrics_recorder;
use crate::time::TimeSource;

pub async fn serve<T, F>(
    config: Config,
    timesource: T,
    listener: TcpListener,
    shutdown: F,
) -> Result<()>
where
    T: TimeSource + Send + Sync + 'static,
    F: Future<Output = ()> + Send + 'static,
{
    let state = AppState::new(
        Marker::new(&config.marker_path),
        timesource,
        config.safe_to_kill_grace(),
    );

    // Installing a global recorder when running as a library (during tests etc)
    // does not work well, so only do it when asked to.
    let recorder_handle = match config.export_prometheus {
        true => Some(setup_metrics_recorder()?),
        false => None,
    };

    let router = app(state, config.max_logged_body_bytes, recorder_handle);

    tracing::info!(
        "listening on {:?}, drain marker at {}",
        listener.local_addr()?,
        config.marker_path.display()
    );
    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown)
        .await?;

    Ok(())
}
