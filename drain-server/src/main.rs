use envconfig::Envconfig;
use eyre::Result;
use tokio::signal;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;

use drain_server::config::Config;
use drain_server::server::serve;
use drain_server::time::SystemTime;

async fn shutdown() {
    let mut term = match signal::unix::signal(signal::unix::SignalKind::terminate()) {
        Ok(term) => term,
        Err(e) => {
            tracing::error!("failed to register SIGTERM handler: {}", e);
            return std::future::pending().await;
        }
    };

    tokio::select! {
        _ = term.recv() => {},
        _ = signal::ctrl_c() => {},
    };

    tracing::info!("Shutting down gracefully...");
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::builder()
                .with_default_directive(LevelFilter::INFO.into())
                .from_env_lossy(),
        )
        .init();

    let config = Config::init_from_env()?;

    let listener = tokio::net::TcpListener::bind(config.bind()).await?;

    if let Err(e) = serve(config, SystemTime {}, listener, shutdown()).await {
        tracing::error!("failed to run drain-server http server, {}", e);
        return Err(e);
    }

    Ok(())
}
