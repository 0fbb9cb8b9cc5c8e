#![allow(dead_code)]

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::{Arc, Once};

use once_cell::sync::Lazy;
use reqwest::{Method, Response};
use tempfile::TempDir;
use tokio::net::TcpListener;
use tokio::sync::Notify;

use drain_server::config::Config;
use drain_server::server::serve;
use drain_server::time::{SystemTime, TimeSource};

pub static DEFAULT_CONFIG: Lazy<Config> = Lazy::new(|| Config {
    host: "127.0.0.1".to_string(),
    port: 0,
    marker_path: PathBuf::from("drain"),
    safe_to_kill_grace_secs: 2,
    max_logged_body_bytes: 1_000_000,
    export_prometheus: false,
});

static TRACING_INIT: Once = Once::new();
pub fn setup_tracing() {
    TRACING_INIT.call_once(|| {
        tracing_subscriber::fmt()
            .with_writer(tracing_subscriber::fmt::TestWriter::new())
            .init()
    });
}

pub struct ServerHandle {
    pub addr: SocketAddr,
    pub marker_path: PathBuf,
    shutdown: Arc<Notify>,
    client: reqwest::Client,
    _dir: TempDir,
}

impl ServerHandle {
    pub async fn new() -> Self {
        Self::with_clock(DEFAULT_CONFIG.clone(), SystemTime {}).await
    }

    /// Starts a server whose marker lives in a fresh temporary directory.
    pub async fn with_clock<T>(mut config: Config, timesource: T) -> Self
    where
        T: TimeSource + Send + Sync + 'static,
    {
        setup_tracing();

        let dir = tempfile::tempdir().expect("failed to create marker directory");
        config.marker_path = dir.path().join(&config.marker_path);
        let marker_path = config.marker_path.clone();

        let listener = TcpListener::bind(config.bind()).await.unwrap();
        let addr = listener.local_addr().unwrap();
        let notify = Arc::new(Notify::new());
        let shutdown = notify.clone();

        tokio::spawn(async move {
            serve(config, timesource, listener, async move {
                notify.notified().await
            })
            .await
            .expect("drain-server exited with an error")
        });

        Self {
            addr,
            marker_path,
            shutdown,
            client: reqwest::Client::new(),
            _dir: dir,
        }
    }

    pub async fn request(&self, method: Method, path: &str) -> Response {
        self.client
            .request(method, format!("http://{}{}", self.addr, path))
            .send()
            .await
            .expect("failed to send request")
    }

    pub async fn start_drain(&self) -> Response {
        self.request(Method::POST, "/drain").await
    }

    pub async fn stop_drain(&self) -> Response {
        self.request(Method::POST, "/drain/stop").await
    }

    pub async fn drain_status(&self) -> Response {
        self.request(Method::GET, "/drain/status").await
    }

    pub async fn safe_to_kill(&self) -> Response {
        self.request(Method::GET, "/drain/safe_to_kill").await
    }
}

impl Drop for ServerHandle {
    fn drop(&mut self) {
        self.shutdown.notify_one()
    }
}
