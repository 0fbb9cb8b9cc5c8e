pub mod config;
pub mod handlers;
pub mod marker;
pub mod metrics;
pub mod request_log;
pub mod server;
pub mod time;
