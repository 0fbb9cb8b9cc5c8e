use std::path::PathBuf;

use envconfig::Envconfig;

#[derive(Envconfig, Clone, Debug)]
pub struct Config {
    #[envconfig(from = "BIND_HOST", default = "0.0.0.0")]
    pub host: String,

    #[envconfig(from = "BIND_PORT", default = "3000")]
    pub port: u16,

    /// Relative paths resolve against the process working directory.
    #[envconfig(from = "MARKER_PATH", default = "drain")]
    pub marker_path: PathBuf,

    #[envconfig(from = "SAFE_TO_KILL_GRACE_SECS", default = "2")]
    pub safe_to_kill_grace_secs: u32,

    #[envconfig(from = "MAX_LOGGED_BODY_BYTES", default = "1000000")]
    pub max_logged_body_bytes: usize,

    #[envconfig(from = "EXPORT_PROMETHEUS", default = "false")]
    pub export_prometheus: bool,
}

impl Config {
    pub fn bind(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub fn safe_to_kill_grace(&self) -> time::Duration {
        time::Duration::seconds(i64::from(self.safe_to_kill_grace_secs))
    }
}
