use std::io::{self, ErrorKind, Write};
use std::num::ParseIntError;
use std::path::{Path, PathBuf};

use tempfile::NamedTempFile;
use thiserror::Error;
use time::OffsetDateTime;
use tokio::fs;
use tokio::sync::Mutex;
use tokio::task;
use tracing::{debug, info, warn};

/// The drain marker: a file whose presence means the host is draining, and whose
/// content is the unix timestamp (in seconds) at which draining began.
///
/// Every operation holds the same lock for its whole duration, so concurrent
/// requests observe each check-then-act sequence as a single step.
pub struct Marker {
    path: PathBuf,
    lock: Mutex<()>,
}

#[derive(Error, Debug)]
pub enum MarkerError {
    #[error("failed to probe drain marker {path}: {source}")]
    Probe { path: PathBuf, source: io::Error },
    #[error("failed to create drain marker {path}: {source}")]
    Create { path: PathBuf, source: io::Error },
    #[error("failed to delete drain marker {path}: {source}")]
    Delete { path: PathBuf, source: io::Error },
    #[error("failed to read drain marker {path}: {source}")]
    Read { path: PathBuf, source: io::Error },
    #[error("drain marker {path} holds an invalid timestamp {content:?}: {reason}")]
    Parse {
        path: PathBuf,
        content: String,
        reason: String,
    },
}

impl MarkerError {
    /// Short label used for metrics.
    pub fn kind(&self) -> &'static str {
        match self {
            MarkerError::Probe { .. } => "probe",
            MarkerError::Create { .. } => "create",
            MarkerError::Delete { .. } => "delete",
            MarkerError::Read { .. } => "read",
            MarkerError::Parse { .. } => "parse",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StartOutcome {
    Created(i64),
    AlreadyDraining,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopOutcome {
    Removed,
    NotDraining,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DrainStatus {
    Draining,
    NotDraining,
}

impl Marker {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Creates the marker stamped with `now`. An existing marker is left untouched,
    /// keeping the original drain start time.
    ///
    /// The timestamp is written to a staging file next to the marker and linked into
    /// place only once complete, so the marker never exists half-written. The work runs
    /// on the blocking pool and finishes even if the request is dropped.
    pub async fn start(&self, now: OffsetDateTime) -> Result<StartOutcome, MarkerError> {
        let _guard = self.lock.lock().await;

        let path = self.path.clone();
        let timestamp = now.unix_timestamp();
        let created = task::spawn_blocking(move || create_marker(&path, timestamp))
            .await
            .map_err(|e| self.create_error(io::Error::new(ErrorKind::Other, e)))?
            .map_err(|source| self.create_error(source))?;

        if !created {
            debug!("drain marker {} already present", self.path.display());
            return Ok(StartOutcome::AlreadyDraining);
        }

        info!(
            "created drain marker {} at {}",
            self.path.display(),
            timestamp
        );
        Ok(StartOutcome::Created(timestamp))
    }

    pub async fn stop(&self) -> Result<StopOutcome, MarkerError> {
        let _guard = self.lock.lock().await;

        match fs::remove_file(&self.path).await {
            Ok(()) => {
                info!("removed drain marker {}", self.path.display());
                Ok(StopOutcome::Removed)
            }
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(StopOutcome::NotDraining),
            Err(source) => Err(MarkerError::Delete {
                path: self.path.clone(),
                source,
            }),
        }
    }

    pub async fn status(&self) -> Result<DrainStatus, MarkerError> {
        let _guard = self.lock.lock().await;

        match self.probe().await? {
            true => Ok(DrainStatus::Draining),
            false => Ok(DrainStatus::NotDraining),
        }
    }

    /// Returns when draining began, or `None` if the marker is absent.
    pub async fn started_at(&self) -> Result<Option<OffsetDateTime>, MarkerError> {
        let _guard = self.lock.lock().await;

        if !self.probe().await? {
            return Ok(None);
        }

        let content = match fs::read_to_string(&self.path).await {
            Ok(content) => content,
            // Removed between the probe and the read by something outside this process.
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(source) => {
                return Err(MarkerError::Read {
                    path: self.path.clone(),
                    source,
                })
            }
        };

        let timestamp: i64 = content
            .trim()
            .parse()
            .map_err(|e: ParseIntError| self.parse_error(&content, e.to_string()))?;

        OffsetDateTime::from_unix_timestamp(timestamp)
            .map(Some)
            .map_err(|e| self.parse_error(&content, e.to_string()))
    }

    async fn probe(&self) -> Result<bool, MarkerError> {
        match fs::metadata(&self.path).await {
            Ok(_) => Ok(true),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
            Err(source) => Err(MarkerError::Probe {
                path: self.path.clone(),
                source,
            }),
        }
    }

    fn create_error(&self, source: io::Error) -> MarkerError {
        MarkerError::Create {
            path: self.path.clone(),
            source,
        }
    }

    fn parse_error(&self, content: &str, reason: String) -> MarkerError {
        MarkerError::Parse {
            path: self.path.clone(),
            content: content.to_owned(),
            reason,
        }
    }
}

/// Returns false when a marker already exists at `path`.
fn create_marker(path: &Path, timestamp: i64) -> io::Result<bool> {
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };

    let mut staged = NamedTempFile::new_in(dir)?;
    let written = staged
        .write_all(timestamp.to_string().as_bytes())
        .and_then(|()| staged.as_file().sync_all());
    if let Err(e) = written {
        discard(staged, path);
        return Err(e);
    }

    match staged.persist_noclobber(path) {
        Ok(_) => Ok(true),
        Err(e) if e.error.kind() == ErrorKind::AlreadyExists => {
            discard(e.file, path);
            Ok(false)
        }
        Err(e) => {
            discard(e.file, path);
            Err(e.error)
        }
    }
}

fn discard(staged: NamedTempFile, marker: &Path) {
    let staged_path = staged.path().to_owned();
    if let Err(e) = staged.close() {
        warn!(
            "failed to remove staged drain marker {} for {}: {}",
            staged_path.display(),
            marker.display(),
            e
        );
    }
}
