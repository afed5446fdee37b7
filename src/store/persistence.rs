//! Loading and saving the talk map.
//!
//! The request path never waits on disk: the store publishes each new
//! snapshot on a watch channel and [`Persister`] writes the latest one in
//! the background. Bursts of mutations coalesce into a single write.

use std::fs::{self, File};
use std::io::{BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::watch;
use tokio::task::JoinHandle;

use crate::observability::metrics;
use crate::store::model::{Snapshot, Talk, TalkMap};

#[derive(Debug, Error)]
pub enum PersistError {
    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid talk data in {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

impl PersistError {
    /// True when the backing file simply does not exist yet.
    pub fn is_not_found(&self) -> bool {
        matches!(self, PersistError::Io { source, .. } if source.kind() == std::io::ErrorKind::NotFound)
    }
}

/// Load-at-startup / save-after-mutation storage for the full talk map.
pub trait TalkPersistence: Send + Sync {
    fn load(&self) -> Result<Vec<Talk>, PersistError>;
    fn save(&self, talks: &[Talk]) -> Result<(), PersistError>;
}

/// Stores the talks as one JSON object keyed by title.
#[derive(Debug, Clone)]
pub struct JsonFile {
    path: PathBuf,
}

impl JsonFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn io_err(&self, source: std::io::Error) -> PersistError {
        PersistError::Io {
            path: self.path.clone(),
            source,
        }
    }

    fn parse_err(&self, source: serde_json::Error) -> PersistError {
        PersistError::Parse {
            path: self.path.clone(),
            source,
        }
    }
}

impl TalkPersistence for JsonFile {
    fn load(&self) -> Result<Vec<Talk>, PersistError> {
        let file = File::open(&self.path).map_err(|e| self.io_err(e))?;
        let map: TalkMap =
            serde_json::from_reader(BufReader::new(file)).map_err(|e| self.parse_err(e))?;
        Ok(map.0)
    }

    fn save(&self, talks: &[Talk]) -> Result<(), PersistError> {
        let mut tmp = self.path.clone().into_os_string();
        tmp.push(".tmp");
        let tmp = PathBuf::from(tmp);

        let file = File::create(&tmp).map_err(|e| self.io_err(e))?;
        let mut writer = BufWriter::new(file);
        serde_json::to_writer(&mut writer, &TalkMap(talks.to_vec()))
            .map_err(|e| self.parse_err(e))?;
        writer.flush().map_err(|e| self.io_err(e))?;
        drop(writer);

        fs::rename(&tmp, &self.path).map_err(|e| self.io_err(e))
    }
}

/// Load talks, starting empty when the file is missing or unreadable.
pub fn load_or_empty(backend: &dyn TalkPersistence) -> Vec<Talk> {
    match backend.load() {
        Ok(talks) => {
            tracing::info!(count = talks.len(), "Loaded talks from storage");
            talks
        }
        Err(e) if e.is_not_found() => {
            tracing::info!("No saved talks found, starting fresh");
            Vec::new()
        }
        Err(e) => {
            tracing::warn!(error = %e, "Failed to read saved talks, starting fresh");
            Vec::new()
        }
    }
}

/// Background writer for published snapshots.
pub struct Persister {
    backend: Arc<dyn TalkPersistence>,
    snapshots: watch::Receiver<Arc<Snapshot>>,
}

impl Persister {
    pub fn new(backend: Arc<dyn TalkPersistence>, snapshots: watch::Receiver<Arc<Snapshot>>) -> Self {
        Self { backend, snapshots }
    }

    /// Spawn the writer. It exits once the store (the sender) is dropped,
    /// after writing any snapshot it has not saved yet.
    pub fn spawn(self) -> JoinHandle<()> {
        tokio::spawn(self.run())
    }

    async fn run(mut self) {
        while self.snapshots.changed().await.is_ok() {
            let snapshot = self.snapshots.borrow_and_update().clone();
            self.save(snapshot).await;
        }
        tracing::debug!("Persister stopped");
    }

    async fn save(&self, snapshot: Arc<Snapshot>) {
        let backend = self.backend.clone();
        let version = snapshot.version;
        let count = snapshot.talks.len();

        match tokio::task::spawn_blocking(move || backend.save(&snapshot.talks)).await {
            Ok(Ok(())) => tracing::info!(version, count, "Talks saved to disk"),
            Ok(Err(e)) => {
                metrics::record_persist_failure();
                tracing::error!(version, error = %e, "Failed to save talks");
            }
            Err(e) => {
                metrics::record_persist_failure();
                tracing::error!(version, error = %e, "Save task failed");
            }
        }
    }
}
