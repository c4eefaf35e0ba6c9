use crate::memory::MemoryStorage;
use crate::{Result, Storage, ValueEntry};
use std::path::{Path, PathBuf};
use vitals_common::metric::Metric;

/// File-snapshotted backend: a [`MemoryStorage`] plus full-state JSON
/// serialization to a file. The server drives [`FileStorage::save`] on a
/// store interval and once more at shutdown; [`FileStorage::restore`]
/// replays the last snapshot before the server accepts traffic.
///
/// The persisted layout is a JSON array of wire metrics, one entry per
/// stored id: gauges carry `value`, counters carry the accumulated total as
/// `delta`.
pub struct FileStorage {
    inner: MemoryStorage,
    path: PathBuf,
}

impl FileStorage {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            inner: MemoryStorage::new(),
            path: path.into(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Writes the current state to the snapshot file. The write goes to a
    /// sibling temp file first and is renamed into place, so readers never
    /// see a torn snapshot.
    pub fn save(&self) -> Result<()> {
        let metrics = self.inner.export();
        let json = serde_json::to_vec(&metrics)?;
        let tmp = self.path.with_extension("tmp");
        std::fs::write(&tmp, json)?;
        std::fs::rename(&tmp, &self.path)?;
        tracing::debug!(path = %self.path.display(), count = metrics.len(), "state flushed");
        Ok(())
    }

    /// Replays the last saved snapshot into the in-memory state.
    pub fn restore(&self) -> Result<()> {
        let data = std::fs::read(&self.path)?;
        let metrics: Vec<Metric> = serde_json::from_slice(&data)?;
        self.inner.import(&metrics)?;
        tracing::info!(path = %self.path.display(), count = metrics.len(), "state restored");
        Ok(())
    }
}

impl Storage for FileStorage {
    fn set_gauge(&self, name: &str, value: f64) -> Result<()> {
        self.inner.set_gauge(name, value)
    }

    fn set_counter(&self, name: &str, delta: i64) -> Result<()> {
        self.inner.set_counter(name, delta)
    }

    fn get_gauge(&self, name: &str) -> Result<f64> {
        self.inner.get_gauge(name)
    }

    fn get_counter(&self, name: &str) -> Result<i64> {
        self.inner.get_counter(name)
    }

    fn get_all(&self) -> Result<Vec<ValueEntry>> {
        self.inner.get_all()
    }

    fn set_batch(&self, metrics: &[Metric]) -> Result<()> {
        self.inner.set_batch(metrics)
    }

    fn ping(&self) -> Result<()> {
        self.inner.ping()
    }
}
