//! Current-value metric storage for the vitals server.
//!
//! Every backend implements the same [`Storage`] contract: gauges are
//! overwritten (last write wins), counters accumulate every delta ever
//! applied, and batches apply as one logical unit. Three interchangeable
//! implementations are provided: [`memory::MemoryStorage`] (volatile),
//! [`file::FileStorage`] (volatile map plus periodic JSON snapshots), and
//! [`sqlite::SqliteStorage`] (transactional relational).

pub mod error;
pub mod file;
pub mod memory;
pub mod sqlite;

#[cfg(test)]
mod tests;

pub use error::{Result, StorageError};

use vitals_common::metric::{Metric, MetricKind};

/// One stored metric rendered for enumeration, with the value formatted
/// identically regardless of backend (gauges with one decimal, counters as
/// plain integers).
///
/// # Examples
///
/// ```
/// use vitals_storage::ValueEntry;
///
/// let entry = ValueEntry::gauge("HeapFree", 12.0);
/// assert_eq!(entry.value, "12.0");
/// assert_eq!(ValueEntry::counter("PollCount", 42).value, "42");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct ValueEntry {
    pub name: String,
    pub kind: MetricKind,
    pub value: String,
}

impl ValueEntry {
    pub fn gauge(name: impl Into<String>, value: f64) -> Self {
        Self {
            name: name.into(),
            kind: MetricKind::Gauge,
            value: format!("{value:.1}"),
        }
    }

    pub fn counter(name: impl Into<String>, total: i64) -> Self {
        Self {
            name: name.into(),
            kind: MetricKind::Counter,
            value: total.to_string(),
        }
    }
}

/// Persistence backend for current metric values.
///
/// Implementations must be safe to share across threads (`Send + Sync`):
/// the HTTP handlers and the gRPC service mutate the same storage
/// concurrently. `set_counter` and `set_batch` are required to be free of
/// lost-update races for the same id, and `set_batch` must leave no partial
/// writes visible when it fails on a backend with transaction support.
pub trait Storage: Send + Sync {
    /// Unconditionally overwrites the gauge `name`.
    fn set_gauge(&self, name: &str, value: f64) -> Result<()>;

    /// Adds `delta` to the counter `name`, creating it at `delta` on first
    /// write. Negative deltas are applied as-is.
    fn set_counter(&self, name: &str, delta: i64) -> Result<()>;

    /// Returns the current gauge value, or [`StorageError::NotFound`].
    fn get_gauge(&self, name: &str) -> Result<f64>;

    /// Returns the accumulated counter total, or [`StorageError::NotFound`].
    fn get_counter(&self, name: &str) -> Result<i64>;

    /// Enumerates every stored metric, sorted by name.
    fn get_all(&self) -> Result<Vec<ValueEntry>>;

    /// Applies a list of metrics as one logical unit, in list order.
    /// Duplicate ids are valid; each occurrence applies its own mutation.
    fn set_batch(&self, metrics: &[Metric]) -> Result<()>;

    /// Liveness check. Always succeeds for purely in-memory backends.
    fn ping(&self) -> Result<()>;
}

/// Checks that a batch metric carries the payload field its kind requires.
/// Shared by backends that validate before mutating.
pub(crate) fn payload_of(metric: &Metric) -> Result<BatchOp<'_>> {
    match metric.kind {
        MetricKind::Gauge => match metric.value {
            Some(value) => Ok(BatchOp::Gauge(&metric.id, value)),
            None => Err(StorageError::MissingPayload {
                kind: metric.kind,
                name: metric.id.clone(),
            }),
        },
        MetricKind::Counter => match metric.delta {
            Some(delta) => Ok(BatchOp::Counter(&metric.id, delta)),
            None => Err(StorageError::MissingPayload {
                kind: metric.kind,
                name: metric.id.clone(),
            }),
        },
    }
}

/// A validated batch mutation.
pub(crate) enum BatchOp<'a> {
    Gauge(&'a str, f64),
    Counter(&'a str, i64),
}
