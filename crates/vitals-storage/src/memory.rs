use crate::{payload_of, BatchOp, Result, Storage, StorageError, ValueEntry};
use std::collections::HashMap;
use std::sync::RwLock;
use vitals_common::metric::{Metric, MetricKind};

/// Volatile backend: two concurrent maps keyed by metric id, surviving only
/// for the process lifetime.
#[derive(Default)]
pub struct MemoryStorage {
    gauges: RwLock<HashMap<String, f64>>,
    counters: RwLock<HashMap<String, i64>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Dumps the current state as wire metrics (counters carry their
    /// accumulated total), sorted by id. Used by the file backend.
    pub(crate) fn export(&self) -> Vec<Metric> {
        let gauges = self.gauges.read().unwrap();
        let counters = self.counters.read().unwrap();
        let mut metrics: Vec<Metric> = gauges
            .iter()
            .map(|(name, value)| Metric::gauge(name.clone(), *value))
            .chain(
                counters
                    .iter()
                    .map(|(name, total)| Metric::counter(name.clone(), *total)),
            )
            .collect();
        metrics.sort_by(|a, b| a.id.cmp(&b.id));
        metrics
    }

    /// Replaces current state from exported wire metrics. Counters are
    /// stored directly: the exported delta already is the accumulated total.
    pub(crate) fn import(&self, metrics: &[Metric]) -> Result<()> {
        let ops: Vec<BatchOp<'_>> = metrics.iter().map(payload_of).collect::<Result<_>>()?;
        let mut gauges = self.gauges.write().unwrap();
        let mut counters = self.counters.write().unwrap();
        for op in ops {
            match op {
                BatchOp::Gauge(name, value) => {
                    gauges.insert(name.to_string(), value);
                }
                BatchOp::Counter(name, total) => {
                    counters.insert(name.to_string(), total);
                }
            }
        }
        Ok(())
    }
}

impl Storage for MemoryStorage {
    fn set_gauge(&self, name: &str, value: f64) -> Result<()> {
        self.gauges.write().unwrap().insert(name.to_string(), value);
        Ok(())
    }

    fn set_counter(&self, name: &str, delta: i64) -> Result<()> {
        // Read-modify-write under the write lock, so concurrent callers for
        // the same id cannot lose updates.
        let mut counters = self.counters.write().unwrap();
        *counters.entry(name.to_string()).or_insert(0) += delta;
        Ok(())
    }

    fn get_gauge(&self, name: &str) -> Result<f64> {
        self.gauges
            .read()
            .unwrap()
            .get(name)
            .copied()
            .ok_or_else(|| StorageError::NotFound {
                kind: MetricKind::Gauge,
                name: name.to_string(),
            })
    }

    fn get_counter(&self, name: &str) -> Result<i64> {
        self.counters
            .read()
            .unwrap()
            .get(name)
            .copied()
            .ok_or_else(|| StorageError::NotFound {
                kind: MetricKind::Counter,
                name: name.to_string(),
            })
    }

    fn get_all(&self) -> Result<Vec<ValueEntry>> {
        let gauges = self.gauges.read().unwrap();
        let counters = self.counters.read().unwrap();
        let mut entries: Vec<ValueEntry> = gauges
            .iter()
            .map(|(name, value)| ValueEntry::gauge(name.clone(), *value))
            .chain(
                counters
                    .iter()
                    .map(|(name, total)| ValueEntry::counter(name.clone(), *total)),
            )
            .collect();
        entries.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(entries)
    }

    fn set_batch(&self, metrics: &[Metric]) -> Result<()> {
        // Validate the whole batch before touching state, then apply under
        // both write locks: a malformed batch leaves nothing behind, and
        // concurrent readers never observe a half-applied batch.
        let ops: Vec<BatchOp<'_>> = metrics.iter().map(payload_of).collect::<Result<_>>()?;
        let mut gauges = self.gauges.write().unwrap();
        let mut counters = self.counters.write().unwrap();
        for op in ops {
            match op {
                BatchOp::Gauge(name, value) => {
                    gauges.insert(name.to_string(), value);
                }
                BatchOp::Counter(name, delta) => {
                    *counters.entry(name.to_string()).or_insert(0) += delta;
                }
            }
        }
        Ok(())
    }

    fn ping(&self) -> Result<()> {
        Ok(())
    }
}
