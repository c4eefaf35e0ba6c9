//! Metric sampling for the vitals agent.
//!
//! Each [`Sampler`] implementation reads one category of host counters and
//! returns ready-to-send [`Metric`]s. The [`Collector`] owns the sampler set
//! plus the poll counter and turns one sampling pass into an immutable
//! [`Snapshot`].

pub mod cpu;
pub mod memory;
pub mod random;

use vitals_common::metric::{Metric, Snapshot};

/// Metric id of the per-tick poll counter.
pub const POLL_COUNT: &str = "PollCount";

/// A host metric sampler.
///
/// Implementations are registered in the agent's collection loop and called
/// once per poll interval. `Send` is required because the collection loop
/// runs on its own task.
pub trait Sampler: Send {
    /// Sampler name (e.g. `"memory"`), used for logging.
    fn name(&self) -> &str;

    /// Reads the current values for this sampler's metrics.
    ///
    /// # Errors
    ///
    /// Returns an error if the underlying system read fails; the collector
    /// logs it and degrades to a snapshot without these metrics.
    fn sample(&mut self) -> anyhow::Result<Vec<Metric>>;
}

/// Produces one [`Snapshot`] per poll tick from a fixed sampler set.
pub struct Collector {
    samplers: Vec<Box<dyn Sampler>>,
    poll_count: i64,
}

impl Collector {
    pub fn new(samplers: Vec<Box<dyn Sampler>>) -> Self {
        Self {
            samplers,
            poll_count: 0,
        }
    }

    /// The default sampler set: memory, CPU, and a random probe value.
    pub fn with_default_samplers() -> Self {
        Self::new(vec![
            Box::new(memory::MemorySampler::new()),
            Box::new(cpu::CpuSampler::new()),
            Box::new(random::RandomSampler),
        ])
    }

    /// Runs one sampling pass.
    ///
    /// Increments the poll counter by exactly 1 and appends it to the
    /// snapshot as the [`POLL_COUNT`] counter metric. A failing sampler
    /// degrades to its metrics being absent from this snapshot; collection
    /// itself never fails.
    pub fn collect(&mut self) -> Snapshot {
        self.poll_count += 1;
        let mut metrics = Vec::new();
        for sampler in &mut self.samplers {
            match sampler.sample() {
                Ok(points) => metrics.extend(points),
                Err(e) => {
                    tracing::warn!(sampler = sampler.name(), error = %e, "sampler failed, skipping")
                }
            }
        }
        metrics.push(Metric::counter(POLL_COUNT, 1));
        Snapshot::new(metrics)
    }

    /// Total number of sampling passes performed so far.
    pub fn poll_count(&self) -> i64 {
        self.poll_count
    }
}
