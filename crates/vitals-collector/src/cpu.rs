use crate::Sampler;
use sysinfo::System;
use vitals_common::metric::Metric;

/// Samples CPU utilization. `CPUutilization1` is the sum over all cores,
/// matching the historical wire id for this value.
pub struct CpuSampler {
    system: System,
}

impl CpuSampler {
    pub fn new() -> Self {
        let mut system = System::new();
        // First refresh establishes the baseline; usage numbers are deltas
        // between refreshes.
        system.refresh_cpu_all();
        Self { system }
    }
}

impl Default for CpuSampler {
    fn default() -> Self {
        Self::new()
    }
}

impl Sampler for CpuSampler {
    fn name(&self) -> &str {
        "cpu"
    }

    fn sample(&mut self) -> anyhow::Result<Vec<Metric>> {
        self.system.refresh_cpu_all();

        let summed: f64 = self
            .system
            .cpus()
            .iter()
            .map(|cpu| cpu.cpu_usage() as f64)
            .sum();

        Ok(vec![Metric::gauge("CPUutilization1", summed)])
    }
}
