use crate::Sampler;
use sysinfo::System;
use vitals_common::metric::Metric;

pub struct MemorySampler {
    system: System,
}

impl MemorySampler {
    pub fn new() -> Self {
        Self {
            system: System::new(),
        }
    }
}

impl Default for MemorySampler {
    fn default() -> Self {
        Self::new()
    }
}

impl Sampler for MemorySampler {
    fn name(&self) -> &str {
        "memory"
    }

    fn sample(&mut self) -> anyhow::Result<Vec<Metric>> {
        self.system.refresh_memory();

        let total = self.system.total_memory();
        let free = self.system.free_memory();
        let used = self.system.used_memory();
        let available = self.system.available_memory();

        Ok(vec![
            Metric::gauge("TotalMemory", total as f64),
            Metric::gauge("FreeMemory", free as f64),
            Metric::gauge("UsedMemory", used as f64),
            Metric::gauge("AvailableMemory", available as f64),
        ])
    }
}
