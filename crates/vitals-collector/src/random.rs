use crate::Sampler;
use rand::Rng;
use vitals_common::metric::Metric;

/// Emits a fresh `RandomValue` gauge each tick. Downstream dashboards use it
/// as a liveness probe: a stuck value means the agent stopped sampling.
pub struct RandomSampler;

impl Sampler for RandomSampler {
    fn name(&self) -> &str {
        "random"
    }

    fn sample(&mut self) -> anyhow::Result<Vec<Metric>> {
        let value: f64 = rand::thread_rng().gen();
        Ok(vec![Metric::gauge("RandomValue", value)])
    }
}
