//! Prometheus counters for simulation runs, served at `/metrics`.
use prometheus::{Encoder, IntCounter, IntCounterVec, Opts, Registry, TextEncoder};

pub struct SimulationMetrics {
    registry: Registry,
    runs: IntCounterVec,
    rejected: IntCounter,
}

impl SimulationMetrics {
    pub fn new() -> Result<Self, prometheus::Error> {
        let registry = Registry::new();
        let runs = IntCounterVec::new(
            Opts::new("fourtwo_simulations_total", "Pipeline runs by outcome"),
            &["outcome"],
        )?;
        let rejected = IntCounter::new(
            "fourtwo_simulations_rejected_total",
            "Simulation requests rejected before the runner was invoked",
        )?;
        registry.register(Box::new(runs.clone()))?;
        registry.register(Box::new(rejected.clone()))?;
        Ok(Self {
            registry,
            runs,
            rejected,
        })
    }

    pub fn record_run(&self, success: Option<bool>) {
        let outcome = match success {
            Some(true) => "success",
            Some(false) => "failure",
            None => "undetermined",
        };
        self.runs.with_label_values(&[outcome]).inc();
    }

    pub fn record_rejected(&self) {
        self.rejected.inc();
    }

    pub fn encode(&self) -> Result<String, prometheus::Error> {
        let encoder = TextEncoder::new();
        let mut buffer = Vec::new();
        encoder.encode(&self.registry.gather(), &mut buffer)?;
        Ok(String::from_utf8_lossy(&buffer).to_string())
    }
}
