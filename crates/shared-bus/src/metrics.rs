//! Per-system integration counters.

use shared_types::IntegrationMetrics;
use std::collections::{BTreeMap, HashMap};

#[derive(Debug, Default)]
pub struct MetricsTable {
    systems: HashMap<String, IntegrationMetrics>,
}

impl MetricsTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_published(&mut self, system: &str) {
        self.entry(system).record_published();
    }

    pub fn record_received(&mut self, system: &str, response_time_ms: f64) {
        self.entry(system).record_received(response_time_ms);
    }

    pub fn record_failures(&mut self, system: &str, failures: u32) {
        let metrics = self.entry(system);
        for _ in 0..failures {
            metrics.record_failure();
        }
    }

    pub fn get(&self, system: &str) -> Option<IntegrationMetrics> {
        self.systems.get(system).cloned()
    }

    /// Every system seen so far, sorted by name.
    pub fn snapshot(&self) -> BTreeMap<String, IntegrationMetrics> {
        self.systems
            .iter()
            .map(|(name, metrics)| (name.clone(), metrics.clone()))
            .collect()
    }

    fn entry(&mut self, system: &str) -> &mut IntegrationMetrics {
        self.systems.entry(system.to_string()).or_default()
    }
}
