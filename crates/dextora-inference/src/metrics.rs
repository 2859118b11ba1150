//! Prometheus metrics for the inference cycle

use prometheus::{Histogram, HistogramOpts, IntCounter, IntCounterVec, IntGauge, Opts, Registry};

/// Cycle, session and hydration metrics
#[derive(Clone)]
pub struct InferenceMetrics {
    pub cycles_total: IntCounter,
    pub cycle_failures: IntCounterVec,
    pub active_sessions: IntGauge,
    pub cycle_duration_seconds: Histogram,
    pub hydrations: IntCounterVec,
    pub dehydration_failures: IntCounter,
}

impl InferenceMetrics {
    pub fn new() -> prometheus::Result<Self> {
        Ok(Self {
            cycles_total: IntCounter::new(
                "dextora_cycles_total",
                "Total inference cycles completed",
            )?,
            cycle_failures: IntCounterVec::new(
                Opts::new("dextora_cycle_failures_total", "Failed inference cycles by fault kind"),
                &["kind"],
            )?,
            active_sessions: IntGauge::new(
                "dextora_active_sessions",
                "Currently open student sessions",
            )?,
            cycle_duration_seconds: Histogram::with_opts(
                HistogramOpts::new(
                    "dextora_cycle_duration_seconds",
                    "End-to-end inference cycle duration",
                )
                .buckets(vec![0.0005, 0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5]),
            )?,
            hydrations: IntCounterVec::new(
                Opts::new("dextora_hydrations_total", "Session hydrations by vector source"),
                &["source"],
            )?,
            dehydration_failures: IntCounter::new(
                "dextora_dehydration_failures_total",
                "Live vectors that could not be persisted at session end",
            )?,
        })
    }

    pub fn register(&self, registry: &Registry) -> prometheus::Result<()> {
        registry.register(Box::new(self.cycles_total.clone()))?;
        registry.register(Box::new(self.cycle_failures.clone()))?;
        registry.register(Box::new(self.active_sessions.clone()))?;
        registry.register(Box::new(self.cycle_duration_seconds.clone()))?;
        registry.register(Box::new(self.hydrations.clone()))?;
        registry.register(Box::new(self.dehydration_failures.clone()))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_register_and_gather() {
        let registry = Registry::new();
        let metrics = InferenceMetrics::new().unwrap();
        metrics.register(&registry).unwrap();

        metrics.cycles_total.inc();
        metrics.cycle_failures.with_label_values(&["model"]).inc();
        metrics.hydrations.with_label_values(&["fresh"]).inc();

        let names: Vec<_> = registry.gather().iter().map(|f| f.get_name().to_string()).collect();
        assert!(names.contains(&"dextora_cycles_total".to_string()));
        assert!(names.contains(&"dextora_cycle_failures_total".to_string()));
        assert!(names.contains(&"dextora_hydrations_total".to_string()));
    }

    #[test]
    fn test_double_register_fails() {
        let registry = Registry::new();
        let metrics = InferenceMetrics::new().unwrap();
        metrics.register(&registry).unwrap();
        assert!(metrics.register(&registry).is_err());
    }
}
