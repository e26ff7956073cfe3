//! Prometheus metrics for the Application Controller.

use crate::reconciler::SyncOutcome;
use prometheus::{
    Encoder, Histogram, HistogramOpts, IntCounter, IntCounterVec, Opts, Registry, TextEncoder,
};
use std::time::Duration;

/// Controller metrics, registered on a private registry.
///
/// Cheap to clone; clones share the same collectors.
#[derive(Clone)]
pub struct Metrics {
    registry: Registry,
    reconciliations: IntCounterVec,
    failures: IntCounter,
    duration: Histogram,
    workload_syncs: IntCounterVec,
}

impl Metrics {
    pub fn new() -> Result<Self, prometheus::Error> {
        let registry = Registry::new();

        let reconciliations = IntCounterVec::new(
            Opts::new("application_reconcile_total", "Application reconciliations by result"),
            &["result"],
        )?;
        let failures = IntCounter::new(
            "application_reconcile_errors_total",
            "Application reconciliations that returned an error",
        )?;
        let duration = Histogram::with_opts(
            HistogramOpts::new(
                "application_reconcile_duration_seconds",
                "Time spent in a single Application reconciliation",
            )
            .buckets(vec![0.01, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0]),
        )?;
        let workload_syncs = IntCounterVec::new(
            Opts::new(
                "application_workload_sync_total",
                "Deployment sync passes by outcome",
            ),
            &["outcome"],
        )?;

        registry.register(Box::new(reconciliations.clone()))?;
        registry.register(Box::new(failures.clone()))?;
        registry.register(Box::new(duration.clone()))?;
        registry.register(Box::new(workload_syncs.clone()))?;

        Ok(Self {
            registry,
            reconciliations,
            failures,
            duration,
            workload_syncs,
        })
    }

    pub fn record_reconcile(&self, success: bool, elapsed: Duration) {
        let result = if success { "success" } else { "error" };
        self.reconciliations.with_label_values(&[result]).inc();
        if !success {
            self.failures.inc();
        }
        self.duration.observe(elapsed.as_secs_f64());
    }

    pub fn record_sync(&self, outcome: SyncOutcome) {
        self.workload_syncs.with_label_values(&[outcome.as_str()]).inc();
    }

    /// Render all metrics in the Prometheus text exposition format
    pub fn render(&self) -> Result<String, prometheus::Error> {
        let mut buffer = Vec::new();
        TextEncoder::new().encode(&self.registry.gather(), &mut buffer)?;
        String::from_utf8(buffer).map_err(|e| prometheus::Error::Msg(e.to_string()))
    }
}
