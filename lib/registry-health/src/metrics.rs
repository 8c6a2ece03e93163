//! Prometheus metrics for the service directory

use crate::Result;
use prometheus::{
    CounterVec, Encoder, Histogram, HistogramOpts, IntGauge, Opts, Registry, TextEncoder,
};
use std::sync::Arc;

/// Prometheus metrics collector for heartbeats and store synchronization
#[derive(Clone)]
pub struct RegistryMetrics {
    /// Heartbeats by service and outcome
    pub heartbeats_total: CounterVec,
    /// Heartbeat probe duration in seconds
    pub heartbeat_duration_seconds: Histogram,
    /// Currently registered services
    pub services: IntGauge,
    /// Failed store writes/deletes by operation
    pub store_sync_errors_total: CounterVec,
    /// Prometheus registry for metrics
    pub registry: Arc<Registry>,
}

impl RegistryMetrics {
    /// Create a new metrics collector
    pub fn new() -> Result<Self> {
        let registry = Arc::new(Registry::new());

        let heartbeats_total = CounterVec::new(
            Opts::new("registry_heartbeats_total", "Heartbeat probes by outcome"),
            &["service", "outcome"],
        )?;

        let heartbeat_duration_seconds = Histogram::with_opts(HistogramOpts::new(
            "registry_heartbeat_duration_seconds",
            "Heartbeat probe latency in seconds",
        ))?;

        let services = IntGauge::new("registry_services", "Registered services")?;

        let store_sync_errors_total = CounterVec::new(
            Opts::new(
                "registry_store_sync_errors_total",
                "Store write-through failures",
            ),
            &["operation"],
        )?;

        registry.register(Box::new(heartbeats_total.clone()))?;
        registry.register(Box::new(heartbeat_duration_seconds.clone()))?;
        registry.register(Box::new(services.clone()))?;
        registry.register(Box::new(store_sync_errors_total.clone()))?;

        Ok(Self {
            heartbeats_total,
            heartbeat_duration_seconds,
            services,
            store_sync_errors_total,
            registry,
        })
    }

    pub fn record_heartbeat(&self, service: &str, healthy: bool, seconds: f64) {
        let outcome = if healthy { "success" } else { "failure" };
        self.heartbeats_total
            .with_label_values(&[service, outcome])
            .inc();
        self.heartbeat_duration_seconds.observe(seconds);
    }

    /// Drop the heartbeat series of a deregistered service
    pub fn forget_service(&self, service: &str) {
        for outcome in ["success", "failure"] {
            // Absent series are not an error here
            let _ = self
                .heartbeats_total
                .remove_label_values(&[service, outcome]);
        }
    }

    pub fn record_sync_error(&self, operation: &str) {
        self.store_sync_errors_total
            .with_label_values(&[operation])
            .inc();
    }

    /// Gather all metrics in Prometheus text format
    pub fn gather(&self) -> Result<String> {
        let encoder = TextEncoder::new();
        let metric_families = self.registry.gather();
        let mut buffer = vec![];
        encoder.encode(&metric_families, &mut buffer)?;
        Ok(String::from_utf8(buffer)?)
    }
}
