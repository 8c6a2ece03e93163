//! Heartbeat probes for registered services

use crate::{HealthError, HttpClient, RegistryMetrics, Result};
use chrono::{DateTime, Utc};
use registry_core::ServiceRegistry;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

/// Health check configuration
#[derive(Clone, Debug)]
pub struct HealthCheckConfig {
    /// HTTP path to check for health
    pub http_path: String,
    /// Interval between heartbeat rounds
    pub check_interval: Duration,
    /// Timeout for a single probe
    pub timeout: Duration,
}

impl Default for HealthCheckConfig {
    fn default() -> Self {
        Self {
            http_path: "/hb".to_string(),
            check_interval: Duration::from_secs(30),
            timeout: Duration::from_secs(5),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum HealthStatus {
    Healthy,
    Unhealthy { reason: String },
}

/// Outcome of one heartbeat
#[derive(Clone, Debug)]
pub struct HealthReport {
    pub service: String,
    pub host: String,
    pub status: HealthStatus,
    pub checked_at: DateTime<Utc>,
}

impl HealthReport {
    pub fn is_healthy(&self) -> bool {
        self.status == HealthStatus::Healthy
    }
}

/// Probes the primary host of a service.
///
/// Probing is observational: results are logged and counted, and the
/// registry is never changed because of them.
pub struct HealthChecker {
    config: HealthCheckConfig,
    client: Arc<dyn HttpClient>,
    metrics: Option<RegistryMetrics>,
}

impl HealthChecker {
    /// Create a new health checker
    pub fn new(config: HealthCheckConfig, client: Arc<dyn HttpClient>) -> Self {
        Self {
            config,
            client,
            metrics: None,
        }
    }

    pub fn with_metrics(mut self, metrics: RegistryMetrics) -> Self {
        self.metrics = Some(metrics);
        self
    }

    pub fn config(&self) -> &HealthCheckConfig {
        &self.config
    }

    /// Build the probe URL for a host
    pub fn probe_url(&self, host: &str) -> String {
        format!("http://{}{}", host, self.config.http_path)
    }

    /// Probe the primary host of a registered service.
    ///
    /// Fails only when the service is unknown or has no hosts. An
    /// unreachable host is a normal report with an unhealthy status.
    pub async fn heartbeat(&self, registry: &ServiceRegistry, name: &str) -> Result<HealthReport> {
        let service = registry
            .service(name)
            .await
            .ok_or_else(|| HealthError::ServiceNotFound(name.to_string()))?;
        let host = service
            .primary_host()
            .ok_or_else(|| HealthError::NoHosts(name.to_string()))?
            .to_string();

        let url = self.probe_url(&host);
        debug!("Probing {} at {}", name, url);

        let started = Instant::now();
        let status = match self.client.get(&url).await {
            Ok(()) => {
                info!("{} OK", name);
                HealthStatus::Healthy
            }
            Err(e) => {
                warn!("{} heartbeat to {} failed: {}", name, host, e);
                HealthStatus::Unhealthy {
                    reason: e.to_string(),
                }
            }
        };

        if let Some(metrics) = &self.metrics {
            metrics.record_heartbeat(
                name,
                status == HealthStatus::Healthy,
                started.elapsed().as_secs_f64(),
            );
        }

        Ok(HealthReport {
            service: name.to_string(),
            host,
            status,
            checked_at: Utc::now(),
        })
    }

    /// Probe every registered service once.
    ///
    /// Services removed or left without hosts since the snapshot are skipped.
    pub async fn heartbeat_all(&self, registry: &ServiceRegistry) -> Vec<HealthReport> {
        let mut names: Vec<String> = registry.services().await.into_keys().collect();
        names.sort();

        let mut reports = Vec::with_capacity(names.len());
        for name in names {
            match self.heartbeat(registry, &name).await {
                Ok(report) => reports.push(report),
                Err(e) => debug!("Skipping heartbeat for {}: {}", name, e),
            }
        }
        reports
    }
}
