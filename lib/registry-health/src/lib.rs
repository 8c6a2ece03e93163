//! Liveness probing and metrics for registered services
pub mod client;
pub mod error;
pub mod health_check;
pub mod metrics;

pub use client::{HttpClient, ReqwestClient};
pub use error::{HealthError, Result};
pub use health_check::{HealthCheckConfig, HealthChecker, HealthReport, HealthStatus};
pub use metrics::RegistryMetrics;
