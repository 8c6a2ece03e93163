//! Runtime configuration loaded from the environment

use crate::{Result, SyncError};
use registry_health::HealthCheckConfig;
use std::time::Duration;

pub const STORE_URL_VAR: &str = "REGISTRY_STORE_URL";
pub const HEARTBEAT_INTERVAL_VAR: &str = "REGISTRY_HEARTBEAT_INTERVAL_SECS";
pub const PROBE_TIMEOUT_VAR: &str = "REGISTRY_PROBE_TIMEOUT_SECS";
pub const HEALTH_PATH_VAR: &str = "REGISTRY_HEALTH_PATH";

const DEFAULT_STORE_URL: &str = "redis://127.0.0.1:6379";

#[derive(Clone, Debug)]
pub struct RegistryConfig {
    /// Durable store location
    pub store_url: String,
    /// Heartbeat path, interval and probe timeout
    pub health: HealthCheckConfig,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            store_url: DEFAULT_STORE_URL.to_string(),
            health: HealthCheckConfig::default(),
        }
    }
}

impl RegistryConfig {
    /// Load configuration from `REGISTRY_*` environment variables
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration from an arbitrary variable source
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(url) = lookup(STORE_URL_VAR) {
            config.store_url = url;
        }
        if let Some(interval) = lookup(HEARTBEAT_INTERVAL_VAR) {
            config.health.check_interval = parse_secs(HEARTBEAT_INTERVAL_VAR, &interval)?;
        }
        if let Some(timeout) = lookup(PROBE_TIMEOUT_VAR) {
            config.health.timeout = parse_secs(PROBE_TIMEOUT_VAR, &timeout)?;
        }
        if let Some(path) = lookup(HEALTH_PATH_VAR) {
            if !path.starts_with('/') {
                return Err(SyncError::Config(format!(
                    "{} must start with '/', got {:?}",
                    HEALTH_PATH_VAR, path
                )));
            }
            config.health.http_path = path;
        }

        Ok(config)
    }
}

fn parse_secs(var: &str, value: &str) -> Result<Duration> {
    let secs: u64 = value
        .trim()
        .parse()
        .map_err(|_| SyncError::Config(format!("{} is not a number: {:?}", var, value)))?;
    if secs == 0 {
        return Err(SyncError::Config(format!("{} must be greater than zero", var)));
    }
    Ok(Duration::from_secs(secs))
}
