//! HTTP client used by heartbeat probes

use crate::{HealthError, Result};
use async_trait::async_trait;
use std::time::Duration;

/// Minimal HTTP capability needed for a liveness probe
#[async_trait]
pub trait HttpClient: Send + Sync {
    /// Issue a GET, succeeding only on a 2xx response
    async fn get(&self, url: &str) -> Result<()>;
}

/// reqwest-backed client with a bounded request timeout
#[derive(Clone)]
pub struct ReqwestClient {
    client: reqwest::Client,
}

impl ReqwestClient {
    pub fn new(timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self { client })
    }
}

#[async_trait]
impl HttpClient for ReqwestClient {
    async fn get(&self, url: &str) -> Result<()> {
        let response = self.client.get(url).send().await.map_err(|e| {
            if e.is_timeout() {
                HealthError::Request(format!("timeout calling {}", url))
            } else {
                HealthError::Request(e.to_string())
            }
        })?;

        let status = response.status();
        if status.is_success() {
            Ok(())
        } else {
            Err(HealthError::Status(status.as_u16()))
        }
    }
}
