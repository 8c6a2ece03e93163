//! Registry lifecycle: `init` builds a running registry, `shutdown` stops it

use crate::{RegistryConfig, Result, StoreSynchronizer, SyncError};
use registry_core::{ServiceRegistry, SubscriptionId};
use registry_health::{HealthChecker, HttpClient, RegistryMetrics, ReqwestClient};
use registry_store::{KvStore, RedisStore};
use std::sync::Arc;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, info};

/// Handle to a running registry.
///
/// Owns the periodic heartbeat task and the store write-through
/// subscription. Consumers share the registry through [`Self::registry`].
pub struct RegistryRuntime {
    registry: Arc<ServiceRegistry>,
    checker: Arc<HealthChecker>,
    metrics: RegistryMetrics,
    subscription: SubscriptionId,
    shutdown_tx: watch::Sender<bool>,
    heartbeat_task: JoinHandle<()>,
}

impl RegistryRuntime {
    /// Connect to the configured Redis store and start the registry
    pub async fn init(config: RegistryConfig) -> Result<Self> {
        let store = Arc::new(RedisStore::connect(&config.store_url).await?);
        let client = Arc::new(ReqwestClient::new(config.health.timeout)?);
        Self::init_with(config, store, client).await
    }

    /// Start the registry on top of the given collaborators.
    ///
    /// Rehydrates from `store` first and only then subscribes the
    /// write-through observer, so restored entries are not written back.
    pub async fn init_with(
        config: RegistryConfig,
        store: Arc<dyn KvStore>,
        client: Arc<dyn HttpClient>,
    ) -> Result<Self> {
        let metrics = RegistryMetrics::new()?;
        let registry = Arc::new(ServiceRegistry::new());
        let checker = Arc::new(
            HealthChecker::new(config.health.clone(), client).with_metrics(metrics.clone()),
        );
        let synchronizer = StoreSynchronizer::new(store).with_metrics(metrics.clone());

        let restored = synchronizer.rehydrate(&registry, &checker).await?;
        info!("Rehydrated {} services from store", restored.len());

        let subscription = registry.subscribe(Arc::new(synchronizer)).await;

        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let heartbeat_task = tokio::spawn(run_heartbeats(
            registry.clone(),
            checker.clone(),
            metrics.clone(),
            shutdown_rx,
        ));

        Ok(Self {
            registry,
            checker,
            metrics,
            subscription,
            shutdown_tx,
            heartbeat_task,
        })
    }

    pub fn registry(&self) -> &Arc<ServiceRegistry> {
        &self.registry
    }

    pub fn checker(&self) -> &Arc<HealthChecker> {
        &self.checker
    }

    pub fn metrics(&self) -> &RegistryMetrics {
        &self.metrics
    }

    /// Stop the heartbeat loop and detach store write-through
    pub async fn shutdown(self) -> Result<()> {
        self.registry.unsubscribe(self.subscription).await;
        let _ = self.shutdown_tx.send(true);
        self.heartbeat_task
            .await
            .map_err(|e| SyncError::Task(e.to_string()))?;

        info!("Registry runtime stopped");
        Ok(())
    }
}

async fn run_heartbeats(
    registry: Arc<ServiceRegistry>,
    checker: Arc<HealthChecker>,
    metrics: RegistryMetrics,
    mut shutdown_rx: watch::Receiver<bool>,
) {
    let mut interval = tokio::time::interval(checker.config().check_interval);
    // The first tick fires immediately; rehydration has just probed everything
    interval.tick().await;

    loop {
        tokio::select! {
            _ = interval.tick() => {
                let reports = checker.heartbeat_all(&registry).await;
                let healthy = reports.iter().filter(|r| r.is_healthy()).count();
                metrics.services.set(registry.service_count().await as i64);
                debug!("Heartbeat round: {}/{} healthy", healthy, reports.len());
            }
            changed = shutdown_rx.changed() => {
                if changed.is_err() || *shutdown_rx.borrow() {
                    break;
                }
            }
        }
    }
}
