//! Mirrors the service directory into a durable store
//!
//! Startup is strict: any store failure or unreadable record aborts
//! rehydration. Live write-through is best effort: failures are logged and
//! counted, and the in-memory directory stays authoritative until the next
//! rehydration.

use crate::Result;
use async_trait::async_trait;
use registry_core::{CoreError, EventObserver, Service, ServiceRegistry};
use registry_health::{HealthChecker, RegistryMetrics};
use registry_store::codec::{decode_endpoints, decode_hosts, encode_endpoints, encode_hosts};
use registry_store::keys::{endpoints_key, hosts_key, service_name_from_hosts_key, HOSTS_PATTERN};
use registry_store::{KvStore, StoreError};
use std::sync::Arc;
use tracing::{debug, info, warn};

pub struct StoreSynchronizer {
    store: Arc<dyn KvStore>,
    metrics: Option<RegistryMetrics>,
}

impl StoreSynchronizer {
    pub fn new(store: Arc<dyn KvStore>) -> Self {
        Self {
            store,
            metrics: None,
        }
    }

    pub fn with_metrics(mut self, metrics: RegistryMetrics) -> Self {
        self.metrics = Some(metrics);
        self
    }

    /// Rebuild directory entries from persisted records.
    ///
    /// Each restored service is probed right after it is added. Returns the
    /// restored names in the order they were processed.
    pub async fn rehydrate(
        &self,
        registry: &ServiceRegistry,
        checker: &HealthChecker,
    ) -> Result<Vec<String>> {
        let mut keys = self.store.scan(HOSTS_PATTERN).await?;
        keys.sort();
        debug!("Found {} persisted services", keys.len());

        let mut restored = Vec::with_capacity(keys.len());
        for key in keys {
            let name = service_name_from_hosts_key(&key)
                .ok_or_else(|| StoreError::InvalidKey(key.clone()))?
                .to_string();
            let endpoints_key = endpoints_key(&name);

            let hosts_raw = self.fetch(&key).await?;
            let endpoints_raw = self.fetch(&endpoints_key).await?;

            let hosts = decode_hosts(&key, &hosts_raw)?;
            let endpoints = decode_endpoints(&endpoints_key, &endpoints_raw)?;

            if let Some(normalized) = &hosts.normalized {
                warn!("Rewriting double-encoded record {}", key);
                self.store.set(&key, normalized).await?;
            }
            if let Some(normalized) = &endpoints.normalized {
                warn!("Rewriting double-encoded record {}", endpoints_key);
                self.store.set(&endpoints_key, normalized).await?;
            }

            registry
                .add_service(&name, hosts.value, endpoints.value)
                .await;
            info!("Restored service {}", name);

            if let Err(e) = checker.heartbeat(registry, &name).await {
                warn!("Heartbeat after restoring {} failed: {}", name, e);
            }
            restored.push(name);
        }

        if let Some(metrics) = &self.metrics {
            metrics.services.set(registry.service_count().await as i64);
        }
        Ok(restored)
    }

    /// Write both records of a service, endpoints first
    pub async fn persist(&self, name: &str, service: &Service) -> registry_store::Result<()> {
        self.store
            .set(&endpoints_key(name), &encode_endpoints(&service.endpoints)?)
            .await?;
        self.store
            .set(&hosts_key(name), &encode_hosts(&service.hosts)?)
            .await
    }

    /// Delete both records of a service, endpoints first
    pub async fn forget(&self, name: &str) -> registry_store::Result<()> {
        self.store.del(&endpoints_key(name)).await?;
        self.store.del(&hosts_key(name)).await
    }

    async fn fetch(&self, key: &str) -> registry_store::Result<String> {
        self.store
            .get(key)
            .await?
            .ok_or_else(|| StoreError::MissingRecord(key.to_string()))
    }

    fn sync_failed(&self, operation: &str, name: &str, e: StoreError) -> CoreError {
        if let Some(metrics) = &self.metrics {
            metrics.record_sync_error(operation);
        }
        CoreError::Observer {
            event: format!("{} {}", operation, name),
            reason: e.to_string(),
        }
    }

    async fn update_gauge(&self, registry: &ServiceRegistry) {
        if let Some(metrics) = &self.metrics {
            metrics.services.set(registry.service_count().await as i64);
        }
    }
}

#[async_trait]
impl EventObserver for StoreSynchronizer {
    async fn on_connected(
        &self,
        registry: &ServiceRegistry,
        name: &str,
    ) -> registry_core::Result<()> {
        self.update_gauge(registry).await;

        let service = registry
            .service(name)
            .await
            .ok_or_else(|| CoreError::ServiceNotFound(name.to_string()))?;

        self.persist(name, &service)
            .await
            .map_err(|e| self.sync_failed("set", name, e))?;

        info!("Connected to {}", name);
        Ok(())
    }

    async fn on_disconnected(
        &self,
        registry: &ServiceRegistry,
        name: &str,
        _last: &Service,
    ) -> registry_core::Result<()> {
        self.update_gauge(registry).await;
        if let Some(metrics) = &self.metrics {
            metrics.forget_service(name);
        }

        self.forget(name)
            .await
            .map_err(|e| self.sync_failed("del", name, e))?;

        info!("Disconnected from {}", name);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use registry_core::{Endpoint, EndpointSet};
    use registry_health::{HealthCheckConfig, HealthError, HttpClient};
    use registry_store::MemoryStore;
    use std::sync::Mutex;

    #[derive(Default)]
    struct CountingClient {
        urls: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl HttpClient for CountingClient {
        async fn get(&self, url: &str) -> registry_health::Result<()> {
            self.urls.lock().unwrap().push(url.to_string());
            Err(HealthError::Request("unreachable".to_string()))
        }
    }

    /// Wraps a memory store, recording operations and optionally failing them
    #[derive(Default)]
    struct RecordingStore {
        inner: MemoryStore,
        ops: Mutex<Vec<String>>,
        fail_writes: bool,
        fail_deletes: bool,
    }

    #[async_trait]
    impl KvStore for RecordingStore {
        async fn get(&self, key: &str) -> registry_store::Result<Option<String>> {
            self.inner.get(key).await
        }

        async fn set(&self, key: &str, value: &str) -> registry_store::Result<()> {
            self.ops.lock().unwrap().push(format!("set {}", key));
            if self.fail_writes {
                return Err(StoreError::Connection("store unavailable".to_string()));
            }
            self.inner.set(key, value).await
        }

        async fn del(&self, key: &str) -> registry_store::Result<()> {
            self.ops.lock().unwrap().push(format!("del {}", key));
            if self.fail_deletes {
                return Err(StoreError::Connection("store unavailable".to_string()));
            }
            self.inner.del(key).await
        }

        async fn scan(&self, pattern: &str) -> registry_store::Result<Vec<String>> {
            self.inner.scan(pattern).await
        }
    }

    fn checker(client: Arc<CountingClient>) -> HealthChecker {
        HealthChecker::new(HealthCheckConfig::default(), client)
    }

    fn orders_endpoints() -> EndpointSet {
        EndpointSet::new(
            vec![Endpoint::new("/orders")],
            vec![Endpoint::new("/orders/{id}")],
            vec![Endpoint::new("/orders/admin")],
        )
    }

    #[tokio::test]
    async fn test_write_through_order() {
        let store = Arc::new(RecordingStore::default());
        let registry = ServiceRegistry::new();
        registry
            .subscribe(Arc::new(StoreSynchronizer::new(store.clone())))
            .await;

        registry
            .add_service("orders", vec!["10.0.0.1:80".to_string()], orders_endpoints())
            .await;
        registry.remove_service("orders").await;

        assert_eq!(
            *store.ops.lock().unwrap(),
            vec![
                "set registry_orders_endpoints",
                "set registry_orders_hosts",
                "del registry_orders_endpoints",
                "del registry_orders_hosts",
            ]
        );
        assert!(store.inner.is_empty().await);
    }

    #[tokio::test]
    async fn test_no_write_for_repeated_add() {
        let store = Arc::new(RecordingStore::default());
        let registry = ServiceRegistry::new();
        registry
            .subscribe(Arc::new(StoreSynchronizer::new(store.clone())))
            .await;

        registry
            .add_service("orders", vec!["h1".to_string()], orders_endpoints())
            .await;
        registry
            .add_service("orders", vec!["h2".to_string()], EndpointSet::default())
            .await;
        registry.remove_service("ghost").await;

        assert_eq!(store.ops.lock().unwrap().len(), 2);
        assert_eq!(
            store.inner.get("registry_orders_hosts").await.unwrap(),
            Some(r#"["h1"]"#.to_string())
        );
    }

    #[tokio::test]
    async fn test_write_failure_keeps_memory_state() {
        let store = Arc::new(RecordingStore {
            fail_writes: true,
            ..Default::default()
        });
        let metrics = RegistryMetrics::new().unwrap();
        let registry = ServiceRegistry::new();
        registry
            .subscribe(Arc::new(
                StoreSynchronizer::new(store.clone()).with_metrics(metrics.clone()),
            ))
            .await;

        let added = registry
            .add_service("orders", vec!["h1".to_string()], orders_endpoints())
            .await;

        assert_eq!(registry.service("orders").await, Some(added));
        assert_eq!(
            metrics
                .store_sync_errors_total
                .with_label_values(&["set"])
                .get(),
            1.0
        );
    }

    #[tokio::test]
    async fn test_delete_failure_keeps_removal() {
        let store = Arc::new(RecordingStore {
            fail_deletes: true,
            ..Default::default()
        });
        let metrics = RegistryMetrics::new().unwrap();
        let registry = ServiceRegistry::new();
        registry
            .subscribe(Arc::new(
                StoreSynchronizer::new(store.clone()).with_metrics(metrics.clone()),
            ))
            .await;

        registry
            .add_service("orders", vec!["h1".to_string()], orders_endpoints())
            .await;
        let removed = registry.remove_service("orders").await;

        assert!(removed.is_some());
        assert!(!registry.contains("orders").await);
        assert_eq!(registry.service_name("h1").await, None);
        // The first delete fails, so the hosts record is never attempted
        assert_eq!(
            store.ops.lock().unwrap().last().map(String::as_str),
            Some("del registry_orders_endpoints")
        );
        assert!(store.inner.get("registry_orders_hosts").await.unwrap().is_some());
        assert_eq!(
            metrics
                .store_sync_errors_total
                .with_label_values(&["del"])
                .get(),
            1.0
        );
        assert_eq!(metrics.services.get(), 0);
    }

    #[test]
    fn test_sync_failure_maps_to_observer_error() {
        let metrics = RegistryMetrics::new().unwrap();
        let synchronizer =
            StoreSynchronizer::new(Arc::new(MemoryStore::new())).with_metrics(metrics.clone());

        let err = synchronizer.sync_failed(
            "del",
            "orders",
            StoreError::Connection("store unavailable".to_string()),
        );

        assert!(matches!(
            err,
            CoreError::Observer { ref event, ref reason }
                if event == "del orders" && reason.contains("store unavailable")
        ));
        assert_eq!(
            metrics
                .store_sync_errors_total
                .with_label_values(&["del"])
                .get(),
            1.0
        );
    }

    #[tokio::test]
    async fn test_disconnect_drops_heartbeat_series() {
        let metrics = RegistryMetrics::new().unwrap();
        let registry = ServiceRegistry::new();
        registry
            .subscribe(Arc::new(
                StoreSynchronizer::new(Arc::new(MemoryStore::new())).with_metrics(metrics.clone()),
            ))
            .await;

        registry
            .add_service("orders", vec!["h1".to_string()], orders_endpoints())
            .await;
        registry
            .add_service("billing", vec!["h2".to_string()], EndpointSet::default())
            .await;
        metrics.record_heartbeat("orders", true, 0.01);
        metrics.record_heartbeat("orders", false, 0.01);
        metrics.record_heartbeat("billing", true, 0.01);

        registry.remove_service("orders").await;

        let text = metrics.gather().unwrap();
        assert!(!text.contains("service=\"orders\""));
        assert!(text.contains("service=\"billing\""));
    }

    #[tokio::test]
    async fn test_round_trip_through_rehydration() {
        let store = Arc::new(MemoryStore::new());
        let original = ServiceRegistry::new();
        original
            .subscribe(Arc::new(StoreSynchronizer::new(store.clone())))
            .await;
        original
            .add_service(
                "orders",
                vec!["10.0.0.1:80".to_string(), "10.0.0.2:80".to_string()],
                orders_endpoints(),
            )
            .await;
        original
            .add_service("order_items", vec!["10.0.0.3:80".to_string()], EndpointSet::default())
            .await;

        let client = Arc::new(CountingClient::default());
        let restored = ServiceRegistry::new();
        let names = StoreSynchronizer::new(store.clone())
            .rehydrate(&restored, &checker(client.clone()))
            .await
            .unwrap();

        assert_eq!(names, vec!["order_items", "orders"]);
        assert_eq!(restored.services().await, original.services().await);
        assert_eq!(
            *client.urls.lock().unwrap(),
            vec!["http://10.0.0.3:80/hb", "http://10.0.0.1:80/hb"]
        );
    }

    #[tokio::test]
    async fn test_rehydration_does_not_write_back() {
        let store = Arc::new(RecordingStore::default());
        store.inner.set("registry_a_hosts", r#"["h1"]"#).await.unwrap();
        store
            .inner
            .set("registry_a_endpoints", r#"{"public":["/a"],"protected":[],"internal":[]}"#)
            .await
            .unwrap();

        let registry = ServiceRegistry::new();
        StoreSynchronizer::new(store.clone())
            .rehydrate(&registry, &checker(Arc::new(CountingClient::default())))
            .await
            .unwrap();

        assert!(registry.contains("a").await);
        assert!(store.ops.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_double_encoded_records_are_normalized() {
        let store = Arc::new(MemoryStore::new());
        let hosts = serde_json::to_string(&r#"["h1"]"#).unwrap();
        let endpoints = serde_json::to_string(&r#"{"public":["/a"]}"#).unwrap();
        store.set("registry_a_hosts", &hosts).await.unwrap();
        store.set("registry_a_endpoints", &endpoints).await.unwrap();

        let registry = ServiceRegistry::new();
        StoreSynchronizer::new(store.clone())
            .rehydrate(&registry, &checker(Arc::new(CountingClient::default())))
            .await
            .unwrap();

        let service = registry.service("a").await.unwrap();
        assert_eq!(service.hosts, vec!["h1".to_string()]);
        assert!(service.endpoints.exists("/a"));
        assert_eq!(
            store.get("registry_a_hosts").await.unwrap(),
            Some(r#"["h1"]"#.to_string())
        );
        assert_eq!(
            store.get("registry_a_endpoints").await.unwrap(),
            Some(r#"{"public":["/a"],"protected":[],"internal":[]}"#.to_string())
        );
    }

    #[tokio::test]
    async fn test_missing_endpoints_record_is_fatal() {
        let store = Arc::new(MemoryStore::new());
        store.set("registry_a_hosts", r#"["h1"]"#).await.unwrap();

        let registry = ServiceRegistry::new();
        let err = StoreSynchronizer::new(store)
            .rehydrate(&registry, &checker(Arc::new(CountingClient::default())))
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            crate::SyncError::Store(StoreError::MissingRecord(ref key)) if key == "registry_a_endpoints"
        ));
        assert!(!registry.contains("a").await);
    }

    #[tokio::test]
    async fn test_corrupt_record_is_fatal() {
        let store = Arc::new(MemoryStore::new());
        store.set("registry_a_hosts", "{not json").await.unwrap();
        store.set("registry_a_endpoints", "{}").await.unwrap();

        let registry = ServiceRegistry::new();
        let err = StoreSynchronizer::new(store)
            .rehydrate(&registry, &checker(Arc::new(CountingClient::default())))
            .await
            .unwrap_err();

        assert!(matches!(err, crate::SyncError::Store(StoreError::Decode { .. })));
    }
}
