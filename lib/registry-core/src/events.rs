//! Lifecycle events raised by directory mutations and their delivery

use crate::{Result, Service, ServiceRegistry};
use async_trait::async_trait;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, warn};

/// A state transition of a single directory entry
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum LifecycleEvent {
    /// A new service name was added
    ServiceConnected { name: String },
    /// A service was removed, carrying the value it had at removal
    ServiceDisconnected { name: String, service: Service },
}

impl LifecycleEvent {
    pub fn name(&self) -> &str {
        match self {
            LifecycleEvent::ServiceConnected { name } => name,
            LifecycleEvent::ServiceDisconnected { name, .. } => name,
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            LifecycleEvent::ServiceConnected { .. } => "service-connected",
            LifecycleEvent::ServiceDisconnected { .. } => "service-disconnected",
        }
    }
}

/// Receives lifecycle events.
///
/// Handlers run as part of the mutating call that raised the event. For
/// connections, the current entry can be read back from `registry`. A
/// disconnected entry is already gone, so its last value is passed in.
#[async_trait]
pub trait EventObserver: Send + Sync {
    async fn on_connected(&self, _registry: &ServiceRegistry, _name: &str) -> Result<()> {
        Ok(())
    }

    async fn on_disconnected(
        &self,
        _registry: &ServiceRegistry,
        _name: &str,
        _last: &Service,
    ) -> Result<()> {
        Ok(())
    }
}

/// Handle returned by [`EventDispatcher::subscribe`]
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

/// Delivers events to subscribed observers in subscription order
pub struct EventDispatcher {
    observers: RwLock<Vec<(SubscriptionId, Arc<dyn EventObserver>)>>,
    next_id: AtomicU64,
}

impl EventDispatcher {
    pub fn new() -> Self {
        Self {
            observers: RwLock::new(Vec::new()),
            next_id: AtomicU64::new(1),
        }
    }

    pub async fn subscribe(&self, observer: Arc<dyn EventObserver>) -> SubscriptionId {
        let id = SubscriptionId(self.next_id.fetch_add(1, Ordering::SeqCst));
        self.observers.write().await.push((id, observer));
        debug!("Subscribed observer {:?}", id);
        id
    }

    /// Remove an observer, returning whether it was subscribed
    pub async fn unsubscribe(&self, id: SubscriptionId) -> bool {
        let mut observers = self.observers.write().await;
        let before = observers.len();
        observers.retain(|(existing, _)| *existing != id);
        before != observers.len()
    }

    /// Deliver events in order, awaiting every observer.
    ///
    /// Observer failures are logged and do not stop delivery to the
    /// remaining observers.
    pub async fn dispatch(&self, registry: &ServiceRegistry, events: &[LifecycleEvent]) {
        if events.is_empty() {
            return;
        }

        let observers: Vec<Arc<dyn EventObserver>> = self
            .observers
            .read()
            .await
            .iter()
            .map(|(_, observer)| observer.clone())
            .collect();

        for event in events {
            for observer in &observers {
                let result = match event {
                    LifecycleEvent::ServiceConnected { name } => {
                        observer.on_connected(registry, name).await
                    }
                    LifecycleEvent::ServiceDisconnected { name, service } => {
                        observer.on_disconnected(registry, name, service).await
                    }
                };

                if let Err(e) = result {
                    warn!("Observer error on {} for {}: {}", event.kind(), event.name(), e);
                }
            }
        }
    }
}

impl Default for EventDispatcher {
    fn default() -> Self {
        Self::new()
    }
}
