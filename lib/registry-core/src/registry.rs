//! Shared service registry handle

use crate::{
    EndpointSet, EventDispatcher, EventObserver, LifecycleEvent, Mutation, Service,
    ServiceDirectory, SubscriptionId,
};
use std::cell::RefCell;
use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use tokio::sync::{Mutex, RwLock};
use tracing::debug;

/// Events waiting for delivery by the dispatch in progress on this task
struct PendingEvents {
    // Address of the registry that owns the dispatch
    owner: usize,
    queue: RefCell<VecDeque<LifecycleEvent>>,
}

tokio::task_local! {
    static PENDING: PendingEvents;
}

/// ServiceRegistry is the concurrent front of a [`ServiceDirectory`].
///
/// Mutations are serialized by a gate that stays held until every observer
/// has handled the raised events, so write-through for one mutation
/// finishes before the next mutation starts. Reads only take the state lock.
///
/// An observer may mutate the registry it is notified by. Such a nested
/// mutation is applied immediately and its events are queued behind the
/// event being delivered, all under the gate already held.
pub struct ServiceRegistry {
    directory: RwLock<ServiceDirectory>,
    dispatcher: EventDispatcher,
    mutation_gate: Mutex<()>,
}

impl ServiceRegistry {
    pub fn new() -> Self {
        Self {
            directory: RwLock::new(ServiceDirectory::new()),
            dispatcher: EventDispatcher::new(),
            mutation_gate: Mutex::new(()),
        }
    }

    /// Register a service if the name is new, and return the registered value.
    ///
    /// Re-adding a name keeps the first registration and notifies nobody.
    pub async fn add_service(
        &self,
        name: &str,
        hosts: Vec<String>,
        endpoints: EndpointSet,
    ) -> Service {
        self.mutate(|directory| directory.add_service(name, hosts, endpoints))
            .await
    }

    /// Deregister a service, returning the removed value or `None` if the
    /// name was not registered
    pub async fn remove_service(&self, name: &str) -> Option<Service> {
        self.mutate(|directory| directory.remove_service(name)).await
    }

    async fn mutate<T>(&self, apply: impl FnOnce(&mut ServiceDirectory) -> Mutation<T>) -> T {
        if self.dispatching() {
            let mutation = {
                let mut directory = self.directory.write().await;
                apply(&mut directory)
            };
            debug!("Queueing {} nested events", mutation.events.len());
            let _ = PENDING.try_with(|pending| pending.queue.borrow_mut().extend(mutation.events));
            return mutation.value;
        }

        let _gate = self.mutation_gate.lock().await;

        let mutation = {
            let mut directory = self.directory.write().await;
            apply(&mut directory)
        };

        if !mutation.events.is_empty() {
            let pending = PendingEvents {
                owner: self.address(),
                queue: RefCell::new(mutation.events.into()),
            };
            PENDING.scope(pending, self.deliver_pending()).await;
        }
        mutation.value
    }

    async fn deliver_pending(&self) {
        loop {
            let next = PENDING
                .try_with(|pending| pending.queue.borrow_mut().pop_front())
                .ok()
                .flatten();
            let Some(event) = next else {
                break;
            };
            self.dispatcher
                .dispatch(self, std::slice::from_ref(&event))
                .await;
        }
    }

    /// True while this task is delivering events raised by this registry
    fn dispatching(&self) -> bool {
        PENDING
            .try_with(|pending| pending.owner == self.address())
            .unwrap_or(false)
    }

    fn address(&self) -> usize {
        self as *const Self as usize
    }

    /// Get service information
    pub async fn service(&self, name: &str) -> Option<Service> {
        let directory = self.directory.read().await;
        directory.service(name).cloned()
    }

    /// Snapshot of all services, detached from registry state
    pub async fn services(&self) -> HashMap<String, Service> {
        let directory = self.directory.read().await;
        directory.services().clone()
    }

    /// Name of the service that lists `host`
    pub async fn service_name(&self, host: &str) -> Option<String> {
        let directory = self.directory.read().await;
        directory.service_name(host).map(str::to_string)
    }

    pub async fn contains(&self, name: &str) -> bool {
        let directory = self.directory.read().await;
        directory.service(name).is_some()
    }

    /// Get count of registered services
    pub async fn service_count(&self) -> usize {
        let directory = self.directory.read().await;
        directory.len()
    }

    pub async fn subscribe(&self, observer: Arc<dyn EventObserver>) -> SubscriptionId {
        self.dispatcher.subscribe(observer).await
    }

    pub async fn unsubscribe(&self, id: SubscriptionId) -> bool {
        let removed = self.dispatcher.unsubscribe(id).await;
        debug!("Unsubscribed observer {:?}: {}", id, removed);
        removed
    }
}

impl Default for ServiceRegistry {
    fn default() -> Self {
        Self::new()
    }
}
