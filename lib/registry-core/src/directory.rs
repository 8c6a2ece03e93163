//! In-memory directory state
//!
//! [`ServiceDirectory`] is the plain, synchronous state machine. Every
//! mutation returns the events it raised instead of delivering them, so
//! the event contract can be checked without any observers.

use crate::{EndpointSet, LifecycleEvent, Service};
use std::collections::HashMap;
use tracing::{debug, warn};

/// Result of a directory mutation together with the events it raised
#[derive(Clone, Debug, PartialEq)]
pub struct Mutation<T> {
    pub value: T,
    pub events: Vec<LifecycleEvent>,
}

impl<T> Mutation<T> {
    fn quiet(value: T) -> Self {
        Self {
            value,
            events: Vec::new(),
        }
    }
}

#[derive(Debug, Default)]
pub struct ServiceDirectory {
    services: HashMap<String, Service>,
    // host -> owning service names, in registration order
    hosts: HashMap<String, Vec<String>>,
}

impl ServiceDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a service under a new name.
    ///
    /// An existing name is left untouched and its current value is
    /// returned with no event.
    pub fn add_service(
        &mut self,
        name: &str,
        hosts: Vec<String>,
        endpoints: EndpointSet,
    ) -> Mutation<Service> {
        if let Some(existing) = self.services.get(name) {
            debug!("Service {} already registered, keeping existing entry", name);
            return Mutation::quiet(existing.clone());
        }

        for host in &hosts {
            let owners = self.hosts.entry(host.clone()).or_default();
            if owners.iter().any(|owner| owner == name) {
                continue;
            }
            if let Some(first) = owners.first() {
                warn!("Host {} of service {} is already registered by {}", host, name, first);
            }
            owners.push(name.to_string());
        }

        let service = Service::new(hosts, endpoints);
        self.services.insert(name.to_string(), service.clone());
        debug!("Registered service: {}", name);

        Mutation {
            value: service,
            events: vec![LifecycleEvent::ServiceConnected {
                name: name.to_string(),
            }],
        }
    }

    /// Remove a service, returning its last value if it was registered
    pub fn remove_service(&mut self, name: &str) -> Mutation<Option<Service>> {
        let Some(service) = self.services.remove(name) else {
            return Mutation::quiet(None);
        };

        for host in &service.hosts {
            if let Some(owners) = self.hosts.get_mut(host) {
                owners.retain(|owner| owner != name);
                if owners.is_empty() {
                    self.hosts.remove(host);
                }
            }
        }
        debug!("Deregistered service: {}", name);

        Mutation {
            events: vec![LifecycleEvent::ServiceDisconnected {
                name: name.to_string(),
                service: service.clone(),
            }],
            value: Some(service),
        }
    }

    pub fn service(&self, name: &str) -> Option<&Service> {
        self.services.get(name)
    }

    pub fn services(&self) -> &HashMap<String, Service> {
        &self.services
    }

    /// Reverse lookup of the service that owns `host`.
    ///
    /// If several services list the host, the first one registered wins.
    pub fn service_name(&self, host: &str) -> Option<&str> {
        let owners = self.hosts.get(host)?;
        if owners.len() > 1 {
            debug!(
                "Host {} is shared by {} services, resolving to {}",
                host,
                owners.len(),
                owners[0]
            );
        }
        owners.first().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.services.len()
    }

    pub fn is_empty(&self) -> bool {
        self.services.is_empty()
    }
}
