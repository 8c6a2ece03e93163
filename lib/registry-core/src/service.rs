//! Registered services and endpoint classification queries

use crate::EndpointSet;
use serde::{Deserialize, Serialize};

/// A service known to the directory.
///
/// The name is the directory key and is not stored here.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Service {
    /// Host addresses as `host[:port]`, the first one is the primary
    pub hosts: Vec<String>,
    pub endpoints: EndpointSet,
}

impl Service {
    pub fn new(hosts: Vec<String>, endpoints: EndpointSet) -> Self {
        Self { hosts, endpoints }
    }

    /// The default target for health checks
    pub fn primary_host(&self) -> Option<&str> {
        self.hosts.first().map(String::as_str)
    }
}

/// True if `route` matches a public or protected endpoint of the service
pub fn endpoint_exists(service: &Service, route: &str) -> bool {
    service.endpoints.exists(route)
}

/// True if `route` matches a protected endpoint of the service
pub fn endpoint_protected(service: &Service, route: &str) -> bool {
    service.endpoints.is_protected(route)
}

/// True if `route` matches an internal endpoint of the service
pub fn endpoint_internal(service: &Service, route: &str) -> bool {
    service.endpoints.is_internal(route)
}
