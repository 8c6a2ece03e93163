//! Endpoint patterns and route classification
use serde::{Deserialize, Serialize};

/// A route pattern registered by a service.
///
/// Patterns support exact paths (`/orders`), prefixes ending in `/`
/// (`/orders/`), wildcard prefixes (`/orders/*`) and templated segments
/// (`/orders/{id}` or `/orders/:id`).
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Endpoint {
    pattern: String,
}

impl Endpoint {
    pub fn new(pattern: impl Into<String>) -> Self {
        Self {
            pattern: pattern.into(),
        }
    }

    pub fn pattern(&self) -> &str {
        &self.pattern
    }

    /// Check whether `route` is matched by this endpoint's pattern
    pub fn contains(&self, route: &str) -> bool {
        match_route(&self.pattern, route)
    }
}

impl From<&str> for Endpoint {
    fn from(pattern: &str) -> Self {
        Self::new(pattern)
    }
}

impl From<String> for Endpoint {
    fn from(pattern: String) -> Self {
        Self::new(pattern)
    }
}

/// Match a concrete route against a pattern
pub fn match_route(pattern: &str, route: &str) -> bool {
    // Exact match
    if pattern == route {
        return true;
    }

    // Prefix match with wildcard
    if let Some(prefix) = pattern.strip_suffix("/*") {
        return route == prefix || route.starts_with(&format!("{}/", prefix));
    }

    // Prefix match (pattern ends with /)
    if pattern.ends_with('/') {
        return route.starts_with(pattern);
    }

    if pattern.contains('{') || pattern.contains("/:") {
        return match_template(pattern, route);
    }

    false
}

fn match_template(pattern: &str, route: &str) -> bool {
    let pattern_segments: Vec<&str> = pattern.split('/').collect();
    let route_segments: Vec<&str> = route.split('/').collect();

    if pattern_segments.len() != route_segments.len() {
        return false;
    }

    pattern_segments
        .iter()
        .zip(route_segments.iter())
        .all(|(p, r)| {
            if is_placeholder(p) {
                !r.is_empty()
            } else {
                p == r
            }
        })
}

fn is_placeholder(segment: &str) -> bool {
    (segment.starts_with('{') && segment.ends_with('}') && segment.len() > 2)
        || (segment.starts_with(':') && segment.len() > 1)
}

/// Endpoints of a service grouped by visibility.
///
/// Each list is scanned in insertion order and the first match wins. The
/// three lists are expected to be disjoint but this is not enforced.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct EndpointSet {
    #[serde(default)]
    pub public: Vec<Endpoint>,
    #[serde(default)]
    pub protected: Vec<Endpoint>,
    #[serde(default)]
    pub internal: Vec<Endpoint>,
}

impl EndpointSet {
    pub fn new(public: Vec<Endpoint>, protected: Vec<Endpoint>, internal: Vec<Endpoint>) -> Self {
        Self {
            public,
            protected,
            internal,
        }
    }

    /// True if the route is part of the externally reachable surface
    /// (public or protected). Internal endpoints are not considered.
    pub fn exists(&self, route: &str) -> bool {
        first_match(&self.public, route).is_some() || first_match(&self.protected, route).is_some()
    }

    pub fn is_protected(&self, route: &str) -> bool {
        first_match(&self.protected, route).is_some()
    }

    pub fn is_internal(&self, route: &str) -> bool {
        first_match(&self.internal, route).is_some()
    }
}

fn first_match<'a>(endpoints: &'a [Endpoint], route: &str) -> Option<&'a Endpoint> {
    endpoints.iter().find(|endpoint| endpoint.contains(route))
}
