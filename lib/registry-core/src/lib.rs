//! Core service directory functionality
//!
//! This library provides:
//! - Endpoint patterns and public/protected/internal route classification
//! - The in-memory service directory and its lifecycle events
//! - A concurrent registry handle that delivers events to observers

pub mod directory;
pub mod endpoint;
pub mod error;
pub mod events;
pub mod registry;
pub mod service;

pub use directory::{Mutation, ServiceDirectory};
pub use endpoint::{match_route, Endpoint, EndpointSet};
pub use error::{CoreError, Result};
pub use events::{EventDispatcher, EventObserver, LifecycleEvent, SubscriptionId};
pub use registry::ServiceRegistry;
pub use service::{endpoint_exists, endpoint_internal, endpoint_protected, Service};
