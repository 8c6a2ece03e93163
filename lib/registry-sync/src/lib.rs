//! Persistence and lifecycle for the service directory
//!
//! This library provides:
//! - Startup rehydration and live write-through to the durable store
//! - Environment configuration
//! - The runtime handle that owns the periodic heartbeat loop

pub mod config;
pub mod error;
pub mod runtime;
pub mod synchronizer;

pub use config::RegistryConfig;
pub use error::{Result, SyncError};
pub use runtime::RegistryRuntime;
pub use synchronizer::StoreSynchronizer;
