//! Durable store integration for the service directory
//!
//! Provides the [`KvStore`] boundary with in-memory and Redis backends,
//! plus the key layout and JSON codec of persisted service records.

pub mod codec;
pub mod error;
pub mod keys;
pub mod memory;
pub mod redis_store;
pub mod store;

pub use error::{Result, StoreError};
pub use memory::MemoryStore;
pub use redis_store::RedisStore;
pub use store::KvStore;
