//! Redis-backed store

use crate::{KvStore, Result, StoreError};
use async_trait::async_trait;
use redis::aio::MultiplexedConnection;
use redis::AsyncCommands;
use std::collections::BTreeSet;
use tracing::{debug, info};

/// Keys requested per SCAN round trip
const SCAN_BATCH: usize = 100;

/// RedisStore wraps a multiplexed Redis connection
#[derive(Clone)]
pub struct RedisStore {
    connection: MultiplexedConnection,
}

impl RedisStore {
    /// Connect to the Redis server at `url` (for example `redis://127.0.0.1:6379`)
    pub async fn connect(url: &str) -> Result<Self> {
        let client = redis::Client::open(url)
            .map_err(|e| StoreError::Connection(format!("{}: {}", url, e)))?;
        let connection = client
            .get_multiplexed_async_connection()
            .await
            .map_err(|e| StoreError::Connection(format!("{}: {}", url, e)))?;

        info!("Connected to redis store at {}", url);
        Ok(Self { connection })
    }
}

#[async_trait]
impl KvStore for RedisStore {
    async fn get(&self, key: &str) -> Result<Option<String>> {
        let mut connection = self.connection.clone();
        let value: Option<String> = connection.get(key).await?;
        Ok(value)
    }

    async fn set(&self, key: &str, value: &str) -> Result<()> {
        let mut connection = self.connection.clone();
        let _: () = connection.set(key, value).await?;
        Ok(())
    }

    async fn del(&self, key: &str) -> Result<()> {
        let mut connection = self.connection.clone();
        let _: () = connection.del(key).await?;
        Ok(())
    }

    async fn scan(&self, pattern: &str) -> Result<Vec<String>> {
        let mut connection = self.connection.clone();
        // SCAN may return a key more than once
        let mut keys = BTreeSet::new();
        let mut cursor: u64 = 0;

        loop {
            let (next, batch): (u64, Vec<String>) = redis::cmd("SCAN")
                .arg(cursor)
                .arg("MATCH")
                .arg(pattern)
                .arg("COUNT")
                .arg(SCAN_BATCH)
                .query_async(&mut connection)
                .await?;

            keys.extend(batch);
            if next == 0 {
                break;
            }
            cursor = next;
        }

        debug!("Scanned {} keys matching {}", keys.len(), pattern);
        Ok(keys.into_iter().collect())
    }
}
