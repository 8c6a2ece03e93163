//! JSON encoding of persisted records
//!
//! Records are written single-encoded. Older writers stored some values as a
//! JSON string wrapping the real document. Those are still accepted on read
//! and reported back so the caller can rewrite them.

use crate::{Result, StoreError};
use registry_core::EndpointSet;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;

/// A decoded record
#[derive(Debug, Clone, PartialEq)]
pub struct Decoded<T> {
    pub value: T,
    /// Single-encoded replacement when the stored value was double-encoded
    pub normalized: Option<String>,
}

pub fn encode_hosts(hosts: &[String]) -> Result<String> {
    Ok(serde_json::to_string(hosts)?)
}

pub fn encode_endpoints(endpoints: &EndpointSet) -> Result<String> {
    Ok(serde_json::to_string(endpoints)?)
}

pub fn decode_hosts(key: &str, raw: &str) -> Result<Decoded<Vec<String>>> {
    decode_record(key, raw)
}

pub fn decode_endpoints(key: &str, raw: &str) -> Result<Decoded<EndpointSet>> {
    decode_record(key, raw)
}

fn decode_record<T>(key: &str, raw: &str) -> Result<Decoded<T>>
where
    T: DeserializeOwned + Serialize,
{
    let decode_error = |source| StoreError::Decode {
        key: key.to_string(),
        source,
    };

    match serde_json::from_str::<Value>(raw).map_err(decode_error)? {
        Value::String(inner) => {
            let value: T = serde_json::from_str(&inner).map_err(decode_error)?;
            let normalized = serde_json::to_string(&value)?;
            Ok(Decoded {
                value,
                normalized: Some(normalized),
            })
        }
        document => Ok(Decoded {
            value: serde_json::from_value(document).map_err(decode_error)?,
            normalized: None,
        }),
    }
}
