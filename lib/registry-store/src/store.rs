//! Durable key-value store boundary

use crate::Result;
use async_trait::async_trait;

/// String-keyed, string-valued store used to persist the directory.
///
/// `scan` takes a glob pattern where `*` matches any run of characters.
#[async_trait]
pub trait KvStore: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<String>>;

    async fn set(&self, key: &str, value: &str) -> Result<()>;

    async fn del(&self, key: &str) -> Result<()>;

    async fn scan(&self, pattern: &str) -> Result<Vec<String>>;
}

/// Glob match supporting `*` wildcards only
pub fn glob_match(pattern: &str, key: &str) -> bool {
    let mut parts = pattern.split('*');
    let first = parts.next().unwrap_or("");
    let Some(mut rest) = key.strip_prefix(first) else {
        return false;
    };

    let remaining: Vec<&str> = parts.collect();
    let Some((last, middle)) = remaining.split_last() else {
        // No wildcard at all
        return rest.is_empty();
    };

    for part in middle {
        match rest.find(part) {
            Some(pos) => rest = &rest[pos + part.len()..],
            None => return false,
        }
    }

    rest.len() >= last.len() && rest.ends_with(last)
}
