//! Core traits for the distributed cache tier.
//!
//! The `DistributedStore` trait is the narrow slice of a Redis-like
//! key/value server that the cache, staleness tracker, access tracker and
//! metrics persister need: sorted sets, hashes, strings and counters, each
//! with an optional TTL.
//!
//! # Design Principles
//!
//! - **String keys and members**: Human-readable, mirrors the wire protocol
//! - **Per-operation atomicity**: Every method is individually atomic, there
//!   are no multi-key transactions
//! - **Dyn-compatible**: Uses `Pin<Box<dyn Future>>` for trait object support
//!
//! # Example
//!
//! ```ignore
//! use geoband::cache::{DistributedStore, MemoryStore};
//!
//! let store: Arc<dyn DistributedStore> = Arc::new(MemoryStore::new(clock));
//! store.zadd("poi:1:stores:500m", "42", 120.0).await?;
//! let members = store.zrange_with_scores("poi:1:stores:500m").await?;
//! ```

use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;
use std::time::Duration;

use thiserror::Error;

/// Errors that can occur during distributed store operations.
#[derive(Debug, Clone, Error)]
pub enum StoreError {
    /// The store could not be reached.
    #[error("Store unavailable: {0}")]
    Unavailable(String),

    /// The key holds a value of a different type.
    #[error("Wrong type for key {key}: expected {expected}")]
    WrongType { key: String, expected: &'static str },

    /// A stored value could not be decoded.
    #[error("Decode error for key {key}: {reason}")]
    Decode { key: String, reason: String },
}

/// Boxed future type for dyn-compatible async methods.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Redis-style key/value operations used by the cache tiers.
///
/// # Thread Safety
///
/// All implementations must be `Send + Sync` for use across async tasks.
///
/// # Expiry
///
/// A key past its TTL behaves exactly like an absent key.
pub trait DistributedStore: Send + Sync {
    /// Add or update a sorted-set member with the given score.
    fn zadd(&self, key: &str, member: &str, score: f64) -> BoxFuture<'_, Result<(), StoreError>>;

    /// Every member of a sorted set, ascending by score then member.
    ///
    /// Returns an empty list when the key does not exist.
    fn zrange_with_scores(&self, key: &str)
        -> BoxFuture<'_, Result<Vec<(String, f64)>, StoreError>>;

    /// Number of members in a sorted set (0 when absent).
    fn zcard(&self, key: &str) -> BoxFuture<'_, Result<u64, StoreError>>;

    /// Set several hash fields at once.
    fn hset_all(
        &self,
        key: &str,
        fields: Vec<(String, String)>,
    ) -> BoxFuture<'_, Result<(), StoreError>>;

    /// All fields of a hash (empty when absent).
    fn hgetall(&self, key: &str) -> BoxFuture<'_, Result<HashMap<String, String>, StoreError>>;

    /// Set a string value with a TTL, replacing any previous value.
    fn set_with_ttl(
        &self,
        key: &str,
        value: &str,
        ttl: Duration,
    ) -> BoxFuture<'_, Result<(), StoreError>>;

    /// Read a string value.
    fn get(&self, key: &str) -> BoxFuture<'_, Result<Option<String>, StoreError>>;

    /// Atomically increment a counter, returning the new value.
    ///
    /// The TTL is applied only when this call creates the counter, so a
    /// window started by the first increment is never extended.
    fn incr_with_ttl(&self, key: &str, ttl: Duration) -> BoxFuture<'_, Result<i64, StoreError>>;

    /// Delete keys, returning how many existed.
    fn delete(&self, keys: Vec<String>) -> BoxFuture<'_, Result<u64, StoreError>>;

    /// Set a TTL on an existing key. Returns false if the key is absent.
    fn expire(&self, key: &str, ttl: Duration) -> BoxFuture<'_, Result<bool, StoreError>>;

    /// Check whether a key exists.
    fn exists(&self, key: &str) -> BoxFuture<'_, Result<bool, StoreError>>;

    /// Every live key starting with `prefix`.
    fn keys_with_prefix(&self, prefix: &str) -> BoxFuture<'_, Result<Vec<String>, StoreError>>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_store_error_display() {
        let err = StoreError::Unavailable("connection refused".into());
        assert_eq!(err.to_string(), "Store unavailable: connection refused");

        let err = StoreError::WrongType {
            key: "k".into(),
            expected: "hash",
        };
        assert!(err.to_string().contains("hash"));
    }
}
