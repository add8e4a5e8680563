//! In-process distributed store.
//!
//! `MemoryStore` implements [`DistributedStore`] on a `DashMap`, with lazy
//! TTL expiry evaluated against an injected [`Clock`]. It stands in for a
//! networked key/value server in single-process deployments and tests.
//!
//! Expired keys are removed the next time they are touched; there is no
//! background sweeper.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use dashmap::DashMap;

use crate::cache::traits::{BoxFuture, DistributedStore, StoreError};
use crate::clock::Clock;

#[derive(Debug, Clone)]
enum Value {
    Text(String),
    Counter(i64),
    SortedSet(HashMap<String, f64>),
    Hash(HashMap<String, String>),
}

#[derive(Debug, Clone)]
struct Entry {
    value: Value,
    expires_at: Option<DateTime<Utc>>,
}

impl Entry {
    fn new(value: Value) -> Self {
        Self {
            value,
            expires_at: None,
        }
    }

    fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at.is_some_and(|at| at <= now)
    }
}

fn deadline(now: DateTime<Utc>, ttl: Duration) -> Option<DateTime<Utc>> {
    chrono::Duration::from_std(ttl)
        .ok()
        .and_then(|d| now.checked_add_signed(d))
}

fn wrong_type(key: &str, expected: &'static str) -> StoreError {
    StoreError::WrongType {
        key: key.to_string(),
        expected,
    }
}

/// `DistributedStore` backed by a concurrent hash map.
pub struct MemoryStore {
    entries: DashMap<String, Entry>,
    clock: Arc<dyn Clock>,
    unavailable: AtomicBool,
}

impl MemoryStore {
    /// Create an empty store.
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self {
            entries: DashMap::new(),
            clock,
            unavailable: AtomicBool::new(false),
        }
    }

    /// Simulate an outage: every operation fails while set.
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::Relaxed);
    }

    /// Number of live keys.
    pub fn len(&self) -> usize {
        let now = self.clock.now();
        self.entries.iter().filter(|e| !e.is_expired(now)).count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Remaining TTL of a key, if it has one.
    pub fn ttl(&self, key: &str) -> Option<Duration> {
        let now = self.clock.now();
        let entry = self.entries.get(key)?;
        if entry.is_expired(now) {
            return None;
        }
        let remaining = entry.expires_at? - now;
        remaining.to_std().ok()
    }

    fn check(&self) -> Result<DateTime<Utc>, StoreError> {
        if self.unavailable.load(Ordering::Relaxed) {
            return Err(StoreError::Unavailable("memory store offline".into()));
        }
        Ok(self.clock.now())
    }

    /// Drop the key if it has expired.
    fn purge(&self, key: &str, now: DateTime<Utc>) {
        self.entries.remove_if(key, |_, entry| entry.is_expired(now));
    }

    fn zadd_sync(&self, key: &str, member: &str, score: f64) -> Result<(), StoreError> {
        let now = self.check()?;
        self.purge(key, now);
        let mut entry = self
            .entries
            .entry(key.to_string())
            .or_insert_with(|| Entry::new(Value::SortedSet(HashMap::new())));
        match &mut entry.value {
            Value::SortedSet(members) => {
                members.insert(member.to_string(), score);
                Ok(())
            }
            _ => Err(wrong_type(key, "sorted set")),
        }
    }

    fn zrange_sync(&self, key: &str) -> Result<Vec<(String, f64)>, StoreError> {
        let now = self.check()?;
        self.purge(key, now);
        let Some(entry) = self.entries.get(key) else {
            return Ok(Vec::new());
        };
        match &entry.value {
            Value::SortedSet(members) => {
                let mut out: Vec<(String, f64)> =
                    members.iter().map(|(m, s)| (m.clone(), *s)).collect();
                out.sort_by(|a, b| a.1.total_cmp(&b.1).then_with(|| a.0.cmp(&b.0)));
                Ok(out)
            }
            _ => Err(wrong_type(key, "sorted set")),
        }
    }

    fn zcard_sync(&self, key: &str) -> Result<u64, StoreError> {
        let now = self.check()?;
        self.purge(key, now);
        match self.entries.get(key).as_deref().map(|e| &e.value) {
            None => Ok(0),
            Some(Value::SortedSet(members)) => Ok(members.len() as u64),
            Some(_) => Err(wrong_type(key, "sorted set")),
        }
    }

    fn hset_sync(&self, key: &str, fields: Vec<(String, String)>) -> Result<(), StoreError> {
        let now = self.check()?;
        self.purge(key, now);
        let mut entry = self
            .entries
            .entry(key.to_string())
            .or_insert_with(|| Entry::new(Value::Hash(HashMap::new())));
        match &mut entry.value {
            Value::Hash(map) => {
                map.extend(fields);
                Ok(())
            }
            _ => Err(wrong_type(key, "hash")),
        }
    }

    fn hgetall_sync(&self, key: &str) -> Result<HashMap<String, String>, StoreError> {
        let now = self.check()?;
        self.purge(key, now);
        match self.entries.get(key).as_deref().map(|e| &e.value) {
            None => Ok(HashMap::new()),
            Some(Value::Hash(map)) => Ok(map.clone()),
            Some(_) => Err(wrong_type(key, "hash")),
        }
    }

    fn set_sync(&self, key: &str, value: &str, ttl: Duration) -> Result<(), StoreError> {
        let now = self.check()?;
        let entry = Entry {
            value: Value::Text(value.to_string()),
            expires_at: deadline(now, ttl),
        };
        self.entries.insert(key.to_string(), entry);
        Ok(())
    }

    fn get_sync(&self, key: &str) -> Result<Option<String>, StoreError> {
        let now = self.check()?;
        self.purge(key, now);
        match self.entries.get(key).as_deref().map(|e| &e.value) {
            None => Ok(None),
            Some(Value::Text(text)) => Ok(Some(text.clone())),
            Some(Value::Counter(n)) => Ok(Some(n.to_string())),
            Some(_) => Err(wrong_type(key, "string")),
        }
    }

    fn incr_sync(&self, key: &str, ttl: Duration) -> Result<i64, StoreError> {
        let now = self.check()?;
        self.purge(key, now);
        let mut entry = self.entries.entry(key.to_string()).or_insert_with(|| Entry {
            value: Value::Counter(0),
            expires_at: deadline(now, ttl),
        });
        let next = match &entry.value {
            Value::Counter(n) => n + 1,
            Value::Text(text) => {
                text.parse::<i64>().map_err(|e| StoreError::Decode {
                    key: key.to_string(),
                    reason: e.to_string(),
                })? + 1
            }
            _ => return Err(wrong_type(key, "counter")),
        };
        entry.value = Value::Counter(next);
        Ok(next)
    }

    fn delete_sync(&self, keys: Vec<String>) -> Result<u64, StoreError> {
        let now = self.check()?;
        let mut removed = 0;
        for key in keys {
            if let Some((_, entry)) = self.entries.remove(&key) {
                if !entry.is_expired(now) {
                    removed += 1;
                }
            }
        }
        Ok(removed)
    }

    fn expire_sync(&self, key: &str, ttl: Duration) -> Result<bool, StoreError> {
        let now = self.check()?;
        self.purge(key, now);
        match self.entries.get_mut(key) {
            Some(mut entry) => {
                entry.expires_at = deadline(now, ttl);
                Ok(true)
            }
            None => Ok(false),
        }
    }

    fn exists_sync(&self, key: &str) -> Result<bool, StoreError> {
        let now = self.check()?;
        self.purge(key, now);
        Ok(self.entries.contains_key(key))
    }

    fn keys_sync(&self, prefix: &str) -> Result<Vec<String>, StoreError> {
        let now = self.check()?;
        let mut keys: Vec<String> = self
            .entries
            .iter()
            .filter(|e| e.key().starts_with(prefix) && !e.is_expired(now))
            .map(|e| e.key().clone())
            .collect();
        keys.sort();
        Ok(keys)
    }
}

impl DistributedStore for MemoryStore {
    fn zadd(&self, key: &str, member: &str, score: f64) -> BoxFuture<'_, Result<(), StoreError>> {
        let result = self.zadd_sync(key, member, score);
        Box::pin(async move { result })
    }

    fn zrange_with_scores(
        &self,
        key: &str,
    ) -> BoxFuture<'_, Result<Vec<(String, f64)>, StoreError>> {
        let result = self.zrange_sync(key);
        Box::pin(async move { result })
    }

    fn zcard(&self, key: &str) -> BoxFuture<'_, Result<u64, StoreError>> {
        let result = self.zcard_sync(key);
        Box::pin(async move { result })
    }

    fn hset_all(
        &self,
        key: &str,
        fields: Vec<(String, String)>,
    ) -> BoxFuture<'_, Result<(), StoreError>> {
        let result = self.hset_sync(key, fields);
        Box::pin(async move { result })
    }

    fn hgetall(&self, key: &str) -> BoxFuture<'_, Result<HashMap<String, String>, StoreError>> {
        let result = self.hgetall_sync(key);
        Box::pin(async move { result })
    }

    fn set_with_ttl(
        &self,
        key: &str,
        value: &str,
        ttl: Duration,
    ) -> BoxFuture<'_, Result<(), StoreError>> {
        let result = self.set_sync(key, value, ttl);
        Box::pin(async move { result })
    }

    fn get(&self, key: &str) -> BoxFuture<'_, Result<Option<String>, StoreError>> {
        let result = self.get_sync(key);
        Box::pin(async move { result })
    }

    fn incr_with_ttl(&self, key: &str, ttl: Duration) -> BoxFuture<'_, Result<i64, StoreError>> {
        let result = self.incr_sync(key, ttl);
        Box::pin(async move { result })
    }

    fn delete(&self, keys: Vec<String>) -> BoxFuture<'_, Result<u64, StoreError>> {
        let result = self.delete_sync(keys);
        Box::pin(async move { result })
    }

    fn expire(&self, key: &str, ttl: Duration) -> BoxFuture<'_, Result<bool, StoreError>> {
        let result = self.expire_sync(key, ttl);
        Box::pin(async move { result })
    }

    fn exists(&self, key: &str) -> BoxFuture<'_, Result<bool, StoreError>> {
        let result = self.exists_sync(key);
        Box::pin(async move { result })
    }

    fn keys_with_prefix(&self, prefix: &str) -> BoxFuture<'_, Result<Vec<String>, StoreError>> {
        let result = self.keys_sync(prefix);
        Box::pin(async move { result })
    }
}
