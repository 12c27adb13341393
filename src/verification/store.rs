//! Storage seam for OTP state.
//!
//! `OtpStore` is the `put/get/delete/sweep` contract every OTP consumer goes
//! through. `InMemoryStore` backs tests and single-node runs; `RedisStore`
//! lets several server instances share pending codes.

use std::collections::HashMap;
use std::marker::PhantomData;
use std::sync::{Mutex, PoisonError};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;
use serde::de::DeserializeOwned;
use thiserror::Error;

use crate::database::RedisService;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("OTP store backend error: {0}")]
    Backend(String),

    #[error("OTP store serialization error: {0}")]
    Serialization(String),
}

/// Anything with an absolute expiry.
pub trait Expiring {
    fn expires_at(&self) -> DateTime<Utc>;

    fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now > self.expires_at()
    }
}

#[async_trait]
pub trait OtpStore<R>: Send + Sync
where
    R: Expiring + Send + Sync + 'static,
{
    /// Insert or replace the record for `key`.
    async fn put(&self, key: &str, record: R) -> Result<(), StoreError>;

    async fn get(&self, key: &str) -> Result<Option<R>, StoreError>;

    /// Returns whether a record was removed.
    async fn delete(&self, key: &str) -> Result<bool, StoreError>;

    /// Remove every record that expired before `now`; returns how many went.
    async fn sweep(&self, now: DateTime<Utc>) -> Result<usize, StoreError>;
}

/// Process-local store guarded by a mutex.
pub struct InMemoryStore<R> {
    entries: Mutex<HashMap<String, R>>,
}

impl<R> InMemoryStore<R> {
    pub fn new() -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
        }
    }

    pub fn len(&self) -> usize {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl<R> Default for InMemoryStore<R> {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl<R> OtpStore<R> for InMemoryStore<R>
where
    R: Expiring + Clone + Send + Sync + 'static,
{
    async fn put(&self, key: &str, record: R) -> Result<(), StoreError> {
        let mut entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        entries.insert(key.to_string(), record);
        Ok(())
    }

    async fn get(&self, key: &str) -> Result<Option<R>, StoreError> {
        let entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        Ok(entries.get(key).cloned())
    }

    async fn delete(&self, key: &str) -> Result<bool, StoreError> {
        let mut entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        Ok(entries.remove(key).is_some())
    }

    async fn sweep(&self, now: DateTime<Utc>) -> Result<usize, StoreError> {
        let mut entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        let before = entries.len();
        entries.retain(|_, record| !record.is_expired(now));
        Ok(before - entries.len())
    }
}

/// Stale records stay readable this long past their expiry, so a late
/// verify reports `Expired` rather than `NotFound`.
const EXPIRED_GRACE_SECS: u64 = 600;

/// Redis key lifetime for a record expiring at `expires_at`: the remaining
/// lifetime rounded up to whole seconds, plus the grace window.
pub fn redis_ttl_seconds(expires_at: DateTime<Utc>, now: DateTime<Utc>) -> u64 {
    let remaining_ms = (expires_at - now).num_milliseconds().max(0) as u64;
    remaining_ms.div_ceil(1000) + EXPIRED_GRACE_SECS
}

/// Redis-backed store. Records are JSON values under `{namespace}:{key}`.
/// Redis drops them a grace window after they expire, so nothing is swept here.
pub struct RedisStore<R> {
    redis: RedisService,
    namespace: &'static str,
    _record: PhantomData<fn() -> R>,
}

impl<R> RedisStore<R> {
    pub fn new(redis: RedisService, namespace: &'static str) -> Self {
        Self {
            redis,
            namespace,
            _record: PhantomData,
        }
    }

    fn key(&self, key: &str) -> String {
        format!("{}:{}", self.namespace, key)
    }
}

#[async_trait]
impl<R> OtpStore<R> for RedisStore<R>
where
    R: Expiring + Serialize + DeserializeOwned + Send + Sync + 'static,
{
    async fn put(&self, key: &str, record: R) -> Result<(), StoreError> {
        let ttl = redis_ttl_seconds(record.expires_at(), Utc::now());
        let json = serde_json::to_string(&record)
            .map_err(|e| StoreError::Serialization(e.to_string()))?;

        self.redis
            .set_ex(&self.key(key), &json, ttl)
            .await
            .map_err(StoreError::Backend)
    }

    async fn get(&self, key: &str) -> Result<Option<R>, StoreError> {
        match self.redis.get(&self.key(key)).await.map_err(StoreError::Backend)? {
            Some(json) => serde_json::from_str(&json)
                .map(Some)
                .map_err(|e| StoreError::Serialization(e.to_string())),
            None => Ok(None),
        }
    }

    async fn delete(&self, key: &str) -> Result<bool, StoreError> {
        self.redis
            .delete(&self.key(key))
            .await
            .map_err(StoreError::Backend)
    }

    async fn sweep(&self, _now: DateTime<Utc>) -> Result<usize, StoreError> {
        Ok(0)
    }
}

/// In-memory store whose reads give up the executor once, the way a network
/// round trip would, so concurrent callers interleave between get and delete.
#[cfg(test)]
pub(crate) struct YieldingStore<R> {
    inner: InMemoryStore<R>,
}

#[cfg(test)]
impl<R> Default for YieldingStore<R> {
    fn default() -> Self {
        Self {
            inner: InMemoryStore::new(),
        }
    }
}

#[cfg(test)]
#[async_trait]
impl<R> OtpStore<R> for YieldingStore<R>
where
    R: Expiring + Clone + Send + Sync + 'static,
{
    async fn put(&self, key: &str, record: R) -> Result<(), StoreError> {
        self.inner.put(key, record).await
    }

    async fn get(&self, key: &str) -> Result<Option<R>, StoreError> {
        let record = self.inner.get(key).await?;
        tokio::task::yield_now().await;
        Ok(record)
    }

    async fn delete(&self, key: &str) -> Result<bool, StoreError> {
        self.inner.delete(key).await
    }

    async fn sweep(&self, now: DateTime<Utc>) -> Result<usize, StoreError> {
        self.inner.sweep(now).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[derive(Clone, Debug, PartialEq)]
    struct Entry {
        value: u32,
        expires_at: DateTime<Utc>,
    }

    impl Expiring for Entry {
        fn expires_at(&self) -> DateTime<Utc> {
            self.expires_at
        }
    }

    fn entry(value: u32, offset: Duration) -> Entry {
        Entry {
            value,
            expires_at: Utc::now() + offset,
        }
    }

    #[actix_web::test]
    async fn put_replaces_existing_record() {
        let store = InMemoryStore::new();
        store.put("a", entry(1, Duration::minutes(5))).await.unwrap();
        store.put("a", entry(2, Duration::minutes(5))).await.unwrap();

        assert_eq!(store.len(), 1);
        assert_eq!(store.get("a").await.unwrap().unwrap().value, 2);
    }

    #[actix_web::test]
    async fn delete_reports_whether_anything_was_removed() {
        let store = InMemoryStore::new();
        store.put("a", entry(1, Duration::minutes(5))).await.unwrap();

        assert!(store.delete("a").await.unwrap());
        assert!(!store.delete("a").await.unwrap());
        assert!(store.get("a").await.unwrap().is_none());
    }

    #[test]
    fn redis_ttl_outlives_the_expiry() {
        let now = Utc::now();

        let ttl = redis_ttl_seconds(now + Duration::milliseconds(599_400), now);
        assert_eq!(ttl, 600 + EXPIRED_GRACE_SECS);

        let ttl = redis_ttl_seconds(now + Duration::minutes(10), now);
        assert!(ttl > 600);

        // Already expired records still linger for the grace window
        assert_eq!(redis_ttl_seconds(now - Duration::seconds(30), now), EXPIRED_GRACE_SECS);
    }

    #[actix_web::test]
    async fn sweep_only_removes_expired_records() {
        let store = InMemoryStore::new();
        store.put("stale", entry(1, -Duration::seconds(1))).await.unwrap();
        store.put("older", entry(2, -Duration::hours(1))).await.unwrap();
        store.put("live", entry(3, Duration::minutes(5))).await.unwrap();

        let removed = store.sweep(Utc::now()).await.unwrap();

        assert_eq!(removed, 2);
        assert!(store.get("live").await.unwrap().is_some());
        assert!(store.get("stale").await.unwrap().is_none());
    }
}
