//! TTL cache with single-flight computation and stale fallback
//!
//! Lookups only ever touch the in-memory map. The map is warmed from the disk
//! cache at construction and every successful computation is written back, so
//! entries survive restarts while their expiry is always judged against the
//! wall clock.

use std::collections::{HashMap, HashSet};
use std::future::Future;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use chrono::Utc;
use futures::future::{BoxFuture, FutureExt, Shared, WeakShared};
use serde_json::Value;
use thiserror::Error;
use tracing::{debug, warn};

use super::manager::{CacheEntry, CacheManager};

/// How long values of one class of request stay fresh, and whether an expired
/// value may stand in when recomputing it fails
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CachePolicy {
    pub ttl: Duration,
    pub stale_tolerable: bool,
}

impl CachePolicy {
    pub const fn new(ttl: Duration, stale_tolerable: bool) -> Self {
        Self {
            ttl,
            stale_tolerable,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CacheError {
    /// Waited longer than the configured bound for an in-flight computation
    #[error("timed out after {waited:?} waiting for {key}")]
    WaitTimedOut { key: String, waited: Duration },
}

/// Failures a computation may produce
///
/// One failure is handed to every waiter, hence `Clone`.
pub trait FlightError: std::error::Error + Clone + Send + Sync + From<CacheError> + 'static {
    /// Whether a stale entry may be served in place of this failure
    fn allows_stale(&self) -> bool {
        true
    }
}

type Computation<E> = BoxFuture<'static, Result<Value, E>>;

enum Lookup<E> {
    Hit(Value),
    /// This caller started the computation
    Started(Shared<Computation<E>>),
    /// Another caller's computation is already running
    Joined(Shared<Computation<E>>),
}

struct StoreInner<E> {
    entries: Mutex<HashMap<String, CacheEntry>>,
    in_flight: Mutex<HashMap<String, WeakShared<Computation<E>>>>,
    disk: Option<CacheManager>,
    wait_timeout: Duration,
    stale_retention: chrono::Duration,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

impl<E> StoreInner<E> {
    fn fresh(&self, key: &str) -> Option<Value> {
        let now = Utc::now();
        let mut entries = lock(&self.entries);
        let entry = entries.get(key)?;
        if entry.is_fresh_at(now) {
            return Some(entry.value.clone());
        }
        if !entry.is_retained_at(now, self.stale_retention) {
            entries.remove(key);
        }
        None
    }

    fn stale(&self, key: &str) -> Option<CacheEntry> {
        let now = Utc::now();
        lock(&self.entries)
            .get(key)
            .filter(|entry| entry.is_retained_at(now, self.stale_retention))
            .cloned()
    }

    async fn store(&self, entry: CacheEntry) {
        lock(&self.entries).insert(entry.key.clone(), entry.clone());

        let Some(disk) = self.disk.clone() else {
            return;
        };
        let key = entry.key.clone();
        match tokio::task::spawn_blocking(move || disk.write(&entry)).await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => warn!(%key, error = %e, "failed to persist cache entry"),
            Err(e) => warn!(%key, error = %e, "cache write task failed"),
        }
    }
}

/// Cache shared by every request; cloning shares the same entries
pub struct CacheStore<E> {
    inner: Arc<StoreInner<E>>,
}

impl<E> Clone for CacheStore<E> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<E: FlightError> CacheStore<E> {
    /// Creates a store, loading every still-retained entry from `disk`
    pub fn new(disk: Option<CacheManager>, wait_timeout: Duration, stale_retention: Duration) -> Self {
        let stale_retention =
            chrono::Duration::from_std(stale_retention).unwrap_or_else(|_| chrono::Duration::days(7));
        let now = Utc::now();
        let entries: HashMap<String, CacheEntry> = disk
            .as_ref()
            .map(CacheManager::entries)
            .unwrap_or_default()
            .into_iter()
            .filter(|entry| entry.is_retained_at(now, stale_retention))
            .map(|entry| (entry.key.clone(), entry))
            .collect();
        if let Some(disk) = &disk {
            debug!(count = entries.len(), dir = %disk.dir().display(), "loaded cache entries");
        }

        Self {
            inner: Arc::new(StoreInner {
                entries: Mutex::new(entries),
                in_flight: Mutex::new(HashMap::new()),
                disk,
                wait_timeout,
                stale_retention,
            }),
        }
    }

    /// A store without durable backing
    pub fn in_memory(wait_timeout: Duration, stale_retention: Duration) -> Self {
        Self::new(None, wait_timeout, stale_retention)
    }

    /// The entry currently held for `key`, fresh or stale
    pub fn entry(&self, key: &str) -> Option<CacheEntry> {
        lock(&self.inner.entries).get(key).cloned()
    }

    /// Returns the fresh value for `key`, or runs `compute` to produce one.
    ///
    /// Concurrent callers for the same key share a single run of `compute`.
    /// The run continues as long as any caller still waits on it and is
    /// dropped once none do. Only callers joining an existing run are bounded
    /// by the wait timeout; the caller that starts it waits for `compute`,
    /// which carries its own network timeouts. Failures are never cached; when the policy is
    /// stale-tolerable, a retained expired value is returned in place of a
    /// failure that allows it.
    pub async fn get_or_compute<F, Fut>(
        &self,
        key: &str,
        policy: CachePolicy,
        compute: F,
    ) -> Result<Value, E>
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = Result<Value, E>> + Send + 'static,
    {
        if let Some(value) = self.inner.fresh(key) {
            debug!(key, "cache hit");
            return Ok(value);
        }

        let result = match self.join_or_start(key, policy, compute) {
            Lookup::Hit(value) => return Ok(value),
            Lookup::Started(flight) => flight.await,
            Lookup::Joined(flight) => {
                let wait = self.inner.wait_timeout;
                match tokio::time::timeout(wait, flight).await {
                    Ok(result) => result,
                    Err(_) => Err(E::from(CacheError::WaitTimedOut {
                        key: key.to_string(),
                        waited: wait,
                    })),
                }
            }
        };

        match result {
            Ok(value) => Ok(value),
            Err(err) if policy.stale_tolerable && err.allows_stale() => {
                match self.inner.stale(key) {
                    Some(entry) => {
                        warn!(key, error = %err, cached_at = %entry.cached_at, "serving stale cache entry");
                        Ok(entry.value)
                    }
                    None => Err(err),
                }
            }
            Err(err) => Err(err),
        }
    }

    fn join_or_start<F, Fut>(&self, key: &str, policy: CachePolicy, compute: F) -> Lookup<E>
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = Result<Value, E>> + Send + 'static,
    {
        let mut in_flight = lock(&self.inner.in_flight);

        // A flight may have completed between the first lookup and this lock
        if let Some(value) = self.inner.fresh(key) {
            return Lookup::Hit(value);
        }
        if let Some(flight) = in_flight.get(key).and_then(WeakShared::upgrade) {
            debug!(key, "joining in-flight computation");
            return Lookup::Joined(flight);
        }

        debug!(key, "cache miss");
        let inner = Arc::clone(&self.inner);
        let owned_key = key.to_string();
        let flight = async move {
            let result = compute().await;
            if let Ok(value) = &result {
                let entry = CacheEntry::new(
                    owned_key.clone(),
                    value.clone(),
                    policy.ttl,
                    policy.stale_tolerable,
                );
                inner.store(entry).await;
            }
            lock(&inner.in_flight).remove(&owned_key);
            result
        }
        .boxed()
        .shared();

        if let Some(weak) = flight.downgrade() {
            in_flight.insert(key.to_string(), weak);
        }
        Lookup::Started(flight)
    }

    /// Drops the entry for `key` from memory and disk
    pub fn invalidate(&self, key: &str) -> bool {
        let removed = lock(&self.inner.entries).remove(key).is_some();
        if let Some(disk) = &self.inner.disk {
            if let Err(e) = disk.delete(key) {
                warn!(key, error = %e, "failed to delete cache file");
            }
        }
        removed
    }

    /// Removes every entry that can no longer be served, fresh or stale.
    ///
    /// Returns how many distinct keys were dropped.
    pub fn purge_expired(&self) -> usize {
        let now = Utc::now();
        let retention = self.inner.stale_retention;
        let mut purged = HashSet::new();

        lock(&self.inner.entries).retain(|key, entry| {
            let keep = entry.is_retained_at(now, retention);
            if !keep {
                purged.insert(key.clone());
            }
            keep
        });

        if let Some(disk) = &self.inner.disk {
            for entry in disk.entries() {
                if entry.is_retained_at(now, retention) {
                    continue;
                }
                match disk.delete(&entry.key) {
                    Ok(()) => {
                        purged.insert(entry.key);
                    }
                    Err(e) => warn!(key = %entry.key, error = %e, "failed to delete cache file"),
                }
            }
        }

        debug!(count = purged.len(), "purged expired cache entries");
        purged.len()
    }
}
