//! Get-or-compute caching over an optional key/value backend.
//!
//! The backend is injected as a [`CacheBackend`] trait object. When no real
//! store is configured the [`NoopCache`] backend is used and every call goes
//! straight to the producer; the orchestrator itself never special-cases it.

use std::collections::HashMap;
use std::fmt::Display;
use std::future::Future;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Serialize;
use tokio::time::Instant;

use crate::error::TsumugiError;

/// Key/value store used by [`CacheOrchestrator`]. Values are JSON strings.
#[async_trait]
pub trait CacheBackend: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<String>, TsumugiError>;

    async fn set(&self, key: &str, value: String, ttl: Duration) -> Result<(), TsumugiError>;
}

/// Backend that stores nothing.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopCache;

#[async_trait]
impl CacheBackend for NoopCache {
    async fn get(&self, _key: &str) -> Result<Option<String>, TsumugiError> {
        Ok(None)
    }

    async fn set(&self, _key: &str, _value: String, _ttl: Duration) -> Result<(), TsumugiError> {
        Ok(())
    }
}

/// In-process backend with per-entry expiry. Expired entries are dropped
/// on read and swept on every write.
#[derive(Debug, Default)]
pub struct MemoryCache {
    entries: Mutex<HashMap<String, (String, Instant)>>,
}

impl MemoryCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.lock().map(|entries| entries.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn lock(
        &self,
    ) -> Result<std::sync::MutexGuard<'_, HashMap<String, (String, Instant)>>, TsumugiError> {
        self.entries
            .lock()
            .map_err(|_| TsumugiError::Cache("memory cache lock poisoned".into()))
    }
}

#[async_trait]
impl CacheBackend for MemoryCache {
    async fn get(&self, key: &str) -> Result<Option<String>, TsumugiError> {
        let mut entries = self.lock()?;
        match entries.get(key) {
            Some((value, expires_at)) if Instant::now() < *expires_at => Ok(Some(value.clone())),
            Some(_) => {
                entries.remove(key);
                Ok(None)
            }
            None => Ok(None),
        }
    }

    async fn set(&self, key: &str, value: String, ttl: Duration) -> Result<(), TsumugiError> {
        let now = Instant::now();
        let mut entries = self.lock()?;
        entries.retain(|_, (_, expires_at)| now < *expires_at);
        entries.insert(key.to_string(), (value, now + ttl));
        Ok(())
    }
}

/// Wraps async producers with a get-or-compute-and-store policy.
#[derive(Clone)]
pub struct CacheOrchestrator {
    backend: Arc<dyn CacheBackend>,
}

impl std::fmt::Debug for CacheOrchestrator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CacheOrchestrator").finish_non_exhaustive()
    }
}

impl CacheOrchestrator {
    pub fn new(backend: Arc<dyn CacheBackend>) -> Self {
        Self { backend }
    }

    /// Orchestrator over [`NoopCache`]: every call invokes the producer.
    pub fn disabled() -> Self {
        Self::new(Arc::new(NoopCache))
    }

    /// Return the cached value under `key`, or run `producer`, store its
    /// result for `ttl` and return it.
    ///
    /// The producer runs at most once per call and only on a miss. Producer
    /// errors are returned as-is and nothing is stored. Backend faults are
    /// logged and treated as a miss (on read) or ignored (on write).
    pub async fn fetch<T, E, F, Fut>(&self, key: &str, ttl: Duration, producer: F) -> Result<T, E>
    where
        T: Serialize + DeserializeOwned,
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        match self.backend.get(key).await {
            Ok(Some(raw)) => match serde_json::from_str::<T>(&raw) {
                Ok(value) => {
                    tracing::debug!(key, "cache hit");
                    return Ok(value);
                }
                Err(e) => tracing::warn!(key, error = %e, "discarding undecodable cache entry"),
            },
            Ok(None) => tracing::debug!(key, "cache miss"),
            Err(e) => tracing::warn!(key, error = %e, "cache read failed, computing"),
        }

        let value = producer().await?;

        match serde_json::to_string(&value) {
            Ok(raw) => {
                if let Err(e) = self.backend.set(key, raw, ttl).await {
                    tracing::warn!(key, error = %e, "cache write failed");
                } else {
                    tracing::debug!(key, ttl_secs = ttl.as_secs(), "cache store");
                }
            }
            Err(e) => tracing::warn!(key, error = %e, "value not serializable, skipping cache"),
        }

        Ok(value)
    }
}

/// Build a composite key: `namespace;part1;part2;...`.
pub fn cache_key(namespace: &str, parts: &[&dyn Display]) -> String {
    let mut key = namespace.to_string();
    for part in parts {
        key.push(';');
        key.push_str(&part.to_string());
    }
    key
}

/// TTLs per endpoint family.
pub mod ttl {
    use std::time::Duration;

    use chrono::Weekday;

    /// Trending/popular aggregate lists.
    pub const AGGREGATE: Duration = Duration::from_secs(60 * 60);

    /// Watch/source resolution results.
    pub const WATCH: Duration = Duration::from_secs(600);

    const EPISODE_WEEKDAY: Duration = Duration::from_secs(60 * 60 / 2);
    const EPISODE_WEEKEND: Duration = Duration::from_secs(60 * 120);

    /// Per-title episode/info data lives longer on weekends.
    pub fn episodes(day: Weekday) -> Duration {
        match day {
            Weekday::Sat | Weekday::Sun => EPISODE_WEEKEND,
            _ => EPISODE_WEEKDAY,
        }
    }
}
