use std::collections::{HashMap, HashSet};
use std::time::Duration;

use async_trait::async_trait;
use moka::sync::Cache as MokaCache;

use super::CacheBackend;
use crate::error::CacheError;

/// In-process backend built on moka. Used when no external store is configured, and as the
/// backend for tests.
#[derive(Clone)]
pub struct MemoryCache {
    cache: MokaCache<(String, String), String>, // (namespace, id) -> stored text
}

impl MemoryCache {
    pub fn new(max_capacity: u64) -> Self {
        let cache = MokaCache::builder().max_capacity(max_capacity).build();
        Self { cache }
    }

    /// Entries expire `ttl` after being written.
    pub fn with_ttl(max_capacity: u64, ttl: Duration) -> Self {
        let cache = MokaCache::builder()
            .max_capacity(max_capacity)
            .time_to_live(ttl)
            .build();
        Self { cache }
    }

    /// Stored text for one entry, exactly as the backend holds it.
    pub fn raw(&self, namespace: &str, id: &str) -> Option<String> {
        self.cache.get(&(namespace.to_string(), id.to_string()))
    }
}

impl std::fmt::Debug for MemoryCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemoryCache")
            .field("cache", &"<moka cache>")
            .finish()
    }
}

#[async_trait]
impl CacheBackend for MemoryCache {
    async fn get_raw(
        &self,
        ids: &[String],
        namespace: &str,
    ) -> Result<HashMap<String, String>, CacheError> {
        Ok(ids
            .iter()
            .filter_map(|id| {
                self.raw(namespace, id)
                    .map(|value| (id.clone(), value))
            })
            .collect())
    }

    async fn set_raw(
        &self,
        entries: Vec<(String, String)>,
        namespace: &str,
    ) -> Result<(), CacheError> {
        for (id, value) in entries {
            self.cache.insert((namespace.to_string(), id), value);
        }
        Ok(())
    }

    async fn cached_ids(&self, namespace: &str) -> Result<HashSet<String>, CacheError> {
        self.cache.run_pending_tasks();
        Ok(self
            .cache
            .iter()
            .filter(|(key, _)| key.0 == namespace)
            .map(|(key, _)| key.1.clone())
            .collect())
    }

    fn name(&self) -> &'static str {
        "memory"
    }
}
