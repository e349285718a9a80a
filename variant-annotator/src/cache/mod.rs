use std::collections::{HashMap, HashSet};
use std::fmt::Debug;
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;
use tracing::warn;

use crate::error::CacheError;

pub mod memory;
pub mod postgres;
pub mod redis;

pub use memory::MemoryCache;
pub use postgres::PostgresCache;
pub use redis::RedisCache;

/// How a backend treats characters it cannot store. Whatever the policy, it is applied on both
/// write and read, so printable text always round-trips byte for byte.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SanitizePolicy {
    #[default]
    Preserve,
    /// Drop control characters other than tab, newline and carriage return.
    StripNonPrintable,
}

impl SanitizePolicy {
    pub fn apply(&self, value: String) -> String {
        match self {
            SanitizePolicy::Preserve => value,
            SanitizePolicy::StripNonPrintable => {
                if value.chars().any(is_stripped) {
                    value.chars().filter(|c| !is_stripped(*c)).collect()
                } else {
                    value
                }
            }
        }
    }
}

fn is_stripped(c: char) -> bool {
    c.is_control() && !matches!(c, '\t' | '\n' | '\r')
}

/// Raw storage for cache entries: `(namespace, id) -> text`. Backends only move strings around,
/// json handling and sanitization live in [`Cache`].
#[async_trait]
pub trait CacheBackend: Debug + Send + Sync {
    /// Return the stored text for every id that is present. Missing ids are absent.
    async fn get_raw(
        &self,
        ids: &[String],
        namespace: &str,
    ) -> Result<HashMap<String, String>, CacheError>;

    /// Store every pair, overwriting unconditionally.
    async fn set_raw(&self, entries: Vec<(String, String)>, namespace: &str)
        -> Result<(), CacheError>;

    /// All ids known in `namespace`, without reading their values.
    async fn cached_ids(&self, namespace: &str) -> Result<HashSet<String>, CacheError>;

    fn sanitize_policy(&self) -> SanitizePolicy {
        SanitizePolicy::Preserve
    }

    fn name(&self) -> &'static str;
}

/// Result of [`Cache::get`]. Entries that could not be decoded are reported in `corrupt`
/// instead of failing the whole read.
#[derive(Debug, Default)]
pub struct CacheHits {
    pub values: HashMap<String, Value>,
    pub corrupt: Vec<(String, CacheError)>,
}

/// Backend-agnostic cache used by annotators. Cloning is cheap and shares the backend.
#[derive(Debug, Clone)]
pub struct Cache {
    backend: Arc<dyn CacheBackend>,
}

impl Cache {
    pub fn new(backend: impl CacheBackend + 'static) -> Self {
        Self {
            backend: Arc::new(backend),
        }
    }

    pub fn from_arc(backend: Arc<dyn CacheBackend>) -> Self {
        Self { backend }
    }

    pub fn backend_name(&self) -> &'static str {
        self.backend.name()
    }

    /// Read the subset of `ids` present in `namespace`. With `as_json`, each stored string is
    /// decoded; one undecodable entry is reported in [`CacheHits::corrupt`] and the rest are
    /// still returned. Without it, values come back as json strings.
    pub async fn get(
        &self,
        ids: &[String],
        namespace: &str,
        as_json: bool,
    ) -> Result<CacheHits, CacheError> {
        let mut hits = CacheHits::default();
        if ids.is_empty() {
            return Ok(hits);
        }

        let policy = self.backend.sanitize_policy();
        for (id, raw) in self.backend.get_raw(ids, namespace).await? {
            let raw = policy.apply(raw);
            if !as_json {
                hits.values.insert(id, Value::String(raw));
                continue;
            }
            match serde_json::from_str(&raw) {
                Ok(value) => {
                    hits.values.insert(id, value);
                }
                Err(error) => {
                    warn!(
                        namespace,
                        id = id.as_str(),
                        backend = self.backend.name(),
                        "could not decode cached value: {}",
                        error
                    );
                    hits.corrupt
                        .push((id.clone(), CacheError::Deserialize { key: id, error }));
                }
            }
        }
        Ok(hits)
    }

    /// Write every entry of `data` into `namespace`, replacing what was there. With `as_json`
    /// values are serialized first; without it every value must be a json string.
    pub async fn set(
        &self,
        data: &HashMap<String, Value>,
        namespace: &str,
        as_json: bool,
    ) -> Result<(), CacheError> {
        if data.is_empty() {
            return Ok(());
        }

        let policy = self.backend.sanitize_policy();
        let mut entries = Vec::with_capacity(data.len());
        for (id, value) in data {
            let raw = if as_json {
                serde_json::to_string(value).map_err(|error| CacheError::Serialize {
                    key: id.clone(),
                    error,
                })?
            } else {
                match value {
                    Value::String(s) => s.clone(),
                    _ => return Err(CacheError::NotText { key: id.clone() }),
                }
            };
            entries.push((id.clone(), policy.apply(raw)));
        }

        self.backend.set_raw(entries, namespace).await
    }

    pub async fn get_cached_ids(&self, namespace: &str) -> Result<HashSet<String>, CacheError> {
        self.backend.cached_ids(namespace).await
    }
}
