use std::collections::{HashMap, HashSet};

use async_trait::async_trait;
use redis::RedisError;

use super::CacheBackend;
use crate::error::CacheError;

const SCAN_COUNT: usize = 1000;

#[async_trait]
pub trait RedisClientOperations: Send + Sync {
    async fn get_keys(&self, keys: &[String]) -> Result<Vec<Option<String>>, RedisError>;
    async fn set_keys(&self, updates: &[(String, String)], ttl: Option<u64>)
        -> Result<(), RedisError>;
    async fn scan_keys(&self, pattern: &str) -> Result<Vec<String>, RedisError>;
}

#[derive(Clone)]
pub struct RedisCacheClient {
    conn: redis::aio::ConnectionManager,
}

impl RedisCacheClient {
    pub async fn new(client: redis::Client) -> Result<Self, RedisError> {
        let conn = redis::aio::ConnectionManager::new(client).await?;
        Ok(Self { conn })
    }
}

#[async_trait]
impl RedisClientOperations for RedisCacheClient {
    async fn get_keys(&self, keys: &[String]) -> Result<Vec<Option<String>>, RedisError> {
        let mut conn = self.conn.clone();
        redis::cmd("MGET").arg(keys).query_async(&mut conn).await
    }

    async fn set_keys(
        &self,
        updates: &[(String, String)],
        ttl: Option<u64>,
    ) -> Result<(), RedisError> {
        if updates.is_empty() {
            return Ok(());
        }

        let mut pipe = redis::pipe();
        for (key, value) in updates {
            match ttl {
                Some(ttl) => pipe.set_ex(key, value, ttl),
                None => pipe.set(key, value),
            };
        }

        let mut conn = self.conn.clone();
        let _: () = pipe.query_async(&mut conn).await?;
        Ok(())
    }

    async fn scan_keys(&self, pattern: &str) -> Result<Vec<String>, RedisError> {
        let mut conn = self.conn.clone();
        let mut keys = Vec::new();
        let mut cursor: u64 = 0;
        loop {
            let (next, batch): (u64, Vec<String>) = redis::cmd("SCAN")
                .arg(cursor)
                .arg("MATCH")
                .arg(pattern)
                .arg("COUNT")
                .arg(SCAN_COUNT)
                .query_async(&mut conn)
                .await?;
            keys.extend(batch);
            if next == 0 {
                return Ok(keys);
            }
            cursor = next;
        }
    }
}

/// Key-value backend. Entries live under `"{namespace}:{id}"`.
#[derive(Clone)]
pub struct RedisCache<T: RedisClientOperations + Clone = RedisCacheClient> {
    client: T,
    ttl: Option<u64>,
}

impl<T: RedisClientOperations + Clone> RedisCache<T> {
    pub fn new(client: T, ttl: Option<u64>) -> Self {
        Self { client, ttl }
    }
}

impl RedisCache<RedisCacheClient> {
    pub async fn new_redis(client: redis::Client, ttl: Option<u64>) -> Result<Self, RedisError> {
        let redis_client = RedisCacheClient::new(client).await?;
        Ok(Self::new(redis_client, ttl))
    }
}

impl<T: RedisClientOperations + Clone> std::fmt::Debug for RedisCache<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RedisCache").field("ttl", &self.ttl).finish()
    }
}

// Ids may contain ':' but namespaces may not, so every key splits at its first ':'.
fn make_key(namespace: &str, id: &str) -> String {
    format!("{namespace}:{id}")
}

fn check_namespace(namespace: &str) -> Result<(), CacheError> {
    if namespace.contains(':') {
        return Err(CacheError::InvalidNamespace {
            namespace: namespace.to_string(),
        });
    }
    Ok(())
}

// SCAN MATCH is a glob, so the namespace must not be read as one.
fn namespace_pattern(namespace: &str) -> String {
    let mut pattern = String::with_capacity(namespace.len() + 2);
    for c in namespace.chars() {
        if matches!(c, '*' | '?' | '[' | ']' | '\\') {
            pattern.push('\\');
        }
        pattern.push(c);
    }
    pattern.push_str(":*");
    pattern
}

#[async_trait]
impl<T: RedisClientOperations + Clone> CacheBackend for RedisCache<T> {
    async fn get_raw(
        &self,
        ids: &[String],
        namespace: &str,
    ) -> Result<HashMap<String, String>, CacheError> {
        check_namespace(namespace)?;
        if ids.is_empty() {
            return Ok(HashMap::new());
        }

        let keys: Vec<String> = ids.iter().map(|id| make_key(namespace, id)).collect();
        let values = self.client.get_keys(&keys).await?;

        Ok(ids
            .iter()
            .zip(values)
            .filter_map(|(id, value)| value.map(|v| (id.clone(), v)))
            .collect())
    }

    async fn set_raw(
        &self,
        entries: Vec<(String, String)>,
        namespace: &str,
    ) -> Result<(), CacheError> {
        check_namespace(namespace)?;
        let updates: Vec<(String, String)> = entries
            .into_iter()
            .map(|(id, value)| (make_key(namespace, &id), value))
            .collect();
        self.client
            .set_keys(&updates, self.ttl)
            .await
            .map_err(CacheError::from)
    }

    async fn cached_ids(&self, namespace: &str) -> Result<HashSet<String>, CacheError> {
        check_namespace(namespace)?;
        let prefix = make_key(namespace, "");
        let keys = self.client.scan_keys(&namespace_pattern(namespace)).await?;
        Ok(keys
            .into_iter()
            .filter_map(|key| key.strip_prefix(&prefix).map(str::to_string))
            .collect())
    }

    fn name(&self) -> &'static str {
        "redis"
    }
}
