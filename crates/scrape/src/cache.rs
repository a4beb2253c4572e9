// ABOUTME: Cache-or-compute layer over a pluggable key-value store.
// ABOUTME: Keys are sha256 digests of namespace, URL, and the option map, base64url encoded.

//! Result caching.
//!
//! The engine caches serialized scrape records under a digest of the request.
//! The store is a trait so callers can plug Redis or anything else in; the
//! in-memory store is the default and what the tests use. Store failures are
//! deliberately soft: a cache that errors behaves like a cache that misses.

use std::collections::{BTreeMap, HashMap};
use std::sync::Mutex;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use sha2::{Digest, Sha256};

/// Backend for cached values and rate-limit windows.
#[async_trait]
pub trait KeyValueStore: Send + Sync {
    async fn get(&self, key: &str) -> anyhow::Result<Option<String>>;
    async fn set(&self, key: &str, value: &str, ttl: Duration) -> anyhow::Result<()>;
    async fn delete(&self, key: &str) -> anyhow::Result<()>;
}

/// Process-local store with per-entry expiry. Expired entries are dropped
/// lazily on read.
#[derive(Default)]
pub struct MemoryStore {
    entries: Mutex<HashMap<String, (String, Instant)>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl KeyValueStore for MemoryStore {
    async fn get(&self, key: &str) -> anyhow::Result<Option<String>> {
        let mut entries = self
            .entries
            .lock()
            .map_err(|_| anyhow::anyhow!("store mutex poisoned"))?;
        match entries.get(key) {
            Some((_, expires)) if *expires <= Instant::now() => {
                entries.remove(key);
                Ok(None)
            }
            Some((value, _)) => Ok(Some(value.clone())),
            None => Ok(None),
        }
    }

    async fn set(&self, key: &str, value: &str, ttl: Duration) -> anyhow::Result<()> {
        let mut entries = self
            .entries
            .lock()
            .map_err(|_| anyhow::anyhow!("store mutex poisoned"))?;
        // A TTL too large to represent never expires within the process.
        let expires = Instant::now()
            .checked_add(ttl)
            .unwrap_or_else(|| Instant::now() + Duration::from_secs(u32::MAX as u64));
        entries.insert(key.to_string(), (value.to_string(), expires));
        Ok(())
    }

    async fn delete(&self, key: &str) -> anyhow::Result<()> {
        let mut entries = self
            .entries
            .lock()
            .map_err(|_| anyhow::anyhow!("store mutex poisoned"))?;
        entries.remove(key);
        Ok(())
    }
}

/// Deterministic cache key for a request.
///
/// Params arrive in a BTreeMap so the digest input is order-independent:
/// the same options always produce the same key no matter how the caller
/// assembled them.
pub fn cache_key(namespace: &str, url: &str, params: &BTreeMap<String, serde_json::Value>) -> String {
    let mut input = String::new();
    input.push_str(namespace);
    input.push(':');
    input.push_str(url);
    for (k, v) in params {
        input.push('|');
        input.push_str(k);
        input.push(':');
        input.push_str(&v.to_string());
    }
    let digest = Sha256::digest(input.as_bytes());
    URL_SAFE_NO_PAD.encode(digest)
}

/// Read a cached value. A store error logs and reads as a miss.
pub async fn cache_get(store: &dyn KeyValueStore, key: &str) -> Option<String> {
    match store.get(key).await {
        Ok(value) => value,
        Err(err) => {
            tracing::warn!(key, error = %err, "cache read failed, treating as miss");
            None
        }
    }
}

/// Write a value through to the cache. A store error logs and is dropped;
/// the scrape result is still returned to the caller.
pub async fn cache_set(store: &dyn KeyValueStore, key: &str, value: &str, ttl: Duration) {
    if let Err(err) = store.set(key, value, ttl).await {
        tracing::warn!(key, error = %err, "cache write failed, result not cached");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[tokio::test]
    async fn memory_store_round_trips_values() {
        let store = MemoryStore::new();
        store
            .set("k", "v", Duration::from_secs(60))
            .await
            .unwrap();
        assert_eq!(store.get("k").await.unwrap().as_deref(), Some("v"));
        store.delete("k").await.unwrap();
        assert_eq!(store.get("k").await.unwrap(), None);
    }

    #[tokio::test]
    async fn memory_store_accepts_oversized_ttl() {
        let store = MemoryStore::new();
        store
            .set("k", "v", Duration::from_secs(u64::MAX))
            .await
            .unwrap();
        assert_eq!(store.get("k").await.unwrap().as_deref(), Some("v"));
    }

    #[tokio::test]
    async fn memory_store_expires_entries() {
        let store = MemoryStore::new();
        store.set("k", "v", Duration::ZERO).await.unwrap();
        assert_eq!(store.get("k").await.unwrap(), None);
    }

    #[test]
    fn cache_key_is_deterministic_and_param_sensitive() {
        let mut params = BTreeMap::new();
        params.insert("timeout".to_string(), serde_json::json!(30000));
        params.insert("contentType".to_string(), serde_json::json!("news"));

        let a = cache_key("scrape", "https://example.com/x", &params);
        let b = cache_key("scrape", "https://example.com/x", &params);
        assert_eq!(a, b);

        params.insert("timeout".to_string(), serde_json::json!(5000));
        let c = cache_key("scrape", "https://example.com/x", &params);
        assert_ne!(a, c);
    }

    #[test]
    fn cache_key_varies_with_url_and_namespace() {
        let params = BTreeMap::new();
        let a = cache_key("scrape", "https://example.com/x", &params);
        let b = cache_key("scrape", "https://example.com/y", &params);
        let c = cache_key("other", "https://example.com/x", &params);
        assert_ne!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn cache_key_is_url_safe() {
        let params = BTreeMap::new();
        let key = cache_key("scrape", "https://example.com/x?q=1&r=2", &params);
        assert!(key
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_'));
    }

    #[tokio::test]
    async fn failing_store_reads_as_miss_and_swallows_writes() {
        struct Broken;
        #[async_trait]
        impl KeyValueStore for Broken {
            async fn get(&self, _: &str) -> anyhow::Result<Option<String>> {
                anyhow::bail!("connection refused")
            }
            async fn set(&self, _: &str, _: &str, _: Duration) -> anyhow::Result<()> {
                anyhow::bail!("connection refused")
            }
            async fn delete(&self, _: &str) -> anyhow::Result<()> {
                anyhow::bail!("connection refused")
            }
        }
        let store = Broken;
        assert_eq!(cache_get(&store, "k").await, None);
        cache_set(&store, "k", "v", Duration::from_secs(1)).await;
    }
}
