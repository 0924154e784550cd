//! Shared TTL cache.
//!
//! Thin wrapper over a moka future cache where every entry carries its own
//! time-to-live. Reads double-check `expires_at`, so an expired entry is
//! never served even if eviction hasn't caught up yet.

use moka::future::Cache;
use moka::Expiry;
use serde::Serialize;
use sha2::{Digest, Sha256};
use std::time::{Duration, Instant};

/// TTL category for cached provider results.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum CacheCategory {
    /// Business registries (Secretary of State, licensing boards)
    Registry,
    /// Chamber and trade association directories
    Association,
    /// Email and contact discovery
    Contact,
}

#[derive(Debug, Clone, Copy)]
pub struct CacheTtls {
    pub registry: Duration,
    pub association: Duration,
    pub contact: Duration,
}

impl CacheTtls {
    pub fn for_category(&self, category: CacheCategory) -> Duration {
        match category {
            CacheCategory::Registry => self.registry,
            CacheCategory::Association => self.association,
            CacheCategory::Contact => self.contact,
        }
    }
}

impl Default for CacheTtls {
    fn default() -> Self {
        Self {
            registry: Duration::from_secs(24 * 3600),
            association: Duration::from_secs(7 * 24 * 3600),
            contact: Duration::from_secs(24 * 3600),
        }
    }
}

#[derive(Debug, Clone)]
pub struct CacheEntry<V> {
    pub value: V,
    pub expires_at: Instant,
    ttl: Duration,
}

struct PerEntryTtl;

impl<V> Expiry<String, CacheEntry<V>> for PerEntryTtl {
    fn expire_after_create(
        &self,
        _key: &String,
        value: &CacheEntry<V>,
        _created_at: Instant,
    ) -> Option<Duration> {
        Some(value.ttl)
    }

    fn expire_after_update(
        &self,
        _key: &String,
        value: &CacheEntry<V>,
        _updated_at: Instant,
        _duration_until_expiry: Option<Duration>,
    ) -> Option<Duration> {
        Some(value.ttl)
    }
}

/// Key-value cache with per-entry expiry. Cloning shares the underlying store.
#[derive(Clone)]
pub struct TtlCache<V: Clone + Send + Sync + 'static> {
    inner: Cache<String, CacheEntry<V>>,
}

impl<V: Clone + Send + Sync + 'static> TtlCache<V> {
    pub fn new(max_capacity: u64) -> Self {
        let inner = Cache::builder()
            .max_capacity(max_capacity)
            .expire_after(PerEntryTtl)
            .build();
        Self { inner }
    }

    /// Returns the value if present and not yet expired.
    pub async fn get(&self, key: &str) -> Option<V> {
        let entry = self.inner.get(key).await?;
        if Instant::now() >= entry.expires_at {
            self.inner.invalidate(key).await;
            return None;
        }
        Some(entry.value)
    }

    /// Stores a value. A zero TTL is a no-op since the entry would already be expired.
    pub async fn set(&self, key: String, value: V, ttl: Duration) {
        if ttl.is_zero() {
            return;
        }
        let entry = CacheEntry {
            value,
            expires_at: Instant::now() + ttl,
            ttl,
        };
        self.inner.insert(key, entry).await;
    }

    pub async fn invalidate(&self, key: &str) {
        self.inner.invalidate(key).await;
    }
}

fn normalize_part(part: &str) -> String {
    part.split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

/// Stable cache key over normalized parts (trimmed, lowercased, whitespace
/// collapsed). Punctuation is kept, so "Spa & Wellness" and "Spa and
/// Wellness" are different keys.
pub fn fingerprint(parts: &[&str]) -> String {
    let mut hasher = Sha256::new();
    for part in parts {
        hasher.update(normalize_part(part).as_bytes());
        hasher.update([0x1f]);
    }
    hex::encode(hasher.finalize())
}
