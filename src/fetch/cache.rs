use crate::query::ProductQuery;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt::{Display, Formatter};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;

pub const PRODUCTS_PREFIX: &str = "products:";
pub const CATEGORIES_PREFIX: &str = "categories:";

/// Order independent identity of a request, derived from its parameters.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CacheKey(String);

impl CacheKey {
    pub fn products(query: &ProductQuery) -> Self {
        let params = query
            .pairs()
            .into_iter()
            .map(|(name, value)| format!("{name}={value}"))
            .collect::<Vec<_>>()
            .join("&");
        CacheKey(format!("{PRODUCTS_PREFIX}{params}"))
    }

    pub fn categories(with_count: bool) -> Self {
        let variant = if with_count { "with-count" } else { "all" };
        CacheKey(format!("{CATEGORIES_PREFIX}{variant}"))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_products(&self) -> bool {
        self.0.starts_with(PRODUCTS_PREFIX)
    }
}

impl Display for CacheKey {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone)]
struct CacheEntry<T> {
    data: T,
    created_at: Instant,
    ttl: Duration,
}

impl<T> CacheEntry<T> {
    fn new(data: T, ttl: Duration) -> Self {
        Self {
            data,
            created_at: Instant::now(),
            ttl,
        }
    }

    fn is_expired(&self) -> bool {
        self.created_at.elapsed() >= self.ttl
    }
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheStats {
    pub entries: usize,
    pub hits: u64,
    pub misses: u64,
}

/// In-memory TTL cache. Cloning shares the underlying storage.
#[derive(Debug, Clone)]
pub struct MemoryCache<T> {
    entries: Arc<RwLock<HashMap<CacheKey, CacheEntry<T>>>>,
    hits: Arc<AtomicU64>,
    misses: Arc<AtomicU64>,
}

impl<T> Default for MemoryCache<T> {
    fn default() -> Self {
        Self {
            entries: Arc::new(RwLock::new(HashMap::new())),
            hits: Arc::new(AtomicU64::new(0)),
            misses: Arc::new(AtomicU64::new(0)),
        }
    }
}

impl<T: Clone> MemoryCache<T> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &CacheKey) -> Option<T> {
        let entries = self.entries.read();
        match entries.get(key) {
            Some(entry) if !entry.is_expired() => {
                self.hits.fetch_add(1, Ordering::Relaxed);
                Some(entry.data.clone())
            }
            Some(_) => {
                drop(entries);
                self.entries.write().remove(key);
                self.misses.fetch_add(1, Ordering::Relaxed);
                None
            }
            None => {
                self.misses.fetch_add(1, Ordering::Relaxed);
                None
            }
        }
    }

    pub fn set_with_ttl(&self, key: CacheKey, value: T, ttl: Duration) {
        self.entries.write().insert(key, CacheEntry::new(value, ttl));
    }

    pub fn remove(&self, key: &CacheKey) {
        self.entries.write().remove(key);
    }

    /// Keeps only the entries whose key satisfies `keep`. Returns how many
    /// were dropped.
    pub fn retain<P>(&self, mut keep: P) -> usize
    where
        P: FnMut(&CacheKey) -> bool,
    {
        let mut entries = self.entries.write();
        let before = entries.len();
        entries.retain(|key, _| keep(key));
        before - entries.len()
    }

    pub fn clear(&self) {
        self.entries.write().clear();
    }

    pub fn cleanup_expired(&self) -> usize {
        let mut entries = self.entries.write();
        let before = entries.len();
        entries.retain(|_, entry| !entry.is_expired());
        before - entries.len()
    }

    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            entries: self.len(),
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::time::sleep;

    fn key(name: &str) -> CacheKey {
        CacheKey(format!("{PRODUCTS_PREFIX}{name}"))
    }

    #[tokio::test(start_paused = true)]
    async fn memory_cache_basic_operations() {
        let cache = MemoryCache::new();
        cache.set_with_ttl(key("a"), "value".to_string(), Duration::from_secs(1));
        assert_eq!(cache.get(&key("a")), Some("value".to_string()));
        assert_eq!(cache.get(&key("missing")), None);
        cache.remove(&key("a"));
        assert_eq!(cache.get(&key("a")), None);
        assert_eq!(
            cache.stats(),
            CacheStats {
                entries: 0,
                hits: 1,
                misses: 2
            }
        );
    }

    #[tokio::test(start_paused = true)]
    async fn memory_cache_expiration() {
        let cache = MemoryCache::new();
        cache.set_with_ttl(key("a"), 1, Duration::from_secs(30));
        sleep(Duration::from_secs(29)).await;
        assert_eq!(cache.get(&key("a")), Some(1));
        sleep(Duration::from_secs(1)).await;
        assert_eq!(cache.get(&key("a")), None);
        assert!(cache.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn cleanup_expired_works() {
        let cache = MemoryCache::new();
        cache.set_with_ttl(key("short"), 1, Duration::from_secs(30));
        cache.set_with_ttl(key("long"), 2, Duration::from_secs(300));
        sleep(Duration::from_secs(60)).await;
        assert_eq!(cache.cleanup_expired(), 1);
        assert_eq!(cache.get(&key("long")), Some(2));
    }

    #[tokio::test]
    async fn retain_drops_matching_keys() {
        let cache = MemoryCache::new();
        cache.set_with_ttl(key("a"), 1, Duration::from_secs(60));
        cache.set_with_ttl(CacheKey::categories(true), 2, Duration::from_secs(60));
        let dropped = cache.retain(|key| !key.is_products());
        assert_eq!(dropped, 1);
        assert_eq!(cache.get(&CacheKey::categories(true)), Some(2));
    }

    #[test]
    fn products_key_is_sorted_by_name() {
        let query = ProductQuery {
            search: Some("lamp".to_string()),
            category_id: Some("furniture".to_string()),
            ..Default::default()
        };
        assert_eq!(
            CacheKey::products(&query).to_string(),
            "products:category_id=furniture&page=1&per_page=12&search=lamp&sort_by=created_at&sort_order=desc&status=available"
                .to_string()
        );
    }
}
