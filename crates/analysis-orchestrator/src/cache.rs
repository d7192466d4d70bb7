use chrono::{DateTime, Duration, Utc};
use dashmap::DashMap;

/// Internal cache entry with timestamp
struct CacheEntry<V> {
    data: V,
    cached_at: DateTime<Utc>,
}

/// Concurrent key/value cache whose entries expire after a fixed TTL.
///
/// Expired entries are treated as misses and dropped lazily on lookup.
pub struct TtlCache<V> {
    entries: DashMap<String, CacheEntry<V>>,
    ttl: Duration,
}

impl<V: Clone> TtlCache<V> {
    pub fn new(ttl_secs: u64) -> Self {
        Self::with_ttl(Duration::seconds(ttl_secs.min(i64::MAX as u64) as i64))
    }

    pub fn with_ttl(ttl: Duration) -> Self {
        Self {
            entries: DashMap::new(),
            ttl,
        }
    }

    pub fn get(&self, key: &str) -> Option<V> {
        match self.entries.get(key) {
            Some(entry) if Utc::now() - entry.cached_at < self.ttl => return Some(entry.data.clone()),
            Some(_) => {}
            None => return None,
        }
        // Read guard is released here; a concurrent refresh must survive
        self.entries
            .remove_if(key, |_, entry| Utc::now() - entry.cached_at >= self.ttl);
        None
    }

    pub fn insert(&self, key: impl Into<String>, data: V) {
        self.entries.insert(
            key.into(),
            CacheEntry {
                data,
                cached_at: Utc::now(),
            },
        );
    }

    pub fn invalidate(&self, key: &str) {
        self.entries.remove(key);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Drop every expired entry
    pub fn purge_expired(&self) {
        let now = Utc::now();
        self.entries.retain(|_, entry| now - entry.cached_at < self.ttl);
    }
}
