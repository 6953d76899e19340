// src/cache.rs
use ahash::AHashMap;
use std::hash::Hasher;
use std::sync::Mutex;
use std::time::{Duration, Instant};
use twox_hash::XxHash64;

use crate::core::types::SearchOptions;
use crate::screener::SearchHit;

/// Cached responses expire after this long.
pub const DEFAULT_TTL: Duration = Duration::from_secs(15 * 60);

/// Deterministic key over everything that shapes a search response. XxHash64
/// with a fixed seed over the bincode encoding, so the same query always maps
/// to the same key across processes.
pub fn cache_key(input: &str, count: usize, options: &SearchOptions) -> u64 {
    let encoded = bincode::serialize(&(input, count as u64, options))
        .expect("search options always encode");
    let mut hasher = XxHash64::with_seed(0);
    hasher.write(&encoded);
    hasher.finish()
}

struct CacheEntry {
    stored_at: Instant,
    hits: Vec<SearchHit>,
}

/// In-process response cache for search calls. Purely an optimization:
/// correctness never depends on it, and a refresh clears it wholesale.
pub struct SearchCache {
    entries: Mutex<AHashMap<u64, CacheEntry>>,
    ttl: Duration,
}

impl SearchCache {
    pub fn new() -> Self {
        Self::with_ttl(DEFAULT_TTL)
    }

    pub fn with_ttl(ttl: Duration) -> Self {
        Self {
            entries: Mutex::new(AHashMap::new()),
            ttl,
        }
    }

    /// Returns the cached response for `key` unless it has expired; expired
    /// entries are dropped on the way out.
    pub fn get(&self, key: u64) -> Option<Vec<SearchHit>> {
        let mut entries = self.entries.lock().expect("cache lock poisoned");

        match entries.get(&key) {
            Some(entry) if entry.stored_at.elapsed() < self.ttl => Some(entry.hits.clone()),
            Some(_) => {
                entries.remove(&key);
                None
            }
            None => None,
        }
    }

    pub fn insert(&self, key: u64, hits: Vec<SearchHit>) {
        let mut entries = self.entries.lock().expect("cache lock poisoned");
        entries.insert(
            key,
            CacheEntry {
                stored_at: Instant::now(),
                hits,
            },
        );
    }

    pub fn clear(&self) {
        self.entries.lock().expect("cache lock poisoned").clear();
    }
}

impl Default for SearchCache {
    fn default() -> Self {
        Self::new()
    }
}
