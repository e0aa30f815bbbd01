//! Response caching with LRU eviction and a TTL stamp

use lru::LruCache;
use std::num::NonZeroUsize;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

const FALLBACK_CAPACITY: usize = 64;

/// Keyed cache for computed responses. Values are shared as `Arc` so a hit
/// never clones the payload; entries older than the TTL read as misses and
/// are dropped on access.
pub struct ResponseCache<V> {
    entries: Mutex<LruCache<String, (Instant, Arc<V>)>>,
    ttl: Duration,
}

impl<V> ResponseCache<V> {
    pub fn new(capacity: usize, ttl: Duration) -> Self {
        let capacity = NonZeroUsize::new(capacity)
            .unwrap_or_else(|| NonZeroUsize::new(FALLBACK_CAPACITY).unwrap());
        Self {
            entries: Mutex::new(LruCache::new(capacity)),
            ttl,
        }
    }

    pub fn get(&self, key: &str) -> Option<Arc<V>> {
        let mut entries = self.entries.lock().unwrap();
        let expired = match entries.get(key) {
            Some((stamp, value)) => {
                if stamp.elapsed() < self.ttl {
                    return Some(Arc::clone(value));
                }
                true
            }
            None => false,
        };
        if expired {
            entries.pop(key);
        }
        None
    }

    pub fn set(&self, key: impl Into<String>, value: V) -> Arc<V> {
        let value = Arc::new(value);
        self.entries
            .lock()
            .unwrap()
            .put(key.into(), (Instant::now(), Arc::clone(&value)));
        value
    }

    pub fn len(&self) -> usize {
        self.entries.lock().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
