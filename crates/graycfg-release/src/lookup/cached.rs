use std::num::NonZeroUsize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use graycfg_core::{watch_key, Release, ReleaseId, ReleaseMessage, Result, NO_NOTIFICATION_ID, WATCH_KEY_SEPARATOR};
use lru::LruCache;
use parking_lot::Mutex;
use tracing::debug;

use crate::{ReleaseLookup, ReleaseStore};

#[derive(Debug, Clone)]
struct CacheEntry {
    release: Option<Arc<Release>>,
    /// Highest release message id this entry is known to reflect
    notification_id: i64,
}

/// Counters for the cached lookup
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReleaseCacheStats {
    pub hits: u64,
    pub misses: u64,
    pub invalidations: u64,
}

impl ReleaseCacheStats {
    pub fn hit_rate(&self) -> f64 {
        if self.hits + self.misses == 0 {
            0.0
        } else {
            self.hits as f64 / (self.hits + self.misses) as f64
        }
    }
}

/// Release lookup backed by a cache that release messages keep fresh.
///
/// Latest-active releases are cached per watch key (`app+cluster+namespace`)
/// together with the newest message id seen for that key. A request whose
/// notification id is newer than the cached entry bypasses the cache, which
/// covers messages that reached the client before they reached this process.
/// Releases fetched by id (gray releases) live in a separate LRU and are
/// evicted whenever their watch key receives a message.
///
/// Watch keys come from client requests, so the cached entries and the
/// message ids remembered per key are both bounded LRUs.
pub struct CachedReleaseLookup {
    store: Arc<dyn ReleaseStore>,
    by_watch_key: Mutex<LruCache<String, CacheEntry>>,
    by_id: Mutex<LruCache<ReleaseId, Arc<Release>>>,
    // Locked before `by_watch_key` whenever both are held.
    latest_message_ids: Mutex<LruCache<String, i64>>,
    hits: AtomicU64,
    misses: AtomicU64,
    invalidations: AtomicU64,
}

fn capacity(max: usize) -> NonZeroUsize {
    NonZeroUsize::new(max).unwrap_or(NonZeroUsize::MIN)
}

impl CachedReleaseLookup {
    pub fn new(store: Arc<dyn ReleaseStore>, max_watch_keys: usize, max_releases_by_id: usize) -> Self {
        Self {
            store,
            by_watch_key: Mutex::new(LruCache::new(capacity(max_watch_keys))),
            by_id: Mutex::new(LruCache::new(capacity(max_releases_by_id))),
            latest_message_ids: Mutex::new(LruCache::new(capacity(max_watch_keys))),
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
            invalidations: AtomicU64::new(0),
        }
    }

    pub fn stats(&self) -> ReleaseCacheStats {
        ReleaseCacheStats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            invalidations: self.invalidations.load(Ordering::Relaxed),
        }
    }

    /// Number of watch keys currently cached.
    pub fn cached_watch_keys(&self) -> usize {
        self.by_watch_key.lock().len()
    }

    fn known_notification_id(&self, key: &str) -> i64 {
        self.latest_message_ids
            .lock()
            .peek(key)
            .copied()
            .unwrap_or(NO_NOTIFICATION_ID)
    }

    /// Cache a freshly loaded entry unless a message for `key` arrived while
    /// it was loading; such an entry may predate the release the message
    /// announced and must be reloaded by the next request.
    fn cache_if_unchanged(
        &self,
        key: String,
        known: i64,
        release: Option<Arc<Release>>,
        notification_id: i64,
    ) -> bool {
        let ids = self.latest_message_ids.lock();
        if ids.peek(&key).copied().unwrap_or(NO_NOTIFICATION_ID) != known {
            debug!("Release message for '{}' arrived during load, not caching", key);
            return false;
        }
        self.by_watch_key.lock().put(
            key,
            CacheEntry {
                release,
                notification_id: known.max(notification_id),
            },
        );
        true
    }

    fn hit(&self) {
        self.hits.fetch_add(1, Ordering::Relaxed);
    }

    fn miss(&self) {
        self.misses.fetch_add(1, Ordering::Relaxed);
    }
}

impl ReleaseLookup for CachedReleaseLookup {
    fn find_active_one(&self, id: ReleaseId, _notification_id: i64) -> Result<Option<Arc<Release>>> {
        if let Some(release) = self.by_id.lock().get(&id).cloned() {
            self.hit();
            return Ok(Some(release));
        }
        self.miss();

        let release = self.store.find_active_one(id)?;
        if let Some(release) = &release {
            self.by_id.lock().put(id, release.clone());
        }
        Ok(release)
    }

    fn find_latest_active(
        &self,
        app_id: &str,
        cluster_name: &str,
        namespace: &str,
        notification_id: i64,
    ) -> Result<Option<Arc<Release>>> {
        let key = watch_key(app_id, cluster_name, namespace);

        let cached = self
            .by_watch_key
            .lock()
            .get(&key)
            .filter(|entry| entry.notification_id >= notification_id)
            .map(|entry| entry.release.clone());
        if let Some(release) = cached {
            self.hit();
            return Ok(release);
        }
        self.miss();

        // The store is read without holding either cache lock.
        let known = self.known_notification_id(&key);
        let release = self
            .store
            .find_latest_active(app_id, cluster_name, namespace)?;
        self.cache_if_unchanged(key, known, release.clone(), notification_id);
        Ok(release)
    }

    fn handle_message(&self, message: &ReleaseMessage) {
        let key = message.message.as_str();
        if key.split(WATCH_KEY_SEPARATOR).count() != 3 {
            debug!("Ignoring release message {} with invalid key '{}'", message.id, key);
            return;
        }

        {
            let mut ids = self.latest_message_ids.lock();
            let latest = ids.peek(key).map_or(message.id, |id| (*id).max(message.id));
            ids.put(key.to_string(), latest);
        }

        if self.by_watch_key.lock().pop(key).is_some() {
            self.invalidations.fetch_add(1, Ordering::Relaxed);
        }

        let mut by_id = self.by_id.lock();
        let stale: Vec<ReleaseId> = by_id
            .iter()
            .filter(|(_, release)| release.watch_key() == key)
            .map(|(id, _)| *id)
            .collect();
        for id in &stale {
            by_id.pop(id);
        }
        debug!(
            "Release message {} invalidated '{}' ({} release(s) by id)",
            message.id,
            key,
            stale.len()
        );
    }
}
