//! Process-wide shared state: the zio-id/book-id counters and the single-slot
//! decompressed-page cache.
//!
//! These are the only two genuinely global pieces of mutable state in the
//! core (§9 design notes). Both are guarded by a mutex held only for the
//! duration of one lookup/store or one id allocation — never across I/O.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;

static NEXT_ID: AtomicU64 = AtomicU64::new(1);

/// Allocate a fresh, process-wide monotonic id. Used both to mint zio-stream
/// ids (the cache key) and per-book ids.
pub fn next_id() -> u64 {
    NEXT_ID.fetch_add(1, Ordering::Relaxed)
}

/// Key identifying one decoded slice: which zio stream it came from, and
/// where in that stream's uncompressed view the slice starts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct CacheKey {
    zio_id: u64,
    location: u64,
}

struct CacheSlot {
    key: CacheKey,
    data: Vec<u8>,
}

/// The single process-wide decompressed-slice cache.
///
/// Holds at most one decoded slice at a time, keyed by `(zio_id, location)`.
/// A read against a different id transparently evicts; a read error
/// invalidates the slot outright so a retry can never observe stale data.
pub struct GlobalCache {
    slot: Mutex<Option<CacheSlot>>,
}

impl GlobalCache {
    const fn new() -> Self {
        Self {
            slot: Mutex::new(None),
        }
    }

    /// Look up a cached slice. Returns a copy if present and current.
    pub fn get(&self, zio_id: u64, location: u64) -> Option<Vec<u8>> {
        let guard = self.slot.lock().unwrap();
        match guard.as_ref() {
            Some(s) if s.key.zio_id == zio_id && s.key.location == location => Some(s.data.clone()),
            _ => None,
        }
    }

    /// Store a freshly decoded slice, evicting whatever was there before.
    pub fn put(&self, zio_id: u64, location: u64, data: Vec<u8>) {
        let mut guard = self.slot.lock().unwrap();
        *guard = Some(CacheSlot {
            key: CacheKey { zio_id, location },
            data,
        });
    }

    /// Invalidate the slot unconditionally. Called after any read error so a
    /// subsequent retry never serves stale bytes from a now-suspect stream.
    pub fn invalidate(&self) {
        let mut guard = self.slot.lock().unwrap();
        *guard = None;
    }

    /// Invalidate the slot only if it currently belongs to `zio_id`. Used on
    /// `close` of a stream whose id is about to be reused for nothing in
    /// particular — defensive, not required by the coherence invariant.
    pub fn invalidate_stream(&self, zio_id: u64) {
        let mut guard = self.slot.lock().unwrap();
        if matches!(guard.as_ref(), Some(s) if s.key.zio_id == zio_id) {
            *guard = None;
        }
    }
}

static GLOBAL_CACHE: GlobalCache = GlobalCache::new();

/// Access the process-wide cache singleton.
pub fn global_cache() -> &'static GlobalCache {
    &GLOBAL_CACHE
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ids_are_monotonic_and_unique() {
        let a = next_id();
        let b = next_id();
        assert!(b > a);
    }

    #[test]
    fn cache_roundtrip_and_eviction() {
        let cache = GlobalCache::new();
        assert_eq!(cache.get(1, 0), None);
        cache.put(1, 0, vec![1, 2, 3]);
        assert_eq!(cache.get(1, 0), Some(vec![1, 2, 3]));
        // Different location under same id misses.
        assert_eq!(cache.get(1, 2048), None);
        // Different id transparently evicts.
        cache.put(2, 0, vec![9]);
        assert_eq!(cache.get(1, 0), None);
        assert_eq!(cache.get(2, 0), Some(vec![9]));
    }

    #[test]
    fn invalidate_clears_slot() {
        let cache = GlobalCache::new();
        cache.put(1, 0, vec![1]);
        cache.invalidate();
        assert_eq!(cache.get(1, 0), None);
    }
}
