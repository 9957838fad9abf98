//! TTL document cache
//!
//! A best-effort read accelerator in front of the primary store. Entries
//! expire after a fixed TTL (default five minutes); expiry is swept on
//! access using the caller-supplied `now`, so tests drive time instead of
//! sleeping. The cache must never be treated as the system of record —
//! a miss is always answerable from the primary store.

use draftdb_core::{Document, DocumentId, Timestamp};
use parking_lot::Mutex;
use rustc_hash::FxHashMap;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

use crate::ttl::TtlIndex;

/// Cache hit/miss counters and current size
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CacheStats {
    /// Lookups answered from the cache
    pub hits: u64,
    /// Lookups that fell through to the primary store
    pub misses: u64,
    /// Entries currently cached (expired entries may still be counted
    /// until the next sweep)
    pub entries: usize,
}

struct CacheEntry {
    document: Arc<Document>,
    expires_at: Timestamp,
}

struct CacheInner {
    entries: FxHashMap<DocumentId, CacheEntry>,
    expiry: TtlIndex<DocumentId>,
    hits: u64,
    misses: u64,
}

/// TTL map of recently read documents
pub struct DocumentCache {
    ttl: Duration,
    inner: Mutex<CacheInner>,
}

impl DocumentCache {
    /// Default entry lifetime
    pub const DEFAULT_TTL: Duration = Duration::from_secs(300);

    /// Create a cache with the given entry TTL
    pub fn new(ttl: Duration) -> Self {
        DocumentCache {
            ttl,
            inner: Mutex::new(CacheInner {
                entries: FxHashMap::default(),
                expiry: TtlIndex::new(),
                hits: 0,
                misses: 0,
            }),
        }
    }

    /// Look up a document, counting a hit or miss
    ///
    /// Sweeps entries due at `now` first, so an expired entry is never
    /// returned.
    pub fn get(&self, id: &DocumentId, now: Timestamp) -> Option<Arc<Document>> {
        let mut inner = self.inner.lock();
        Self::sweep(&mut inner, now);
        let hit = inner.entries.get(id).map(|e| Arc::clone(&e.document));
        match hit {
            Some(doc) => {
                inner.hits += 1;
                Some(doc)
            }
            None => {
                inner.misses += 1;
                None
            }
        }
    }

    /// Insert or refresh an entry, restarting its TTL at `now`
    pub fn put(&self, document: Arc<Document>, now: Timestamp) {
        let id = document.id;
        let expires_at = now.saturating_add(self.ttl);
        let mut inner = self.inner.lock();
        if let Some(old) = inner.entries.remove(&id) {
            inner.expiry.remove(old.expires_at, &id);
        }
        inner.expiry.insert(expires_at, id);
        inner.entries.insert(
            id,
            CacheEntry {
                document,
                expires_at,
            },
        );
    }

    /// Drop an entry (e.g. after delete or external invalidation)
    pub fn invalidate(&self, id: &DocumentId) {
        let mut inner = self.inner.lock();
        if let Some(entry) = inner.entries.remove(id) {
            inner.expiry.remove(entry.expires_at, id);
        }
    }

    /// Drop everything
    pub fn clear(&self) {
        let mut inner = self.inner.lock();
        inner.entries.clear();
        inner.expiry = TtlIndex::new();
    }

    /// Current counters
    pub fn stats(&self) -> CacheStats {
        let inner = self.inner.lock();
        CacheStats {
            hits: inner.hits,
            misses: inner.misses,
            entries: inner.entries.len(),
        }
    }

    fn sweep(inner: &mut CacheInner, now: Timestamp) {
        let due = inner.expiry.take_expired(now);
        if !due.is_empty() {
            debug!(count = due.len(), "cache entries expired");
        }
        for id in due {
            inner.entries.remove(&id);
        }
    }
}

impl Default for DocumentCache {
    fn default() -> Self {
        Self::new(Self::DEFAULT_TTL)
    }
}
