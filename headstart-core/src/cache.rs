//! Bounded fingerprint-to-references cache.
//!
//! Maps a response validator token (typically an ETag) to the reference
//! list previously extracted for that exact body, so later responses with
//! the same fingerprint can replay their `Link` headers without buffering
//! or re-scanning. Entries hold only derived metadata; response bodies are
//! never retained, so memory is bounded by the capacity times the size of
//! a reference list, not by body sizes.
//!
//! ## Trust assumption
//!
//! The fingerprint is taken at face value: the cache assumes the host
//! derives it from body content, so equal tokens imply equal bodies. A
//! host that reuses a token across different bodies will replay hints for
//! the wrong body. That contract is the caller's to uphold; the cache does
//! not hash or verify content.

use std::fmt;
use std::num::NonZeroUsize;
use std::sync::Arc;

use lru::LruCache;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::reference::ResourceReference;

/// Default number of fingerprint entries retained.
pub const DEFAULT_CACHE_CAPACITY: usize = 1024;

/// Cached scan result for one fingerprint, shared cheaply with replays.
pub type CachedReferences = Arc<[ResourceReference]>;

/// Notification hook invoked when a fingerprint entry is evicted.
///
/// Called with the evicted fingerprint and its stored references, exactly
/// once per evicted entry, synchronously inside the insertion that pushed
/// the entry out. The listener runs under the cache lock: it must not call
/// back into the cache and should return quickly.
pub type EvictionListener = Arc<dyn Fn(&str, &[ResourceReference]) + Send + Sync>;

/// Construction options for [`FingerprintCache`], nested in the library
/// configuration surface.
#[derive(Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheOptions {
    /// Maximum number of retained fingerprints. Values below 1 are
    /// clamped to 1.
    pub capacity: usize,
    /// Optional eviction notification hook.
    #[serde(skip)]
    pub on_evict: Option<EvictionListener>,
}

impl Default for CacheOptions {
    fn default() -> Self {
        Self {
            capacity: DEFAULT_CACHE_CAPACITY,
            on_evict: None,
        }
    }
}

impl fmt::Debug for CacheOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CacheOptions")
            .field("capacity", &self.capacity)
            .field("on_evict", &self.on_evict.as_ref().map(|_| "..."))
            .finish()
    }
}

/// Bounded LRU mapping from fingerprint to extracted references.
///
/// Interior mutability behind a single mutex: `get` and `put` are O(1),
/// called once per response, and safe from any number of in-flight
/// requests without losing LRU ordering or eviction notifications.
pub struct FingerprintCache {
    entries: Mutex<LruCache<String, CachedReferences>>,
    on_evict: Option<EvictionListener>,
}

impl FingerprintCache {
    /// Creates a cache from configuration options.
    pub fn new(options: CacheOptions) -> Self {
        let capacity = NonZeroUsize::new(options.capacity).unwrap_or(NonZeroUsize::MIN);
        Self {
            entries: Mutex::new(LruCache::new(capacity)),
            on_evict: options.on_evict,
        }
    }

    /// Creates a cache with the given capacity and no eviction listener.
    pub fn with_capacity(capacity: usize) -> Self {
        Self::new(CacheOptions {
            capacity,
            on_evict: None,
        })
    }

    /// Looks up a fingerprint, marking the entry most recently used.
    pub fn get(&self, fingerprint: &str) -> Option<CachedReferences> {
        let mut entries = self.entries.lock();
        entries.get(fingerprint).cloned()
    }

    /// Stores the references extracted for a fingerprint.
    ///
    /// If the insertion pushes the least recently used entry out, the
    /// eviction listener fires for it before this call returns. Re-storing
    /// an already-present fingerprint replaces the entry silently; the
    /// listener is reserved for capacity evictions.
    pub fn put(&self, fingerprint: impl Into<String>, references: Vec<ResourceReference>) {
        let fingerprint = fingerprint.into();
        let references: CachedReferences = references.into();
        debug!(
            fingerprint = %fingerprint,
            references = references.len(),
            "fingerprint entry stored"
        );
        let mut entries = self.entries.lock();
        if let Some((evicted_fingerprint, evicted_references)) =
            entries.push(fingerprint.clone(), references)
        {
            if evicted_fingerprint != fingerprint {
                debug!(fingerprint = %evicted_fingerprint, "fingerprint entry evicted");
                if let Some(listener) = &self.on_evict {
                    listener(&evicted_fingerprint, &evicted_references);
                }
            }
        }
    }

    /// Whether a fingerprint is currently cached. Does not touch recency.
    pub fn contains(&self, fingerprint: &str) -> bool {
        self.entries.lock().contains(fingerprint)
    }

    /// Number of entries currently retained.
    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    /// Whether the cache holds no entries.
    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }

    /// Configured capacity after clamping.
    pub fn capacity(&self) -> usize {
        self.entries.lock().cap().get()
    }
}

impl fmt::Debug for FingerprintCache {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FingerprintCache")
            .field("len", &self.len())
            .field("capacity", &self.capacity())
            .finish()
    }
}
