//! Rendered-page cache
//!
//! Process-local map from a cache key to a rendered response body with a TTL.
//! Entries leave the cache only when they expire or on `clear()`; writes to
//! the data model never evict anything, so a cached page can be stale for up
//! to one TTL.

use bytes::Bytes;
use dashmap::DashMap;
use lazy_static::lazy_static;
use prometheus::{register_int_counter, IntCounter};
use std::future::Future;
use std::time::{Duration, Instant};
use tracing::debug;

lazy_static! {
    static ref PAGE_CACHE_HIT: IntCounter = register_int_counter!(
        "blog_page_cache_hit_total",
        "Total number of rendered-page cache hits"
    )
    .expect("Failed to register blog_page_cache_hit_total");

    static ref PAGE_CACHE_MISS: IntCounter = register_int_counter!(
        "blog_page_cache_miss_total",
        "Total number of rendered-page cache misses"
    )
    .expect("Failed to register blog_page_cache_miss_total");

    static ref PAGE_CACHE_CLEAR: IntCounter = register_int_counter!(
        "blog_page_cache_clear_total",
        "Total number of explicit cache clears"
    )
    .expect("Failed to register blog_page_cache_clear_total");
}

#[derive(Debug, Clone)]
struct CachedPage {
    body: Bytes,
    expires_at: Instant,
}

impl CachedPage {
    fn new(body: Bytes, ttl: Duration) -> Self {
        Self {
            body,
            expires_at: Instant::now() + ttl,
        }
    }

    #[inline]
    fn is_expired(&self) -> bool {
        Instant::now() >= self.expires_at
    }
}

#[derive(Debug, Default)]
pub struct PageCache {
    store: DashMap<String, CachedPage>,
}

impl PageCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the live entry for `key`, dropping it if it has expired
    pub fn get(&self, key: &str) -> Option<Bytes> {
        if let Some(entry) = self.store.get(key) {
            if !entry.is_expired() {
                return Some(entry.body.clone());
            }
        }
        // Expired (or absent): remove only if still expired, a concurrent
        // writer may have refreshed it in between
        self.store.remove_if(key, |_, entry| entry.is_expired());
        None
    }

    /// Store a body; a zero TTL means "don't cache"
    pub fn insert(&self, key: impl Into<String>, body: Bytes, ttl: Duration) {
        if ttl.is_zero() {
            return;
        }
        let key = key.into();
        debug!(
            cache_key = %key,
            size_bytes = body.len(),
            ttl_secs = ttl.as_secs(),
            "page cache STORE"
        );
        self.store.insert(key, CachedPage::new(body, ttl));
    }

    /// Cached body for `key`, or render, store and return a fresh one.
    /// Render failures are returned as-is and nothing is stored.
    pub async fn get_or_render<F, Fut, E>(
        &self,
        key: &str,
        ttl: Duration,
        render: F,
    ) -> Result<Bytes, E>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<Bytes, E>>,
    {
        if let Some(body) = self.get(key) {
            PAGE_CACHE_HIT.inc();
            debug!(cache_key = %key, "page cache HIT");
            return Ok(body);
        }

        PAGE_CACHE_MISS.inc();
        debug!(cache_key = %key, "page cache MISS");

        let body = render().await?;
        self.insert(key, body.clone(), ttl);
        Ok(body)
    }

    pub fn clear(&self) {
        let count = self.store.len();
        self.store.clear();
        PAGE_CACHE_CLEAR.inc();
        debug!(cleared_entries = count, "page cache CLEAR");
    }

    pub fn len(&self) -> usize {
        self.store.len()
    }

    pub fn is_empty(&self) -> bool {
        self.store.is_empty()
    }
}
