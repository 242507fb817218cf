/// Caching layer
///
/// Only the landing feed is cached. Its rendered body is stored under a single
/// fixed key, so every page number and every viewer shares one entry until it
/// expires.
pub mod page_cache;

pub use page_cache::PageCache;

/// Key the landing feed is cached under, independent of `?page=` and viewer
pub const INDEX_CACHE_KEY: &str = "index_page";
