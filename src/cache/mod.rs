//! Response caching.
//!
//! [`ResponseCache`] holds generated narration for a short TTL, keyed on
//! [`cache_key`]. Expired entries are dropped when a read finds them and by
//! the engine's periodic [`sweep`](ResponseCache::sweep).

pub mod response;

pub use response::{
    CacheConfig, CacheEntry, CacheEntryInfo, CacheInfo, MAX_CACHE_DURATION, ResponseCache, cache_key,
};
