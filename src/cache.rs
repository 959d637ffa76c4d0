//! Derived-asset cache / 派生资源缓存
//!
//! Stores processed variants of media files (resized images and the
//! like) under a reserved key prefix of the same bucket. A cache miss is
//! an ordinary answer, never an error; entries are overwritten in place
//! and carry no expiry of their own.

use chrono::{DateTime, Utc};

use crate::error::Result;
use crate::storage::{PutOptions, StoreRef};

/// Reserved key prefix for cached derivations.
pub const DEFAULT_CACHE_PREFIX: &str = "cache";

/// Metadata stored alongside a cached payload.
///
/// Reconstructed from the object's own attributes on read, so the cache
/// needs no side channel for it.
#[derive(Debug, Clone)]
pub struct CacheMetadata {
    pub content_type: String,
    pub content_length: u64,
    pub last_modified: Option<DateTime<Utc>>,
}

/// Cache of derived assets layered over a store backend, typically the
/// same backend the owning file system runs on.
pub struct DerivedCache {
    store: StoreRef,
    prefix: String,
}

impl DerivedCache {
    pub fn new(store: StoreRef, prefix: &str) -> Self {
        Self {
            store,
            prefix: prefix.trim_matches('/').to_string(),
        }
    }

    pub fn with_default_prefix(store: StoreRef) -> Self {
        Self::new(store, DEFAULT_CACHE_PREFIX)
    }

    fn cache_key(&self, key: &str) -> String {
        let key = key.trim_matches('/');
        if self.prefix.is_empty() {
            key.to_string()
        } else {
            format!("{}/{}", self.prefix, key)
        }
    }

    /// Looks the cache entry up. `None` on a miss, payload and metadata
    /// on a hit.
    pub async fn get(&self, key: &str) -> Result<Option<(Vec<u8>, CacheMetadata)>> {
        let cache_key = self.cache_key(key);
        let data = match self.store.get(&cache_key).await {
            Ok(data) => data,
            Err(e) if e.is_not_found() => return Ok(None),
            Err(e) => return Err(e),
        };

        // the entry may be deleted between download and stat, still a miss
        let meta = match self.store.stat(&cache_key).await {
            Ok(meta) => meta,
            Err(e) if e.is_not_found() => return Ok(None),
            Err(e) => return Err(e),
        };
        let metadata = CacheMetadata {
            content_type: meta
                .content_type
                .unwrap_or_else(|| "application/octet-stream".to_string()),
            content_length: meta.size.unwrap_or(data.len() as u64),
            last_modified: meta.last_modified,
        };
        Ok(Some((data, metadata)))
    }

    /// Stores a cache entry, replacing any previous payload under the
    /// key.
    pub async fn set(&self, key: &str, data: &[u8], metadata: &CacheMetadata) -> Result<()> {
        let cache_key = self.cache_key(key);
        tracing::debug!("cache set key={} bytes={}", cache_key, data.len());

        let options = PutOptions {
            content_type: metadata.content_type.clone(),
            ..PutOptions::default()
        };
        self.store.put(&cache_key, data, &options).await
    }
}
