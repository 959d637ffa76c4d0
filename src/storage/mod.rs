//! Object store capability interface / 对象存储能力接口
//!
//! The file system layer depends on this narrow trait only: key-level
//! stat/get/put/delete plus delimiter-based prefix listing. Alternate
//! backends plug in without touching path translation or the file
//! system operations.

pub mod memory;
pub mod s3;

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::error::Result;

pub use memory::MemoryStore;
pub use s3::S3Store;

/// Shared handle to a store backend. One handle may serve several file
/// system instances; it is never mutated after construction.
pub type StoreRef = Arc<dyn ObjectStore>;

/// Metadata of one stored object, as reported by the store.
///
/// Fields the store does not report stay `None`; the file system layer
/// turns required-but-absent fields into explicit errors.
#[derive(Debug, Clone)]
pub struct ObjectMeta {
    pub key: String,
    pub size: Option<u64>,
    pub last_modified: Option<DateTime<Utc>>,
    /// Creation time. Some stores (S3 among them) never report it.
    pub created: Option<DateTime<Utc>>,
    pub content_type: Option<String>,
    pub e_tag: Option<String>,
}

/// One object row of a prefix listing.
#[derive(Debug, Clone)]
pub struct ListedObject {
    pub key: String,
    pub size: u64,
    pub last_modified: Option<DateTime<Utc>>,
}

/// Result of a prefix listing: objects below the prefix and, when a
/// delimiter was given, the common sub-prefixes the store collapsed.
#[derive(Debug, Clone, Default)]
pub struct ListPage {
    pub objects: Vec<ListedObject>,
    pub common_prefixes: Vec<String>,
}

/// Canned access-control hint attached to an upload.
///
/// Non-overwriting writes use the restrictive hint. Backends apply it
/// where their SDK exposes canned ACLs and ignore it otherwise.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccessHint {
    /// Inherit the bucket's default access.
    Inherit,
    /// Restrict the object to bucket-owner read.
    OwnerRead,
}

/// Options for a single upload.
#[derive(Debug, Clone)]
pub struct PutOptions {
    pub content_type: String,
    pub access: AccessHint,
}

impl Default for PutOptions {
    fn default() -> Self {
        Self {
            content_type: "application/octet-stream".to_string(),
            access: AccessHint::Inherit,
        }
    }
}

/// Key-level operations against one bucket.
///
/// Every method is a single network round trip; no retry happens at this
/// layer. Absent objects surface as [`StorageError::NotFound`] from
/// `stat`, `get` and `delete`, callers decide whether that is an error.
///
/// [`StorageError::NotFound`]: crate::error::StorageError::NotFound
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Fetch object metadata without the payload.
    async fn stat(&self, key: &str) -> Result<ObjectMeta>;

    /// Download the full object payload.
    async fn get(&self, key: &str) -> Result<Vec<u8>>;

    /// Upload a payload, replacing any existing object under the key.
    async fn put(&self, key: &str, data: &[u8], options: &PutOptions) -> Result<()>;

    /// Delete the object under the key.
    async fn delete(&self, key: &str) -> Result<()>;

    /// List keys under `prefix`. With a delimiter the store collapses
    /// deeper keys into common prefixes, which simulates one directory
    /// level.
    async fn list(&self, prefix: &str, delimiter: Option<&str>) -> Result<ListPage>;
}
