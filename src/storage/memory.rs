//! In-memory store backend / 内存对象存储后端
//!
//! Fills the role a local driver plays for a remote one: a complete
//! [`ObjectStore`] over a plain map, used by tests and as a scratch
//! backend. Listing semantics follow S3: with a delimiter, deeper keys
//! collapse into common prefixes that end with the delimiter.

use std::collections::{BTreeMap, BTreeSet};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::RwLock;

use super::{AccessHint, ListPage, ListedObject, ObjectMeta, ObjectStore, PutOptions};
use crate::error::{Result, StorageError};

#[derive(Debug, Clone)]
struct StoredObject {
    data: Vec<u8>,
    content_type: String,
    access: AccessHint,
    created: DateTime<Utc>,
    last_modified: DateTime<Utc>,
}

/// Object store kept entirely in memory. Keys are ordered so listings
/// are deterministic.
#[derive(Default)]
pub struct MemoryStore {
    objects: RwLock<BTreeMap<String, StoredObject>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Access hint recorded for the last upload of `key`, for asserting
    /// write behavior in tests.
    pub async fn recorded_access(&self, key: &str) -> Option<AccessHint> {
        self.objects.read().await.get(key).map(|o| o.access)
    }

    /// Content type recorded for the last upload of `key`.
    pub async fn recorded_content_type(&self, key: &str) -> Option<String> {
        self.objects
            .read()
            .await
            .get(key)
            .map(|o| o.content_type.clone())
    }

    pub async fn len(&self) -> usize {
        self.objects.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.objects.read().await.is_empty()
    }
}

#[async_trait]
impl ObjectStore for MemoryStore {
    async fn stat(&self, key: &str) -> Result<ObjectMeta> {
        let objects = self.objects.read().await;
        let object = objects
            .get(key)
            .ok_or_else(|| StorageError::NotFound(key.to_string()))?;
        Ok(ObjectMeta {
            key: key.to_string(),
            size: Some(object.data.len() as u64),
            last_modified: Some(object.last_modified),
            created: Some(object.created),
            content_type: Some(object.content_type.clone()),
            e_tag: None,
        })
    }

    async fn get(&self, key: &str) -> Result<Vec<u8>> {
        let objects = self.objects.read().await;
        objects
            .get(key)
            .map(|o| o.data.clone())
            .ok_or_else(|| StorageError::NotFound(key.to_string()))
    }

    async fn put(&self, key: &str, data: &[u8], options: &PutOptions) -> Result<()> {
        let now = Utc::now();
        self.objects.write().await.insert(
            key.to_string(),
            StoredObject {
                data: data.to_vec(),
                content_type: options.content_type.clone(),
                access: options.access,
                created: now,
                last_modified: now,
            },
        );
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<()> {
        self.objects
            .write()
            .await
            .remove(key)
            .map(|_| ())
            .ok_or_else(|| StorageError::NotFound(key.to_string()))
    }

    async fn list(&self, prefix: &str, delimiter: Option<&str>) -> Result<ListPage> {
        let objects = self.objects.read().await;
        let mut page = ListPage::default();
        let mut prefixes = BTreeSet::new();

        for (key, object) in objects.range(prefix.to_string()..) {
            if !key.starts_with(prefix) {
                break;
            }
            let rest = &key[prefix.len()..];
            match delimiter.and_then(|d| rest.find(d).map(|pos| (d, pos))) {
                Some((d, pos)) => {
                    prefixes.insert(format!("{}{}{}", prefix, &rest[..pos], d));
                }
                None => page.objects.push(ListedObject {
                    key: key.clone(),
                    size: object.data.len() as u64,
                    last_modified: Some(object.last_modified),
                }),
            }
        }

        page.common_prefixes = prefixes.into_iter().collect();
        Ok(page)
    }
}
