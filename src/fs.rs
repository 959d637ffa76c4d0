//! Virtual file system over one bucket / 单桶虚拟文件系统
//!
//! Implements path-addressed file operations by composing the path
//! translator with key-level store calls. Directories only exist as key
//! prefixes: listing simulates them, mutating them is unsupported.

use chrono::{DateTime, Utc};
use tokio::io::AsyncRead;

use crate::config::FileSystemOptions;
use crate::error::{Result, StorageError};
use crate::path;
use crate::storage::{AccessHint, PutOptions, StoreRef};

/// One file system instance bound to a bucket, a bucket-root prefix and
/// a virtual request root. All three are fixed for the instance's
/// lifetime; configuration changes produce a new instance through the
/// provider.
pub struct BucketFileSystem {
    request_root: String,
    bucket_root: String,
    store: StoreRef,
}

/// A pseudo-directory entry: a common key prefix reported by the store.
/// Nothing is stored for it, so it always exists and carries the current
/// time as a placeholder timestamp.
#[derive(Debug, Clone)]
pub struct PrefixInfo {
    pub prefix: String,
    pub name: String,
}

impl PrefixInfo {
    fn new(prefix: String) -> Self {
        let name = prefix
            .trim_end_matches('/')
            .rsplit('/')
            .next()
            .unwrap_or("")
            .to_string();
        Self { prefix, name }
    }
}

/// A pseudo-file entry carrying the metadata the listing returned.
#[derive(Debug, Clone)]
pub struct ObjectInfo {
    pub key: String,
    pub name: String,
    pub size: u64,
    pub last_modified: Option<DateTime<Utc>>,
}

/// One row of a directory listing: either a pseudo-directory or a
/// pseudo-file, never both.
#[derive(Debug, Clone)]
pub enum StorageItem {
    Prefix(PrefixInfo),
    Object(ObjectInfo),
}

impl StorageItem {
    pub fn is_prefix(&self) -> bool {
        matches!(self, StorageItem::Prefix(_))
    }

    pub fn name(&self) -> &str {
        match self {
            StorageItem::Prefix(p) => &p.name,
            StorageItem::Object(o) => &o.name,
        }
    }

    pub fn size(&self) -> Option<u64> {
        match self {
            StorageItem::Prefix(_) => None,
            StorageItem::Object(o) => Some(o.size),
        }
    }

    /// Last-modified timestamp; pseudo-directories and objects the store
    /// reported without one fall back to the current time.
    pub fn last_modified(&self) -> DateTime<Utc> {
        match self {
            StorageItem::Prefix(_) => Utc::now(),
            StorageItem::Object(o) => o.last_modified.unwrap_or_else(Utc::now),
        }
    }
}

/// Result of listing one pseudo-directory. An empty listing is the only
/// existence signal a directory has.
#[derive(Debug, Clone, Default)]
pub struct DirectoryContents {
    pub items: Vec<StorageItem>,
}

impl DirectoryContents {
    pub fn exists(&self) -> bool {
        !self.items.is_empty()
    }

    pub fn directories(&self) -> impl Iterator<Item = &PrefixInfo> {
        self.items.iter().filter_map(|item| match item {
            StorageItem::Prefix(p) => Some(p),
            StorageItem::Object(_) => None,
        })
    }

    pub fn files(&self) -> impl Iterator<Item = &ObjectInfo> {
        self.items.iter().filter_map(|item| match item {
            StorageItem::Object(o) => Some(o),
            StorageItem::Prefix(_) => None,
        })
    }
}

impl BucketFileSystem {
    pub fn new(options: &FileSystemOptions, store: StoreRef) -> Self {
        let options = options.clone().normalized();
        Self {
            request_root: options.virtual_root,
            bucket_root: options.bucket_root,
            store,
        }
    }

    /// The store handle this instance runs on. Shared with the derived
    /// cache built from the same options.
    pub fn store(&self) -> StoreRef {
        self.store.clone()
    }

    pub fn request_root(&self) -> &str {
        &self.request_root
    }

    /// Store-facing key for a path: the translated key placed under the
    /// bucket-root prefix when one is configured.
    fn object_key(&self, p: &str) -> String {
        let key = path::to_key(p, &self.request_root);
        if self.bucket_root.is_empty() {
            key
        } else if key.is_empty() {
            self.bucket_root.clone()
        } else {
            format!("{}/{}", self.bucket_root, key)
        }
    }

    /// True when an object is stored under the path. Absence is a normal
    /// answer, any other store failure propagates.
    pub async fn exists(&self, p: &str) -> Result<bool> {
        match self.store.stat(&self.object_key(p)).await {
            Ok(_) => Ok(true),
            Err(e) if e.is_not_found() => Ok(false),
            Err(e) => Err(e),
        }
    }

    /// Downloads the full object payload.
    pub async fn read(&self, p: &str) -> Result<Vec<u8>> {
        self.store.get(&self.object_key(p)).await
    }

    /// Downloads the object and returns a reader positioned at the
    /// start of the payload.
    pub async fn open(&self, p: &str) -> Result<Box<dyn AsyncRead + Unpin + Send>> {
        let data = self.read(p).await?;
        Ok(Box::new(std::io::Cursor::new(data)))
    }

    /// Uploads `data` under the path.
    ///
    /// With `overwrite_if_exists = false` an existing object is a
    /// [`StorageError::Conflict`] and the upload carries the restrictive
    /// access hint. The existence check and the upload are two separate
    /// store calls: a concurrent writer can slip between them, and the
    /// last write wins.
    pub async fn write(&self, p: &str, data: &[u8], overwrite_if_exists: bool) -> Result<()> {
        let key = self.object_key(p);

        if !overwrite_if_exists {
            let page = self.store.list(&key, None).await?;
            if page.objects.iter().any(|o| o.key == key) {
                return Err(StorageError::Conflict(key));
            }
        }

        let content_type = content_type_for(&key);
        let options = PutOptions {
            content_type,
            access: if overwrite_if_exists {
                AccessHint::Inherit
            } else {
                AccessHint::OwnerRead
            },
        };

        tracing::debug!("write key={} bytes={}", key, data.len());
        self.store.put(&key, data, &options).await
    }

    /// Deletes the object under the path. A missing object counts as
    /// success, so the operation is idempotent.
    pub async fn delete(&self, p: &str) -> Result<()> {
        match self.store.delete(&self.object_key(p)).await {
            Ok(()) => Ok(()),
            Err(e) if e.is_not_found() => Ok(()),
            Err(e) => Err(e),
        }
    }

    /// Last-modified timestamp of the stored object. Errors when the
    /// store did not report one.
    pub async fn last_modified(&self, p: &str) -> Result<DateTime<Utc>> {
        let meta = self.store.stat(&self.object_key(p)).await?;
        meta.last_modified
            .ok_or(StorageError::MetadataUnavailable("last_modified"))
    }

    /// Creation timestamp of the stored object. Object stores commonly
    /// omit it, which surfaces as [`StorageError::MetadataUnavailable`].
    pub async fn created(&self, p: &str) -> Result<DateTime<Utc>> {
        let meta = self.store.stat(&self.object_key(p)).await?;
        meta.created
            .ok_or(StorageError::MetadataUnavailable("created"))
    }

    /// Size in bytes of the stored object.
    pub async fn size(&self, p: &str) -> Result<u64> {
        let meta = self.store.stat(&self.object_key(p)).await?;
        meta.size.ok_or(StorageError::MetadataUnavailable("size"))
    }

    /// Translates a path to its full key under the request root. The
    /// bucket-root prefix is a store detail and not part of this value.
    pub fn full_path(&self, p: &str) -> String {
        path::to_key(p, &self.request_root)
    }

    /// Strips the request root from a full path or URL.
    pub fn relative_path(&self, full_path_or_url: &str) -> String {
        path::to_relative_path(full_path_or_url, &self.request_root)
    }

    /// URL of a path under the request root. Pass a bare relative path;
    /// a path already carrying the root gets the root prepended again.
    pub fn url(&self, p: &str) -> String {
        path::to_url(p, &self.request_root)
    }

    /// Lists the pseudo-directory at `p` through a delimiter-bounded
    /// prefix listing. Common prefixes and keys ending in the delimiter
    /// become pseudo-directories, every other key a pseudo-file. An
    /// empty result means the directory does not exist.
    pub async fn list(&self, p: &str) -> Result<DirectoryContents> {
        let key = self.object_key(p);
        let prefix = if key.is_empty() {
            String::new()
        } else {
            format!("{}/", key)
        };

        let page = self.store.list(&prefix, Some("/")).await?;

        let mut items = Vec::new();
        for common in page.common_prefixes {
            items.push(StorageItem::Prefix(PrefixInfo::new(common)));
        }
        for object in page.objects {
            if object.key == prefix {
                // 跳过目录占位对象
                continue;
            }
            if object.key.ends_with('/') {
                items.push(StorageItem::Prefix(PrefixInfo::new(object.key)));
                continue;
            }
            let name = object
                .key
                .rsplit('/')
                .next()
                .unwrap_or(object.key.as_str())
                .to_string();
            items.push(StorageItem::Object(ObjectInfo {
                name,
                size: object.size,
                last_modified: object.last_modified,
                key: object.key,
            }));
        }

        Ok(DirectoryContents { items })
    }

    /// The store has no directories to create.
    pub async fn create_directory(&self, _p: &str) -> Result<()> {
        Err(StorageError::Unsupported("create_directory"))
    }

    /// The store has no directories to delete.
    pub async fn delete_directory(&self, _p: &str) -> Result<()> {
        Err(StorageError::Unsupported("delete_directory"))
    }
}

/// Content type from the key's extension, `application/octet-stream`
/// when unknown.
fn content_type_for(key: &str) -> String {
    mime_guess::from_path(key).first_or_octet_stream().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::{MemoryStore, ObjectStore};
    use std::sync::Arc;
    use tokio::io::AsyncReadExt;

    fn media_options() -> FileSystemOptions {
        FileSystemOptions {
            endpoint: "http://localhost:9000".to_string(),
            region: "us-east-1".to_string(),
            bucket: "assets".to_string(),
            credential_path: None,
            bucket_root: String::new(),
            virtual_root: "/media".to_string(),
            force_path_style: true,
        }
    }

    fn fixture() -> (Arc<MemoryStore>, BucketFileSystem) {
        let store = Arc::new(MemoryStore::new());
        let fs = BucketFileSystem::new(&media_options(), store.clone());
        (store, fs)
    }

    #[tokio::test]
    async fn write_exists_url_delete_scenario() {
        let (_, fs) = fixture();

        fs.write("/media/a/b.png", b"png", true).await.unwrap();
        assert!(fs.exists("/media/a/b.png").await.unwrap());
        assert_eq!(fs.url("a/b.png"), "/media/a/b.png");

        fs.delete("/media/a/b.png").await.unwrap();
        assert!(!fs.exists("/media/a/b.png").await.unwrap());
    }

    #[tokio::test]
    async fn write_without_overwrite_conflicts() {
        let (store, fs) = fixture();

        fs.write("a/b.png", b"old", false).await.unwrap();
        assert_eq!(
            store.recorded_access("media/a/b.png").await,
            Some(AccessHint::OwnerRead)
        );

        let error = fs.write("a/b.png", b"new", false).await.unwrap_err();
        assert!(matches!(error, StorageError::Conflict(_)));

        fs.write("a/b.png", b"new", true).await.unwrap();
        assert_eq!(fs.read("a/b.png").await.unwrap(), b"new");
        assert_eq!(
            store.recorded_access("media/a/b.png").await,
            Some(AccessHint::Inherit)
        );
    }

    #[tokio::test]
    async fn write_resolves_content_type_from_extension() {
        let (store, fs) = fixture();

        fs.write("a/b.png", b"png", true).await.unwrap();
        assert_eq!(
            store.recorded_content_type("media/a/b.png").await.as_deref(),
            Some("image/png")
        );

        fs.write("a/raw", b"raw", true).await.unwrap();
        assert_eq!(
            store.recorded_content_type("media/a/raw").await.as_deref(),
            Some("application/octet-stream")
        );
    }

    #[tokio::test]
    async fn read_missing_object_is_not_found() {
        let (_, fs) = fixture();
        assert!(fs.read("a/missing.png").await.unwrap_err().is_not_found());
        assert!(fs.open("a/missing.png").await.err().unwrap().is_not_found());
    }

    #[tokio::test]
    async fn open_returns_reader_at_start() {
        let (_, fs) = fixture();
        fs.write("a/b.bin", b"payload", true).await.unwrap();

        let mut reader = fs.open("a/b.bin").await.unwrap();
        let mut buffer = Vec::new();
        reader.read_to_end(&mut buffer).await.unwrap();
        assert_eq!(buffer, b"payload");
    }

    #[tokio::test]
    async fn delete_is_idempotent() {
        let (_, fs) = fixture();
        fs.write("a/b.png", b"png", true).await.unwrap();

        fs.delete("a/b.png").await.unwrap();
        fs.delete("a/b.png").await.unwrap();
    }

    #[tokio::test]
    async fn metadata_accessors() {
        let (_, fs) = fixture();
        fs.write("a/b.png", b"12345", true).await.unwrap();

        assert_eq!(fs.size("a/b.png").await.unwrap(), 5);
        assert!(fs.last_modified("a/b.png").await.is_ok());
        // memory store records creation time, unlike S3
        assert!(fs.created("a/b.png").await.is_ok());
        assert!(fs.size("a/missing.png").await.unwrap_err().is_not_found());
    }

    #[tokio::test]
    async fn path_helpers_use_bound_root() {
        let (_, fs) = fixture();
        assert_eq!(fs.full_path("1234/img.jpg"), "media/1234/img.jpg");
        assert_eq!(fs.full_path("/media/1234/img.jpg"), "media/1234/img.jpg");
        assert_eq!(fs.relative_path("/media/1234/img.jpg"), "1234/img.jpg");
        assert_eq!(fs.url("1234/img.jpg"), "/media/1234/img.jpg");
    }

    #[tokio::test]
    async fn bucket_root_prefixes_store_keys() {
        let store = Arc::new(MemoryStore::new());
        let mut options = media_options();
        options.bucket_root = "tenant-1".to_string();
        let fs = BucketFileSystem::new(&options, store.clone());

        fs.write("a/b.png", b"png", true).await.unwrap();
        assert!(store.get("tenant-1/media/a/b.png").await.is_ok());
        // the full path stays bucket-root free
        assert_eq!(fs.full_path("a/b.png"), "media/a/b.png");
    }

    #[tokio::test]
    async fn listing_partitions_directories_and_files() {
        let (store, fs) = fixture();
        fs.write("docs/report.pdf", b"pdf", true).await.unwrap();
        fs.write("docs/archive/2019.zip", b"zip", true).await.unwrap();
        // directory marker object, as some tools create them
        store
            .put("media/docs/empty/", b"", &PutOptions::default())
            .await
            .unwrap();

        let contents = fs.list("docs").await.unwrap();
        assert!(contents.exists());

        let directories: Vec<_> = contents.directories().map(|d| d.name.clone()).collect();
        let files: Vec<_> = contents.files().map(|f| f.name.clone()).collect();
        assert_eq!(directories, vec!["archive".to_string(), "empty".to_string()]);
        assert_eq!(files, vec!["report.pdf".to_string()]);
    }

    #[tokio::test]
    async fn listing_one_prefix_and_one_object() {
        let (_, fs) = fixture();
        fs.write("mixed/file.txt", b"text", true).await.unwrap();
        fs.write("mixed/sub/deep.txt", b"deep", true).await.unwrap();

        let contents = fs.list("mixed").await.unwrap();
        assert_eq!(contents.items.len(), 2);
        assert_eq!(contents.directories().count(), 1);
        assert_eq!(contents.files().count(), 1);
    }

    #[tokio::test]
    async fn empty_listing_reports_not_found() {
        let (_, fs) = fixture();
        let contents = fs.list("nothing/here").await.unwrap();
        assert!(!contents.exists());
        assert!(contents.items.is_empty());
    }

    #[tokio::test]
    async fn directory_mutation_is_unsupported() {
        let (_, fs) = fixture();
        assert!(matches!(
            fs.create_directory("a").await.unwrap_err(),
            StorageError::Unsupported(_)
        ));
        assert!(matches!(
            fs.delete_directory("a").await.unwrap_err(),
            StorageError::Unsupported(_)
        ));
    }

    #[tokio::test]
    async fn storage_item_accessors() {
        let (_, fs) = fixture();
        fs.write("x/file.bin", b"12345678", true).await.unwrap();
        fs.write("x/dir/nested.bin", b"1", true).await.unwrap();

        let contents = fs.list("x").await.unwrap();
        for item in &contents.items {
            if item.is_prefix() {
                assert_eq!(item.name(), "dir");
                assert_eq!(item.size(), None);
            } else {
                assert_eq!(item.name(), "file.bin");
                assert_eq!(item.size(), Some(8));
            }
            // placeholder or real, both are always present
            let _ = item.last_modified();
        }
    }
}
