//! bucketfs: virtual file system over flat object storage / 对象存储虚拟文件系统
//!
//! A content-serving host stores binary assets (originals and derived
//! renditions) through path-addressed file system semantics. The backing
//! store is a flat, key-addressed object store. This crate is the adapter
//! between the two:
//!
//! - [`path`] translates between virtual request paths, object keys and
//!   relative paths (pure string manipulation, no I/O)
//! - [`storage`] is the narrow capability interface to the object store,
//!   with an S3-compatible backend and an in-memory backend
//! - [`fs`] implements file operations (exists/read/write/delete/stat/list)
//!   on top of flat key operations, simulating directories by prefix
//! - [`provider`] lazily builds and caches one file system per configured
//!   name, evicting entries when their configuration changes
//! - [`cache`] is a write-through store for expensive derived assets,
//!   kept under its own key prefix in the same bucket

pub mod cache;
pub mod config;
pub mod error;
pub mod fs;
pub mod path;
pub mod provider;
pub mod storage;

pub use cache::{CacheMetadata, DerivedCache};
pub use config::{
    ChangeListener, FileSystemOptions, OptionsMonitor, StaticOptionsMonitor,
    MEDIA_FILE_SYSTEM_NAME,
};
pub use error::{Result, StorageError};
pub use fs::{BucketFileSystem, DirectoryContents, ObjectInfo, PrefixInfo, StorageItem};
pub use provider::{FileSystemProvider, S3StoreFactory, StoreFactory};
pub use storage::{
    AccessHint, ListPage, ListedObject, MemoryStore, ObjectMeta, ObjectStore, PutOptions, S3Store,
    StoreRef,
};
