//! File system registry / 文件系统注册管理
//!
//! Keeps one shared [`BucketFileSystem`] per configured name, building
//! instances lazily from the current options. The provider subscribes to
//! the options monitor at construction: a change notification for a name
//! evicts that entry, so the next `get` rebuilds it.

use std::collections::hash_map::Entry;
use std::collections::HashMap;
use std::sync::{Arc, Weak};

use async_trait::async_trait;
use parking_lot::RwLock;

use crate::config::{FileSystemOptions, OptionsMonitor};
use crate::error::{Result, StorageError};
use crate::fs::BucketFileSystem;
use crate::storage::{S3Store, StoreRef};

/// Builds a store backend from instance options. Seam for swapping the
/// S3 backend out in tests.
#[async_trait]
pub trait StoreFactory: Send + Sync {
    async fn build(&self, options: &FileSystemOptions) -> Result<StoreRef>;
}

/// Default factory: one authenticated S3 bucket handle per instance.
pub struct S3StoreFactory;

#[async_trait]
impl StoreFactory for S3StoreFactory {
    async fn build(&self, options: &FileSystemOptions) -> Result<StoreRef> {
        Ok(Arc::new(S3Store::new(options)?))
    }
}

/// Named registry of file system instances.
///
/// `get` is the only way callers obtain an instance; the registry
/// guarantees all concurrent callers of one name share the same
/// instance until its configuration changes or it is invalidated.
pub struct FileSystemProvider {
    options: Arc<dyn OptionsMonitor>,
    factory: Arc<dyn StoreFactory>,
    file_systems: RwLock<HashMap<String, Arc<BucketFileSystem>>>,
}

impl FileSystemProvider {
    pub fn new(options: Arc<dyn OptionsMonitor>) -> Arc<Self> {
        Self::with_factory(options, Arc::new(S3StoreFactory))
    }

    /// Builds the registry and subscribes it to the monitor's change
    /// notifications, so a changed entry is evicted without the host
    /// calling [`invalidate`](Self::invalidate) itself.
    pub fn with_factory(
        options: Arc<dyn OptionsMonitor>,
        factory: Arc<dyn StoreFactory>,
    ) -> Arc<Self> {
        let provider = Arc::new(Self {
            options,
            factory,
            file_systems: RwLock::new(HashMap::new()),
        });

        // Weak引用，监听器不延长注册表生命周期
        let weak: Weak<Self> = Arc::downgrade(&provider);
        provider.options.on_change(Box::new(move |name| {
            if let Some(provider) = weak.upgrade() {
                provider.invalidate(name);
            }
        }));

        provider
    }

    /// Returns the shared instance for `name`, building it from the
    /// current options on first use.
    ///
    /// The build runs outside the registry lock, so two concurrent first
    /// callers may both build; the first to install wins and the other
    /// instance is dropped. A name without configured options is
    /// [`StorageError::NotConfigured`].
    pub async fn get(&self, name: &str) -> Result<Arc<BucketFileSystem>> {
        if name.is_empty() {
            return Err(StorageError::InvalidArgument(
                "file system name is empty".to_string(),
            ));
        }

        if let Some(fs) = self.file_systems.read().get(name) {
            return Ok(fs.clone());
        }

        let options = self
            .options
            .get(name)
            .ok_or_else(|| StorageError::NotConfigured(name.to_string()))?
            .normalized();
        let store = self.factory.build(&options).await?;
        let built = Arc::new(BucketFileSystem::new(&options, store));

        let mut file_systems = self.file_systems.write();
        match file_systems.entry(name.to_string()) {
            Entry::Occupied(entry) => {
                // 并发首次构建，保留先安装的实例
                tracing::debug!("file system '{}' already installed, dropping duplicate", name);
                Ok(entry.get().clone())
            }
            Entry::Vacant(entry) => {
                tracing::info!("file system '{}' created", name);
                Ok(entry.insert(built).clone())
            }
        }
    }

    /// Drops the cached instance for `name`; the next `get` rebuilds it
    /// from the then-current options. Change notifications call this
    /// automatically; handles already obtained keep working against the
    /// old configuration.
    pub fn invalidate(&self, name: &str) {
        if self.file_systems.write().remove(name).is_some() {
            tracing::info!("file system '{}' invalidated", name);
        }
    }
}
