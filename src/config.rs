//! Per-instance file system configuration / 文件系统实例配置
//!
//! Options are injected by the host; loading and validating them is the
//! host's job. The registry only reads them through [`OptionsMonitor`] and
//! reacts to change notifications keyed by name.

use std::collections::HashMap;

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};

use crate::path;

/// Conventional instance name for the media file system of a content host.
pub const MEDIA_FILE_SYSTEM_NAME: &str = "media";

/// Options for one named file system instance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileSystemOptions {
    /// Endpoint URL of the S3-compatible store
    /// (AWS: https://s3.{region}.amazonaws.com, MinIO: http://localhost:9000)
    pub endpoint: String,
    /// Store region
    #[serde(default = "default_region")]
    pub region: String,
    /// Bucket name
    pub bucket: String,
    /// Path to a JSON credential file. `None` means the ambient default
    /// credential chain (environment, profile, instance metadata).
    #[serde(default)]
    pub credential_path: Option<String>,
    /// Key prefix inside the bucket under which all objects of this
    /// instance live. Empty means the bucket root itself.
    #[serde(default)]
    pub bucket_root: String,
    /// Externally visible root path used in URLs and caller-facing paths,
    /// independent of `bucket_root` (e.g. "/media").
    pub virtual_root: String,
    /// Use path-style addressing instead of virtual-hosted style.
    /// MinIO等需要开启此选项
    #[serde(default)]
    pub force_path_style: bool,
}

fn default_region() -> String {
    "us-east-1".to_string()
}

impl FileSystemOptions {
    /// Returns a copy with `virtual_root` and `bucket_root` brought to
    /// canonical form: single forward-slash separators, no trailing
    /// separator, and no surrounding separators on the bucket root.
    pub fn normalized(mut self) -> Self {
        self.bucket_root = path::normalize(&self.bucket_root)
            .trim_matches('/')
            .to_string();
        self.virtual_root = path::normalize(&self.virtual_root)
            .trim_end_matches('/')
            .to_string();
        self
    }
}

/// Callback invoked with the instance name whose options changed.
pub type ChangeListener = Box<dyn Fn(&str) + Send + Sync>;

/// Read access to the current options for a named instance, plus change
/// notification.
///
/// The host owns loading and validation; the registry calls `get` on
/// every cache miss so a rebuilt instance always sees the configuration
/// current at build time, and registers a listener through `on_change`
/// to evict stale instances.
pub trait OptionsMonitor: Send + Sync {
    fn get(&self, name: &str) -> Option<FileSystemOptions>;

    /// Registers a listener called with the name of every subsequently
    /// changed entry. Listeners run on the notifying thread and must not
    /// block; they stay registered for the monitor's lifetime.
    fn on_change(&self, listener: ChangeListener);
}

/// In-process options table, useful for tests and simple hosts.
#[derive(Default)]
pub struct StaticOptionsMonitor {
    entries: RwLock<HashMap<String, FileSystemOptions>>,
    listeners: RwLock<Vec<ChangeListener>>,
}

impl StaticOptionsMonitor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts or replaces the options for `name` and notifies
    /// registered listeners.
    pub fn insert(&self, name: impl Into<String>, options: FileSystemOptions) {
        let name = name.into();
        self.entries.write().insert(name.clone(), options);
        self.notify(&name);
    }

    /// Removes the options for `name` and notifies registered listeners.
    pub fn remove(&self, name: &str) {
        if self.entries.write().remove(name).is_some() {
            self.notify(name);
        }
    }

    fn notify(&self, name: &str) {
        for listener in self.listeners.read().iter() {
            listener(name);
        }
    }
}

impl OptionsMonitor for StaticOptionsMonitor {
    fn get(&self, name: &str) -> Option<FileSystemOptions> {
        self.entries.read().get(name).cloned()
    }

    fn on_change(&self, listener: ChangeListener) {
        self.listeners.write().push(listener);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn options() -> FileSystemOptions {
        FileSystemOptions {
            endpoint: "http://localhost:9000".to_string(),
            region: default_region(),
            bucket: "assets".to_string(),
            credential_path: None,
            bucket_root: "\\root\\prefix\\".to_string(),
            virtual_root: "/media/".to_string(),
            force_path_style: true,
        }
    }

    #[test]
    fn normalized_trims_and_unifies_separators() {
        let options = options().normalized();
        assert_eq!(options.bucket_root, "root/prefix");
        assert_eq!(options.virtual_root, "/media");
    }

    #[test]
    fn normalized_is_idempotent() {
        let once = options().normalized();
        assert_eq!(once.clone().normalized(), once);
    }

    #[test]
    fn listeners_hear_insert_and_remove() {
        use std::sync::Arc;

        let monitor = StaticOptionsMonitor::new();
        let seen = Arc::new(parking_lot::Mutex::new(Vec::new()));
        let sink = seen.clone();
        monitor.on_change(Box::new(move |name| sink.lock().push(name.to_string())));

        monitor.insert(MEDIA_FILE_SYSTEM_NAME, options());
        monitor.remove(MEDIA_FILE_SYSTEM_NAME);
        // removing an absent entry changes nothing, so no notification
        monitor.remove(MEDIA_FILE_SYSTEM_NAME);

        assert_eq!(*seen.lock(), vec!["media".to_string(), "media".to_string()]);
    }

    #[test]
    fn static_monitor_returns_current_entry() {
        let monitor = StaticOptionsMonitor::new();
        assert!(monitor.get(MEDIA_FILE_SYSTEM_NAME).is_none());

        monitor.insert(MEDIA_FILE_SYSTEM_NAME, options());
        assert_eq!(monitor.get(MEDIA_FILE_SYSTEM_NAME), Some(options()));

        monitor.remove(MEDIA_FILE_SYSTEM_NAME);
        assert!(monitor.get(MEDIA_FILE_SYSTEM_NAME).is_none());
    }
}
