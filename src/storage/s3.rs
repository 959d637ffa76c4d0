//! S3-compatible store backend built on rust-s3 / 基于 rust-s3 的对象存储后端

use chrono::{DateTime, Utc};
use s3::creds::Credentials;
use s3::error::S3Error;
use s3::region::Region;
use s3::{Bucket, BucketConfiguration};
use serde::Deserialize;

use super::{AccessHint, ListPage, ListedObject, ObjectMeta, ObjectStore, PutOptions};
use crate::config::FileSystemOptions;
use crate::error::{Result, StorageError};

use async_trait::async_trait;

/// Object store backend for any S3-compatible endpoint (AWS, MinIO,
/// OSS, COS). The authenticated [`Bucket`] handle is built once and
/// reused for every call.
pub struct S3Store {
    bucket: Box<Bucket>,
}

/// JSON credential file layout, mirroring the shape handed out by
/// object-store consoles.
#[derive(Debug, Deserialize)]
struct CredentialFile {
    access_key_id: String,
    secret_access_key: String,
    #[serde(default)]
    session_token: Option<String>,
}

/// Loads credentials from a JSON file, or falls back to the ambient
/// default chain (environment, shared profile, instance metadata) when
/// no path is configured. Reading the file is blocking I/O and happens
/// once per instance build.
pub fn load_credentials(credential_path: Option<&str>) -> Result<Credentials> {
    match credential_path {
        Some(path) => {
            let raw = std::fs::read_to_string(path).map_err(|e| {
                StorageError::Credential(format!("credential file '{path}' unreadable: {e}"))
            })?;
            let file: CredentialFile = serde_json::from_str(&raw).map_err(|e| {
                StorageError::Credential(format!("credential file '{path}' malformed: {e}"))
            })?;
            Credentials::new(
                Some(&file.access_key_id),
                Some(&file.secret_access_key),
                file.session_token.as_deref(),
                None,
                None,
            )
            .map_err(|e| StorageError::Credential(format!("credential rejected: {e}")))
        }
        None => Credentials::default()
            .map_err(|e| StorageError::Credential(format!("no ambient credentials: {e}"))),
    }
}

fn region_of(options: &FileSystemOptions) -> Region {
    Region::Custom {
        region: options.region.clone(),
        endpoint: options.endpoint.clone(),
    }
}

/// Maps a rust-s3 error onto the adapter taxonomy. 404 means the object
/// is absent, everything else propagates as a backend failure.
fn map_s3_error(key: &str, error: S3Error) -> StorageError {
    match error {
        S3Error::HttpFailWithBody(404, _) => StorageError::NotFound(key.to_string()),
        e => StorageError::Backend(format!("s3 request for '{key}' failed: {e}")),
    }
}

/// Parses the timestamp strings S3 responses carry: HTTP date on HEAD,
/// RFC 3339 in listings.
fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc2822(raw)
        .or_else(|_| DateTime::parse_from_rfc3339(raw))
        .ok()
        .map(|t| t.with_timezone(&Utc))
}

impl S3Store {
    /// Builds the authenticated bucket handle from instance options.
    pub fn new(options: &FileSystemOptions) -> Result<Self> {
        let credentials = load_credentials(options.credential_path.as_deref())?;
        let bucket = Bucket::new(&options.bucket, region_of(options), credentials)
            .map_err(|e| StorageError::Backend(format!("bucket handle failed: {e}")))?;

        let bucket = if options.force_path_style {
            bucket.with_path_style()
        } else {
            bucket
        };

        tracing::debug!(
            "s3 store ready: bucket={} endpoint={}",
            options.bucket,
            options.endpoint
        );
        Ok(Self { bucket })
    }

    /// Startup helper: get-or-create the configured bucket. Idempotent,
    /// meant to run once during host bootstrap, not in steady state.
    pub async fn ensure_bucket(options: &FileSystemOptions) -> Result<()> {
        let store = Self::new(options)?;
        let exists = store
            .bucket
            .exists()
            .await
            .map_err(|e| StorageError::Backend(format!("bucket probe failed: {e}")))?;
        if exists {
            return Ok(());
        }

        let credentials = load_credentials(options.credential_path.as_deref())?;
        let region = region_of(options);
        let config = BucketConfiguration::default();
        let response = if options.force_path_style {
            Bucket::create_with_path_style(&options.bucket, region, credentials, config).await
        } else {
            Bucket::create(&options.bucket, region, credentials, config).await
        }
        .map_err(|e| StorageError::Backend(format!("bucket create failed: {e}")))?;

        tracing::info!(
            "bucket created: {} ({})",
            options.bucket,
            response.response_code
        );
        Ok(())
    }
}

#[async_trait]
impl ObjectStore for S3Store {
    async fn stat(&self, key: &str) -> Result<ObjectMeta> {
        let (head, code) = self
            .bucket
            .head_object(key)
            .await
            .map_err(|e| map_s3_error(key, e))?;

        match code {
            200 => {}
            404 => return Err(StorageError::NotFound(key.to_string())),
            code => {
                return Err(StorageError::Backend(format!(
                    "head for '{key}' returned status {code}"
                )))
            }
        }

        let size = match head.content_length {
            Some(n) if n < 0 => return Err(StorageError::Overflow),
            Some(n) => Some(n as u64),
            None => None,
        };

        Ok(ObjectMeta {
            key: key.to_string(),
            size,
            last_modified: head.last_modified.as_deref().and_then(parse_timestamp),
            // S3不返回对象创建时间
            created: None,
            content_type: head.content_type,
            e_tag: head.e_tag,
        })
    }

    async fn get(&self, key: &str) -> Result<Vec<u8>> {
        let response = self
            .bucket
            .get_object(key)
            .await
            .map_err(|e| map_s3_error(key, e))?;

        match response.status_code() {
            200 => Ok(response.bytes().to_vec()),
            404 => Err(StorageError::NotFound(key.to_string())),
            code => Err(StorageError::Backend(format!(
                "get for '{key}' returned status {code}"
            ))),
        }
    }

    async fn put(&self, key: &str, data: &[u8], options: &PutOptions) -> Result<()> {
        // rust-s3的简单上传接口不带预设ACL参数，访问提示由支持的后端生效
        if options.access == AccessHint::OwnerRead {
            tracing::debug!("access hint owner-read for '{}' (advisory)", key);
        }

        self.bucket
            .put_object_with_content_type(key, data, &options.content_type)
            .await
            .map_err(|e| map_s3_error(key, e))?;
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<()> {
        self.bucket
            .delete_object(key)
            .await
            .map_err(|e| map_s3_error(key, e))?;
        Ok(())
    }

    async fn list(&self, prefix: &str, delimiter: Option<&str>) -> Result<ListPage> {
        let results = self
            .bucket
            .list(prefix.to_string(), delimiter.map(|d| d.to_string()))
            .await
            .map_err(|e| map_s3_error(prefix, e))?;

        let mut page = ListPage::default();
        for result in results {
            for cp in result.common_prefixes.unwrap_or_default() {
                page.common_prefixes.push(cp.prefix);
            }
            for object in result.contents {
                page.objects.push(ListedObject {
                    size: object.size as u64,
                    last_modified: parse_timestamp(&object.last_modified),
                    key: object.key,
                });
            }
        }
        Ok(page)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn credentials_from_json_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{"access_key_id":"AKID","secret_access_key":"SECRET","session_token":"TOKEN"}}"#
        )
        .unwrap();

        let credentials = load_credentials(file.path().to_str()).unwrap();
        assert_eq!(credentials.access_key.as_deref(), Some("AKID"));
        assert_eq!(credentials.secret_key.as_deref(), Some("SECRET"));
        assert_eq!(credentials.security_token.as_deref(), Some("TOKEN"));
    }

    #[test]
    fn missing_credential_file_is_fatal() {
        let error = load_credentials(Some("/nonexistent/credentials.json")).unwrap_err();
        assert!(matches!(error, StorageError::Credential(_)));
    }

    #[test]
    fn malformed_credential_file_is_fatal() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "not json").unwrap();

        let error = load_credentials(file.path().to_str()).unwrap_err();
        assert!(matches!(error, StorageError::Credential(_)));
    }

    #[test]
    fn timestamps_parse_in_both_formats() {
        assert!(parse_timestamp("Fri, 27 Sep 2024 12:00:00 GMT").is_some());
        assert!(parse_timestamp("2024-09-27T12:00:00.000Z").is_some());
        assert!(parse_timestamp("yesterday-ish").is_none());
    }

    #[test]
    fn http_404_maps_to_not_found() {
        let error = map_s3_error("media/a.png", S3Error::HttpFailWithBody(404, String::new()));
        assert!(error.is_not_found());

        let error = map_s3_error("media/a.png", S3Error::HttpFailWithBody(500, String::new()));
        assert!(matches!(error, StorageError::Backend(_)));
    }
}
