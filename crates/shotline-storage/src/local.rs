use crate::traits::{ObjectEntry, ObjectStorage, StorageError, StorageResult, UploadOptions};
use crate::StorageBackend;
use async_trait::async_trait;
use bytes::Bytes;
use chrono::{DateTime, Utc};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::fs;
use tokio::io::AsyncWriteExt;

/// Local filesystem storage implementation
///
/// Each bucket is a directory below `base_path`; keys map to relative paths inside it.
#[derive(Clone)]
pub struct LocalStorage {
    base_path: PathBuf,
    base_url: String,
}

impl LocalStorage {
    /// Create a new LocalStorage instance
    ///
    /// # Arguments
    /// * `base_path` - Root directory for all buckets (e.g., "/var/lib/shotline")
    /// * `base_url` - Base URL for serving files (e.g., "http://localhost:4000/media")
    pub async fn new(base_path: impl Into<PathBuf>, base_url: String) -> StorageResult<Self> {
        let base_path = base_path.into();

        fs::create_dir_all(&base_path).await.map_err(|e| {
            StorageError::ConfigError(format!(
                "Failed to create storage directory {}: {}",
                base_path.display(),
                e
            ))
        })?;

        Ok(LocalStorage {
            base_path,
            base_url,
        })
    }

    fn validate_segment(value: &str, what: &str) -> StorageResult<()> {
        if value.contains("..") || value.starts_with('/') || value.contains('\\') {
            return Err(StorageError::InvalidKey(format!(
                "{} contains invalid characters",
                what
            )));
        }
        Ok(())
    }

    /// Convert bucket and key to a filesystem path with security validation
    ///
    /// Rejects anything that could escape the bucket directory.
    fn key_to_path(&self, bucket: &str, storage_key: &str) -> StorageResult<PathBuf> {
        Self::validate_segment(bucket, "Bucket name")?;
        if bucket.is_empty() || bucket.contains('/') {
            return Err(StorageError::InvalidKey(
                "Bucket name contains invalid characters".to_string(),
            ));
        }
        Self::validate_segment(storage_key, "Storage key")?;

        Ok(self.base_path.join(bucket).join(storage_key))
    }

    /// Generate public URL for file
    fn generate_url(&self, bucket: &str, key: &str) -> String {
        format!("{}/{}/{}", self.base_url.trim_end_matches('/'), bucket, key)
    }

    /// Ensure parent directory exists
    async fn ensure_parent_dir(&self, path: &Path) -> StorageResult<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).await?;
        }
        Ok(())
    }
}

#[async_trait]
impl ObjectStorage for LocalStorage {
    async fn upload(
        &self,
        bucket: &str,
        key: &str,
        data: Bytes,
        options: UploadOptions,
    ) -> StorageResult<()> {
        let path = self.key_to_path(bucket, key)?;
        let size = data.len();

        self.ensure_parent_dir(&path).await?;

        let start = std::time::Instant::now();

        let mut open = fs::OpenOptions::new();
        open.write(true);
        if options.upsert {
            open.create(true).truncate(true);
        } else {
            open.create_new(true);
        }

        let mut file = open.open(&path).await.map_err(|e| match e.kind() {
            ErrorKind::AlreadyExists => StorageError::AlreadyExists(key.to_string()),
            _ => StorageError::UploadFailed(format!(
                "Failed to create file {}: {}",
                path.display(),
                e
            )),
        })?;

        file.write_all(&data).await.map_err(|e| {
            StorageError::UploadFailed(format!("Failed to write file {}: {}", path.display(), e))
        })?;

        file.sync_all().await.map_err(|e| {
            StorageError::UploadFailed(format!("Failed to sync file {}: {}", path.display(), e))
        })?;

        tracing::info!(
            path = %path.display(),
            bucket = %bucket,
            key = %key,
            content_type = %options.content_type,
            size_bytes = size,
            duration_ms = start.elapsed().as_secs_f64() * 1000.0,
            "Local storage upload successful"
        );

        Ok(())
    }

    async fn copy(
        &self,
        from_bucket: &str,
        from_key: &str,
        to_bucket: &str,
        to_key: &str,
    ) -> StorageResult<()> {
        let from_path = self.key_to_path(from_bucket, from_key)?;
        let to_path = self.key_to_path(to_bucket, to_key)?;

        if !fs::try_exists(&from_path).await.unwrap_or(false) {
            return Err(StorageError::NotFound(format!("{}/{}", from_bucket, from_key)));
        }

        self.ensure_parent_dir(&to_path).await?;

        fs::copy(&from_path, &to_path).await.map_err(|e| {
            StorageError::CopyFailed(format!(
                "Failed to copy {} to {}: {}",
                from_path.display(),
                to_path.display(),
                e
            ))
        })?;

        tracing::info!(
            from_bucket = %from_bucket,
            from_key = %from_key,
            to_bucket = %to_bucket,
            to_key = %to_key,
            "Local storage copy successful"
        );

        Ok(())
    }

    async fn remove(&self, bucket: &str, keys: &[String]) -> StorageResult<()> {
        let start = std::time::Instant::now();

        // Validate the whole batch before touching anything
        let paths = keys
            .iter()
            .map(|key| self.key_to_path(bucket, key))
            .collect::<StorageResult<Vec<_>>>()?;

        for path in &paths {
            match fs::remove_file(path).await {
                Ok(()) => {}
                Err(e) if e.kind() == ErrorKind::NotFound => {}
                Err(e) => {
                    return Err(StorageError::DeleteFailed(format!(
                        "Failed to delete file {}: {}",
                        path.display(),
                        e
                    )))
                }
            }
        }

        tracing::info!(
            bucket = %bucket,
            count = paths.len(),
            duration_ms = start.elapsed().as_secs_f64() * 1000.0,
            "Local storage delete successful"
        );

        Ok(())
    }

    async fn list(
        &self,
        bucket: &str,
        prefix: &str,
        limit: usize,
    ) -> StorageResult<Vec<ObjectEntry>> {
        let dir = self.key_to_path(bucket, prefix.trim_end_matches('/'))?;

        let mut read_dir = match fs::read_dir(&dir).await {
            Ok(read_dir) => read_dir,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => {
                return Err(StorageError::ListFailed(format!(
                    "Failed to read directory {}: {}",
                    dir.display(),
                    e
                )))
            }
        };

        let mut entries = Vec::new();
        while let Some(entry) = read_dir
            .next_entry()
            .await
            .map_err(|e| StorageError::ListFailed(e.to_string()))?
        {
            let name = entry.file_name().to_string_lossy().into_owned();
            let meta = entry
                .metadata()
                .await
                .map_err(|e| StorageError::ListFailed(e.to_string()))?;

            if meta.is_dir() {
                entries.push(ObjectEntry::prefix(name));
            } else {
                let modified = meta.modified().ok().map(DateTime::<Utc>::from);
                entries.push(ObjectEntry::object(name, meta.len(), modified));
            }
        }

        entries.sort_by(|a, b| a.name.cmp(&b.name));
        entries.truncate(limit);
        Ok(entries)
    }

    fn public_url(&self, bucket: &str, key: &str) -> String {
        self.generate_url(bucket, key)
    }

    async fn create_signed_upload_url(
        &self,
        _bucket: &str,
        _storage_key: &str,
        _expires_in: Duration,
    ) -> StorageResult<String> {
        Err(StorageError::ConfigError(
            "Signed upload URLs are not supported by the local storage backend".to_string(),
        ))
    }

    fn backend_type(&self) -> StorageBackend {
        StorageBackend::Local
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    async fn storage(dir: &Path) -> LocalStorage {
        LocalStorage::new(dir, "http://localhost:4000/media".to_string())
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_upload_and_list() {
        let dir = tempdir().unwrap();
        let storage = storage(dir.path()).await;

        storage
            .upload(
                "pipeline-raw",
                "L1/raw/1700000000000-abc123.jpg",
                Bytes::from_static(b"test data"),
                UploadOptions::create("image/jpeg"),
            )
            .await
            .unwrap();

        let root = storage.list("pipeline-raw", "", 1000).await.unwrap();
        assert_eq!(root, vec![ObjectEntry::prefix("L1")]);

        let files = storage.list("pipeline-raw", "L1/raw", 1000).await.unwrap();
        assert_eq!(files.len(), 1);
        assert_eq!(files[0].name, "1700000000000-abc123.jpg");
        assert_eq!(files[0].size, Some(9));
        assert!(!files[0].is_prefix);
    }

    #[tokio::test]
    async fn test_create_only_upload_collides() {
        let dir = tempdir().unwrap();
        let storage = storage(dir.path()).await;
        let key = "L1/raw/1-abc.jpg";

        storage
            .upload("pipeline-raw", key, Bytes::from_static(b"a"), UploadOptions::create("image/jpeg"))
            .await
            .unwrap();

        let result = storage
            .upload("pipeline-raw", key, Bytes::from_static(b"b"), UploadOptions::create("image/jpeg"))
            .await;
        assert!(matches!(result, Err(StorageError::AlreadyExists(_))));

        let upsert = UploadOptions {
            content_type: "image/jpeg".to_string(),
            upsert: true,
        };
        assert!(storage
            .upload("pipeline-raw", key, Bytes::from_static(b"c"), upsert)
            .await
            .is_ok());
    }

    #[tokio::test]
    async fn test_path_traversal_rejected() {
        let dir = tempdir().unwrap();
        let storage = storage(dir.path()).await;

        let result = storage.list("pipeline-raw", "../../etc", 10).await;
        assert!(matches!(result, Err(StorageError::InvalidKey(_))));

        let result = storage
            .remove("pipeline-raw", &["../etc/passwd".to_string()])
            .await;
        assert!(matches!(result, Err(StorageError::InvalidKey(_))));

        let result = storage
            .copy("pipeline-raw", "/etc/passwd", "pipeline-final", "L1/final/x.jpg")
            .await;
        assert!(matches!(result, Err(StorageError::InvalidKey(_))));

        let result = storage.list("../outside", "", 10).await;
        assert!(matches!(result, Err(StorageError::InvalidKey(_))));
    }

    #[tokio::test]
    async fn test_remove_nonexistent_is_ok() {
        let dir = tempdir().unwrap();
        let storage = storage(dir.path()).await;

        let result = storage
            .remove("pipeline-raw", &["L1/raw/missing.jpg".to_string()])
            .await;
        assert!(result.is_ok());
    }

    #[tokio::test]
    async fn test_copy_across_buckets() {
        let dir = tempdir().unwrap();
        let storage = storage(dir.path()).await;

        storage
            .upload(
                "pipeline-qc",
                "L1/qc/1-abc.jpg",
                Bytes::from_static(b"original content"),
                UploadOptions::create("image/jpeg"),
            )
            .await
            .unwrap();

        storage
            .copy("pipeline-qc", "L1/qc/1-abc.jpg", "pipeline-final", "L1/final/1-abc.jpg")
            .await
            .unwrap();

        let copied = fs::read(dir.path().join("pipeline-final/L1/final/1-abc.jpg"))
            .await
            .unwrap();
        assert_eq!(copied, b"original content");

        let missing = storage
            .copy("pipeline-qc", "L1/qc/nope.jpg", "pipeline-final", "L1/final/nope.jpg")
            .await;
        assert!(matches!(missing, Err(StorageError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_list_missing_prefix_is_empty_and_limited() {
        let dir = tempdir().unwrap();
        let storage = storage(dir.path()).await;

        assert!(storage.list("pipeline-raw", "L9/raw", 10).await.unwrap().is_empty());

        for i in 0..5 {
            storage
                .upload(
                    "pipeline-raw",
                    &format!("L1/raw/{}-abc.jpg", i),
                    Bytes::from_static(b"x"),
                    UploadOptions::create("image/jpeg"),
                )
                .await
                .unwrap();
        }
        let files = storage.list("pipeline-raw", "L1/raw", 3).await.unwrap();
        let names: Vec<_> = files.iter().map(|f| f.name.as_str()).collect();
        assert_eq!(names, vec!["0-abc.jpg", "1-abc.jpg", "2-abc.jpg"]);
    }

    #[tokio::test]
    async fn test_public_url_and_signing() {
        let dir = tempdir().unwrap();
        let storage = storage(dir.path()).await;

        assert_eq!(
            storage.public_url("pipeline-final", "L1/final/1-abc.jpg"),
            "http://localhost:4000/media/pipeline-final/L1/final/1-abc.jpg"
        );
        let signed = storage
            .create_signed_upload_url("pipeline-raw", "L1/raw/1-abc.jpg", Duration::from_secs(60))
            .await;
        assert!(matches!(signed, Err(StorageError::ConfigError(_))));
    }
}
