//! Storage abstraction trait
//!
//! This module defines the ObjectStorage trait that all storage backends must implement.

use crate::StorageBackend;
use async_trait::async_trait;
use bytes::Bytes;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::time::Duration;
use thiserror::Error;

/// Storage operation errors
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Upload failed: {0}")]
    UploadFailed(String),

    #[error("Object already exists: {0}")]
    AlreadyExists(String),

    #[error("Copy failed: {0}")]
    CopyFailed(String),

    #[error("Delete failed: {0}")]
    DeleteFailed(String),

    #[error("List failed: {0}")]
    ListFailed(String),

    #[error("File not found: {0}")]
    NotFound(String),

    #[error("Invalid storage key: {0}")]
    InvalidKey(String),

    #[error("Storage backend error: {0}")]
    BackendError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    ConfigError(String),
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

/// Options for [`ObjectStorage::upload`]
#[derive(Debug, Clone)]
pub struct UploadOptions {
    pub content_type: String,
    /// Overwrite an existing object at the same key. When false a collision is an
    /// [`StorageError::AlreadyExists`] error.
    pub upsert: bool,
}

impl UploadOptions {
    /// Create-only upload with the given content type.
    pub fn create(content_type: impl Into<String>) -> Self {
        Self {
            content_type: content_type.into(),
            upsert: false,
        }
    }
}

/// One entry of a single-level listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ObjectEntry {
    /// Last path segment (file or folder name)
    pub name: String,
    /// Size in bytes; `None` for folders
    pub size: Option<u64>,
    pub last_modified: Option<DateTime<Utc>>,
    /// True when the entry is a folder (common prefix) rather than an object
    pub is_prefix: bool,
}

impl ObjectEntry {
    pub fn object(name: impl Into<String>, size: u64, last_modified: Option<DateTime<Utc>>) -> Self {
        Self {
            name: name.into(),
            size: Some(size),
            last_modified,
            is_prefix: false,
        }
    }

    pub fn prefix(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            size: None,
            last_modified: None,
            is_prefix: true,
        }
    }
}

/// Storage abstraction trait
///
/// Buckets are addressed by name on every call so a single backend instance serves
/// all pipeline stages. Keys must not contain `..` or a leading `/`.
#[async_trait]
pub trait ObjectStorage: Send + Sync {
    /// Store `data` at `bucket/key`.
    async fn upload(
        &self,
        bucket: &str,
        key: &str,
        data: Bytes,
        options: UploadOptions,
    ) -> StorageResult<()>;

    /// Copy an object, possibly across buckets. The destination is overwritten.
    async fn copy(
        &self,
        from_bucket: &str,
        from_key: &str,
        to_bucket: &str,
        to_key: &str,
    ) -> StorageResult<()>;

    /// Delete a batch of objects. Keys that do not exist are ignored.
    async fn remove(&self, bucket: &str, keys: &[String]) -> StorageResult<()>;

    /// List the direct children of `prefix` (one level, folders as prefixes), ordered
    /// by name and truncated to `limit`. An empty prefix lists the bucket root.
    async fn list(&self, bucket: &str, prefix: &str, limit: usize)
        -> StorageResult<Vec<ObjectEntry>>;

    /// Public URL of an object. Only meaningful for buckets served publicly.
    fn public_url(&self, bucket: &str, key: &str) -> String;

    /// Generate a presigned PUT URL for a direct client upload to exactly this key.
    ///
    /// Only supported by S3 backends; other backends return a `ConfigError`.
    async fn create_signed_upload_url(
        &self,
        bucket: &str,
        key: &str,
        expires_in: Duration,
    ) -> StorageResult<String>;

    /// Get the storage backend type
    fn backend_type(&self) -> StorageBackend;
}
