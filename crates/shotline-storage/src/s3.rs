use crate::traits::{ObjectEntry, ObjectStorage, StorageError, StorageResult, UploadOptions};
use crate::StorageBackend;
use async_trait::async_trait;
use bytes::Bytes;
use http::Method;
use object_store::aws::{AmazonS3, AmazonS3Builder};
use object_store::path::Path;
use object_store::signer::Signer;
use object_store::Error as ObjectStoreError;
use object_store::{
    Attribute, AttributeValue, Attributes, ObjectStore, ObjectStoreExt, PutMode, PutOptions,
    PutPayload, Result as ObjectResult,
};
use std::collections::HashMap;
use std::time::Duration;

/// S3 storage implementation
///
/// Holds one object store per bucket; every pipeline stage bucket must be registered
/// at construction.
#[derive(Clone)]
pub struct S3Storage {
    stores: HashMap<String, AmazonS3>,
    region: String,
    endpoint_url: Option<String>, // Custom endpoint for S3-compatible providers
}

impl S3Storage {
    /// Create a new S3Storage instance
    ///
    /// # Arguments
    /// * `buckets` - Bucket names this instance may address
    /// * `region` - AWS region (or region identifier for S3-compatible providers)
    /// * `endpoint_url` - Optional custom endpoint URL for S3-compatible providers
    ///   (e.g., "http://localhost:9000" for MinIO)
    pub async fn new(
        buckets: &[&str],
        region: String,
        endpoint_url: Option<String>,
    ) -> StorageResult<Self> {
        let mut stores = HashMap::with_capacity(buckets.len());

        for bucket in buckets {
            // Build AmazonS3 object store from environment and explicit settings.
            let mut builder = AmazonS3Builder::from_env()
                .with_region(region.clone())
                .with_bucket_name(bucket.to_string());

            if let Some(ref endpoint) = endpoint_url {
                let allow_http = endpoint.starts_with("http://");
                builder = builder
                    .with_endpoint(endpoint.clone())
                    .with_allow_http(allow_http);
            }

            let store = builder
                .build()
                .map_err(|e| StorageError::ConfigError(e.to_string()))?;
            stores.insert(bucket.to_string(), store);
        }

        Ok(S3Storage {
            stores,
            region,
            endpoint_url,
        })
    }

    fn store(&self, bucket: &str) -> StorageResult<&AmazonS3> {
        self.stores.get(bucket).ok_or_else(|| {
            StorageError::ConfigError(format!("Bucket {} is not configured", bucket))
        })
    }

    /// Generate public URL for S3 object
    ///
    /// For AWS S3, uses the standard format: https://{bucket}.s3.{region}.amazonaws.com/{key}
    /// For S3-compatible providers, uses path-style URLs on the endpoint
    fn generate_url(&self, bucket: &str, key: &str) -> String {
        if let Some(ref endpoint) = self.endpoint_url {
            let base_url = endpoint.trim_end_matches('/');
            format!("{}/{}/{}", base_url, bucket, key)
        } else {
            format!("https://{}.s3.{}.amazonaws.com/{}", bucket, self.region, key)
        }
    }
}

#[async_trait]
impl ObjectStorage for S3Storage {
    async fn upload(
        &self,
        bucket: &str,
        key: &str,
        data: Bytes,
        options: UploadOptions,
    ) -> StorageResult<()> {
        let store = self.store(bucket)?;
        let size = data.len() as u64;
        let location = Path::from(key.to_string());

        let mut attributes = Attributes::new();
        attributes.insert(
            Attribute::ContentType,
            AttributeValue::from(options.content_type.clone()),
        );
        let put_options = PutOptions {
            mode: if options.upsert {
                PutMode::Overwrite
            } else {
                PutMode::Create
            },
            attributes,
            ..Default::default()
        };

        let start = std::time::Instant::now();

        let result: ObjectResult<_> = store
            .put_opts(&location, PutPayload::from(data), put_options)
            .await;

        result.map_err(|e| {
            tracing::error!(
                error = %e,
                bucket = %bucket,
                key = %key,
                size_bytes = size,
                duration_ms = start.elapsed().as_secs_f64() * 1000.0,
                "S3 upload failed"
            );
            match e {
                ObjectStoreError::AlreadyExists { .. } | ObjectStoreError::Precondition { .. } => {
                    StorageError::AlreadyExists(key.to_string())
                }
                other => StorageError::UploadFailed(other.to_string()),
            }
        })?;

        tracing::info!(
            bucket = %bucket,
            key = %key,
            size_bytes = size,
            duration_ms = start.elapsed().as_secs_f64() * 1000.0,
            "S3 upload successful"
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
        let start = std::time::Instant::now();
        let from = Path::from(from_key.to_string());
        let to = Path::from(to_key.to_string());
        let source = self.store(from_bucket)?;

        let not_found = |e: ObjectStoreError| match e {
            ObjectStoreError::NotFound { .. } => {
                StorageError::NotFound(format!("{}/{}", from_bucket, from_key))
            }
            other => StorageError::CopyFailed(other.to_string()),
        };

        if from_bucket == to_bucket {
            let copy_result: ObjectResult<_> = source.copy(&from, &to).await;
            copy_result.map_err(not_found)?;
        } else {
            // object_store has no cross-bucket copy; stream through this process
            let target = self.store(to_bucket)?;
            copy_between(source, &from, target, &to)
                .await
                .map_err(not_found)?;
        }

        tracing::info!(
            from_bucket = %from_bucket,
            from_key = %from_key,
            to_bucket = %to_bucket,
            to_key = %to_key,
            duration_ms = start.elapsed().as_secs_f64() * 1000.0,
            "S3 copy successful"
        );

        Ok(())
    }

    async fn remove(&self, bucket: &str, keys: &[String]) -> StorageResult<()> {
        let store = self.store(bucket)?;
        let start = std::time::Instant::now();

        for key in keys {
            let location = Path::from(key.to_string());
            let result: ObjectResult<_> = store.delete(&location).await;

            match result {
                Ok(_) | Err(ObjectStoreError::NotFound { .. }) => {}
                Err(e) => {
                    tracing::error!(
                        error = %e,
                        bucket = %bucket,
                        key = %key,
                        duration_ms = start.elapsed().as_secs_f64() * 1000.0,
                        "S3 delete failed"
                    );
                    return Err(StorageError::DeleteFailed(e.to_string()));
                }
            }
        }

        tracing::info!(
            bucket = %bucket,
            count = keys.len(),
            duration_ms = start.elapsed().as_secs_f64() * 1000.0,
            "S3 delete successful"
        );

        Ok(())
    }

    async fn list(
        &self,
        bucket: &str,
        prefix: &str,
        limit: usize,
    ) -> StorageResult<Vec<ObjectEntry>> {
        let store = self.store(bucket)?;
        let prefix = prefix.trim_end_matches('/');
        let location = (!prefix.is_empty()).then(|| Path::from(prefix.to_string()));

        let result: ObjectResult<_> = store.list_with_delimiter(location.as_ref()).await;
        let listing = result.map_err(|e| {
            tracing::error!(error = %e, bucket = %bucket, prefix = %prefix, "S3 list failed");
            StorageError::ListFailed(e.to_string())
        })?;

        let mut entries: Vec<ObjectEntry> = listing
            .common_prefixes
            .iter()
            .filter_map(|p| p.filename().map(ObjectEntry::prefix))
            .chain(listing.objects.iter().filter_map(|meta| {
                meta.location.filename().map(|name| {
                    ObjectEntry::object(name, meta.size, Some(meta.last_modified))
                })
            }))
            .collect();

        entries.sort_by(|a, b| a.name.cmp(&b.name));
        entries.truncate(limit);
        Ok(entries)
    }

    fn public_url(&self, bucket: &str, key: &str) -> String {
        self.generate_url(bucket, key)
    }

    async fn create_signed_upload_url(
        &self,
        bucket: &str,
        storage_key: &str,
        expires_in: Duration,
    ) -> StorageResult<String> {
        let store = self.store(bucket)?;
        let location = Path::from(storage_key.to_string());
        let url_result: ObjectResult<_> = store
            .signed_url(Method::PUT, &location, expires_in)
            .await;

        let url = url_result
            .map_err(|e| StorageError::BackendError(e.to_string()))?
            .to_string();

        Ok(url)
    }

    fn backend_type(&self) -> StorageBackend {
        StorageBackend::S3
    }
}

/// Read an object and write it to another store with the same attributes.
async fn copy_between(
    source: &impl ObjectStore,
    from: &Path,
    target: &impl ObjectStore,
    to: &Path,
) -> ObjectResult<()> {
    let object = source.get(from).await?;
    let attributes = object.attributes.clone();
    let bytes = object.bytes().await?;
    let options = PutOptions {
        attributes,
        ..Default::default()
    };
    target.put_opts(to, PutPayload::from(bytes), options).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use object_store::memory::InMemory;

    #[tokio::test]
    async fn test_public_url_formats() {
        let aws = S3Storage::new(&["pipeline-final"], "eu-west-1".to_string(), None)
            .await
            .unwrap();
        assert_eq!(
            aws.public_url("pipeline-final", "L1/final/1-abc.jpg"),
            "https://pipeline-final.s3.eu-west-1.amazonaws.com/L1/final/1-abc.jpg"
        );

        let minio = S3Storage::new(
            &["pipeline-final"],
            "us-east-1".to_string(),
            Some("http://localhost:9000/".to_string()),
        )
        .await
        .unwrap();
        assert_eq!(
            minio.public_url("pipeline-final", "L1/final/1-abc.jpg"),
            "http://localhost:9000/pipeline-final/L1/final/1-abc.jpg"
        );
    }

    #[tokio::test]
    async fn test_unknown_bucket_is_config_error() {
        let storage = S3Storage::new(&["pipeline-raw"], "eu-west-1".to_string(), None)
            .await
            .unwrap();
        let result = storage.list("pipeline-qc", "", 10).await;
        assert!(matches!(result, Err(StorageError::ConfigError(_))));
    }

    #[tokio::test]
    async fn test_cross_store_copy_keeps_content_type() {
        let source = InMemory::new();
        let target = InMemory::new();
        let from = Path::from("L1/qc/1700000000000-abc123.jpg");
        let to = Path::from("L1/final/1700000000000-abc123.jpg");

        let mut attributes = Attributes::new();
        attributes.insert(Attribute::ContentType, AttributeValue::from("image/jpeg"));
        source
            .put_opts(
                &from,
                PutPayload::from_static(b"jpeg bytes"),
                PutOptions {
                    attributes,
                    ..Default::default()
                },
            )
            .await
            .unwrap();

        copy_between(&source, &from, &target, &to).await.unwrap();

        let copied = target.get(&to).await.unwrap();
        assert_eq!(
            copied
                .attributes
                .get(&Attribute::ContentType)
                .map(|v| AsRef::<str>::as_ref(v)),
            Some("image/jpeg")
        );
        assert_eq!(
            copied.bytes().await.unwrap(),
            Bytes::from_static(b"jpeg bytes")
        );
    }
}
