//! Configuration module
//!
//! Storage backend selection, backend credentials, and pipeline tuning, read from the
//! environment (and a `.env` file when present).

use std::env;

use crate::storage_types::StorageBackend;

const SIGNED_UPLOAD_EXPIRY_SECS: u64 = 7200;
const CLEANUP_PAGE_SIZE: usize = 1000;

/// Pipeline configuration
#[derive(Clone, Debug)]
pub struct Config {
    pub environment: String,
    // Storage configuration
    pub storage_backend: Option<StorageBackend>,
    pub s3_region: Option<String>,
    pub s3_endpoint: Option<String>, // Custom endpoint for S3-compatible providers (MinIO, Supabase, etc.)
    pub aws_region: Option<String>,
    pub local_storage_path: Option<String>,
    pub local_storage_base_url: Option<String>,
    /// Origin of publicly served native media, used to recognise native URLs
    pub storage_public_origin: Option<String>,
    // Pipeline tuning
    pub signed_upload_expiry_secs: u64,
    pub cleanup_page_size: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            environment: "development".to_string(),
            storage_backend: None,
            s3_region: None,
            s3_endpoint: None,
            aws_region: None,
            local_storage_path: None,
            local_storage_base_url: None,
            storage_public_origin: None,
            signed_upload_expiry_secs: SIGNED_UPLOAD_EXPIRY_SECS,
            cleanup_page_size: CLEANUP_PAGE_SIZE,
        }
    }
}

fn non_empty_var(name: &str) -> Option<String> {
    env::var(name).ok().filter(|s| !s.is_empty())
}

impl Config {
    pub fn from_env() -> Result<Self, anyhow::Error> {
        dotenvy::dotenv().ok();

        let environment = env::var("ENVIRONMENT")
            .or_else(|_| env::var("APP_ENV"))
            .unwrap_or_else(|_| "development".to_string());

        let storage_backend = match non_empty_var("STORAGE_BACKEND") {
            Some(value) => Some(value.parse::<StorageBackend>()?),
            None => None,
        };

        // Backend requirements are checked by `validate` once a backend is needed
        let config = Config {
            environment,
            storage_backend,
            s3_region: non_empty_var("S3_REGION"),
            s3_endpoint: non_empty_var("S3_ENDPOINT"),
            aws_region: non_empty_var("AWS_REGION"),
            local_storage_path: non_empty_var("LOCAL_STORAGE_PATH"),
            local_storage_base_url: non_empty_var("LOCAL_STORAGE_BASE_URL"),
            storage_public_origin: non_empty_var("STORAGE_PUBLIC_ORIGIN"),
            signed_upload_expiry_secs: env::var("SIGNED_UPLOAD_EXPIRY_SECS")
                .unwrap_or_else(|_| SIGNED_UPLOAD_EXPIRY_SECS.to_string())
                .parse()
                .unwrap_or(SIGNED_UPLOAD_EXPIRY_SECS),
            cleanup_page_size: env::var("CLEANUP_PAGE_SIZE")
                .unwrap_or_else(|_| CLEANUP_PAGE_SIZE.to_string())
                .parse()
                .unwrap_or(CLEANUP_PAGE_SIZE),
        };

        Ok(config)
    }

    pub fn storage_backend(&self) -> StorageBackend {
        self.storage_backend.unwrap_or(StorageBackend::S3)
    }

    /// Region for the S3 backend, preferring `S3_REGION` over `AWS_REGION`.
    pub fn s3_region(&self) -> Option<&str> {
        self.s3_region.as_deref().or(self.aws_region.as_deref())
    }

    pub fn validate(&self) -> Result<(), anyhow::Error> {
        if self.signed_upload_expiry_secs == 0 {
            return Err(anyhow::anyhow!(
                "SIGNED_UPLOAD_EXPIRY_SECS must be greater than zero"
            ));
        }

        if self.cleanup_page_size == 0 {
            return Err(anyhow::anyhow!("CLEANUP_PAGE_SIZE must be greater than zero"));
        }

        match self.storage_backend() {
            StorageBackend::S3 => {
                if self.s3_region().is_none() {
                    return Err(anyhow::anyhow!(
                        "S3_REGION or AWS_REGION must be set when using S3 storage backend"
                    ));
                }
            }
            StorageBackend::Local => {
                if self.local_storage_path.is_none() {
                    return Err(anyhow::anyhow!(
                        "LOCAL_STORAGE_PATH must be set when using local storage backend"
                    ));
                }
                if self.local_storage_base_url.is_none() {
                    return Err(anyhow::anyhow!(
                        "LOCAL_STORAGE_BASE_URL must be set when using local storage backend"
                    ));
                }
            }
        }

        Ok(())
    }
}
