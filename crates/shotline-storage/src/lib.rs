//! Shotline Storage Library
//!
//! This crate provides the bucket-addressed storage abstraction used by the media
//! pipeline, with implementations for S3 (and S3-compatible providers) and the local
//! filesystem.
//!
//! # Storage key format
//!
//! Every stage owns one bucket. Inside a bucket, keys are listing-scoped:
//!
//! `{listingId}/{stage}[/{category}]/{timestampMillis}-{randomSuffix}.{ext}`
//!
//! Cleanup parses the timestamp back out of the file name to decide an object's age,
//! so every writer must go through the `keys` module.

pub mod factory;
pub mod keys;
#[cfg(feature = "storage-local")]
pub mod local;
#[cfg(feature = "storage-s3")]
pub mod s3;
pub mod traits;

// Re-export commonly used types
pub use factory::create_storage;
pub use keys::{generate_path, parse_key_timestamp, sanitize_listing_id};
#[cfg(feature = "storage-local")]
pub use local::LocalStorage;
pub use shotline_core::StorageBackend;
#[cfg(feature = "storage-s3")]
pub use s3::S3Storage;
pub use traits::{ObjectEntry, ObjectStorage, StorageError, StorageResult, UploadOptions};
