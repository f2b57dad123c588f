//! Shotline Services Layer
//!
//! This crate is the **business service layer** of the media pipeline: stage
//! transitions (`PipelineService`) and retention-based reclamation
//! (`CleanupService`). Both take their storage backend by injection. Writes return
//! `PipelineError`; reads and sweeps report failures inside their results.

pub mod error;
pub mod pipeline;

#[cfg(feature = "cleanup")]
pub mod cleanup;

#[cfg(feature = "cleanup")]
pub use cleanup::CleanupService;
pub use error::PipelineError;
pub use pipeline::{IngestRequest, PipelineService, PresignedUploadRequest};
pub use shotline_storage::{
    create_storage, ObjectEntry, ObjectStorage, StorageBackend, StorageError, StorageResult,
};
