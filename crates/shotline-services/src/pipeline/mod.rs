mod service;

pub use service::{IngestRequest, PipelineService, PresignedUploadRequest};
