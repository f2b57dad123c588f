//! Shotline Core Library
//!
//! This crate provides the domain models, error metadata, configuration, and the
//! pure URL-resolution helpers shared by every Shotline component.

pub mod config;
pub mod error;
pub mod hooks;
pub mod media_url;
pub mod models;
pub mod storage_types;

// Re-export commonly used types
pub use config::Config;
pub use error::{ErrorMetadata, LogLevel};
pub use hooks::{NoOpEventSink, PipelineEventSink, TracingEventSink};
pub use models::{
    CleanupResult, CleanupSummary, MediaAsset, MediaStats, MediaUrlSource, PipelineAction,
    PipelineEvent, PipelineStatus, ReconcileResult, ResolvedMedia, Stage, StageStats,
    StorageStats,
};
pub use storage_types::StorageBackend;
