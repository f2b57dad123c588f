//! Data models for the media pipeline
//!
//! Each sub-module represents a specific feature area: the stage table, the external
//! media-asset record, pipeline events and status, and cleanup reporting.

mod cleanup;
mod media;
mod pipeline;
mod stage;

// Re-export all models for convenient imports
pub use cleanup::*;
pub use media::*;
pub use pipeline::*;
pub use stage::*;
