//! Hooks for recording pipeline events
//!
//! The pipeline reports every state transition through [`PipelineEventSink`]. The
//! surrounding application decides where events go (a database table, a queue, the
//! log). Recording is best effort: the pipeline ignores sink failures.

use async_trait::async_trait;

use crate::models::PipelineEvent;

/// Receiver for pipeline audit events
#[async_trait]
pub trait PipelineEventSink: Send + Sync {
    /// Record one event. An `Err` is logged by the caller and otherwise ignored.
    async fn record(&self, event: PipelineEvent) -> Result<(), String>;
}

/// No-op implementation for when event recording is disabled
pub struct NoOpEventSink;

#[async_trait]
impl PipelineEventSink for NoOpEventSink {
    async fn record(&self, _event: PipelineEvent) -> Result<(), String> {
        Ok(())
    }
}

/// Writes each event to the tracing subscriber as a structured record.
pub struct TracingEventSink;

#[async_trait]
impl PipelineEventSink for TracingEventSink {
    async fn record(&self, event: PipelineEvent) -> Result<(), String> {
        tracing::info!(
            listing_id = %event.listing_id,
            stage = %event.stage,
            action = event.action.as_str(),
            path = %event.path,
            previous_path = event.previous_path.as_deref().unwrap_or(""),
            metadata = %event.metadata,
            "Pipeline event"
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{PipelineAction, Stage};

    #[tokio::test]
    async fn builtin_sinks_never_fail() {
        let event = PipelineEvent::new("L1", Stage::Raw, PipelineAction::Ingest, "L1/raw/1-a.jpg");
        assert!(NoOpEventSink.record(event.clone()).await.is_ok());
        assert!(TracingEventSink.record(event).await.is_ok());
    }
}
