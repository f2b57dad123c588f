//! Pipeline events, operation outcomes, and per-listing status.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::Stage;

/// State-changing actions recorded in the pipeline event log.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PipelineAction {
    Ingest,
    PromoteToProcessing,
    PromoteToQc,
    PromoteToFinal,
    Reject,
    /// The final copy exists but the qc copy could not be removed.
    QcCleanupFailed,
}

impl PipelineAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            PipelineAction::Ingest => "ingest",
            PipelineAction::PromoteToProcessing => "promote_to_processing",
            PipelineAction::PromoteToQc => "promote_to_qc",
            PipelineAction::PromoteToFinal => "promote_to_final",
            PipelineAction::Reject => "reject",
            PipelineAction::QcCleanupFailed => "qc_cleanup_failed",
        }
    }
}

/// Audit entry for one state transition.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineEvent {
    pub listing_id: String,
    /// Stage the object ended up in (or was removed from, for rejections)
    pub stage: Stage,
    pub action: PipelineAction,
    pub path: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub previous_path: Option<String>,
    #[serde(default)]
    pub metadata: serde_json::Value,
    pub created_at: DateTime<Utc>,
}

impl PipelineEvent {
    pub fn new(
        listing_id: impl Into<String>,
        stage: Stage,
        action: PipelineAction,
        path: impl Into<String>,
    ) -> Self {
        Self {
            listing_id: listing_id.into(),
            stage,
            action,
            path: path.into(),
            previous_path: None,
            metadata: serde_json::Value::Null,
            created_at: Utc::now(),
        }
    }

    pub fn with_previous_path(mut self, previous_path: impl Into<String>) -> Self {
        self.previous_path = Some(previous_path.into());
        self
    }

    pub fn with_metadata(mut self, metadata: serde_json::Value) -> Self {
        self.metadata = metadata;
        self
    }
}

/// Result of a raw ingest.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct IngestOutcome {
    pub path: String,
}

/// Result of a non-destructive promotion (raw → processing, processing → qc).
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PromotionOutcome {
    pub new_path: String,
    pub previous_path: String,
}

/// Result of the qc → final promotion.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FinalOutcome {
    pub new_path: String,
    pub public_url: String,
    /// False when the qc copy survived; `reconcile_final_promotions` removes it later.
    pub source_removed: bool,
}

/// Result of a qc rejection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RejectOutcome {
    pub removed_path: String,
    pub reason: String,
}

/// A time-limited URL a client can PUT the raw upload to directly.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PresignedUpload {
    /// Raw-stage key the upload lands at
    pub path: String,
    pub signed_url: String,
    pub expires_at: DateTime<Utc>,
}

/// Object counts per stage for one listing.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct PipelineStatus {
    pub raw: usize,
    pub processing: usize,
    pub qc: usize,
    #[serde(rename = "final")]
    pub final_count: usize,
}

impl PipelineStatus {
    pub fn total(&self) -> usize {
        self.raw + self.processing + self.qc + self.final_count
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_serializes_final_key() {
        let status = PipelineStatus {
            raw: 1,
            processing: 2,
            qc: 3,
            final_count: 4,
        };
        let value = serde_json::to_value(status).unwrap();
        assert_eq!(value["final"], 4);
        assert_eq!(status.total(), 10);
    }

    #[test]
    fn event_builder_keeps_previous_path() {
        let event = PipelineEvent::new("L1", Stage::Qc, PipelineAction::PromoteToQc, "L1/qc/1-a.jpg")
            .with_previous_path("L1/processing/1-b.jpg");
        assert_eq!(event.previous_path.as_deref(), Some("L1/processing/1-b.jpg"));
        assert_eq!(event.action.as_str(), "promote_to_qc");
    }
}
