use bytes::Bytes;
use chrono::Utc;
use shotline_core::error::log_error;
use shotline_core::models::{
    FinalOutcome, IngestOutcome, PipelineAction, PipelineEvent, PipelineStatus, PresignedUpload,
    PromotionOutcome, RejectOutcome, Stage,
};
use shotline_core::PipelineEventSink;
use shotline_storage::keys::{file_name, generate_path, is_generated_file_name, stage_prefix};
use shotline_storage::{ObjectEntry, ObjectStorage, UploadOptions};
use std::sync::Arc;
use std::time::Duration;

use crate::error::PipelineError;

const DEFAULT_SIGNED_UPLOAD_EXPIRY: Duration = Duration::from_secs(7200);
const STAGE_LIST_LIMIT: usize = 1000;

/// Bytes and descriptors for a raw ingest.
#[derive(Debug, Clone)]
pub struct IngestRequest {
    pub listing_id: String,
    pub data: Bytes,
    pub filename: String,
    pub content_type: String,
    pub category: Option<String>,
    /// Free-form metadata attached to the ingest event
    pub metadata: Option<serde_json::Value>,
}

/// Parameters for a direct-to-storage raw upload.
#[derive(Debug, Clone)]
pub struct PresignedUploadRequest {
    pub listing_id: String,
    pub filename: String,
    pub content_type: String,
    pub category: Option<String>,
    /// Overrides the service default lifetime
    pub expires_in: Option<Duration>,
}

/// Orchestrates the raw → processing → qc → final lifecycle.
///
/// Promotions copy rather than move. Only the final promotion and a qc rejection
/// delete their source; abandoned raw/processing copies are left for cleanup.
///
/// Promotions of the same source path are not deduplicated: two concurrent
/// `promote_to_processing` calls for one raw path produce two processing copies.
#[derive(Clone)]
pub struct PipelineService {
    storage: Arc<dyn ObjectStorage>,
    events: Arc<dyn PipelineEventSink>,
    signed_upload_expiry: Duration,
}

fn require<'a>(value: Option<&'a str>, field: &'static str) -> Result<&'a str, PipelineError> {
    value
        .filter(|v| !v.trim().is_empty())
        .ok_or(PipelineError::MissingField(field))
}

impl PipelineService {
    pub fn new(storage: Arc<dyn ObjectStorage>, events: Arc<dyn PipelineEventSink>) -> Self {
        Self {
            storage,
            events,
            signed_upload_expiry: DEFAULT_SIGNED_UPLOAD_EXPIRY,
        }
    }

    pub fn with_signed_upload_expiry(mut self, expiry: Duration) -> Self {
        self.signed_upload_expiry = expiry;
        self
    }

    /// Record an event; failures are logged and dropped.
    async fn record_event(&self, event: PipelineEvent) {
        let action = event.action.as_str();
        if let Err(e) = self.events.record(event).await {
            tracing::debug!(error = %e, action, "Failed to record pipeline event");
        }
    }

    /// Upload bytes into the raw stage at a freshly generated path.
    #[tracing::instrument(skip(self, request), fields(
        pipeline.listing_id = %request.listing_id,
        pipeline.size = request.data.len()
    ))]
    pub async fn ingest_raw(&self, request: IngestRequest) -> Result<IngestOutcome, PipelineError> {
        let path = generate_path(
            &request.listing_id,
            Stage::Raw,
            &request.filename,
            request.category.as_deref(),
        );
        let size = request.data.len();

        self.storage
            .upload(
                Stage::Raw.bucket(),
                &path,
                request.data,
                UploadOptions::create(request.content_type.clone()),
            )
            .await
            .map_err(PipelineError::from)
            .inspect_err(|e| log_error(e, "ingest_raw"))?;

        let metadata = serde_json::json!({
            "filename": request.filename,
            "content_type": request.content_type,
            "size": size,
            "category": request.category,
            "extra": request.metadata,
        });
        self.record_event(
            PipelineEvent::new(&request.listing_id, Stage::Raw, PipelineAction::Ingest, &path)
                .with_metadata(metadata),
        )
        .await;

        tracing::info!(path = %path, "Ingested raw media");
        Ok(IngestOutcome { path })
    }

    /// Copy `source_path` from `from` into the next stage at a fresh path.
    async fn promote_copy(
        &self,
        listing_id: &str,
        from: Stage,
        to: Stage,
        source_path: &str,
        action: PipelineAction,
    ) -> Result<PromotionOutcome, PipelineError> {
        let new_path = generate_path(listing_id, to, source_path, None);

        self.storage
            .copy(from.bucket(), source_path, to.bucket(), &new_path)
            .await
            .map_err(PipelineError::from)
            .inspect_err(|e| log_error(e, action.as_str()))?;

        self.record_event(
            PipelineEvent::new(listing_id, to, action, &new_path).with_previous_path(source_path),
        )
        .await;

        tracing::info!(
            from_stage = %from,
            to_stage = %to,
            previous_path = %source_path,
            new_path = %new_path,
            "Promoted media"
        );

        Ok(PromotionOutcome {
            new_path,
            previous_path: source_path.to_string(),
        })
    }

    /// raw → processing. The raw copy stays until its retention window expires.
    #[tracing::instrument(skip(self), fields(pipeline.listing_id = %listing_id))]
    pub async fn promote_to_processing(
        &self,
        listing_id: &str,
        raw_path: Option<&str>,
    ) -> Result<PromotionOutcome, PipelineError> {
        let raw_path = require(raw_path, "rawPath")?;
        self.promote_copy(
            listing_id,
            Stage::Raw,
            Stage::Processing,
            raw_path,
            PipelineAction::PromoteToProcessing,
        )
        .await
    }

    /// processing → qc. The processing copy stays until its retention window expires.
    #[tracing::instrument(skip(self), fields(pipeline.listing_id = %listing_id))]
    pub async fn promote_to_qc(
        &self,
        listing_id: &str,
        processing_path: Option<&str>,
    ) -> Result<PromotionOutcome, PipelineError> {
        let processing_path = require(processing_path, "processingPath")?;
        self.promote_copy(
            listing_id,
            Stage::Processing,
            Stage::Qc,
            processing_path,
            PipelineAction::PromoteToQc,
        )
        .await
    }

    /// Destination key for a final promotion.
    ///
    /// The final object keeps the qc object's generated file name so a repeated
    /// promotion overwrites instead of duplicating, and a stale qc copy can be paired
    /// with its final copy later.
    fn final_path(listing_id: &str, qc_path: &str) -> String {
        let name = file_name(qc_path);
        if is_generated_file_name(name) {
            format!("{}/{}", stage_prefix(listing_id, Stage::Final, None), name)
        } else {
            generate_path(listing_id, Stage::Final, qc_path, None)
        }
    }

    /// qc → final. Copies, computes the public URL, then removes the qc copy.
    ///
    /// qc has no retention policy, so the qc copy must be removed here. If that removal
    /// fails the promotion still succeeds with `source_removed = false`; the
    /// reconciliation sweep in `CleanupService` reclaims the leftover, provided the qc
    /// key sits under `listing_id`.
    #[tracing::instrument(skip(self), fields(pipeline.listing_id = %listing_id))]
    pub async fn promote_to_final(
        &self,
        listing_id: &str,
        qc_path: Option<&str>,
    ) -> Result<FinalOutcome, PipelineError> {
        let qc_path = require(qc_path, "qcPath")?;
        let new_path = Self::final_path(listing_id, qc_path);

        self.storage
            .copy(Stage::Qc.bucket(), qc_path, Stage::Final.bucket(), &new_path)
            .await
            .map_err(PipelineError::from)
            .inspect_err(|e| log_error(e, "promote_to_final"))?;

        let public_url = self.storage.public_url(Stage::Final.bucket(), &new_path);

        let source_removed = match self
            .storage
            .remove(Stage::Qc.bucket(), &[qc_path.to_string()])
            .await
        {
            Ok(()) => true,
            Err(e) => {
                tracing::warn!(
                    error = %e,
                    qc_path = %qc_path,
                    final_path = %new_path,
                    "Final copy written but qc copy could not be removed"
                );
                self.record_event(
                    PipelineEvent::new(
                        listing_id,
                        Stage::Qc,
                        PipelineAction::QcCleanupFailed,
                        qc_path,
                    )
                    .with_metadata(serde_json::json!({ "error": e.to_string() })),
                )
                .await;
                false
            }
        };

        self.record_event(
            PipelineEvent::new(listing_id, Stage::Final, PipelineAction::PromoteToFinal, &new_path)
                .with_previous_path(qc_path)
                .with_metadata(serde_json::json!({ "public_url": public_url })),
        )
        .await;

        tracing::info!(
            previous_path = %qc_path,
            new_path = %new_path,
            source_removed,
            "Promoted media to final"
        );

        Ok(FinalOutcome {
            new_path,
            public_url,
            source_removed,
        })
    }

    /// Delete a qc object that failed review. Terminal for that asset.
    #[tracing::instrument(skip(self, reason), fields(pipeline.listing_id = %listing_id))]
    pub async fn reject_from_qc(
        &self,
        listing_id: &str,
        qc_path: Option<&str>,
        reason: &str,
    ) -> Result<RejectOutcome, PipelineError> {
        let qc_path = require(qc_path, "qcPath")?;

        self.storage
            .remove(Stage::Qc.bucket(), &[qc_path.to_string()])
            .await
            .map_err(PipelineError::from)
            .inspect_err(|e| log_error(e, "reject_from_qc"))?;

        self.record_event(
            PipelineEvent::new(listing_id, Stage::Qc, PipelineAction::Reject, qc_path)
                .with_metadata(serde_json::json!({ "reason": reason })),
        )
        .await;

        tracing::info!(qc_path = %qc_path, reason = %reason, "Rejected media from qc");

        Ok(RejectOutcome {
            removed_path: qc_path.to_string(),
            reason: reason.to_string(),
        })
    }

    /// Reserve a raw-stage path and sign a direct upload to it.
    #[tracing::instrument(skip(self, request), fields(pipeline.listing_id = %request.listing_id))]
    pub async fn get_presigned_upload_url(
        &self,
        request: PresignedUploadRequest,
    ) -> Result<PresignedUpload, PipelineError> {
        let path = generate_path(
            &request.listing_id,
            Stage::Raw,
            &request.filename,
            request.category.as_deref(),
        );
        let expires_in = request.expires_in.unwrap_or(self.signed_upload_expiry);
        let expires_at = chrono::Duration::from_std(expires_in)
            .ok()
            .and_then(|lifetime| Utc::now().checked_add_signed(lifetime))
            .ok_or(PipelineError::InvalidField {
                field: "expiresIn",
                reason: "expiry is out of range",
            })
            .inspect_err(|e| log_error(e, "get_presigned_upload_url"))?;

        let signed_url = self
            .storage
            .create_signed_upload_url(Stage::Raw.bucket(), &path, expires_in)
            .await
            .map_err(PipelineError::from)
            .inspect_err(|e| log_error(e, "get_presigned_upload_url"))?;

        tracing::debug!(
            path = %path,
            content_type = %request.content_type,
            expires_in_secs = expires_in.as_secs(),
            "Issued signed upload URL"
        );

        Ok(PresignedUpload {
            path,
            signed_url,
            expires_at,
        })
    }

    /// Objects stored for a listing in one stage.
    ///
    /// Without a category, objects in category folders one level down are included
    /// with their folder as a name prefix. Backend errors yield an empty list.
    pub async fn get_stage_contents(
        &self,
        listing_id: &str,
        stage: Stage,
        category: Option<&str>,
    ) -> Vec<ObjectEntry> {
        let prefix = stage_prefix(listing_id, stage, category);
        let bucket = stage.bucket();

        let entries = match self.storage.list(bucket, &prefix, STAGE_LIST_LIMIT).await {
            Ok(entries) => entries,
            Err(e) => {
                tracing::warn!(error = %e, bucket, prefix = %prefix, "Failed to list stage contents");
                return Vec::new();
            }
        };

        let mut objects = Vec::with_capacity(entries.len());
        for entry in entries {
            if !entry.is_prefix {
                objects.push(entry);
                continue;
            }
            if category.is_some() {
                continue;
            }

            let sub_prefix = format!("{}/{}", prefix, entry.name);
            match self.storage.list(bucket, &sub_prefix, STAGE_LIST_LIMIT).await {
                Ok(children) => objects.extend(
                    children
                        .into_iter()
                        .filter(|child| !child.is_prefix)
                        .map(|child| ObjectEntry {
                            name: format!("{}/{}", entry.name, child.name),
                            ..child
                        }),
                ),
                Err(e) => {
                    tracing::warn!(error = %e, bucket, prefix = %sub_prefix, "Failed to list category folder");
                }
            }
        }

        objects
    }

    /// Object counts per stage, queried concurrently.
    pub async fn get_pipeline_status(&self, listing_id: &str) -> PipelineStatus {
        let (raw, processing, qc, final_objects) = tokio::join!(
            self.get_stage_contents(listing_id, Stage::Raw, None),
            self.get_stage_contents(listing_id, Stage::Processing, None),
            self.get_stage_contents(listing_id, Stage::Qc, None),
            self.get_stage_contents(listing_id, Stage::Final, None),
        );

        PipelineStatus {
            raw: raw.len(),
            processing: processing.len(),
            qc: qc.len(),
            final_count: final_objects.len(),
        }
    }
}
