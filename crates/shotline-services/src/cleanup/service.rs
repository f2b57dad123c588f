use chrono::{DateTime, Utc};
use shotline_core::models::{
    CleanupResult, CleanupSummary, ReconcileResult, Stage, StageStats, StorageStats,
};
use shotline_storage::keys::parse_key_timestamp;
use shotline_storage::{ObjectEntry, ObjectStorage, StorageResult};
use std::collections::HashSet;
use std::sync::Arc;

const DEFAULT_PAGE_SIZE: usize = 1000;
const MILLIS_PER_HOUR: i64 = 3_600_000;

/// Whether an object name is past its stage's retention window.
///
/// Age comes only from the timestamp embedded in the name. Names without one are
/// never expired, and an object exactly at the boundary is kept.
pub fn is_expired(name: &str, retention_hours: u32, now_ms: i64) -> bool {
    match parse_key_timestamp(name) {
        Some(created_ms) => {
            now_ms.saturating_sub(created_ms) > i64::from(retention_hours) * MILLIS_PER_HOUR
        }
        None => false,
    }
}

/// Reclaims storage from the temporary stages.
///
/// Listings are bounded by a page size; a listing folder holding more objects than
/// one page is only partially swept per run. Scheduling is left to the caller.
#[derive(Clone)]
pub struct CleanupService {
    storage: Arc<dyn ObjectStorage>,
    page_size: usize,
}

impl CleanupService {
    pub fn new(storage: Arc<dyn ObjectStorage>) -> Self {
        Self {
            storage,
            page_size: DEFAULT_PAGE_SIZE,
        }
    }

    pub fn with_page_size(mut self, page_size: usize) -> Self {
        self.page_size = page_size.max(1);
        self
    }

    /// Top-level listing folders of a bucket.
    async fn listing_folders(&self, bucket: &str) -> StorageResult<Vec<String>> {
        let entries = self.storage.list(bucket, "", self.page_size).await?;
        Ok(entries
            .into_iter()
            .filter(|entry| entry.is_prefix)
            .map(|entry| entry.name)
            .collect())
    }

    /// Objects under `{listing}/{stage}`, including one level of category folders.
    /// Returned entries carry their full key as name.
    async fn stage_objects(
        &self,
        bucket: &str,
        listing: &str,
        stage: Stage,
    ) -> StorageResult<Vec<ObjectEntry>> {
        let prefix = format!("{}/{}", listing, stage);
        let entries = self.storage.list(bucket, &prefix, self.page_size).await?;

        let mut objects = Vec::with_capacity(entries.len());
        for entry in entries {
            if entry.is_prefix {
                let category_prefix = format!("{}/{}", prefix, entry.name);
                let children = self
                    .storage
                    .list(bucket, &category_prefix, self.page_size)
                    .await?;
                objects.extend(
                    children
                        .into_iter()
                        .filter(|child| !child.is_prefix)
                        .map(|child| ObjectEntry {
                            name: format!("{}/{}", category_prefix, child.name),
                            ..child
                        }),
                );
            } else {
                objects.push(ObjectEntry {
                    name: format!("{}/{}", prefix, entry.name),
                    ..entry
                });
            }
        }

        Ok(objects)
    }

    /// Delete every expired object in a stage's bucket.
    pub async fn cleanup_bucket(&self, stage: Stage) -> CleanupResult {
        self.cleanup_bucket_at(stage, Utc::now()).await
    }

    /// [`cleanup_bucket`](Self::cleanup_bucket) against an explicit clock.
    #[tracing::instrument(skip(self, now), fields(cleanup.stage = %stage))]
    pub async fn cleanup_bucket_at(&self, stage: Stage, now: DateTime<Utc>) -> CleanupResult {
        let mut result = CleanupResult::empty(stage);

        // qc and final are never swept
        let Some(retention_hours) = stage.retention_hours() else {
            tracing::debug!("Stage has unbounded retention, skipping");
            return result;
        };

        let bucket = stage.bucket();
        let now_ms = now.timestamp_millis();

        let folders = match self.listing_folders(bucket).await {
            Ok(folders) => folders,
            Err(e) => {
                tracing::error!(error = %e, bucket, "Failed to list listing folders");
                result
                    .errors
                    .push(format!("Failed to list folders in {}: {}", bucket, e));
                return result;
            }
        };

        for listing in folders {
            let objects = match self.stage_objects(bucket, &listing, stage).await {
                Ok(objects) => objects,
                Err(e) => {
                    tracing::error!(error = %e, bucket, listing = %listing, "Failed to list files");
                    result
                        .errors
                        .push(format!("Failed to list files in {}/{}: {}", listing, stage, e));
                    continue;
                }
            };

            let expired: Vec<String> = objects
                .into_iter()
                .filter(|object| is_expired(&object.name, retention_hours, now_ms))
                .map(|object| object.name)
                .collect();

            if expired.is_empty() {
                continue;
            }

            match self.storage.remove(bucket, &expired).await {
                Ok(()) => {
                    tracing::info!(
                        bucket,
                        listing = %listing,
                        count = expired.len(),
                        "Deleted expired files"
                    );
                    result.deleted_count += expired.len();
                }
                Err(e) => {
                    tracing::error!(error = %e, bucket, listing = %listing, "Failed to delete expired files");
                    result
                        .errors
                        .push(format!("Failed to delete files in {}/{}: {}", listing, stage, e));
                }
            }
        }

        tracing::info!(
            deleted_count = result.deleted_count,
            error_count = result.errors.len(),
            "Stage cleanup completed"
        );

        result
    }

    /// Sweep every temporary stage in order.
    #[tracing::instrument(skip(self), fields(cleanup.operation = "expire_all"))]
    pub async fn run_full_cleanup(&self) -> CleanupSummary {
        let started_at = Utc::now().to_rfc3339();

        let mut results = Vec::with_capacity(Stage::TEMPORARY.len());
        for stage in Stage::TEMPORARY {
            results.push(self.cleanup_bucket(stage).await);
        }

        let total_deleted = results.iter().map(|r| r.deleted_count).sum();
        let total_errors = results.iter().map(|r| r.errors.len()).sum();

        tracing::info!(total_deleted, total_errors, "Cleanup completed");

        CleanupSummary {
            started_at,
            completed_at: Utc::now().to_rfc3339(),
            results,
            total_deleted,
            total_errors,
        }
    }

    async fn stage_stats(&self, stage: Stage) -> StorageResult<StageStats> {
        let bucket = stage.bucket();
        let mut stats = StageStats::default();

        for listing in self.listing_folders(bucket).await? {
            match self.stage_objects(bucket, &listing, stage).await {
                Ok(objects) => {
                    stats.file_count += objects.len();
                    stats.total_bytes += objects.iter().filter_map(|o| o.size).sum::<u64>();
                }
                Err(e) => {
                    tracing::debug!(error = %e, bucket, listing = %listing, "Skipping folder in storage stats");
                }
            }
        }

        Ok(stats)
    }

    /// Object counts and byte sizes for all four stages. Never fails; a stage that
    /// cannot be read reports zeros.
    pub async fn get_storage_stats(&self) -> StorageStats {
        let mut stats = StorageStats::default();

        for stage in Stage::ALL {
            let stage_stats = match self.stage_stats(stage).await {
                Ok(stage_stats) => stage_stats,
                Err(e) => {
                    tracing::warn!(error = %e, stage = %stage, "Failed to collect storage stats");
                    StageStats::default()
                }
            };
            stats.stages.insert(stage, stage_stats);
        }

        stats
    }

    /// Remove qc copies whose final copy already exists.
    ///
    /// A final promotion writes `{listing}/final/{name}` before deleting
    /// `{listing}/qc/{name}`. When that delete fails both copies remain; this sweep
    /// pairs them by file name and removes the qc side.
    ///
    /// Pairs are only found inside one listing folder. A qc key promoted under a
    /// different `listing_id` lands in that listing's final folder and is left alone.
    #[tracing::instrument(skip(self), fields(cleanup.operation = "reconcile_final"))]
    pub async fn reconcile_final_promotions(&self) -> ReconcileResult {
        let mut result = ReconcileResult::default();
        let qc_bucket = Stage::Qc.bucket();
        let final_bucket = Stage::Final.bucket();

        let folders = match self.listing_folders(qc_bucket).await {
            Ok(folders) => folders,
            Err(e) => {
                result
                    .errors
                    .push(format!("Failed to list folders in {}: {}", qc_bucket, e));
                return result;
            }
        };

        for listing in folders {
            let qc_prefix = format!("{}/{}", listing, Stage::Qc);
            let final_prefix = format!("{}/{}", listing, Stage::Final);

            let qc_objects = match self.storage.list(qc_bucket, &qc_prefix, self.page_size).await {
                Ok(entries) => entries,
                Err(e) => {
                    result
                        .errors
                        .push(format!("Failed to list files in {}: {}", qc_prefix, e));
                    continue;
                }
            };
            if qc_objects.iter().all(|entry| entry.is_prefix) {
                continue;
            }

            let final_names: HashSet<String> = match self
                .storage
                .list(final_bucket, &final_prefix, self.page_size)
                .await
            {
                Ok(entries) => entries
                    .into_iter()
                    .filter(|entry| !entry.is_prefix)
                    .map(|entry| entry.name)
                    .collect(),
                Err(e) => {
                    result
                        .errors
                        .push(format!("Failed to list files in {}: {}", final_prefix, e));
                    continue;
                }
            };

            let stale: Vec<String> = qc_objects
                .into_iter()
                .filter(|entry| !entry.is_prefix && final_names.contains(&entry.name))
                .map(|entry| format!("{}/{}", qc_prefix, entry.name))
                .collect();

            if stale.is_empty() {
                continue;
            }

            match self.storage.remove(qc_bucket, &stale).await {
                Ok(()) => {
                    tracing::info!(listing = %listing, count = stale.len(), "Removed stale qc copies");
                    result.removed_count += stale.len();
                }
                Err(e) => result
                    .errors
                    .push(format!("Failed to delete files in {}: {}", qc_prefix, e)),
            }
        }

        result
    }
}
