//! Cleanup and storage-monitoring reports.

use serde::Serialize;
use std::collections::BTreeMap;

use super::Stage;

/// Outcome of sweeping one stage's bucket.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CleanupResult {
    pub stage: Stage,
    pub deleted_count: usize,
    pub errors: Vec<String>,
}

impl CleanupResult {
    pub fn empty(stage: Stage) -> Self {
        Self {
            stage,
            deleted_count: 0,
            errors: Vec::new(),
        }
    }
}

/// Outcome of a full sweep over every temporary stage.
#[derive(Debug, Clone, Serialize)]
pub struct CleanupSummary {
    /// RFC 3339 start time
    pub started_at: String,
    /// RFC 3339 completion time
    pub completed_at: String,
    pub results: Vec<CleanupResult>,
    pub total_deleted: usize,
    pub total_errors: usize,
}

/// Outcome of pairing stale qc copies with their final copies.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ReconcileResult {
    pub removed_count: usize,
    pub errors: Vec<String>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct StageStats {
    pub file_count: usize,
    pub total_bytes: u64,
}

/// Object counts and sizes per stage, best effort.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct StorageStats {
    pub stages: BTreeMap<Stage, StageStats>,
}

impl StorageStats {
    pub fn total_bytes(&self) -> u64 {
        self.stages.values().map(|s| s.total_bytes).sum()
    }

    pub fn total_files(&self) -> usize {
        self.stages.values().map(|s| s.file_count).sum()
    }
}
