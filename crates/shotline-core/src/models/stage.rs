//! Pipeline stages and their storage/retention table.

use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter, Result as FmtResult};
use std::str::FromStr;

/// One of the four storage areas a media file passes through.
///
/// Each stage owns exactly one bucket and one retention policy. Adding a stage
/// forces every accessor below to be updated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Stage {
    Raw,
    Processing,
    Qc,
    Final,
}

impl Stage {
    /// All stages in pipeline order.
    pub const ALL: [Stage; 4] = [Stage::Raw, Stage::Processing, Stage::Qc, Stage::Final];

    /// Stages with a bounded retention window, swept by cleanup.
    pub const TEMPORARY: [Stage; 2] = [Stage::Raw, Stage::Processing];

    /// Name used in storage keys and on the wire.
    pub fn as_str(&self) -> &'static str {
        match self {
            Stage::Raw => "raw",
            Stage::Processing => "processing",
            Stage::Qc => "qc",
            Stage::Final => "final",
        }
    }

    /// Bucket holding this stage's objects.
    pub fn bucket(&self) -> &'static str {
        match self {
            Stage::Raw => "pipeline-raw",
            Stage::Processing => "pipeline-processing",
            Stage::Qc => "pipeline-qc",
            Stage::Final => "pipeline-final",
        }
    }

    /// Maximum object age in hours, or `None` when objects live until an explicit
    /// promote/reject (`qc`) or forever (`final`).
    pub fn retention_hours(&self) -> Option<u32> {
        match self {
            Stage::Raw => Some(168),
            Stage::Processing => Some(48),
            Stage::Qc => None,
            Stage::Final => None,
        }
    }
}

impl FromStr for Stage {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "raw" => Ok(Stage::Raw),
            "processing" => Ok(Stage::Processing),
            "qc" => Ok(Stage::Qc),
            "final" => Ok(Stage::Final),
            _ => Err(anyhow::anyhow!("Invalid pipeline stage: {}", s)),
        }
    }
}

impl Display for Stage {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn retention_table() {
        assert_eq!(Stage::Raw.retention_hours(), Some(168));
        assert_eq!(Stage::Processing.retention_hours(), Some(48));
        assert_eq!(Stage::Qc.retention_hours(), None);
        assert_eq!(Stage::Final.retention_hours(), None);
    }

    #[test]
    fn temporary_stages_are_exactly_the_bounded_ones() {
        let bounded: Vec<Stage> = Stage::ALL
            .into_iter()
            .filter(|s| s.retention_hours().is_some())
            .collect();
        assert_eq!(bounded, Stage::TEMPORARY.to_vec());
    }

    #[test]
    fn buckets_are_distinct() {
        let mut buckets: Vec<&str> = Stage::ALL.iter().map(|s| s.bucket()).collect();
        buckets.sort();
        buckets.dedup();
        assert_eq!(buckets.len(), 4);
    }

    #[test]
    fn parse_and_display_agree() {
        for stage in Stage::ALL {
            assert_eq!(stage.to_string().parse::<Stage>().unwrap(), stage);
        }
        assert!("archive".parse::<Stage>().is_err());
        assert_eq!(
            serde_json::to_string(&Stage::Processing).unwrap(),
            "\"processing\""
        );
    }
}
