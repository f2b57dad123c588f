//! Media asset records as stored by the listing database.
//!
//! The pipeline does not own these rows; it only reads their URL-bearing fields to
//! decide what a client should be served.

use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter, Result as FmtResult};
use std::str::FromStr;

/// A media asset row. Every URL-bearing field is optional; rows migrated from the
/// legacy CDN may carry several of them at once.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MediaAsset {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub listing_id: Option<String>,
    /// Permanent URL in native storage
    #[serde(default)]
    pub media_url: Option<String>,
    /// Legacy external CDN URL
    #[serde(default)]
    pub aryeo_url: Option<String>,
    /// Bucket-relative path that still needs resolving
    #[serde(default)]
    pub storage_path: Option<String>,
    #[serde(default)]
    pub approved_storage_path: Option<String>,
    #[serde(default)]
    pub processed_storage_path: Option<String>,
    #[serde(default)]
    pub migration_status: Option<String>,
}

/// Where an asset's content currently lives, for migration reporting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaUrlSource {
    Native,
    Approved,
    Processed,
    Missing,
}

impl Display for MediaUrlSource {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        match self {
            MediaUrlSource::Native => write!(f, "native"),
            MediaUrlSource::Approved => write!(f, "approved"),
            MediaUrlSource::Processed => write!(f, "processed"),
            MediaUrlSource::Missing => write!(f, "missing"),
        }
    }
}

impl FromStr for MediaUrlSource {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "native" => Ok(MediaUrlSource::Native),
            "approved" => Ok(MediaUrlSource::Approved),
            "processed" => Ok(MediaUrlSource::Processed),
            "missing" => Ok(MediaUrlSource::Missing),
            other => Err(anyhow::anyhow!("Unknown media source: {}", other)),
        }
    }
}

/// An asset paired with the URL a client should be served.
#[derive(Debug, Clone, Serialize)]
pub struct ResolvedMedia<'a> {
    #[serde(flatten)]
    pub asset: &'a MediaAsset,
    pub resolved_url: Option<&'a str>,
    pub source: MediaUrlSource,
}

/// Migration progress across a set of assets.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct MediaStats {
    pub total: usize,
    pub native: usize,
    pub approved: usize,
    pub processed: usize,
    pub missing: usize,
    /// Share of native assets, rounded to a whole percent.
    pub native_percentage: u32,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn source_parses_case_insensitively() {
        assert_eq!("Native".parse::<MediaUrlSource>().unwrap(), MediaUrlSource::Native);
        assert_eq!(MediaUrlSource::Processed.to_string(), "processed");
        assert!("cdn".parse::<MediaUrlSource>().is_err());
    }

    #[test]
    fn resolved_media_flattens_asset() {
        let asset = MediaAsset {
            id: Some("a1".to_string()),
            media_url: Some("https://cdn/a.jpg".to_string()),
            ..Default::default()
        };
        let resolved = ResolvedMedia {
            asset: &asset,
            resolved_url: asset.media_url.as_deref(),
            source: MediaUrlSource::Native,
        };
        let value = serde_json::to_value(&resolved).unwrap();
        assert_eq!(value["id"], "a1");
        assert_eq!(value["resolved_url"], "https://cdn/a.jpg");
        assert_eq!(value["source"], "native");
    }
}
