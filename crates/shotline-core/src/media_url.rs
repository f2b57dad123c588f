//! Media URL resolution
//!
//! Two independent views over the same asset fields:
//!
//! - [`resolve_media_url`] picks the URL to serve: `media_url` (native storage), then
//!   `aryeo_url` (legacy CDN), then `storage_path`.
//! - [`get_media_url_source`] classifies where the asset lives for migration
//!   reporting: native URL, then approved path, then processed path.
//!
//! The two orders differ on purpose. Do not derive one from the other.

use crate::models::{MediaAsset, MediaStats, MediaUrlSource, ResolvedMedia};

const MIGRATION_COMPLETED: &str = "completed";

fn present(field: &Option<String>) -> Option<&str> {
    field.as_deref().filter(|s| !s.is_empty())
}

/// Best URL to serve for an asset, or `None` when nothing is set.
pub fn resolve_media_url(asset: Option<&MediaAsset>) -> Option<&str> {
    let asset = asset?;
    present(&asset.media_url)
        .or_else(|| present(&asset.aryeo_url))
        .or_else(|| present(&asset.storage_path))
}

pub fn get_media_url_source(asset: &MediaAsset) -> MediaUrlSource {
    if present(&asset.media_url).is_some() {
        MediaUrlSource::Native
    } else if present(&asset.approved_storage_path).is_some() {
        MediaUrlSource::Approved
    } else if present(&asset.processed_storage_path).is_some() {
        MediaUrlSource::Processed
    } else {
        MediaUrlSource::Missing
    }
}

/// True only when migration finished and the native URL is actually set.
pub fn is_native_media(asset: &MediaAsset) -> bool {
    asset.migration_status.as_deref() == Some(MIGRATION_COMPLETED)
        && present(&asset.media_url).is_some()
}

/// Resolve every asset, preserving input order.
pub fn resolve_media_urls(assets: &[MediaAsset]) -> Vec<ResolvedMedia<'_>> {
    assets
        .iter()
        .map(|asset| ResolvedMedia {
            asset,
            resolved_url: resolve_media_url(Some(asset)),
            source: get_media_url_source(asset),
        })
        .collect()
}

pub fn filter_by_source(assets: &[MediaAsset], source: MediaUrlSource) -> Vec<&MediaAsset> {
    assets
        .iter()
        .filter(|asset| get_media_url_source(asset) == source)
        .collect()
}

pub fn get_media_stats(assets: &[MediaAsset]) -> MediaStats {
    let mut stats = MediaStats {
        total: assets.len(),
        ..Default::default()
    };

    for asset in assets {
        match get_media_url_source(asset) {
            MediaUrlSource::Native => stats.native += 1,
            MediaUrlSource::Approved => stats.approved += 1,
            MediaUrlSource::Processed => stats.processed += 1,
            MediaUrlSource::Missing => stats.missing += 1,
        }
    }

    if stats.total > 0 {
        stats.native_percentage =
            ((stats.native as f64 / stats.total as f64) * 100.0).round() as u32;
    }

    stats
}

/// Whether `url` points into native storage. Without a configured origin nothing is
/// considered native.
pub fn is_native_url(url: &str, storage_origin: Option<&str>) -> bool {
    match storage_origin.filter(|origin| !origin.is_empty()) {
        Some(origin) => url.starts_with(origin),
        None => false,
    }
}
