//! Storage key generation for pipeline objects.
//!
//! Key format: `{listingId}/{stage}[/{category}]/{timestampMillis}-{suffix}.{ext}`.
//! Listing ids and filenames come from clients, so every component is sanitized
//! before it reaches a key and no generated key can escape its listing prefix.

use rand::Rng;
use regex::Regex;
use shotline_core::Stage;
use std::sync::LazyLock;

const UNKNOWN_LISTING: &str = "unknown";
const DEFAULT_EXTENSION: &str = "bin";
const SUFFIX_LEN: usize = 6;
const SUFFIX_CHARSET: &[u8] = b"abcdefghijklmnopqrstuvwxyz0123456789";

static TIMESTAMP_PREFIX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(\d+)-").expect("timestamp prefix pattern is valid")
});

/// Reduce an untrusted listing id to a single safe path segment.
///
/// `..` sequences are removed, only the last `/` segment is kept, and anything outside
/// `[a-zA-Z0-9_-]` is dropped. An empty result becomes `unknown`.
pub fn sanitize_listing_id(listing_id: &str) -> String {
    let without_traversal = listing_id.replace("..", "");
    let last_segment = without_traversal.rsplit('/').next().unwrap_or("");
    let safe: String = last_segment
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || *c == '_' || *c == '-')
        .collect();

    if safe.is_empty() {
        UNKNOWN_LISTING.to_string()
    } else {
        safe
    }
}

/// Replace every non-alphanumeric character with `_`.
pub fn sanitize_category(category: &str) -> String {
    category
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() { c } else { '_' })
        .collect()
}

/// Lower-cased extension of the filename, or `bin` when there is none.
pub fn extension_of(filename: &str) -> String {
    let name = file_name(filename);
    let ext = match name.rsplit_once('.') {
        Some((_, ext)) => ext,
        None => "",
    };
    let ext: String = ext
        .chars()
        .filter(|c| c.is_ascii_alphanumeric())
        .collect::<String>()
        .to_lowercase();

    if ext.is_empty() {
        DEFAULT_EXTENSION.to_string()
    } else {
        ext
    }
}

/// Last `/` segment of a key.
pub fn file_name(key: &str) -> &str {
    key.rsplit('/').next().unwrap_or(key)
}

/// Listing-scoped prefix for a stage, optionally narrowed to a category.
pub fn stage_prefix(listing_id: &str, stage: Stage, category: Option<&str>) -> String {
    let listing = sanitize_listing_id(listing_id);
    match category {
        Some(category) => format!("{}/{}/{}", listing, stage, sanitize_category(category)),
        None => format!("{}/{}", listing, stage),
    }
}

/// Creation timestamp (epoch millis) embedded in a generated file name.
///
/// Returns `None` for any name not starting with `{digits}-`; such objects have no
/// known age.
pub fn parse_key_timestamp(name: &str) -> Option<i64> {
    TIMESTAMP_PREFIX
        .captures(file_name(name))
        .and_then(|caps| caps.get(1))
        .and_then(|m| m.as_str().parse::<i64>().ok())
}

/// Whether a file name has the shape this module generates.
pub fn is_generated_file_name(name: &str) -> bool {
    let Some((stem, ext)) = name.rsplit_once('.') else {
        return false;
    };
    let Some((timestamp, suffix)) = stem.split_once('-') else {
        return false;
    };
    !timestamp.is_empty()
        && timestamp.chars().all(|c| c.is_ascii_digit())
        && !suffix.is_empty()
        && suffix.chars().all(|c| c.is_ascii_alphanumeric())
        && !ext.is_empty()
        && ext.chars().all(|c| c.is_ascii_alphanumeric())
}

fn random_suffix<R: Rng + ?Sized>(rng: &mut R) -> String {
    (0..SUFFIX_LEN)
        .map(|_| SUFFIX_CHARSET[rng.random_range(0..SUFFIX_CHARSET.len())] as char)
        .collect()
}

/// Generate a key from an explicit random source and timestamp.
pub fn generate_path_with<R: Rng + ?Sized>(
    rng: &mut R,
    now_ms: i64,
    listing_id: &str,
    stage: Stage,
    filename: &str,
    category: Option<&str>,
) -> String {
    format!(
        "{}/{}-{}.{}",
        stage_prefix(listing_id, stage, category),
        now_ms,
        random_suffix(rng),
        extension_of(filename)
    )
}

/// Generate a fresh, collision-resistant key for `filename` in `stage`.
pub fn generate_path(
    listing_id: &str,
    stage: Stage,
    filename: &str,
    category: Option<&str>,
) -> String {
    let now_ms = chrono::Utc::now().timestamp_millis();
    generate_path_with(
        &mut rand::rng(),
        now_ms,
        listing_id,
        stage,
        filename,
        category,
    )
}
