use anyhow::Context;
use serde_json::{json, Value};
use shotline_core::models::MediaAsset;
use shotline_core::ErrorMetadata;
use std::fmt::Display;
use std::path::Path;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Initialize tracing for the CLI.
///
/// Logs go to stderr so stdout carries only command output. `LOG_FORMAT=json`
/// switches to JSON lines.
pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let json = std::env::var("LOG_FORMAT")
        .map(|v| v.eq_ignore_ascii_case("json"))
        .unwrap_or(false);

    let registry = tracing_subscriber::registry().with(filter);
    if json {
        registry
            .with(tracing_subscriber::fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        registry
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .init();
    }
}

/// Wrap a serializable result in the `{ "success": true, ... }` envelope.
///
/// Objects are merged into the envelope; any other value lands under `data`.
pub fn success_envelope(value: Value) -> Value {
    match value {
        Value::Object(mut map) => {
            map.insert("success".to_string(), Value::Bool(true));
            Value::Object(map)
        }
        other => json!({ "success": true, "data": other }),
    }
}

/// Failure envelope for an error that carries metadata.
pub fn failure_envelope<E: ErrorMetadata + Display>(err: &E) -> Value {
    json!({
        "success": false,
        "error": err.client_message(),
        "code": err.error_code(),
    })
}

/// Content type for an upload when none is given, from the file extension.
pub fn content_type_for(filename: &str) -> &'static str {
    let ext = filename
        .rsplit_once('.')
        .map(|(_, ext)| ext.to_ascii_lowercase())
        .unwrap_or_default();
    match ext.as_str() {
        "jpg" | "jpeg" => "image/jpeg",
        "png" => "image/png",
        "webp" => "image/webp",
        "gif" => "image/gif",
        "heic" => "image/heic",
        "tif" | "tiff" => "image/tiff",
        "mp4" => "video/mp4",
        "mov" => "video/quicktime",
        _ => "application/octet-stream",
    }
}

/// Parse an optional `--metadata` argument as JSON.
pub fn parse_metadata(raw: Option<&str>) -> anyhow::Result<Option<Value>> {
    raw.map(|s| serde_json::from_str(s).context("--metadata must be valid JSON"))
        .transpose()
}

/// Load asset records from a JSON file holding an array of objects.
pub fn load_assets(path: &Path) -> anyhow::Result<Vec<MediaAsset>> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    serde_json::from_str(&raw).with_context(|| format!("Failed to parse {}", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use shotline_core::LogLevel;
    use std::fmt;
    use std::io::Write;

    #[derive(Debug)]
    struct Missing;

    impl fmt::Display for Missing {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            write!(f, "qcPath is required")
        }
    }

    impl ErrorMetadata for Missing {
        fn http_status_code(&self) -> u16 {
            400
        }
        fn error_code(&self) -> &'static str {
            "MISSING_FIELD"
        }
        fn is_recoverable(&self) -> bool {
            false
        }
        fn suggested_action(&self) -> Option<&'static str> {
            None
        }
        fn client_message(&self) -> String {
            self.to_string()
        }
        fn log_level(&self) -> LogLevel {
            LogLevel::Debug
        }
    }

    #[test]
    fn success_envelope_merges_objects() {
        let value = success_envelope(json!({ "path": "L1/raw/1-a.jpg" }));
        assert_eq!(value["success"], true);
        assert_eq!(value["path"], "L1/raw/1-a.jpg");

        let value = success_envelope(json!([1, 2]));
        assert_eq!(value["data"], json!([1, 2]));
    }

    #[test]
    fn failure_envelope_carries_code() {
        let value = failure_envelope(&Missing);
        assert_eq!(value["success"], false);
        assert_eq!(value["error"], "qcPath is required");
        assert_eq!(value["code"], "MISSING_FIELD");
    }

    #[test]
    fn content_type_from_extension() {
        assert_eq!(content_type_for("photo.JPG"), "image/jpeg");
        assert_eq!(content_type_for("tour.mov"), "video/quicktime");
        assert_eq!(content_type_for("noext"), "application/octet-stream");
    }

    #[test]
    fn metadata_must_be_json() {
        assert!(parse_metadata(None).unwrap().is_none());
        assert_eq!(
            parse_metadata(Some(r#"{"shooter":"A"}"#)).unwrap(),
            Some(json!({ "shooter": "A" }))
        );
        assert!(parse_metadata(Some("not json")).is_err());
    }

    #[test]
    fn assets_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"[{{"id":"1","media_url":"https://cdn/a.jpg"}},{{"id":"2"}}]"#
        )
        .unwrap();

        let assets = load_assets(file.path()).unwrap();
        assert_eq!(assets.len(), 2);
        assert_eq!(assets[0].media_url.as_deref(), Some("https://cdn/a.jpg"));
        assert!(assets[1].media_url.is_none());
    }
}
