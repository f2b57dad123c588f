//! Error metadata shared by the library crates.
//!
//! Concrete error enums live next to the code that produces them (`StorageError` in
//! shotline-storage, `PipelineError` in shotline-services). They describe themselves
//! through [`ErrorMetadata`] so an HTTP layer or the CLI can translate a failure
//! without matching on every variant.

/// Log level for error reporting
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel {
    /// Debug level - for expected errors like validation failures
    Debug,
    /// Warning level - for recoverable issues like transient backend failures
    Warn,
    /// Error level - for unexpected failures
    Error,
}

/// Metadata for error responses - defines how an error should be presented
pub trait ErrorMetadata {
    /// HTTP status code a caller should map this error to
    fn http_status_code(&self) -> u16;

    /// Machine-readable error code (e.g., "STORAGE_ERROR")
    fn error_code(&self) -> &'static str;

    /// Whether this error is recoverable (can be retried)
    fn is_recoverable(&self) -> bool;

    /// Suggested action for the client
    fn suggested_action(&self) -> Option<&'static str>;

    /// Client-facing message
    fn client_message(&self) -> String;

    /// Log level for this error
    fn log_level(&self) -> LogLevel;
}

/// Emit a tracing event for an error at the level it asks for.
pub fn log_error<E>(err: &E, operation: &str)
where
    E: ErrorMetadata + std::fmt::Display,
{
    match err.log_level() {
        LogLevel::Debug => {
            tracing::debug!(error = %err, code = err.error_code(), operation, "Operation failed")
        }
        LogLevel::Warn => {
            tracing::warn!(error = %err, code = err.error_code(), operation, "Operation failed")
        }
        LogLevel::Error => {
            tracing::error!(error = %err, code = err.error_code(), operation, "Operation failed")
        }
    }
}
