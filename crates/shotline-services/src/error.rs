use shotline_core::{ErrorMetadata, LogLevel};
use shotline_storage::StorageError;

/// Failures surfaced by the pipeline's state-changing operations.
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    /// A required argument was missing or empty. Caller-correctable.
    #[error("{0} is required")]
    MissingField(&'static str),

    /// An argument was present but unusable.
    #[error("{field} is invalid: {reason}")]
    InvalidField {
        field: &'static str,
        reason: &'static str,
    },

    /// The storage backend rejected the call; its message is passed through as is.
    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// Static metadata for each variant: (http_status, error_code, recoverable, suggested_action, log_level).
fn pipeline_error_static_metadata(
    err: &PipelineError,
) -> (u16, &'static str, bool, Option<&'static str>, LogLevel) {
    match err {
        PipelineError::MissingField(_) => (
            400,
            "MISSING_FIELD",
            false,
            Some("Provide the required path and try again"),
            LogLevel::Debug,
        ),
        PipelineError::InvalidField { .. } => (
            400,
            "INVALID_FIELD",
            false,
            Some("Correct the value and try again"),
            LogLevel::Debug,
        ),
        PipelineError::Storage(StorageError::NotFound(_)) => (
            404,
            "OBJECT_NOT_FOUND",
            false,
            Some("Verify the source path exists in the expected stage"),
            LogLevel::Debug,
        ),
        PipelineError::Storage(StorageError::AlreadyExists(_)) => (
            409,
            "OBJECT_EXISTS",
            true,
            Some("Retry the upload; a fresh path will be generated"),
            LogLevel::Warn,
        ),
        PipelineError::Storage(StorageError::InvalidKey(_)) => (
            400,
            "INVALID_PATH",
            false,
            Some("Check the supplied storage path"),
            LogLevel::Debug,
        ),
        PipelineError::Storage(StorageError::ConfigError(_)) => (
            500,
            "STORAGE_CONFIG_ERROR",
            false,
            Some("Contact support if this error persists"),
            LogLevel::Error,
        ),
        PipelineError::Storage(_) => (
            502,
            "STORAGE_ERROR",
            true,
            Some("Retry after a short delay"),
            LogLevel::Warn,
        ),
    }
}

impl ErrorMetadata for PipelineError {
    fn http_status_code(&self) -> u16 {
        pipeline_error_static_metadata(self).0
    }

    fn error_code(&self) -> &'static str {
        pipeline_error_static_metadata(self).1
    }

    fn is_recoverable(&self) -> bool {
        pipeline_error_static_metadata(self).2
    }

    fn suggested_action(&self) -> Option<&'static str> {
        pipeline_error_static_metadata(self).3
    }

    fn client_message(&self) -> String {
        self.to_string()
    }

    fn log_level(&self) -> LogLevel {
        pipeline_error_static_metadata(self).4
    }
}
