//! Intake error taxonomy
//!
//! [`IntakeError`] names every way an upload can be rejected before anything is
//! written. [`UploadError`] is what the orchestrator surfaces: validation
//! failures are wrapped, never flattened, so [`UploadError::kind`] still tells
//! callers which check failed.

use dmi_core::{AppError, ErrorMetadata, LogLevel};
use serde::Serialize;

const BYTES_PER_MB: u64 = 1024 * 1024;

const UNREADABLE_CLIENT_MESSAGE: &str =
    "Unable to read the file. It may be corrupt or not a spreadsheet.";

/// Machine-readable failure kind
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum IntakeErrorKind {
    UnsupportedFormat,
    FileTooLarge,
    UnreadableFile,
    UnknownFileType,
    MissingHeaders,
    PersistenceFailed,
}

/// Validation-phase failures. None of these leave side effects behind.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum IntakeError {
    #[error(
        "Unsupported file format '{extension}'. Only Excel files ({}) are allowed.",
        .allowed.join(", ")
    )]
    UnsupportedFormat {
        extension: String,
        allowed: Vec<String>,
    },

    #[error("File size too large: {size} bytes. Max size is {} MB.", .max / BYTES_PER_MB)]
    FileTooLarge { size: u64, max: u64 },

    #[error("Unable to read the file: {0}")]
    UnreadableFile(String),

    #[error("Unknown file type: {0}")]
    UnknownFileType(String),

    #[error(
        "The following fields are missing in the file headers: {}",
        .0.join(", ")
    )]
    MissingHeaders(Vec<String>),
}

impl IntakeError {
    pub fn kind(&self) -> IntakeErrorKind {
        match self {
            IntakeError::UnsupportedFormat { .. } => IntakeErrorKind::UnsupportedFormat,
            IntakeError::FileTooLarge { .. } => IntakeErrorKind::FileTooLarge,
            IntakeError::UnreadableFile(_) => IntakeErrorKind::UnreadableFile,
            IntakeError::UnknownFileType(_) => IntakeErrorKind::UnknownFileType,
            IntakeError::MissingHeaders(_) => IntakeErrorKind::MissingHeaders,
        }
    }

    /// Message safe to show the uploader. Parser detail stays in logs.
    pub fn client_message(&self) -> String {
        match self {
            IntakeError::UnreadableFile(_) => UNREADABLE_CLIENT_MESSAGE.to_string(),
            other => other.to_string(),
        }
    }

    /// Missing field names, when this is a header mismatch
    pub fn missing_fields(&self) -> Option<&[String]> {
        match self {
            IntakeError::MissingHeaders(fields) => Some(fields),
            _ => None,
        }
    }
}

/// Errors surfaced by [`crate::UploadFile`]
#[derive(Debug, thiserror::Error)]
pub enum UploadError {
    #[error("Error processing file: {0}")]
    ValidationFailed(#[source] IntakeError),

    #[error("Error saving file: {0}")]
    PersistenceFailed(String),
}

impl From<IntakeError> for UploadError {
    fn from(err: IntakeError) -> Self {
        UploadError::ValidationFailed(err)
    }
}

impl From<AppError> for UploadError {
    fn from(err: AppError) -> Self {
        UploadError::PersistenceFailed(err.to_string())
    }
}

impl UploadError {
    pub fn kind(&self) -> IntakeErrorKind {
        match self {
            UploadError::ValidationFailed(inner) => inner.kind(),
            UploadError::PersistenceFailed(_) => IntakeErrorKind::PersistenceFailed,
        }
    }

    /// The wrapped validation failure, if any
    pub fn validation_error(&self) -> Option<&IntakeError> {
        match self {
            UploadError::ValidationFailed(inner) => Some(inner),
            UploadError::PersistenceFailed(_) => None,
        }
    }
}

/// Static metadata per kind: (http_status, error_code, recoverable, suggested_action, sensitive, log_level).
fn kind_static_metadata(
    kind: IntakeErrorKind,
) -> (
    u16,
    &'static str,
    bool,
    Option<&'static str>,
    bool,
    LogLevel,
) {
    match kind {
        IntakeErrorKind::UnsupportedFormat => (
            415,
            "UNSUPPORTED_FORMAT",
            false,
            Some("Upload a .csv, .xls, .xlsx or .xlsm file"),
            false,
            LogLevel::Debug,
        ),
        IntakeErrorKind::FileTooLarge => (
            413,
            "FILE_TOO_LARGE",
            false,
            Some("Split the file into parts under 20 MB"),
            false,
            LogLevel::Debug,
        ),
        IntakeErrorKind::UnreadableFile => (
            422,
            "UNREADABLE_FILE",
            false,
            Some("Re-export the file and upload it again"),
            false,
            LogLevel::Debug,
        ),
        IntakeErrorKind::UnknownFileType => (
            400,
            "UNKNOWN_FILE_TYPE",
            false,
            Some("Use one of the registered file types"),
            false,
            LogLevel::Warn,
        ),
        IntakeErrorKind::MissingHeaders => (
            422,
            "MISSING_HEADERS",
            false,
            Some("Add the missing columns to the header row"),
            false,
            LogLevel::Debug,
        ),
        IntakeErrorKind::PersistenceFailed => (
            500,
            "PERSISTENCE_FAILED",
            true,
            Some("Retry after a short delay"),
            true,
            LogLevel::Error,
        ),
    }
}

impl ErrorMetadata for UploadError {
    fn http_status_code(&self) -> u16 {
        kind_static_metadata(self.kind()).0
    }

    fn error_code(&self) -> &'static str {
        kind_static_metadata(self.kind()).1
    }

    fn is_recoverable(&self) -> bool {
        kind_static_metadata(self.kind()).2
    }

    fn suggested_action(&self) -> Option<&'static str> {
        kind_static_metadata(self.kind()).3
    }

    fn is_sensitive(&self) -> bool {
        kind_static_metadata(self.kind()).4
    }

    fn log_level(&self) -> LogLevel {
        kind_static_metadata(self.kind()).5
    }

    fn client_message(&self) -> String {
        match self {
            UploadError::ValidationFailed(inner) => inner.client_message(),
            UploadError::PersistenceFailed(_) => "Error saving file".to_string(),
        }
    }
}
