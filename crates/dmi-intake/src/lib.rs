//! DMI Intake Library
//!
//! Accepts uploaded spreadsheet/CSV files, checks them against a registered
//! tabular schema and hands a validated payload to persistence:
//!
//! 1. [`SchemaRegistry`] resolves the caller's file type tag.
//! 2. [`FileValidator`] gates extension and size.
//! 3. [`TabularLoader`] parses the bytes into a [`ParsedTable`].
//! 4. [`validate_headers`] checks the normalized headers against the schema.
//! 5. [`UploadFile`] stores the original and creates the record.

pub mod error;
pub mod file;
pub mod headers;
pub mod loader;
pub mod registry;
pub mod upload;
pub mod validator;

// Re-export commonly used types
pub use error::{IntakeError, IntakeErrorKind, UploadError};
pub use file::UploadedFile;
pub use headers::{normalize_header, validate_header_names, validate_headers, NormalizedHeaders};
pub use loader::{CellValue, ParsedTable, TabularLoader};
pub use registry::{ResolvedSchema, SchemaRegistry, TabularSchema};
pub use upload::{
    UploadFile, UploadRequest, UploadValidator, ValidatedAttributes, ValidatedUpload,
};
pub use validator::{FileValidator, TabularFormat, MAX_UPLOAD_SIZE_BYTES};
