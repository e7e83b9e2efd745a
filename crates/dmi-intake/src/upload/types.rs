//! Types for the upload pipeline.

use bytes::Bytes;
use serde::Serialize;
use uuid::Uuid;

use dmi_core::Store;

use crate::file::UploadedFile;
use crate::loader::ParsedTable;

/// One caller request: which schema the file claims to follow, and the file.
#[derive(Debug, Clone)]
pub struct UploadRequest {
    pub file_type: String,
    pub file: UploadedFile,
    /// Operational-store user id of the uploader, if known
    pub uploaded_by: Option<Uuid>,
}

impl UploadRequest {
    pub fn new(file_type: impl Into<String>, file: UploadedFile) -> Self {
        Self {
            file_type: file_type.into(),
            file,
            uploaded_by: None,
        }
    }

    pub fn uploaded_by(mut self, user_id: Uuid) -> Self {
        self.uploaded_by = Some(user_id);
        self
    }
}

/// Attributes produced by validation and persisted by `save`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ValidatedAttributes {
    /// Canonical (normalized) schema tag
    pub file_type: String,
    pub domain: String,
    /// Every normalized header, extras included, in source order
    pub headers: Vec<String>,
    pub ext: String,
    pub row_count: usize,
    pub target_store: Store,
    pub original_filename: String,
    pub file_size: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub uploaded_by: Option<Uuid>,
}

/// Output of a successful validation.
///
/// Owns the parsed table and the original bytes for the lifetime of one
/// request; nothing here is shared between requests.
#[derive(Debug, Clone)]
pub struct ValidatedUpload {
    pub attrs: ValidatedAttributes,
    pub table: ParsedTable,
    pub(crate) data: Bytes,
}

impl ValidatedUpload {
    pub fn attrs(&self) -> &ValidatedAttributes {
        &self.attrs
    }

    pub fn table(&self) -> &ParsedTable {
        &self.table
    }

    /// Original file content as uploaded
    pub fn data(&self) -> &Bytes {
        &self.data
    }
}
