use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter, Result as FmtResult};
use uuid::Uuid;

#[cfg(feature = "sqlx")]
use sqlx::FromRow;

use crate::routing::Store;

/// Lifecycle of an accepted upload.
///
/// The intake pipeline only ever creates `Pending` records; later processing
/// stages move them forward.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(
    feature = "sqlx",
    sqlx(type_name = "file_upload_status", rename_all = "lowercase")
)]
#[serde(rename_all = "lowercase")]
pub enum FileUploadStatus {
    Pending,
    Processing,
    Processed,
    Failed,
}

impl Display for FileUploadStatus {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        match self {
            FileUploadStatus::Pending => write!(f, "pending"),
            FileUploadStatus::Processing => write!(f, "processing"),
            FileUploadStatus::Processed => write!(f, "processed"),
            FileUploadStatus::Failed => write!(f, "failed"),
        }
    }
}

/// Persisted record of a validated tabular upload
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(FromRow))]
pub struct FileUpload {
    pub id: Uuid,
    pub reference: String,
    pub file_type: String,
    /// Storage key of the original bytes
    pub original_file: String,
    pub original_filename: String,
    /// Normalized header names, in source column order
    pub headers: Vec<String>,
    pub extension: String,
    pub file_size: i64,
    pub row_count: i64,
    pub target_store: Store,
    pub status: FileUploadStatus,
    /// Operational-store user id. Not a foreign key: users live in the other store.
    pub uploaded_by: Option<Uuid>,
    pub created_at: DateTime<Utc>,
}

/// Attributes for inserting a [`FileUpload`]
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewFileUpload {
    pub id: Uuid,
    pub reference: String,
    pub file_type: String,
    pub domain: String,
    pub original_file: String,
    pub original_filename: String,
    pub headers: Vec<String>,
    pub extension: String,
    pub file_size: i64,
    pub row_count: i64,
    pub target_store: Store,
    pub uploaded_by: Option<Uuid>,
}

impl NewFileUpload {
    /// Materialize the record as it will exist once inserted
    pub fn into_record(self, created_at: DateTime<Utc>) -> FileUpload {
        FileUpload {
            id: self.id,
            reference: self.reference,
            file_type: self.file_type,
            original_file: self.original_file,
            original_filename: self.original_filename,
            headers: self.headers,
            extension: self.extension,
            file_size: self.file_size,
            row_count: self.row_count,
            target_store: self.target_store,
            status: FileUploadStatus::Pending,
            uploaded_by: self.uploaded_by,
            created_at,
        }
    }
}
