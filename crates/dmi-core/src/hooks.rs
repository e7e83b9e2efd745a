//! Persistence seam for the intake pipeline
//!
//! The upload orchestrator only needs to create records and check reference
//! codes. The database layer implements [`FileUploadStore`]; tests use an
//! in-memory implementation.

use async_trait::async_trait;
use uuid::Uuid;

use crate::error::AppError;
use crate::models::{FileUpload, NewFileUpload};

/// Storage-layer collaborator for [`FileUpload`] records
#[async_trait]
pub trait FileUploadStore: Send + Sync {
    /// Insert a new record. A single insert; atomic at the storage layer.
    async fn create(&self, upload: NewFileUpload) -> Result<FileUpload, AppError>;

    /// Whether a record already uses `reference`
    async fn reference_exists(&self, reference: &str) -> Result<bool, AppError>;

    /// Fetch a record by id
    async fn get(&self, id: Uuid) -> Result<Option<FileUpload>, AppError>;
}
