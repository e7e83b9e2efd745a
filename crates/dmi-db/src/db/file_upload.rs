//! File upload repository: records of accepted tabular uploads.
//!
//! The `file_uploads` table belongs to the `data` domain and so lives in the
//! analytical store. `uploaded_by` points at a user in the operational store;
//! it is kept as a plain id because the two stores cannot share keys.

use async_trait::async_trait;
use chrono::Utc;
use sqlx::{PgPool, Postgres};
use uuid::Uuid;

use dmi_core::models::{FileUpload, FileUploadStatus, NewFileUpload};
use dmi_core::{AppError, FileUploadStore, Store, DATA_DOMAIN};

use super::pools::{DatabasePools, USERS_DOMAIN};

const FILE_UPLOAD_COLUMNS: &str = "id, reference, file_type, original_file, original_filename, \
     headers, extension, file_size, row_count, target_store, status, uploaded_by, created_at";

#[derive(Clone)]
pub struct FileUploadRepository {
    pools: DatabasePools,
}

impl FileUploadRepository {
    pub fn new(pools: DatabasePools) -> Self {
        Self { pools }
    }

    /// Store that owns the `file_uploads` table
    fn table_store(&self) -> Store {
        self.pools.router().route_for_write(DATA_DOMAIN)
    }

    fn read_pool(&self) -> &PgPool {
        self.pools.for_read(DATA_DOMAIN)
    }

    /// Pool for inserting a record of `domain`.
    ///
    /// The record must route to the store that holds `file_uploads`, and any
    /// uploader reference must be a relation the router permits.
    fn write_pool(&self, upload: &NewFileUpload) -> Result<&PgPool, AppError> {
        let router = self.pools.router();
        let store = router.route_for_write(&upload.domain);
        if !router.allow_migrate(store, DATA_DOMAIN) {
            return Err(AppError::InvalidInput(format!(
                "Domain '{}' routes to the {} store, which has no file_uploads table",
                upload.domain, store
            )));
        }
        if upload.uploaded_by.is_some() {
            let users_store = router.route_for_read(USERS_DOMAIN);
            if !router.allow_relation(users_store.alias(), store.alias()) {
                return Err(AppError::InvalidInput(format!(
                    "Uploads in {} may not reference users in {}",
                    store, users_store
                )));
            }
        }
        Ok(self.pools.pool(store))
    }

    #[tracing::instrument(
        skip(self, upload),
        fields(db.table = "file_uploads", db.operation = "insert", file_type = %upload.file_type)
    )]
    pub async fn insert(&self, upload: NewFileUpload) -> Result<FileUpload, AppError> {
        let pool = self.write_pool(&upload)?;
        let created_at = Utc::now();

        let record = sqlx::query_as::<Postgres, FileUpload>(&format!(
            r#"
            INSERT INTO file_uploads (
                id, reference, file_type, original_file, original_filename,
                headers, extension, file_size, row_count, target_store,
                status, uploaded_by, created_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13)
            RETURNING {}
            "#,
            FILE_UPLOAD_COLUMNS
        ))
        .bind(upload.id)
        .bind(&upload.reference)
        .bind(&upload.file_type)
        .bind(&upload.original_file)
        .bind(&upload.original_filename)
        .bind(&upload.headers)
        .bind(&upload.extension)
        .bind(upload.file_size)
        .bind(upload.row_count)
        .bind(upload.target_store)
        .bind(FileUploadStatus::Pending)
        .bind(upload.uploaded_by)
        .bind(created_at)
        .fetch_one(pool)
        .await?;

        tracing::debug!(upload_id = %record.id, store = %self.table_store(), "File upload inserted");
        Ok(record)
    }

    #[tracing::instrument(skip(self), fields(db.table = "file_uploads", db.operation = "select", db.record_id = %id))]
    pub async fn get_by_id(&self, id: Uuid) -> Result<Option<FileUpload>, AppError> {
        let record = sqlx::query_as::<Postgres, FileUpload>(&format!(
            "SELECT {} FROM file_uploads WHERE id = $1",
            FILE_UPLOAD_COLUMNS
        ))
        .bind(id)
        .fetch_optional(self.read_pool())
        .await?;
        Ok(record)
    }

    #[tracing::instrument(skip(self), fields(db.table = "file_uploads", db.operation = "select"))]
    pub async fn get_by_reference(&self, reference: &str) -> Result<Option<FileUpload>, AppError> {
        let record = sqlx::query_as::<Postgres, FileUpload>(&format!(
            "SELECT {} FROM file_uploads WHERE reference = $1",
            FILE_UPLOAD_COLUMNS
        ))
        .bind(reference)
        .fetch_optional(self.read_pool())
        .await?;
        Ok(record)
    }

    /// Most recent uploads, optionally restricted to one file type
    #[tracing::instrument(skip(self), fields(db.table = "file_uploads", db.operation = "select"))]
    pub async fn list_recent(
        &self,
        file_type: Option<&str>,
        limit: i64,
    ) -> Result<Vec<FileUpload>, AppError> {
        let limit = limit.clamp(1, 500);
        let records = sqlx::query_as::<Postgres, FileUpload>(&format!(
            r#"
            SELECT {}
            FROM file_uploads
            WHERE ($1::TEXT IS NULL OR file_type = $1)
            ORDER BY created_at DESC
            LIMIT $2
            "#,
            FILE_UPLOAD_COLUMNS
        ))
        .bind(file_type)
        .bind(limit)
        .fetch_all(self.read_pool())
        .await?;
        Ok(records)
    }

    /// Move a record to `status`; later processing stages use this
    #[tracing::instrument(skip(self), fields(db.table = "file_uploads", db.operation = "update", db.record_id = %id))]
    pub async fn update_status(
        &self,
        id: Uuid,
        status: FileUploadStatus,
    ) -> Result<FileUpload, AppError> {
        let record = sqlx::query_as::<Postgres, FileUpload>(&format!(
            "UPDATE file_uploads SET status = $2 WHERE id = $1 RETURNING {}",
            FILE_UPLOAD_COLUMNS
        ))
        .bind(id)
        .bind(status)
        .fetch_optional(self.pools.for_write(DATA_DOMAIN))
        .await?;

        record.ok_or_else(|| AppError::NotFound(format!("File upload {} not found", id)))
    }

    #[tracing::instrument(skip(self), fields(db.table = "file_uploads", db.operation = "select"))]
    pub async fn reference_taken(&self, reference: &str) -> Result<bool, AppError> {
        let exists: bool = sqlx::query_scalar(
            "SELECT EXISTS(SELECT 1 FROM file_uploads WHERE reference = $1)",
        )
        .bind(reference)
        .fetch_one(self.read_pool())
        .await?;
        Ok(exists)
    }
}

#[async_trait]
impl FileUploadStore for FileUploadRepository {
    async fn create(&self, upload: NewFileUpload) -> Result<FileUpload, AppError> {
        self.insert(upload).await
    }

    async fn reference_exists(&self, reference: &str) -> Result<bool, AppError> {
        self.reference_taken(reference).await
    }

    async fn get(&self, id: Uuid) -> Result<Option<FileUpload>, AppError> {
        self.get_by_id(id).await
    }
}
