//! Upload pipeline: resolve → check → load → headers, then store → record.
//!
//! [`UploadFile::validate`] performs no I/O and may be repeated freely (dry
//! runs use it alone). [`UploadFile::save`] is the only effectful step: it
//! keeps the original bytes and inserts one record.

use std::sync::Arc;
use std::time::Instant;

use uuid::Uuid;

use dmi_core::models::{FileUpload, NewFileUpload};
use dmi_core::{generate_unique_code, AppError, CodeSpec, FileUploadStore};
use dmi_storage::Storage;

use super::types::{UploadRequest, ValidatedAttributes, ValidatedUpload};
use crate::error::{IntakeError, UploadError};
use crate::headers::validate_headers;
use crate::loader::TabularLoader;
use crate::registry::SchemaRegistry;
use crate::validator::FileValidator;

/// The validation half of the pipeline. Needs no storage, so dry runs can
/// use it on its own.
#[derive(Debug, Clone)]
pub struct UploadValidator {
    registry: Arc<SchemaRegistry>,
    validator: FileValidator,
    loader: TabularLoader,
}

impl UploadValidator {
    pub fn new(registry: Arc<SchemaRegistry>) -> Self {
        Self {
            registry,
            validator: FileValidator::default(),
            loader: TabularLoader,
        }
    }

    /// Replace the default 20 MiB extension/size validator
    pub fn with_file_validator(mut self, validator: FileValidator) -> Self {
        self.validator = validator;
        self
    }

    pub fn registry(&self) -> &SchemaRegistry {
        &self.registry
    }

    /// Validate a request without side effects.
    ///
    /// Any failure is wrapped in [`UploadError::ValidationFailed`].
    pub fn validate(&self, request: &UploadRequest) -> Result<ValidatedUpload, UploadError> {
        let start = Instant::now();
        let result = self.run_checks(request);

        match &result {
            Ok(validated) => tracing::debug!(
                file_type = %validated.attrs.file_type,
                extension = %validated.attrs.ext,
                size_bytes = request.file.size,
                rows = validated.attrs.row_count,
                duration_ms = start.elapsed().as_millis() as u64,
                "Upload validated"
            ),
            Err(e) => tracing::debug!(
                file_type = %request.file_type,
                filename = %request.file.name,
                size_bytes = request.file.size,
                kind = ?e.kind(),
                error = %e,
                "Upload rejected"
            ),
        }

        result.map_err(UploadError::from)
    }

    fn run_checks(&self, request: &UploadRequest) -> Result<ValidatedUpload, IntakeError> {
        let schema = self.registry.resolve(&request.file_type)?;
        let format = self.validator.validate(&request.file)?;
        let table = self.loader.load(&request.file.data, format)?;
        let headers = validate_headers(&table, &schema.expected_fields)?;

        let attrs = ValidatedAttributes {
            file_type: schema.file_type,
            domain: schema.domain,
            headers: headers.into_vec(),
            ext: format.extension().to_string(),
            row_count: table.row_count(),
            target_store: schema.target_store,
            original_filename: request.file.name.clone(),
            file_size: request.file.size,
            uploaded_by: request.uploaded_by,
        };

        Ok(ValidatedUpload {
            attrs,
            table,
            data: request.file.data.clone(),
        })
    }
}

/// Upload orchestrator
#[derive(Clone)]
pub struct UploadFile {
    checks: UploadValidator,
    storage: Arc<dyn Storage>,
    store: Arc<dyn FileUploadStore>,
}

impl UploadFile {
    pub fn new(
        registry: Arc<SchemaRegistry>,
        storage: Arc<dyn Storage>,
        store: Arc<dyn FileUploadStore>,
    ) -> Self {
        Self {
            checks: UploadValidator::new(registry),
            storage,
            store,
        }
    }

    /// Replace the default 20 MiB extension/size validator
    pub fn with_validator(mut self, validator: FileValidator) -> Self {
        self.checks = self.checks.with_file_validator(validator);
        self
    }

    pub fn registry(&self) -> &SchemaRegistry {
        self.checks.registry()
    }

    /// See [`UploadValidator::validate`]
    pub fn validate(&self, request: &UploadRequest) -> Result<ValidatedUpload, UploadError> {
        self.checks.validate(request)
    }

    /// Persist a validated upload.
    ///
    /// Stores the original bytes, then creates the record. If the insert
    /// fails the stored file is removed again. Never retries.
    pub async fn save(&self, validated: ValidatedUpload) -> Result<FileUpload, UploadError> {
        let ValidatedUpload { attrs, data, .. } = validated;

        let reference = generate_unique_code(CodeSpec::REFERENCE, |code| {
            let store = Arc::clone(&self.store);
            async move { store.reference_exists(&code).await }
        })
        .await?;

        let id = Uuid::new_v4();
        let filename = format!("{}{}", id, attrs.ext);
        let (storage_key, _) = self
            .storage
            .upload(&attrs.file_type, &filename, data)
            .await
            .map_err(AppError::from)?;

        let new_upload = NewFileUpload {
            id,
            reference,
            file_type: attrs.file_type.clone(),
            domain: attrs.domain.clone(),
            original_file: storage_key.clone(),
            original_filename: attrs.original_filename.clone(),
            headers: attrs.headers.clone(),
            extension: attrs.ext.clone(),
            file_size: attrs.file_size as i64,
            row_count: attrs.row_count as i64,
            target_store: attrs.target_store,
            uploaded_by: attrs.uploaded_by,
        };

        match self.store.create(new_upload).await {
            Ok(record) => {
                tracing::info!(
                    upload_id = %record.id,
                    reference = %record.reference,
                    file_type = %record.file_type,
                    store = %record.target_store,
                    rows = record.row_count,
                    created_at = %record.created_at,
                    "File upload saved"
                );
                Ok(record)
            }
            Err(e) => {
                tracing::error!(
                    error = %e,
                    file_type = %attrs.file_type,
                    storage_key = %storage_key,
                    "Failed to create file upload record"
                );
                if let Err(cleanup) = self.storage.delete(&storage_key).await {
                    tracing::warn!(
                        error = %cleanup,
                        storage_key = %storage_key,
                        "Failed to remove stored file after record insert failed"
                    );
                }
                Err(e.into())
            }
        }
    }

    /// `validate` followed by `save`
    pub async fn process(&self, request: &UploadRequest) -> Result<FileUpload, UploadError> {
        let validated = self.validate(request)?;
        let start = Instant::now();
        let record = self.save(validated).await?;
        tracing::debug!(
            upload_id = %record.id,
            duration_ms = start.elapsed().as_millis() as u64,
            "Upload processed"
        );
        Ok(record)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::IntakeErrorKind;
    use crate::file::UploadedFile;
    use async_trait::async_trait;
    use chrono::Utc;
    use dmi_storage::LocalStorage;
    use std::sync::Mutex;

    #[derive(Default)]
    struct NoopStore {
        created: Mutex<Vec<NewFileUpload>>,
    }

    #[async_trait]
    impl FileUploadStore for NoopStore {
        async fn create(&self, upload: NewFileUpload) -> Result<FileUpload, AppError> {
            self.created.lock().unwrap().push(upload.clone());
            Ok(upload.into_record(Utc::now()))
        }

        async fn reference_exists(&self, _reference: &str) -> Result<bool, AppError> {
            Ok(false)
        }

        async fn get(&self, _id: Uuid) -> Result<Option<FileUpload>, AppError> {
            Ok(None)
        }
    }

    async fn orchestrator(dir: &std::path::Path) -> (UploadFile, Arc<NoopStore>) {
        let store = Arc::new(NoopStore::default());
        let storage = LocalStorage::new(dir.to_path_buf(), "http://localhost/media".to_string())
            .await
            .unwrap();
        let upload = UploadFile::new(
            Arc::new(SchemaRegistry::default()),
            Arc::new(storage),
            store.clone(),
        );
        (upload, store)
    }

    #[tokio::test]
    async fn test_unknown_file_type_checked_first() {
        let dir = tempfile::tempdir().unwrap();
        let (upload, _) = orchestrator(dir.path()).await;
        let request = UploadRequest::new("fisheries", UploadedFile::new("a.pdf", b"".to_vec()));
        let err = upload.validate(&request).unwrap_err();
        assert_eq!(err.kind(), IntakeErrorKind::UnknownFileType);
    }

    #[tokio::test]
    async fn test_validate_is_repeatable() {
        let dir = tempfile::tempdir().unwrap();
        let (upload, store) = orchestrator(dir.path()).await;
        let request = UploadRequest::new(
            "livestock_census",
            UploadedFile::new(
                "census.csv",
                b"State,LGA,Year,Species,Head Count\nKano,Dala,2023,goat,120\n".to_vec(),
            ),
        );
        let first = upload.validate(&request).unwrap();
        let second = upload.validate(&request).unwrap();
        assert_eq!(first.attrs, second.attrs);
        assert!(store.created.lock().unwrap().is_empty());
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
    }

    #[tokio::test]
    async fn test_save_sets_reference_and_storage_key() {
        let dir = tempfile::tempdir().unwrap();
        let (upload, store) = orchestrator(dir.path()).await;
        let request = UploadRequest::new(
            "livestock_census",
            UploadedFile::new(
                "census.csv",
                b"state,lga,year,species,head_count\nOyo,Iseyin,2022,cattle,40\n".to_vec(),
            ),
        );
        let record = upload.process(&request).await.unwrap();
        assert_eq!(record.reference.len(), 9);
        assert!(record
            .original_file
            .starts_with("data/livestock_census/"));
        assert!(record.original_file.ends_with(".csv"));
        assert_eq!(store.created.lock().unwrap().len(), 1);
    }
}
