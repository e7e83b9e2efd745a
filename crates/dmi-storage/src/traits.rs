//! Storage abstraction trait

use async_trait::async_trait;
use bytes::Bytes;
use thiserror::Error;

/// Storage operation errors
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Upload failed: {0}")]
    UploadFailed(String),

    #[error("Download failed: {0}")]
    DownloadFailed(String),

    #[error("Delete failed: {0}")]
    DeleteFailed(String),

    #[error("File not found: {0}")]
    NotFound(String),

    #[error("Invalid storage key: {0}")]
    InvalidKey(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    ConfigError(String),
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

impl From<StorageError> for dmi_core::AppError {
    fn from(err: StorageError) -> Self {
        match err {
            StorageError::NotFound(key) => dmi_core::AppError::NotFound(key),
            other => dmi_core::AppError::Storage(other.to_string()),
        }
    }
}

/// Storage abstraction trait
///
/// Backends keep the original bytes of accepted uploads, addressed by key.
#[async_trait]
pub trait Storage: Send + Sync {
    /// Store an upload of `file_type` and return (storage_key, storage_url)
    async fn upload(
        &self,
        file_type: &str,
        filename: &str,
        data: Bytes,
    ) -> StorageResult<(String, String)>;

    /// Read a stored file by its storage key
    async fn download(&self, storage_key: &str) -> StorageResult<Vec<u8>>;

    /// Delete a file by its storage key. Missing files are not an error.
    async fn delete(&self, storage_key: &str) -> StorageResult<()>;

    /// Check if a file exists
    async fn exists(&self, storage_key: &str) -> StorageResult<bool>;

    /// Public URL for a storage key
    fn url_for(&self, storage_key: &str) -> String;
}

#[cfg(test)]
mod tests {
    use super::*;
    use dmi_core::AppError;

    #[test]
    fn test_missing_key_maps_to_not_found() {
        let err = AppError::from(StorageError::NotFound("data/x.csv".into()));
        assert!(matches!(err, AppError::NotFound(key) if key == "data/x.csv"));
    }

    #[test]
    fn test_other_failures_map_to_storage_error() {
        let err = AppError::from(StorageError::ConfigError("no base path".into()));
        assert!(matches!(err, AppError::Storage(msg) if msg.contains("no base path")));
    }
}
