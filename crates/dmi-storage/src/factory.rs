use crate::{LocalStorage, Storage, StorageResult};
use dmi_core::Config;
use std::sync::Arc;

/// Create the storage backend for original upload files
pub async fn create_storage(config: &Config) -> StorageResult<Arc<dyn Storage>> {
    let storage = LocalStorage::new(
        config.storage_path().to_string(),
        config.storage_base_url().to_string(),
    )
    .await?;

    tracing::info!(
        path = %config.storage_path(),
        "Using local storage for uploaded files"
    );

    Ok(Arc::new(storage))
}
