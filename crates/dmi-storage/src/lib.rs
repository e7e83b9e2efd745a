//! DMI Storage Library
//!
//! Keeps the original bytes of accepted uploads. Records in the database only
//! hold the storage key.
//!
//! # Storage key format
//!
//! `data/{file_type}/{filename}`, where `filename` is generated by the intake
//! pipeline (`{uuid}{extension}`). Keys must not contain `..` or a leading `/`.
//! Key generation lives in the `keys` module.

pub mod factory;
pub mod keys;
pub mod local;
pub mod traits;

// Re-export commonly used types
pub use factory::create_storage;
pub use local::LocalStorage;
pub use traits::{Storage, StorageError, StorageResult};
