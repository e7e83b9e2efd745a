//! Database repositories and connection pools
//
// Pools for the operational and analytical stores
pub mod pools;
//
// Intake records (analytical store)
pub mod file_upload;

pub use file_upload::FileUploadRepository;
pub use pools::DatabasePools;
