//! DMI Core Library
//!
//! This crate provides the domain models, error types, configuration and the
//! two-store routing policy shared by every DMI component. It never opens
//! database connections itself.

pub mod codes;
pub mod config;
pub mod error;
pub mod hooks;
pub mod models;
pub mod routing;

// Re-export commonly used types
pub use codes::{generate_unique_code, CodeSpec};
pub use config::{
    analytical_domains_from_env, upload_limit_from_env, Config, DatabaseConfig, IntakeConfig,
};
pub use error::{AppError, ErrorMetadata, LogLevel};
pub use hooks::FileUploadStore;
pub use routing::{DatabaseRouter, Store, DATA_DOMAIN};
