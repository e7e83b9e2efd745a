//! Data models for the application

mod file_upload;

pub use file_upload::*;
