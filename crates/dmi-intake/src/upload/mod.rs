//! Two-phase upload orchestration: side-effect-free `validate`, then `save`.

mod pipeline;
mod types;

pub use pipeline::{UploadFile, UploadValidator};
pub use types::{UploadRequest, ValidatedAttributes, ValidatedUpload};
