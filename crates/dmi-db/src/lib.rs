//! DMI database layer
//!
//! One PostgreSQL pool per physical store. Every query picks its pool through
//! the [`dmi_core::DatabaseRouter`]; migrations for a store only run where the
//! router allows them.

pub mod db;

pub use db::{DatabasePools, FileUploadRepository};
