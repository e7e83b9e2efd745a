//! Extension and size checks for uploaded tabular files

use std::fmt::{Display, Formatter, Result as FmtResult};

use crate::error::IntakeError;
use crate::file::UploadedFile;

/// Upload size ceiling: 20 MiB.
pub const MAX_UPLOAD_SIZE_BYTES: u64 = 20 * 1024 * 1024;

/// Accepted tabular formats
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TabularFormat {
    Csv,
    Xls,
    Xlsx,
    Xlsm,
}

impl TabularFormat {
    pub const ALL: [TabularFormat; 4] = [
        TabularFormat::Xls,
        TabularFormat::Xlsx,
        TabularFormat::Xlsm,
        TabularFormat::Csv,
    ];

    /// Extension including the leading dot, e.g. `.xlsx`
    pub fn extension(&self) -> &'static str {
        match self {
            TabularFormat::Csv => ".csv",
            TabularFormat::Xls => ".xls",
            TabularFormat::Xlsx => ".xlsx",
            TabularFormat::Xlsm => ".xlsm",
        }
    }

    /// Parse a dotted, lower-case extension
    pub fn from_extension(extension: &str) -> Option<Self> {
        TabularFormat::ALL
            .into_iter()
            .find(|f| f.extension() == extension)
    }

    pub fn is_spreadsheet(&self) -> bool {
        !matches!(self, TabularFormat::Csv)
    }
}

impl Display for TabularFormat {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        write!(f, "{}", self.extension())
    }
}

/// Lower-cased suffix from the last `.` of the final path component.
///
/// Returns an empty string when there is no extension; a leading dot alone
/// (`.csv`) names a hidden file, not an extension.
pub fn file_extension(filename: &str) -> String {
    let base = filename
        .rsplit(|c| c == '/' || c == '\\')
        .next()
        .unwrap_or(filename);
    match base.rfind('.') {
        Some(idx) if idx > 0 => base[idx..].to_lowercase(),
        _ => String::new(),
    }
}

/// Tabular upload validator
///
/// Checks the extension first, then the declared size, so a wrong format is
/// always reported even when the file is also too large.
#[derive(Debug, Clone)]
pub struct FileValidator {
    max_file_size: u64,
    allowed: Vec<TabularFormat>,
}

impl Default for FileValidator {
    fn default() -> Self {
        Self::new(MAX_UPLOAD_SIZE_BYTES)
    }
}

impl FileValidator {
    pub fn new(max_file_size: u64) -> Self {
        Self {
            max_file_size,
            allowed: TabularFormat::ALL.to_vec(),
        }
    }

    pub fn max_file_size(&self) -> u64 {
        self.max_file_size
    }

    pub fn allowed_extensions(&self) -> Vec<String> {
        self.allowed
            .iter()
            .map(|f| f.extension().to_string())
            .collect()
    }

    /// Validate file extension
    pub fn validate_extension(&self, filename: &str) -> Result<TabularFormat, IntakeError> {
        let extension = file_extension(filename);
        TabularFormat::from_extension(&extension)
            .filter(|format| self.allowed.contains(format))
            .ok_or_else(|| IntakeError::UnsupportedFormat {
                extension,
                allowed: self.allowed_extensions(),
            })
    }

    /// Validate file size
    pub fn validate_file_size(&self, size: u64) -> Result<(), IntakeError> {
        if size > self.max_file_size {
            return Err(IntakeError::FileTooLarge {
                size,
                max: self.max_file_size,
            });
        }
        Ok(())
    }

    /// Validate extension then size; returns the detected format.
    ///
    /// The size checked is the larger of the declared size and the payload
    /// length, so an understated declaration cannot get past the ceiling.
    pub fn validate(&self, file: &UploadedFile) -> Result<TabularFormat, IntakeError> {
        let format = self.validate_extension(&file.name)?;
        self.validate_file_size(file.size.max(file.data.len() as u64))?;
        Ok(format)
    }
}
