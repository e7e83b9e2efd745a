//! Uploaded file handle

use bytes::Bytes;
use std::path::Path;

/// An uploaded file: its client-supplied name, declared size and content.
///
/// `size` is what the transport reported. Size checks use it, so an oversized
/// upload can be rejected without inspecting the bytes.
#[derive(Debug, Clone)]
pub struct UploadedFile {
    pub name: String,
    pub size: u64,
    pub data: Bytes,
}

impl UploadedFile {
    /// File whose declared size is the length of `data`
    pub fn new(name: impl Into<String>, data: impl Into<Bytes>) -> Self {
        let data = data.into();
        Self {
            name: name.into(),
            size: data.len() as u64,
            data,
        }
    }

    /// File with a transport-declared size
    pub fn with_declared_size(name: impl Into<String>, size: u64, data: impl Into<Bytes>) -> Self {
        Self {
            name: name.into(),
            size,
            data: data.into(),
        }
    }

    /// Read a file from disk, named after its final path component
    pub async fn from_path(path: impl AsRef<Path>) -> std::io::Result<Self> {
        let path = path.as_ref();
        let data = tokio::fs::read(path).await?;
        let name = path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or_default()
            .to_string();
        Ok(Self::new(name, data))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_size_defaults_to_content_length() {
        let file = UploadedFile::new("a.csv", b"x,y\n".to_vec());
        assert_eq!(file.size, 4);
    }

    #[tokio::test]
    async fn test_from_path_uses_file_name() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("Farmers 2024.CSV");
        tokio::fs::write(&path, b"farmer_name\n").await.unwrap();

        let file = UploadedFile::from_path(&path).await.unwrap();
        assert_eq!(file.name, "Farmers 2024.CSV");
        assert_eq!(file.size, 12);
    }
}
