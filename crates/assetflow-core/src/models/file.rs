//! Minimal file descriptor used throughout the pipeline.

use bytes::Bytes;
use serde::{Deserialize, Serialize};

/// A file offered for upload.
///
/// `name` may be absent: while a file merely hovers over a drop target the
/// environment does not always expose a filename until the drop completes.
/// The descriptor never owns raw bytes beyond what the caller already
/// holds; `bytes` is a cheap shared handle to that payload when available.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct FileLike {
    pub name: Option<String>,
    /// Declared MIME type. May be empty for unknown types.
    pub mime_type: String,
    pub size: u64,
    /// Shared handle to the file content if the caller holds it.
    #[serde(skip)]
    pub bytes: Option<Bytes>,
}

impl FileLike {
    pub fn new(name: impl Into<String>, mime_type: impl Into<String>, bytes: Bytes) -> Self {
        Self {
            name: Some(name.into()),
            mime_type: mime_type.into(),
            size: bytes.len() as u64,
            bytes: Some(bytes),
        }
    }

    /// A descriptor without a resolvable name, as seen during drag hover.
    pub fn unnamed(mime_type: impl Into<String>, size: u64) -> Self {
        Self {
            name: None,
            mime_type: mime_type.into(),
            size,
            bytes: None,
        }
    }

    /// Lowercased extension of the filename, without the leading dot.
    pub fn extension(&self) -> Option<String> {
        let name = self.name.as_deref()?;
        let (stem, ext) = name.rsplit_once('.')?;
        if stem.is_empty() || ext.is_empty() {
            return None;
        }
        Some(ext.to_lowercase())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extension_lowercased() {
        let file = FileLike::new("photo.PSD", "", Bytes::from_static(b"x"));
        assert_eq!(file.extension().as_deref(), Some("psd"));
    }

    #[test]
    fn test_extension_absent() {
        assert_eq!(
            FileLike::new("README", "text/plain", Bytes::new()).extension(),
            None
        );
        // A leading dot alone is not an extension
        assert_eq!(
            FileLike::new(".gitignore", "", Bytes::new()).extension(),
            None
        );
        assert_eq!(FileLike::unnamed("image/png", 10).extension(), None);
    }

    #[test]
    fn test_size_tracks_bytes() {
        let file = FileLike::new("a.bin", "application/octet-stream", Bytes::from_static(b"12345"));
        assert_eq!(file.size, 5);
    }
}
