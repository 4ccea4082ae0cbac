//! Remote asset document.

use serde::{Deserialize, Serialize};

/// Families of assets the store distinguishes.
///
/// Each kind gets its own transport endpoint and its own concurrency
/// limiter binding.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AssetKind {
    File,
    Image,
    Video,
}

impl AssetKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            AssetKind::File => "file",
            AssetKind::Image => "image",
            AssetKind::Video => "video",
        }
    }
}

impl std::fmt::Display for AssetKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A record in the remote asset store, keyed by id.
///
/// Looked up (by id or by content hash), never constructed locally; the
/// store is the only writer.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssetDocument {
    pub id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sha1_hash: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub original_filename: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mime_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub size: Option<u64>,
}

impl AssetDocument {
    /// Minimal document carrying only an id. Test and dedup-hit convenience.
    pub fn with_id(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            sha1_hash: None,
            url: None,
            original_filename: None,
            mime_type: None,
            size: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_optional_fields_omitted() {
        let value = serde_json::to_value(AssetDocument::with_id("asset-1")).unwrap();
        assert_eq!(value["id"], "asset-1");
        assert!(value.get("sha1Hash").is_none());
        assert!(value.get("url").is_none());
    }

    #[test]
    fn test_deserializes_remote_shape() {
        let doc: AssetDocument = serde_json::from_value(serde_json::json!({
            "id": "asset-9",
            "sha1Hash": "da39a3ee5e6b4b0d3255bfef95601890afd80709",
            "mimeType": "image/png",
            "size": 1024
        }))
        .unwrap();
        assert_eq!(doc.sha1_hash.as_deref().unwrap().len(), 40);
        assert_eq!(doc.size, Some(1024));
    }
}
