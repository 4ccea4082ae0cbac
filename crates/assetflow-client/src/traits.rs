//! Trait seams between the pipeline and the remote asset service.
//!
//! The pipeline is written against these traits so tests can substitute
//! in-memory implementations; the HTTP implementations live in
//! [`crate::api`].

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;

use assetflow_core::models::{AssetDocument, AssetKind, FileLike, UploadOptions};
use assetflow_core::UploadError;

/// Body of a link request: associates an already-stored remote asset with
/// the current dataset without re-uploading bytes.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LinkRequest {
    pub media_library_id: String,
    pub asset_instance_id: String,
    pub asset_id: String,
}

/// Read/link operations against the remote asset store.
#[async_trait]
pub trait AssetStore: Send + Sync {
    /// Query by exact content hash. Returns at most one document.
    async fn fetch_by_hash(&self, sha1_hash: &str) -> Result<Option<AssetDocument>, UploadError>;

    /// Issue one link request. A 422 with the documented "not ready"
    /// message surfaces as [`UploadError::AssetNotReady`]; all other 4xx/5xx
    /// are fatal.
    async fn link_asset(&self, request: &LinkRequest) -> Result<AssetDocument, UploadError>;
}

/// The byte-transfer half of an upload.
#[async_trait]
pub trait UploadTransport: Send + Sync {
    /// Transfer the file's bytes to the store.
    ///
    /// Percent progress (0-100, transport-scale) is reported through
    /// `progress` as bytes go out; the final asset document is the return
    /// value. Dropping the returned future aborts the transfer.
    async fn upload(
        &self,
        file: &FileLike,
        kind: AssetKind,
        options: &UploadOptions,
        progress: mpsc::Sender<f64>,
    ) -> Result<AssetDocument, UploadError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_link_request_body_shape() {
        let request = LinkRequest {
            media_library_id: "lib-1".into(),
            asset_instance_id: "inst-2".into(),
            asset_id: "asset-3".into(),
        };
        let value = serde_json::to_value(&request).unwrap();
        assert_eq!(value["mediaLibraryId"], "lib-1");
        assert_eq!(value["assetInstanceId"], "inst-2");
        assert_eq!(value["assetId"], "asset-3");
    }
}
