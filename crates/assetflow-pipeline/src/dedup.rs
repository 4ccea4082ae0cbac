//! Content digests and the optimistic dedup lookup.
//!
//! A digest failure is never fatal: the pipeline proceeds as if no digest
//! were available and pays the transport cost. Likewise a lookup failure
//! is treated identically to "no existing asset".

use sha1::{Digest, Sha1};

use assetflow_client::AssetStore;
use assetflow_core::models::{AssetDocument, FileLike};

/// Computes SHA-1 content digests for deduplication.
pub struct ContentHasher;

impl ContentHasher {
    /// Hex SHA-1 digest of the file content, or `None` when the content is
    /// not readable. Large payloads digest on the blocking pool; the hash
    /// is a bounded, non-preemptible step.
    pub async fn digest(file: &FileLike) -> Option<String> {
        let bytes = file.bytes.clone()?;
        match tokio::task::spawn_blocking(move || Self::digest_bytes(&bytes)).await {
            Ok(digest) => Some(digest),
            Err(e) => {
                tracing::warn!(error = %e, "Hashing failed, proceeding without dedup");
                None
            }
        }
    }

    /// Hex SHA-1 digest of a byte slice.
    pub fn digest_bytes(data: &[u8]) -> String {
        let mut hasher = Sha1::new();
        hasher.update(data);
        hex::encode(hasher.finalize())
    }
}

/// Query the store for an asset with this content hash.
///
/// Network or lookup failure falls back to "no match" so the upload can
/// proceed; the error is logged, never propagated.
pub async fn lookup_existing(store: &dyn AssetStore, sha1_hash: &str) -> Option<AssetDocument> {
    match store.fetch_by_hash(sha1_hash).await {
        Ok(found) => found,
        Err(e) => {
            tracing::warn!(
                error = %e,
                sha1_hash = sha1_hash,
                "Dedup lookup failed, proceeding with upload"
            );
            None
        }
    }
}
