//! HTTP implementations of the asset service traits.
//!
//! Error mapping is the contract here: a 422 whose message payload is the
//! documented "not ready" string becomes [`UploadError::AssetNotReady`]
//! (retryable by the link retrier), a 402 becomes
//! [`UploadError::AssetLimit`] (upsell), everything else non-2xx is a
//! fatal transport failure.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use futures::StreamExt;
use tokio::sync::mpsc;

use assetflow_core::constants::ASSET_NOT_READY_MESSAGE;
use assetflow_core::models::{AssetDocument, AssetKind, FileLike, UploadOptions};
use assetflow_core::UploadError;

use crate::traits::{AssetStore, LinkRequest, UploadTransport};
use crate::{api_prefix, AssetServiceClient};

/// Chunk size for the streamed upload body. Progress granularity follows
/// from this.
const UPLOAD_CHUNK_BYTES: usize = 64 * 1024;

/// Extract the server's message payload, falling back to the raw body.
fn response_message(body: &str) -> String {
    serde_json::from_str::<serde_json::Value>(body)
        .ok()
        .and_then(|v| v.get("message").and_then(|m| m.as_str()).map(String::from))
        .unwrap_or_else(|| body.to_string())
}

/// Split the payload into transfer chunks; each chunk is a view into the
/// same backing buffer, not a copy.
fn chunk_payload(bytes: &Bytes) -> Vec<Bytes> {
    (0..bytes.len())
        .step_by(UPLOAD_CHUNK_BYTES)
        .map(|start| bytes.slice(start..bytes.len().min(start + UPLOAD_CHUNK_BYTES)))
        .collect()
}

async fn error_from_response(response: reqwest::Response) -> UploadError {
    let status = response.status();
    let body = response.text().await.unwrap_or_default();
    let message = response_message(&body);

    if status.as_u16() == 422 && message == ASSET_NOT_READY_MESSAGE {
        UploadError::AssetNotReady(message)
    } else if status.as_u16() == 402 {
        UploadError::AssetLimit(message)
    } else {
        UploadError::Transport(format!("status {}: {}", status, message))
    }
}

#[async_trait]
impl AssetStore for AssetServiceClient {
    async fn fetch_by_hash(&self, sha1_hash: &str) -> Result<Option<AssetDocument>, UploadError> {
        let url = self.build_url(&format!("{}/assets", api_prefix()));
        let request = self
            .client()
            .get(&url)
            .query(&[("sha1Hash", sha1_hash), ("limit", "1")]);
        let request = self.apply_auth(request);

        let response = request
            .send()
            .await
            .map_err(|e| UploadError::DedupLookup(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status();
            return Err(UploadError::DedupLookup(format!("status {}", status)));
        }

        let mut documents: Vec<AssetDocument> = response
            .json()
            .await
            .map_err(|e| UploadError::DedupLookup(e.to_string()))?;

        Ok(if documents.is_empty() {
            None
        } else {
            Some(documents.swap_remove(0))
        })
    }

    async fn link_asset(&self, request: &LinkRequest) -> Result<AssetDocument, UploadError> {
        let url = self.build_url(&format!("{}/assets/link", api_prefix()));
        let req = self.client().post(&url).json(request);
        let req = self.apply_auth(req);

        let response = req
            .send()
            .await
            .map_err(|e| UploadError::Transport(e.to_string()))?;

        if !response.status().is_success() {
            return Err(error_from_response(response).await);
        }

        response
            .json()
            .await
            .map_err(|e| UploadError::Transport(format!("invalid link response: {}", e)))
    }
}

#[async_trait]
impl UploadTransport for AssetServiceClient {
    async fn upload(
        &self,
        file: &FileLike,
        kind: AssetKind,
        options: &UploadOptions,
        progress: mpsc::Sender<f64>,
    ) -> Result<AssetDocument, UploadError> {
        let bytes = file
            .bytes
            .clone()
            .ok_or_else(|| UploadError::Transport("file content is not readable".into()))?;
        let total = bytes.len().max(1) as u64;

        let url = self.build_url(&format!("{}/assets/{}s", api_prefix(), kind));
        let mut query = options.to_query_pairs();
        if let Some(name) = &file.name {
            query.push(("filename", name.clone()));
        }

        // Chunked body so progress tracks bytes handed to the connection.
        // Progress sends are lossy (try_send); the terminal event carries
        // the authoritative result.
        let sent = Arc::new(AtomicU64::new(0));
        let chunks = chunk_payload(&bytes);
        let body_stream = futures::stream::iter(chunks.into_iter().map(Ok::<_, std::io::Error>))
            .inspect(move |chunk| {
                if let Ok(chunk) = chunk {
                    let so_far = sent.fetch_add(chunk.len() as u64, Ordering::Relaxed)
                        + chunk.len() as u64;
                    let percent = (so_far as f64 / total as f64) * 100.0;
                    let _ = progress.try_send(percent.min(100.0));
                }
            });

        let request = self
            .client()
            .post(&url)
            .query(&query)
            .header("Content-Type", &file.mime_type)
            .body(reqwest::Body::wrap_stream(body_stream));
        let request = self.apply_auth(request);

        let response = request
            .send()
            .await
            .map_err(|e| UploadError::Transport(e.to_string()))?;

        if !response.status().is_success() {
            return Err(error_from_response(response).await);
        }

        response
            .json()
            .await
            .map_err(|e| UploadError::Transport(format!("invalid upload response: {}", e)))
    }
}
