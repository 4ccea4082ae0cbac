//! Linking externally-stored assets with retry.
//!
//! A link request can race the remote store's own ingest: the asset
//! exists but is not ready to be linked, and the store answers with the
//! documented "not ready" rejection. That condition is retried on a fixed
//! delay up to a ceiling; every other failure is fatal immediately.
//!
//! Batches are dispatched with fixed spacing between requests and a
//! concurrency bound across the batch, so a large paste of library assets
//! does not stampede the store.

use std::sync::Arc;
use std::time::Duration;

use assetflow_client::{AssetStore, LinkRequest};
use assetflow_core::models::AssetDocument;
use assetflow_core::{ErrorMetadata, UploadConfig, UploadError};

use crate::limiter::ConcurrencyLimiter;

/// Issues link requests with spacing, bounded concurrency, and
/// not-ready retry.
pub struct AssetLinkRetrier {
    store: Arc<dyn AssetStore>,
    limiter: ConcurrencyLimiter,
    max_attempts: u32,
    retry_delay: Duration,
    spacing: Duration,
}

impl AssetLinkRetrier {
    pub fn new(store: Arc<dyn AssetStore>, config: &UploadConfig) -> Self {
        Self {
            store,
            limiter: ConcurrencyLimiter::new(config.link_concurrency),
            max_attempts: config.link_max_attempts,
            retry_delay: config.link_retry_delay(),
            spacing: config.link_spacing(),
        }
    }

    /// Link a batch, returning the linked documents in request order.
    ///
    /// The first fatal failure fails the batch; requests already in
    /// flight run to completion but their results are discarded.
    pub async fn link(
        &self,
        requests: Vec<LinkRequest>,
    ) -> Result<Vec<AssetDocument>, UploadError> {
        let mut handles = Vec::with_capacity(requests.len());
        for (i, request) in requests.into_iter().enumerate() {
            if i > 0 {
                tokio::time::sleep(self.spacing).await;
            }
            let store = self.store.clone();
            let limiter = self.limiter.clone();
            let max_attempts = self.max_attempts;
            let retry_delay = self.retry_delay;
            handles.push(tokio::spawn(async move {
                limiter
                    .run(link_one(store.as_ref(), &request, max_attempts, retry_delay))
                    .await
            }));
        }

        let mut linked = Vec::with_capacity(handles.len());
        for handle in handles {
            let result = handle
                .await
                .map_err(|e| UploadError::Internal(anyhow::anyhow!("link task panicked: {e}")))?;
            linked.push(result?);
        }
        Ok(linked)
    }

    /// Link a single asset with retry.
    pub async fn link_asset(&self, request: &LinkRequest) -> Result<AssetDocument, UploadError> {
        self.limiter
            .run(link_one(
                self.store.as_ref(),
                request,
                self.max_attempts,
                self.retry_delay,
            ))
            .await
    }
}

async fn link_one(
    store: &dyn AssetStore,
    request: &LinkRequest,
    max_attempts: u32,
    retry_delay: Duration,
) -> Result<AssetDocument, UploadError> {
    for attempt in 1..=max_attempts {
        match store.link_asset(request).await {
            Ok(asset) => return Ok(asset),
            Err(e) if e.is_retryable() => {
                if attempt == max_attempts {
                    tracing::error!(
                        asset_id = %request.asset_id,
                        attempts = max_attempts,
                        "Asset never became ready to link"
                    );
                    return Err(UploadError::LinkRetriesExhausted {
                        attempts: max_attempts,
                    });
                }
                tracing::debug!(
                    asset_id = %request.asset_id,
                    attempt = attempt,
                    "Asset not ready, retrying link"
                );
                tokio::time::sleep(retry_delay).await;
            }
            Err(e) => return Err(e),
        }
    }
    // max_attempts is validated to be at least 1.
    Err(UploadError::LinkRetriesExhausted {
        attempts: max_attempts,
    })
}
