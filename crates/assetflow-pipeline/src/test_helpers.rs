//! In-memory doubles for the pipeline's trait seams.
//!
//! Used by unit tests across this crate and by the integration tests.
//! Each mock records its calls and can be scripted with canned responses.

use std::collections::{HashMap, VecDeque};
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::{mpsc, Mutex};
use tokio_util::sync::CancellationToken;

use assetflow_client::{AssetStore, LinkRequest, UploadTransport};
use assetflow_core::constants::ASSET_NOT_READY_MESSAGE;
use assetflow_core::models::{AssetDocument, AssetKind, FileLike, Patch, UploadOptions};
use assetflow_core::UploadError;

use crate::orchestrator::UploadHandle;
use crate::patches::PatchSink;
use crate::registry::Uploader;

type LinkFailure = Box<dyn Fn() -> UploadError + Send + Sync>;

/// Scriptable in-memory [`AssetStore`].
#[derive(Default)]
pub struct MockAssetStore {
    by_hash: Mutex<HashMap<String, AssetDocument>>,
    fail_lookups: Mutex<bool>,
    not_ready_failures: Mutex<u32>,
    link_failure: Mutex<Option<LinkFailure>>,
    link_calls: Mutex<Vec<LinkRequest>>,
}

impl MockAssetStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed an existing asset for dedup lookups.
    pub async fn insert_by_hash(&self, sha1_hash: &str, asset: AssetDocument) {
        self.by_hash.lock().await.insert(sha1_hash.to_string(), asset);
    }

    /// Make every hash lookup fail.
    pub async fn fail_lookups(&self) {
        *self.fail_lookups.lock().await = true;
    }

    /// Answer the next `n` link calls with the not-ready rejection, then
    /// succeed.
    pub async fn script_link_failures(&self, n: u32) {
        *self.not_ready_failures.lock().await = n;
    }

    /// Make every link call fail with the produced error.
    pub async fn fail_links_with<F>(&self, failure: F)
    where
        F: Fn() -> UploadError + Send + Sync + 'static,
    {
        *self.link_failure.lock().await = Some(Box::new(failure));
    }

    pub async fn link_call_count(&self) -> usize {
        self.link_calls.lock().await.len()
    }

    pub async fn link_calls(&self) -> Vec<LinkRequest> {
        self.link_calls.lock().await.clone()
    }
}

#[async_trait]
impl AssetStore for MockAssetStore {
    async fn fetch_by_hash(&self, sha1_hash: &str) -> Result<Option<AssetDocument>, UploadError> {
        if *self.fail_lookups.lock().await {
            return Err(UploadError::DedupLookup("scripted lookup failure".into()));
        }
        Ok(self.by_hash.lock().await.get(sha1_hash).cloned())
    }

    async fn link_asset(&self, request: &LinkRequest) -> Result<AssetDocument, UploadError> {
        self.link_calls.lock().await.push(request.clone());

        if let Some(failure) = self.link_failure.lock().await.as_ref() {
            return Err(failure());
        }
        let mut remaining = self.not_ready_failures.lock().await;
        if *remaining > 0 {
            *remaining = remaining.saturating_sub(1);
            return Err(UploadError::AssetNotReady(ASSET_NOT_READY_MESSAGE.into()));
        }
        Ok(AssetDocument::with_id(&request.asset_id))
    }
}

/// Scriptable in-memory [`UploadTransport`].
#[derive(Default)]
pub struct MockTransport {
    progress_script: Mutex<Vec<f64>>,
    progress_delay: Mutex<Option<Duration>>,
    results: Mutex<VecDeque<Result<AssetDocument, UploadError>>>,
    uploads: Mutex<Vec<FileLike>>,
}

impl MockTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Transport-scale percentages to report on the next upload.
    pub async fn script_progress(&self, percents: Vec<f64>) {
        *self.progress_script.lock().await = percents;
    }

    /// Pause between scripted progress reports.
    pub async fn script_progress_delay(&self, delay: Duration) {
        *self.progress_delay.lock().await = Some(delay);
    }

    /// Queue a result; consumed one per upload. With nothing queued,
    /// uploads succeed with a generic document.
    pub async fn script_result(&self, result: Result<AssetDocument, UploadError>) {
        self.results.lock().await.push_back(result);
    }

    pub async fn upload_count(&self) -> usize {
        self.uploads.lock().await.len()
    }

    pub async fn uploaded_files(&self) -> Vec<FileLike> {
        self.uploads.lock().await.clone()
    }
}

#[async_trait]
impl UploadTransport for MockTransport {
    async fn upload(
        &self,
        file: &FileLike,
        _kind: AssetKind,
        _options: &UploadOptions,
        progress: mpsc::Sender<f64>,
    ) -> Result<AssetDocument, UploadError> {
        self.uploads.lock().await.push(file.clone());

        let script = std::mem::take(&mut *self.progress_script.lock().await);
        let delay = *self.progress_delay.lock().await;
        for percent in script {
            if let Some(delay) = delay {
                tokio::time::sleep(delay).await;
            }
            let _ = progress.send(percent).await;
        }

        self.results
            .lock()
            .await
            .pop_front()
            .unwrap_or_else(|| Ok(AssetDocument::with_id("asset-mock")))
    }
}

/// An [`Uploader`] whose handles never produce events.
pub struct NullUploader {
    kind: AssetKind,
}

impl NullUploader {
    pub fn new(kind: AssetKind) -> Self {
        Self { kind }
    }
}

impl Uploader for NullUploader {
    fn kind(&self) -> AssetKind {
        self.kind
    }

    fn upload(&self, _file: FileLike, _options: UploadOptions) -> UploadHandle {
        let (_events_tx, events_rx) = mpsc::channel(1);
        let (_previews_tx, previews_rx) = mpsc::channel(1);
        UploadHandle::from_parts(events_rx, previews_rx, CancellationToken::new())
    }
}

/// A [`PatchSink`] that records every batch it is asked to apply.
#[derive(Default)]
pub struct RecordingSink {
    batches: Mutex<Vec<Vec<Patch>>>,
    fail_next: Mutex<bool>,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn batches(&self) -> Vec<Vec<Patch>> {
        self.batches.lock().await.clone()
    }

    /// All recorded patches flattened into application order.
    pub async fn patches(&self) -> Vec<Patch> {
        self.batches.lock().await.iter().flatten().cloned().collect()
    }

    /// Make the next apply call fail.
    pub async fn fail_next(&self) {
        *self.fail_next.lock().await = true;
    }
}

#[async_trait]
impl PatchSink for RecordingSink {
    async fn apply(&self, patches: Vec<Patch>) -> anyhow::Result<()> {
        let mut fail = self.fail_next.lock().await;
        if *fail {
            *fail = false;
            anyhow::bail!("scripted sink failure");
        }
        self.batches.lock().await.push(patches);
        Ok(())
    }
}
