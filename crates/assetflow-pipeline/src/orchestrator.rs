//! Per-upload task orchestration.
//!
//! One [`UploadOrchestrator::upload`] call produces one task: acquire a
//! concurrency slot, digest and dedup, then transport the bytes while
//! remapping raw transport percent into the headroom-adjusted scale. The
//! task communicates exclusively through its [`UploadHandle`]; dropping
//! the handle cancels everything the task has in flight.

use std::sync::Arc;

use tokio::sync::mpsc;
use tokio_util::sync::{CancellationToken, DropGuard};

use assetflow_client::{AssetStore, UploadTransport};
use assetflow_core::constants::PROGRESS_HEADROOM_PERCENT;
use assetflow_core::models::{AssetKind, FileLike, UploadEvent, UploadOptions};
use assetflow_core::{UploadConfig, UploadError};
use assetflow_processing::{sanitize_filename, ImagePreprocessor};

use crate::dedup::{lookup_existing, ContentHasher};
use crate::limiter::ConcurrencyLimiter;
use crate::registry::Uploader;

/// Remap transport percent (0-100) into the visible range above the
/// headroom floor.
fn remap_percent(transport_percent: f64) -> f64 {
    let clamped = transport_percent.clamp(0.0, 100.0);
    PROGRESS_HEADROOM_PERCENT + clamped * (100.0 - PROGRESS_HEADROOM_PERCENT) / 100.0
}

/// Consumer handle for one upload task.
///
/// Events arrive in order; `Complete` or an error is always last. Dropping
/// the handle cancels the task: a queued task never starts, an active
/// transfer aborts, and no further events are produced. Cancellation closes
/// the stream without a terminal event.
pub struct UploadHandle {
    events: mpsc::Receiver<Result<UploadEvent, UploadError>>,
    previews: mpsc::Receiver<String>,
    preview_done: bool,
    cancel: CancellationToken,
    _guard: DropGuard,
}

/// What a consumer multiplexing events and the preview side channel
/// receives from [`UploadHandle::next`].
#[derive(Debug)]
pub enum UploadSignal {
    Event(Result<UploadEvent, UploadError>),
    Preview(String),
}

impl UploadHandle {
    pub(crate) fn from_parts(
        events: mpsc::Receiver<Result<UploadEvent, UploadError>>,
        previews: mpsc::Receiver<String>,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            events,
            previews,
            preview_done: false,
            cancel: cancel.clone(),
            _guard: cancel.drop_guard(),
        }
    }

    /// Next event, or `None` once the stream has ended.
    pub async fn next_event(&mut self) -> Option<Result<UploadEvent, UploadError>> {
        self.events.recv().await
    }

    /// Next signal from either the event stream or the preview side
    /// channel. `None` means the event stream has ended.
    pub async fn next(&mut self) -> Option<UploadSignal> {
        loop {
            tokio::select! {
                event = self.events.recv() => return event.map(UploadSignal::Event),
                preview = self.previews.recv(), if !self.preview_done => {
                    match preview {
                        Some(data_url) => return Some(UploadSignal::Preview(data_url)),
                        None => self.preview_done = true,
                    }
                }
            }
        }
    }

    /// The generated preview data URL, if one arrives. At most one per
    /// task; arrives independently of the progress events.
    pub async fn next_preview(&mut self) -> Option<String> {
        self.previews.recv().await
    }

    /// A token cancelled together with this upload, for callers that need
    /// to observe cancellation without holding the handle.
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Explicitly cancel the task. Equivalent to dropping the handle,
    /// except the handle remains usable for draining already-emitted
    /// events.
    pub fn cancel(&self) {
        self.cancel.cancel();
    }
}

/// Runs upload tasks for one asset kind against one store/transport pair.
pub struct UploadOrchestrator {
    kind: AssetKind,
    store: Arc<dyn AssetStore>,
    transport: Arc<dyn UploadTransport>,
    limiter: ConcurrencyLimiter,
    preprocessor: Option<ImagePreprocessor>,
}

impl UploadOrchestrator {
    pub fn new(
        kind: AssetKind,
        store: Arc<dyn AssetStore>,
        transport: Arc<dyn UploadTransport>,
        limiter: ConcurrencyLimiter,
    ) -> Self {
        Self {
            kind,
            store,
            transport,
            limiter,
            preprocessor: None,
        }
    }

    /// Image orchestrators additionally generate an orientation-corrected
    /// preview alongside the transfer.
    pub fn with_preprocessor(mut self, config: &UploadConfig) -> Self {
        self.preprocessor = Some(ImagePreprocessor::new(config));
        self
    }

    /// Begin one upload task.
    ///
    /// Returns immediately; the slot wait, digest, dedup lookup, and
    /// transfer all happen on the spawned task.
    pub fn upload(&self, mut file: FileLike, options: UploadOptions) -> UploadHandle {
        if let Some(name) = file.name.take() {
            file.name = Some(sanitize_filename(&name));
        }

        let (events_tx, events_rx) = mpsc::channel(32);
        let (preview_tx, preview_rx) = mpsc::channel(1);
        let cancel = CancellationToken::new();

        let task = UploadTaskRunner {
            kind: self.kind,
            store: self.store.clone(),
            transport: self.transport.clone(),
            limiter: self.limiter.clone(),
            preprocessor: self.preprocessor.clone(),
            events: events_tx,
            previews: preview_tx,
            cancel: cancel.clone(),
        };
        tokio::spawn(task.run(file, options));

        UploadHandle::from_parts(events_rx, preview_rx, cancel)
    }
}

impl Uploader for UploadOrchestrator {
    fn kind(&self) -> AssetKind {
        self.kind
    }

    fn upload(&self, file: FileLike, options: UploadOptions) -> UploadHandle {
        UploadOrchestrator::upload(self, file, options)
    }
}

struct UploadTaskRunner {
    kind: AssetKind,
    store: Arc<dyn AssetStore>,
    transport: Arc<dyn UploadTransport>,
    limiter: ConcurrencyLimiter,
    preprocessor: Option<ImagePreprocessor>,
    events: mpsc::Sender<Result<UploadEvent, UploadError>>,
    previews: mpsc::Sender<String>,
    cancel: CancellationToken,
}

impl UploadTaskRunner {
    async fn run(self, file: FileLike, options: UploadOptions) {
        // Wait for a concurrency slot. A task cancelled here never became
        // active and leaves no trace.
        let slot = tokio::select! {
            _ = self.cancel.cancelled() => return,
            slot = self.limiter.acquire() => slot,
        };

        tokio::select! {
            _ = self.cancel.cancelled() => {
                tracing::debug!(file = ?file.name, "Upload cancelled");
            }
            _ = self.run_active(&file, &options) => {}
        }
        drop(slot);
    }

    async fn run_active(&self, file: &FileLike, options: &UploadOptions) {
        // Immediate non-zero indicator, before the transport says anything.
        if self
            .emit(UploadEvent::Progress {
                percent: PROGRESS_HEADROOM_PERCENT,
            })
            .await
            .is_err()
        {
            return;
        }

        let preview = self.spawn_preview(file);

        // Dedup short-circuit: identical content already stored means no
        // byte transfer at all.
        if let Some(sha1_hash) = ContentHasher::digest(file).await {
            if let Some(asset) = lookup_existing(self.store.as_ref(), &sha1_hash).await {
                tracing::debug!(
                    sha1_hash = %sha1_hash,
                    asset_id = %asset.id,
                    "Existing asset matched by content hash"
                );
                let _ = self
                    .emit(UploadEvent::Complete {
                        asset_id: asset.id.clone(),
                        asset,
                    })
                    .await;
                return;
            }
        }

        match self.transfer(file, options).await {
            Ok(asset) => {
                let _ = self
                    .emit(UploadEvent::Complete {
                        asset_id: asset.id.clone(),
                        asset,
                    })
                    .await;
            }
            Err(e) => {
                tracing::error!(error = %e, file = ?file.name, "Upload failed");
                let _ = self.events.send(Err(e)).await;
            }
        }
        drop(preview);
    }

    /// Transport the bytes, forwarding remapped progress as it arrives.
    async fn transfer(
        &self,
        file: &FileLike,
        options: &UploadOptions,
    ) -> Result<assetflow_core::models::AssetDocument, UploadError> {
        let (progress_tx, mut progress_rx) = mpsc::channel::<f64>(16);
        let upload = self.transport.upload(file, self.kind, options, progress_tx);
        tokio::pin!(upload);

        let mut last = PROGRESS_HEADROOM_PERCENT;
        loop {
            tokio::select! {
                result = &mut upload => {
                    // Drain progress reported before completion.
                    while let Ok(percent) = progress_rx.try_recv() {
                        let remapped = remap_percent(percent);
                        if remapped > last {
                            last = remapped;
                            let _ = self.emit(UploadEvent::Progress { percent: remapped }).await;
                        }
                    }
                    return result;
                }
                Some(percent) = progress_rx.recv() => {
                    let remapped = remap_percent(percent);
                    if remapped > last {
                        last = remapped;
                        if self.emit(UploadEvent::Progress { percent: remapped }).await.is_err() {
                            return Err(UploadError::Cancelled);
                        }
                    }
                }
            }
        }
    }

    /// Kick off preview generation concurrently with the transfer. The
    /// returned guard aborts it if the upload finishes first.
    fn spawn_preview(&self, file: &FileLike) -> Option<PreviewGuard> {
        let preprocessor = self.preprocessor.clone()?;
        if !file.mime_type.starts_with("image/") {
            return None;
        }
        let file = file.clone();
        let previews = self.previews.clone();
        let handle = tokio::spawn(async move {
            if let Some(data_url) = preprocessor.preprocess(&file).await {
                let _ = previews.send(data_url).await;
            }
        });
        Some(PreviewGuard(handle))
    }

    async fn emit(
        &self,
        event: UploadEvent,
    ) -> Result<(), mpsc::error::SendError<Result<UploadEvent, UploadError>>> {
        self.events.send(Ok(event)).await
    }
}

struct PreviewGuard(tokio::task::JoinHandle<()>);

impl Drop for PreviewGuard {
    fn drop(&mut self) {
        self.0.abort();
    }
}
