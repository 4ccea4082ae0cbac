//! Translation from upload events to document patches.
//!
//! The pipeline never mutates documents directly: every change to the
//! owning document flows through a [`PatchSink`] as an ordered batch of
//! patches. [`ProgressPatchTranslator`] maps one upload task's events to
//! those batches; [`FieldUploads`] supervises at most one active upload
//! per document field and guarantees exactly one clearing unset when an
//! upload is replaced, cancelled, or fails.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::{mpsc, Mutex};

use assetflow_core::constants::{ASSET_FIELD, UPLOAD_FIELD};
use assetflow_core::models::{FileLike, Patch, PatchPath, UploadEvent, UploadState};
use assetflow_core::{ErrorMetadata, UploadError};

use crate::orchestrator::{UploadHandle, UploadSignal};

/// Receives ordered patch batches targeting the owning document.
///
/// Batches from one translator arrive in event order; a batch is fully
/// applied before the next is submitted.
#[async_trait]
pub trait PatchSink: Send + Sync {
    async fn apply(&self, patches: Vec<Patch>) -> anyhow::Result<()>;
}

/// Maps one upload task's events to patch batches for one document field.
pub struct ProgressPatchTranslator {
    path: PatchPath,
}

impl ProgressPatchTranslator {
    pub fn new(path: PatchPath) -> Self {
        Self { path }
    }

    fn upload_path(&self) -> PatchPath {
        self.path.child(UPLOAD_FIELD)
    }

    /// Initial batch: materialize the field object if absent, then write
    /// the starting upload state.
    pub fn start_patches(&self, state: &UploadState) -> Vec<Patch> {
        vec![
            Patch::set_if_missing(self.path.clone(), serde_json::json!({})),
            Patch::set(self.upload_path(), serde_json::json!(state)),
        ]
    }

    /// Progress tick: rewrite the whole inline state so `updatedAt`
    /// advances together with `progress`.
    pub fn progress_patches(&self, state: &UploadState) -> Vec<Patch> {
        vec![Patch::set(self.upload_path(), serde_json::json!(state))]
    }

    /// The preview arrives on its own side channel, independent of
    /// progress ticks.
    pub fn preview_patches(&self, data_url: &str) -> Vec<Patch> {
        vec![Patch::set(
            self.upload_path().child("previewImage"),
            serde_json::json!(data_url),
        )]
    }

    /// Terminal success batch, in order: pin progress at 100, write the
    /// asset reference, remove the inline state.
    pub fn complete_patches(&self, asset_id: &str) -> Vec<Patch> {
        vec![
            Patch::set(self.upload_path().child("progress"), serde_json::json!(100)),
            Patch::set(
                self.path.child(ASSET_FIELD),
                serde_json::json!({ "_type": "reference", "_ref": asset_id }),
            ),
            Patch::unset(self.upload_path()),
        ]
    }

    /// Clearing batch for failure, cancellation, or takeover. The inline
    /// state disappears; nothing else on the field is touched.
    pub fn clear_patches(&self) -> Vec<Patch> {
        vec![Patch::unset(self.upload_path())]
    }

    /// Drive one upload to its terminal patch batch.
    ///
    /// Consumes the handle's events in order and applies the corresponding
    /// batches through `sink`. A closed stream without a terminal event is
    /// treated as cancellation. On any non-success outcome the clearing
    /// unset has already been applied when this returns.
    pub async fn run(
        &self,
        file: &FileLike,
        mut handle: UploadHandle,
        sink: &dyn PatchSink,
    ) -> Result<(), UploadError> {
        let mut state = UploadState::new(file, Utc::now());
        sink.apply(self.start_patches(&state)).await?;

        while let Some(signal) = handle.next().await {
            match signal {
                UploadSignal::Event(Ok(UploadEvent::Progress { percent })) => {
                    state = state.with_progress(percent, Utc::now());
                    sink.apply(self.progress_patches(&state)).await?;
                }
                UploadSignal::Event(Ok(UploadEvent::Complete { asset_id, .. })) => {
                    sink.apply(self.complete_patches(&asset_id)).await?;
                    return Ok(());
                }
                UploadSignal::Event(Err(e)) => {
                    sink.apply(self.clear_patches()).await?;
                    return Err(e);
                }
                UploadSignal::Preview(data_url) => {
                    state.preview_image = Some(data_url.clone());
                    sink.apply(self.preview_patches(&data_url)).await?;
                }
            }
        }

        sink.apply(self.clear_patches()).await?;
        Err(UploadError::Cancelled)
    }
}

/// One-shot failure notice surfaced to the application layer.
#[derive(Clone, Debug)]
pub struct UploadNotification {
    pub field: String,
    pub error_code: &'static str,
    pub message: String,
    /// Plan-limit failures get upsell treatment instead of a generic
    /// error toast.
    pub upsell: bool,
}

struct ActiveUpload {
    generation: u64,
    task: tokio::task::JoinHandle<()>,
}

/// Supervises the uploads active on one document's fields.
///
/// At most one upload per field: starting a new upload over an occupied
/// field aborts the old translator before its next batch and applies the
/// single clearing unset itself, so the patch stream sees exactly one
/// unset between the old upload's last write and the new upload's start
/// batch.
pub struct FieldUploads {
    sink: Arc<dyn PatchSink>,
    active: Arc<Mutex<HashMap<String, ActiveUpload>>>,
    next_generation: std::sync::atomic::AtomicU64,
    notifications: Option<mpsc::UnboundedSender<UploadNotification>>,
}

impl FieldUploads {
    pub fn new(sink: Arc<dyn PatchSink>) -> Self {
        Self {
            sink,
            active: Arc::new(Mutex::new(HashMap::new())),
            next_generation: std::sync::atomic::AtomicU64::new(0),
            notifications: None,
        }
    }

    /// Route failure notices to `tx` for one-shot consumption by the UI.
    pub fn with_notifications(mut self, tx: mpsc::UnboundedSender<UploadNotification>) -> Self {
        self.notifications = Some(tx);
        self
    }

    /// Number of uploads currently active.
    pub async fn active_count(&self) -> usize {
        self.active.lock().await.len()
    }

    /// Begin translating `handle` for `field`, displacing any upload
    /// already active there.
    pub async fn start(
        &self,
        field: &str,
        file: FileLike,
        handle: UploadHandle,
    ) -> anyhow::Result<()> {
        let translator = ProgressPatchTranslator::new(PatchPath::root(field));
        let generation = self
            .next_generation
            .fetch_add(1, std::sync::atomic::Ordering::Relaxed);

        {
            let mut active = self.active.lock().await;
            if let Some(previous) = active.remove(field) {
                // Abort lands at the displaced task's next yield point, so
                // a batch already inside the sink can still complete. Wait
                // for the task to actually terminate before unsetting;
                // otherwise that batch could land after our unset.
                previous.task.abort();
                let _ = previous.task.await;
                tracing::debug!(field = field, "Displacing active upload");
                self.sink.apply(translator.clear_patches()).await?;
            }

            let task = {
                let sink = self.sink.clone();
                let active = self.active.clone();
                let notifications = self.notifications.clone();
                let field = field.to_string();
                tokio::spawn(async move {
                    let outcome = translator.run(&file, handle, sink.as_ref()).await;
                    if let Err(e) = &outcome {
                        match e {
                            UploadError::Cancelled => {}
                            UploadError::Internal(e) => {
                                tracing::error!(error = %e, field = %field, "Patch sink failed");
                            }
                            e => {
                                if let Some(tx) = &notifications {
                                    let _ = tx.send(UploadNotification {
                                        field: field.clone(),
                                        error_code: e.error_code(),
                                        message: e.to_string(),
                                        upsell: e.triggers_upsell(),
                                    });
                                }
                            }
                        }
                    }
                    // Remove ourselves unless a successor already replaced
                    // this entry.
                    let mut active = active.lock().await;
                    if active.get(&field).is_some_and(|a| a.generation == generation) {
                        active.remove(&field);
                    }
                })
            };
            active.insert(field.to_string(), ActiveUpload { generation, task });
        }

        Ok(())
    }

    /// Cancel the upload active on `field`, if any, applying its clearing
    /// unset. Idempotent: a second cancel finds nothing and applies
    /// nothing.
    pub async fn cancel(&self, field: &str) -> anyhow::Result<()> {
        let previous = self.active.lock().await.remove(field);
        if let Some(previous) = previous {
            // Same ordering as takeover: the task must be fully terminated
            // before the unset goes out.
            previous.task.abort();
            let _ = previous.task.await;
            let translator = ProgressPatchTranslator::new(PatchPath::root(field));
            self.sink.apply(translator.clear_patches()).await?;
        }
        Ok(())
    }
}
