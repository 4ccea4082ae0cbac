//! Assetflow upload pipeline.
//!
//! The core of the asset subsystem: resolving which uploader handles a
//! file, bounding concurrent transport uploads, deduplicating identical
//! content by hash before transferring bytes, translating raw transport
//! progress into an incremental patch stream, and retrying "asset not
//! ready" conditions when linking externally-stored assets.
//!
//! The pipeline holds no document state and no ambient globals: every
//! mutation flows through an explicit [`PatchSink`], and every remote call
//! goes through the `assetflow-client` trait seams.

pub mod dedup;
pub mod limiter;
pub mod linker;
pub mod orchestrator;
pub mod patches;
pub mod registry;
pub mod watchdog;

pub mod test_helpers;

pub use dedup::ContentHasher;
pub use limiter::ConcurrencyLimiter;
pub use linker::AssetLinkRetrier;
pub use orchestrator::{UploadHandle, UploadOrchestrator, UploadSignal};
pub use patches::{FieldUploads, PatchSink, ProgressPatchTranslator, UploadNotification};
pub use registry::{
    ResolvedUploader, SchemaType, UploadTask, Uploader, UploaderDefinition, UploaderRegistry,
};
pub use watchdog::StaleUploadWatchdog;
