//! Domain models shared across the upload pipeline.

pub mod asset;
pub mod event;
pub mod file;
pub mod options;
pub mod patch;
pub mod upload_state;

pub use asset::{AssetDocument, AssetKind};
pub use event::UploadEvent;
pub use file::FileLike;
pub use options::UploadOptions;
pub use patch::{Patch, PatchPath};
pub use upload_state::{UploadState, UploadStateFile};
