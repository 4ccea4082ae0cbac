//! Assetflow Core Library
//!
//! This crate provides the domain models, error taxonomy, configuration, and
//! constants shared across all Assetflow components. It performs no I/O; the
//! transport and pipeline crates build on these types.

pub mod config;
pub mod constants;
pub mod error;
pub mod models;
pub mod telemetry;

// Re-export commonly used types
pub use config::UploadConfig;
pub use error::{ErrorMetadata, LogLevel, UploadError};
pub use models::{
    AssetDocument, AssetKind, FileLike, Patch, PatchPath, UploadEvent, UploadOptions, UploadState,
};
