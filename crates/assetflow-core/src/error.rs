//! Error types module
//!
//! This module provides the error taxonomy used throughout the upload
//! pipeline. All errors are unified under the `UploadError` enum.
//!
//! The propagation policy is: anything recoverable is swallowed at the
//! component boundary where it occurs and never crosses into the patch
//! stream; anything fatal becomes exactly one terminal error on the task's
//! event stream, consumed once by the caller.

/// Log level for error reporting
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel {
    /// Debug level - for expected, locally recovered conditions
    Debug,
    /// Warning level - for degraded behavior (dedup skipped, retry scheduled)
    Warn,
    /// Error level - for failures surfaced to the user
    Error,
}

/// Metadata describing how an error should be handled and presented.
pub trait ErrorMetadata {
    /// Machine-readable error code (e.g., "TRANSPORT_ERROR")
    fn error_code(&self) -> &'static str;

    /// Whether the pipeline recovers locally and continues without this step
    fn is_recoverable(&self) -> bool;

    /// Whether the operation may be retried per policy
    fn is_retryable(&self) -> bool;

    /// Log level for this error
    fn log_level(&self) -> LogLevel;
}

#[derive(Debug, thiserror::Error)]
pub enum UploadError {
    /// Digesting failed or is unsupported; the pipeline proceeds without
    /// dedup. Never fatal.
    #[error("Hashing failed: {0}")]
    Hashing(String),

    /// The fetch-by-hash query failed; treated identically to "no existing
    /// asset". Never fatal.
    #[error("Dedup lookup failed: {0}")]
    DedupLookup(String),

    /// The transport upload itself failed. Fatal to the task.
    #[error("Transport failed: {0}")]
    Transport(String),

    /// The remote asset is still processing during linking; retried per
    /// policy before becoming fatal.
    #[error("Asset not ready: {0}")]
    AssetNotReady(String),

    /// Plan/quota limit reached. Fatal, and additionally signals an upsell
    /// to the surrounding application.
    #[error("Asset limit reached: {0}")]
    AssetLimit(String),

    /// EXIF/preview generation failed. Always recovered locally, never
    /// surfaced to the user.
    #[error("Preprocessing failed: {0}")]
    Preprocessing(String),

    /// The link retry ceiling was exceeded without success.
    #[error("Link retries exhausted after {attempts} attempts")]
    LinkRetriesExhausted { attempts: u32 },

    /// The task was cancelled by explicit unsubscribe.
    #[error("Upload cancelled")]
    Cancelled,

    #[error("Internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl UploadError {
    /// Whether this error should additionally trigger an upsell signal
    /// rather than a generic failure notification.
    pub fn triggers_upsell(&self) -> bool {
        matches!(self, UploadError::AssetLimit(_))
    }
}

/// Static metadata for each variant: (error_code, recoverable, retryable, log_level).
fn upload_error_static_metadata(err: &UploadError) -> (&'static str, bool, bool, LogLevel) {
    match err {
        UploadError::Hashing(_) => ("HASHING_ERROR", true, false, LogLevel::Warn),
        UploadError::DedupLookup(_) => ("DEDUP_LOOKUP_ERROR", true, false, LogLevel::Warn),
        UploadError::Transport(_) => ("TRANSPORT_ERROR", false, false, LogLevel::Error),
        UploadError::AssetNotReady(_) => ("ASSET_NOT_READY", false, true, LogLevel::Debug),
        UploadError::AssetLimit(_) => ("ASSET_LIMIT_EXCEEDED", false, false, LogLevel::Warn),
        UploadError::Preprocessing(_) => ("PREPROCESSING_ERROR", true, false, LogLevel::Debug),
        UploadError::LinkRetriesExhausted { .. } => {
            ("LINK_RETRIES_EXHAUSTED", false, false, LogLevel::Error)
        }
        UploadError::Cancelled => ("CANCELLED", false, false, LogLevel::Debug),
        UploadError::Internal(_) => ("INTERNAL_ERROR", false, false, LogLevel::Error),
    }
}

impl ErrorMetadata for UploadError {
    fn error_code(&self) -> &'static str {
        upload_error_static_metadata(self).0
    }

    fn is_recoverable(&self) -> bool {
        upload_error_static_metadata(self).1
    }

    fn is_retryable(&self) -> bool {
        upload_error_static_metadata(self).2
    }

    fn log_level(&self) -> LogLevel {
        upload_error_static_metadata(self).3
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_recoverable_variants_never_fatal() {
        for err in [
            UploadError::Hashing("no crypto".into()),
            UploadError::DedupLookup("timeout".into()),
            UploadError::Preprocessing("bad exif".into()),
        ] {
            assert!(err.is_recoverable(), "{} should be recoverable", err);
            assert!(!err.triggers_upsell());
        }
    }

    #[test]
    fn test_transport_error_is_fatal() {
        let err = UploadError::Transport("connection reset".into());
        assert!(!err.is_recoverable());
        assert!(!err.is_retryable());
        assert_eq!(err.error_code(), "TRANSPORT_ERROR");
        assert_eq!(err.log_level(), LogLevel::Error);
    }

    #[test]
    fn test_asset_not_ready_is_retryable() {
        let err = UploadError::AssetNotReady("still processing".into());
        assert!(err.is_retryable());
        assert!(!err.is_recoverable());
    }

    #[test]
    fn test_asset_limit_triggers_upsell() {
        let err = UploadError::AssetLimit("plan quota reached".into());
        assert!(err.triggers_upsell());
        assert!(!err.is_recoverable());
        assert_eq!(err.error_code(), "ASSET_LIMIT_EXCEEDED");
    }

    #[test]
    fn test_retries_exhausted_message() {
        let err = UploadError::LinkRetriesExhausted { attempts: 10 };
        assert!(err.to_string().contains("10"));
        assert_eq!(err.log_level(), LogLevel::Error);
    }
}
