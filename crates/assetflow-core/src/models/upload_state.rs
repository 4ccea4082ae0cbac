//! Transient upload state persisted inline on the owning document.
//!
//! Lives at the reserved `_upload` path while an upload is in flight.
//! Created when the upload starts, updated on every progress tick, and
//! removed (unset, never set to a lower value) on completion, cancellation,
//! or explicit clear.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::constants::STALE_UPLOAD_MS;
use crate::models::FileLike;

/// The subset of the file descriptor persisted with the upload state.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct UploadStateFile {
    pub name: Option<String>,
    #[serde(rename = "type")]
    pub mime_type: String,
}

/// Inline upload state at the reserved document path.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadState {
    /// 0-100. Never decreases while the upload is active.
    pub progress: u8,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub file: UploadStateFile,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub preview_image: Option<String>,
}

impl UploadState {
    pub fn new(file: &FileLike, now: DateTime<Utc>) -> Self {
        Self {
            progress: 0,
            created_at: now,
            updated_at: now,
            file: UploadStateFile {
                name: file.name.clone(),
                mime_type: file.mime_type.clone(),
            },
            preview_image: None,
        }
    }

    /// Advance progress, clamped so the persisted value never decreases.
    pub fn with_progress(mut self, percent: f64, now: DateTime<Utc>) -> Self {
        let clamped = percent.clamp(0.0, 100.0).round() as u8;
        self.progress = self.progress.max(clamped);
        self.updated_at = now;
        self
    }

    /// Whether this upload has gone quiet past the stale threshold.
    ///
    /// Advisory only: callers may offer a manual clear, but nothing mutates
    /// state on the strength of this predicate.
    pub fn is_stale(&self, now: DateTime<Utc>) -> bool {
        self.is_stale_after(now, STALE_UPLOAD_MS)
    }

    pub fn is_stale_after(&self, now: DateTime<Utc>, threshold_ms: i64) -> bool {
        (now - self.updated_at).num_milliseconds() > threshold_ms
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::Bytes;
    use chrono::Duration;

    fn state() -> UploadState {
        let file = FileLike::new("photo.jpg", "image/jpeg", Bytes::from_static(b"x"));
        UploadState::new(&file, Utc::now())
    }

    #[test]
    fn test_progress_never_decreases() {
        let now = Utc::now();
        let s = state().with_progress(40.0, now).with_progress(10.0, now);
        assert_eq!(s.progress, 40);
    }

    #[test]
    fn test_progress_clamped_to_percent_range() {
        let now = Utc::now();
        assert_eq!(state().with_progress(150.0, now).progress, 100);
        assert_eq!(state().with_progress(-5.0, now).progress, 0);
    }

    #[test]
    fn test_staleness_threshold() {
        let s = state();
        let fresh = s.updated_at + Duration::milliseconds(STALE_UPLOAD_MS);
        let stale = s.updated_at + Duration::milliseconds(STALE_UPLOAD_MS + 1);
        assert!(!s.is_stale(fresh));
        assert!(s.is_stale(stale));
    }

    #[test]
    fn test_serializes_with_camel_case_and_file_type_field() {
        let value = serde_json::to_value(state()).unwrap();
        assert!(value.get("createdAt").is_some());
        assert!(value.get("updatedAt").is_some());
        assert_eq!(value["file"]["type"], "image/jpeg");
        // No preview yet: field omitted entirely
        assert!(value.get("previewImage").is_none());
    }
}
