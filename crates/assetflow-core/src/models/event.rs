//! Events emitted on a single upload task's stream.

use serde::{Deserialize, Serialize};

use crate::models::AssetDocument;

/// Progress and terminal events for one upload task.
///
/// Within one task's stream, `Progress` percentages are non-decreasing and
/// `Complete` is always the last event.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum UploadEvent {
    Progress {
        percent: f64,
    },
    Complete {
        asset_id: String,
        asset: AssetDocument,
    },
}

impl UploadEvent {
    pub fn is_terminal(&self) -> bool {
        matches!(self, UploadEvent::Complete { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tagged_serialization() {
        let event = UploadEvent::Progress { percent: 42.0 };
        let value = serde_json::to_value(&event).unwrap();
        assert_eq!(value["type"], "progress");
        assert_eq!(value["percent"], 42.0);
        assert!(!event.is_terminal());
    }

    #[test]
    fn test_complete_is_terminal() {
        let event = UploadEvent::Complete {
            asset_id: "asset-123".into(),
            asset: AssetDocument::with_id("asset-123"),
        };
        assert!(event.is_terminal());
        let value = serde_json::to_value(&event).unwrap();
        assert_eq!(value["type"], "complete");
        assert_eq!(value["assetId"], "asset-123");
    }
}
