//! Options forwarded to the transport upload call.

use serde::{Deserialize, Serialize};

/// Configuration attached to a single transport upload.
///
/// Unrecognized fields are ignored by the remote service, not rejected, so
/// callers may forward schema-level options verbatim.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct UploadOptions {
    /// Which derived fields the store should extract (e.g. "exif", "location").
    pub metadata: Vec<String>,
    /// Keep the original filename on the stored asset.
    pub preserve_filename: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub credit_line: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
}

impl UploadOptions {
    /// Query-string pairs for the transport request. Empty fields are
    /// omitted entirely.
    pub fn to_query_pairs(&self) -> Vec<(&'static str, String)> {
        let mut pairs: Vec<(&'static str, String)> = Vec::new();
        for meta in &self.metadata {
            pairs.push(("meta", meta.clone()));
        }
        if self.preserve_filename {
            pairs.push(("preserveFilename", "true".to_string()));
        }
        if let Some(label) = &self.label {
            pairs.push(("label", label.clone()));
        }
        if let Some(title) = &self.title {
            pairs.push(("title", title.clone()));
        }
        if let Some(description) = &self.description {
            pairs.push(("description", description.clone()));
        }
        if let Some(credit_line) = &self.credit_line {
            pairs.push(("creditLine", credit_line.clone()));
        }
        if let Some(source) = &self.source {
            pairs.push(("source", source.clone()));
        }
        pairs
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_options_produce_no_pairs() {
        assert!(UploadOptions::default().to_query_pairs().is_empty());
    }

    #[test]
    fn test_query_pairs() {
        let options = UploadOptions {
            metadata: vec!["exif".into(), "location".into()],
            preserve_filename: true,
            title: Some("Hero image".into()),
            ..Default::default()
        };
        let pairs = options.to_query_pairs();
        assert_eq!(
            pairs,
            vec![
                ("meta", "exif".to_string()),
                ("meta", "location".to_string()),
                ("preserveFilename", "true".to_string()),
                ("title", "Hero image".to_string()),
            ]
        );
    }

    #[test]
    fn test_unknown_fields_ignored_on_deserialize() {
        let options: UploadOptions = serde_json::from_value(serde_json::json!({
            "preserveFilename": true,
            "somethingNew": 42
        }))
        .unwrap();
        assert!(options.preserve_filename);
    }
}
