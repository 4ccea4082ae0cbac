//! Uploader registration and resolution.
//!
//! The registry matches a file plus target schema type to capable
//! uploaders, in priority order. Registration happens once at process
//! start; the set never mutates at runtime. A failed resolution is not an
//! error: `None` means "cannot upload this file here" and callers are
//! expected to surface that as user messaging.

use std::sync::Arc;

use assetflow_core::models::{AssetKind, FileLike, UploadOptions};

use crate::orchestrator::UploadHandle;

/// Schema type a file is being uploaded into, with its optional
/// schema-declared accept override.
#[derive(Clone, Debug)]
pub struct SchemaType {
    pub name: String,
    pub accept: Option<String>,
}

impl SchemaType {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            accept: None,
        }
    }

    pub fn with_accept(name: impl Into<String>, accept: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            accept: Some(accept.into()),
        }
    }
}

/// A capability that can transport one kind of file to the asset store.
pub trait Uploader: Send + Sync {
    fn kind(&self) -> AssetKind;

    /// Begin an upload; progress and the terminal event arrive on the
    /// returned handle.
    fn upload(&self, file: FileLike, options: UploadOptions) -> UploadHandle;
}

/// An immutable uploader registration.
pub struct UploaderDefinition {
    /// Predicate over the target schema type name.
    pub type_match: Box<dyn Fn(&str) -> bool + Send + Sync>,
    /// Comma-separated accept list: MIME patterns (`image/*`, `*/*`) and
    /// extensions (`.psd`). Empty accepts everything.
    pub accept_pattern: String,
    /// Lower value wins within a batch; ties break by registration order.
    pub priority: i32,
    pub uploader: Arc<dyn Uploader>,
}

/// The uploader/schema-type pairing chosen for one file.
#[derive(Clone)]
pub struct ResolvedUploader {
    pub uploader: Arc<UploaderDefinition>,
    pub schema_type: SchemaType,
}

/// Created per file at selection time; discarded once routed.
pub struct UploadTask {
    pub file: FileLike,
    pub candidates: Vec<ResolvedUploader>,
}

impl UploadTask {
    /// The candidate with the lowest priority value. Registration order
    /// breaks ties because candidates preserve it.
    pub fn best_candidate(&self) -> Option<&ResolvedUploader> {
        self.candidates
            .iter()
            .min_by_key(|c| c.uploader.priority)
    }
}

/// Whether `file` satisfies a comma-separated accept pattern.
///
/// MIME patterns match case-insensitively with `*` wildcards per segment.
/// Extension patterns match the filename's extension case-insensitively;
/// when the file has no resolvable name (a file hovering over a drop
/// target does not always expose one), extension patterns fail open rather
/// than rejecting. That means a hovering file can look acceptable and
/// still be rejected on drop; keep this behavior confined here.
pub fn accepts(file: &FileLike, accept_pattern: &str) -> bool {
    let patterns: Vec<&str> = accept_pattern
        .split(',')
        .map(str::trim)
        .filter(|p| !p.is_empty())
        .collect();
    if patterns.is_empty() {
        return true;
    }

    patterns.iter().any(|pattern| {
        if let Some(ext_pattern) = pattern.strip_prefix('.') {
            match file.extension() {
                Some(ext) => ext.eq_ignore_ascii_case(ext_pattern),
                // No resolvable name yet: fail open.
                None => true,
            }
        } else {
            mime_matches(&file.mime_type, pattern)
        }
    })
}

fn mime_matches(mime_type: &str, pattern: &str) -> bool {
    if mime_type.is_empty() {
        return false;
    }
    let (mime_major, mime_minor) = split_mime(mime_type);
    let (pat_major, pat_minor) = split_mime(pattern);
    segment_matches(mime_major, pat_major) && segment_matches(mime_minor, pat_minor)
}

fn split_mime(value: &str) -> (&str, &str) {
    value.split_once('/').unwrap_or((value, "*"))
}

fn segment_matches(value: &str, pattern: &str) -> bool {
    pattern == "*" || value.eq_ignore_ascii_case(pattern)
}

/// Matches files to uploaders, in priority order.
pub struct UploaderRegistry {
    uploaders: Vec<Arc<UploaderDefinition>>,
}

impl UploaderRegistry {
    /// Build a registry. Uploaders are ordered by priority, with
    /// registration order as the stable tie-break.
    pub fn new(definitions: Vec<UploaderDefinition>) -> Self {
        let mut uploaders: Vec<Arc<UploaderDefinition>> =
            definitions.into_iter().map(Arc::new).collect();
        // Stable sort preserves registration order between equal priorities.
        uploaders.sort_by_key(|u| u.priority);
        Self { uploaders }
    }

    /// First uploader whose type predicate accepts the schema type, whose
    /// accept pattern accepts the file, and whose schema-declared accept
    /// override (if present) also accepts the file. `None` means "cannot
    /// upload this file here", not a fault.
    pub fn resolve(
        &self,
        schema_type: &SchemaType,
        file: &FileLike,
    ) -> Option<Arc<UploaderDefinition>> {
        self.uploaders
            .iter()
            .find(|u| {
                (u.type_match)(&schema_type.name)
                    && accepts(file, &u.accept_pattern)
                    && schema_type
                        .accept
                        .as_deref()
                        .map(|accept| accepts(file, accept))
                        .unwrap_or(true)
            })
            .cloned()
    }

    /// Route a batch of files against a set of candidate schema types.
    ///
    /// Returns one [`UploadTask`] per routable file plus the files nothing
    /// accepted.
    pub fn route_files(
        &self,
        schema_types: &[SchemaType],
        files: Vec<FileLike>,
    ) -> (Vec<UploadTask>, Vec<FileLike>) {
        let mut tasks = Vec::new();
        let mut rejected = Vec::new();

        for file in files {
            let candidates: Vec<ResolvedUploader> = schema_types
                .iter()
                .filter_map(|schema_type| {
                    self.resolve(schema_type, &file).map(|uploader| ResolvedUploader {
                        uploader,
                        schema_type: schema_type.clone(),
                    })
                })
                .collect();

            if candidates.is_empty() {
                tracing::debug!(
                    file = ?file.name,
                    mime_type = %file.mime_type,
                    "No uploader accepts this file"
                );
                rejected.push(file);
            } else {
                tasks.push(UploadTask { file, candidates });
            }
        }

        (tasks, rejected)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_helpers::NullUploader;
    use bytes::Bytes;

    fn file(name: &str, mime_type: &str) -> FileLike {
        FileLike::new(name, mime_type, Bytes::from_static(b"content"))
    }

    fn definition(
        type_name: &'static str,
        accept_pattern: &str,
        priority: i32,
    ) -> UploaderDefinition {
        UploaderDefinition {
            type_match: Box::new(move |t| t == type_name),
            accept_pattern: accept_pattern.to_string(),
            priority,
            uploader: Arc::new(NullUploader::new(AssetKind::File)),
        }
    }

    #[test]
    fn test_accepts_mime_wildcards() {
        let f = file("photo.jpg", "image/jpeg");
        assert!(accepts(&f, "image/*"));
        assert!(accepts(&f, "*/*"));
        assert!(accepts(&f, "image/jpeg"));
        assert!(!accepts(&f, "video/*"));
        assert!(!accepts(&f, "image/png"));
    }

    #[test]
    fn test_accepts_is_case_insensitive() {
        let f = file("photo.jpg", "Image/JPEG");
        assert!(accepts(&f, "image/jpeg"));
        // Case-insensitive extension match even with empty MIME type
        let f = file("photo.PSD", "");
        assert!(accepts(&f, ".psd"));
    }

    #[test]
    fn test_accepts_extension_fails_open_without_name() {
        let hovering = FileLike::unnamed("", 0);
        assert!(accepts(&hovering, ".psd"));
        // MIME patterns do not fail open: empty MIME rejects.
        assert!(!accepts(&hovering, "image/*"));
    }

    #[test]
    fn test_accepts_empty_pattern_accepts_all() {
        assert!(accepts(&file("anything.bin", "application/octet-stream"), ""));
        assert!(accepts(&file("a.txt", "text/plain"), " , "));
    }

    #[test]
    fn test_accepts_comma_separated_any_match() {
        let f = file("clip.mp4", "video/mp4");
        assert!(accepts(&f, "image/*, video/*"));
        assert!(accepts(&f, ".mov, .mp4"));
        assert!(!accepts(&f, ".mov, image/*"));
    }

    #[test]
    fn test_resolve_honors_type_and_accept() {
        let registry = UploaderRegistry::new(vec![
            definition("image", "image/*", 0),
            definition("file", "", 10),
        ]);

        let image_type = SchemaType::new("image");
        let file_type = SchemaType::new("file");

        let jpeg = file("a.jpg", "image/jpeg");
        assert!(registry.resolve(&image_type, &jpeg).is_some());
        assert!(registry.resolve(&file_type, &jpeg).is_some());

        let pdf = file("doc.pdf", "application/pdf");
        assert!(registry.resolve(&image_type, &pdf).is_none());
        assert!(registry.resolve(&file_type, &pdf).is_some());
    }

    #[test]
    fn test_resolve_applies_schema_accept_override() {
        let registry = UploaderRegistry::new(vec![definition("image", "image/*", 0)]);
        let restricted = SchemaType::with_accept("image", ".png");

        assert!(registry.resolve(&restricted, &file("a.png", "image/png")).is_some());
        assert!(registry.resolve(&restricted, &file("a.jpg", "image/jpeg")).is_none());
    }

    #[test]
    fn test_resolve_none_is_not_an_error() {
        let registry = UploaderRegistry::new(vec![]);
        assert!(registry
            .resolve(&SchemaType::new("image"), &file("a.jpg", "image/jpeg"))
            .is_none());
    }

    #[test]
    fn test_priority_order_with_registration_tie_break() {
        let registry = UploaderRegistry::new(vec![
            definition("file", "", 5),
            definition("file", "", 1),
            definition("file", "", 1),
        ]);
        let resolved = registry
            .resolve(&SchemaType::new("file"), &file("a.bin", "application/octet-stream"))
            .unwrap();
        assert_eq!(resolved.priority, 1);
    }

    #[test]
    fn test_route_files_splits_tasks_and_rejects() {
        let registry = UploaderRegistry::new(vec![definition("image", "image/*", 0)]);
        let schema_types = vec![SchemaType::new("image")];

        let (tasks, rejected) = registry.route_files(
            &schema_types,
            vec![file("a.jpg", "image/jpeg"), file("doc.pdf", "application/pdf")],
        );

        assert_eq!(tasks.len(), 1);
        assert_eq!(tasks[0].file.name.as_deref(), Some("a.jpg"));
        assert!(tasks[0].best_candidate().is_some());
        assert_eq!(rejected.len(), 1);
        assert_eq!(rejected[0].name.as_deref(), Some("doc.pdf"));
    }

    #[test]
    fn test_best_candidate_prefers_lowest_priority() {
        let registry = UploaderRegistry::new(vec![
            definition("image", "image/*", 7),
            definition("image", "", 2),
        ]);
        let (tasks, _) = registry.route_files(
            &[SchemaType::new("image")],
            vec![file("a.jpg", "image/jpeg")],
        );
        let best = tasks[0].best_candidate().unwrap();
        assert_eq!(best.uploader.priority, 2);
    }
}
