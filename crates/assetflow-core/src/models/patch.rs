//! Document patches: the sole unit of mutation the pipeline exposes.
//!
//! The pipeline never writes to a document directly; every transition emits
//! zero or more patches that a caller applies through its own patch sink.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Path to a field on the owning document.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PatchPath(pub Vec<String>);

impl PatchPath {
    pub fn new<I, S>(segments: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self(segments.into_iter().map(Into::into).collect())
    }

    pub fn root(segment: impl Into<String>) -> Self {
        Self(vec![segment.into()])
    }

    /// Path extended by one segment.
    pub fn child(&self, segment: impl Into<String>) -> Self {
        let mut segments = self.0.clone();
        segments.push(segment.into());
        Self(segments)
    }
}

impl std::fmt::Display for PatchPath {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0.join("."))
    }
}

/// An atomic document mutation instruction.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "camelCase")]
pub enum Patch {
    Set { path: PatchPath, value: Value },
    Unset { path: PatchPath },
    SetIfMissing { path: PatchPath, value: Value },
}

impl Patch {
    pub fn set(path: PatchPath, value: impl Into<Value>) -> Self {
        Patch::Set {
            path,
            value: value.into(),
        }
    }

    pub fn unset(path: PatchPath) -> Self {
        Patch::Unset { path }
    }

    pub fn set_if_missing(path: PatchPath, value: impl Into<Value>) -> Self {
        Patch::SetIfMissing {
            path,
            value: value.into(),
        }
    }

    pub fn path(&self) -> &PatchPath {
        match self {
            Patch::Set { path, .. } | Patch::Unset { path } | Patch::SetIfMissing { path, .. } => {
                path
            }
        }
    }
}
