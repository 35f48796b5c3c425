use std::fmt;
use std::path::Path;

use serde::{Deserialize, Serialize};

/// Opaque, stable identifier for one source image — its basename
/// (spec.md §3). Used as the join key across every stage.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DocumentId(String);

impl DocumentId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Derive a `DocumentId` from a source image path — its basename,
    /// extension included (spec.md §3: "an opaque, stable string
    /// identifying a source image (its basename)").
    pub fn from_path(path: &Path) -> Option<Self> {
        path.file_name()
            .and_then(|n| n.to_str())
            .map(|n| Self(n.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The DocumentId with its image extension stripped — used to name
    /// the structured-record JSON file (spec.md §6: `<DocumentId_stem>.json`).
    pub fn stem(&self) -> &str {
        self.0.rsplit_once('.').map_or(self.0.as_str(), |(s, _)| s)
    }
}

impl fmt::Display for DocumentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<String> for DocumentId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for DocumentId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// Client-supplied conversation identifier (spec.md §3). Opaque beyond
/// being a stable string key into the checkpoint store.
pub type ThreadId = String;
