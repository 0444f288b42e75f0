use crate::RelativePath;
use serde::{Deserialize, Serialize};

pub const DATA_FILE_EXTENSION: &str = "json";
pub const JSON_MIME_TYPE: &str = "application/json";

/// Per-file filesystem metadata as recorded by the folder index.
///
/// The index skips per-file stat calls to keep a full scan at one directory
/// listing per folder, so descriptors normally carry `Unavailable` rather than
/// synthetic zero values.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum FileMetadata {
    Unavailable,
    Recorded {
        size_bytes: u64,
        created_unix_ms: u64,
        modified_unix_ms: u64,
    },
}

impl FileMetadata {
    #[must_use]
    pub const fn is_available(&self) -> bool {
        matches!(self, Self::Recorded { .. })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileDescriptor {
    pub id: String,
    pub name: String,
    pub relative_path: RelativePath,
    pub mime_type: String,
    pub metadata: FileMetadata,
}

/// One dataset grouping (for example one ticker) with at least one data file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Folder {
    pub id: String,
    pub name: String,
    pub files: Vec<FileDescriptor>,
}
