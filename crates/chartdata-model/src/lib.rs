#![forbid(unsafe_code)]
//! Domain model for the chartdata dataset content cache.

mod folder;
mod path;

pub use folder::{FileDescriptor, FileMetadata, Folder, DATA_FILE_EXTENSION, JSON_MIME_TYPE};
pub use path::{RelativePath, ValidationError, REL_PATH_MAX_LEN};

pub const CRATE_NAME: &str = "chartdata-model";
