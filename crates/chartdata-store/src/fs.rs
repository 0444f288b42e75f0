use crate::{StoreError, StoreErrorCode};
use async_trait::async_trait;
use std::path::Path;
use std::time::SystemTime;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirEntryInfo {
    pub name: String,
    pub is_dir: bool,
}

/// Filesystem boundary of the cache. Everything the store touches on disk goes
/// through this trait, so tests can swap in [`crate::FakeFs`].
#[async_trait]
pub trait ContentFs: Send + Sync + 'static {
    fn backend_tag(&self) -> &'static str;
    async fn is_dir(&self, path: &Path) -> bool;
    async fn list_dir(&self, path: &Path) -> Result<Vec<DirEntryInfo>, StoreError>;
    async fn read_to_string(&self, path: &Path) -> Result<String, StoreError>;
    async fn modified(&self, path: &Path) -> Result<SystemTime, StoreError>;
}

pub struct LocalFs;

#[async_trait]
impl ContentFs for LocalFs {
    fn backend_tag(&self) -> &'static str {
        "local"
    }

    async fn is_dir(&self, path: &Path) -> bool {
        tokio::fs::metadata(path)
            .await
            .map(|m| m.is_dir())
            .unwrap_or(false)
    }

    async fn list_dir(&self, path: &Path) -> Result<Vec<DirEntryInfo>, StoreError> {
        let dir_read_err = |e: std::io::Error| {
            StoreError::new(
                StoreErrorCode::DirRead,
                format!("failed to list {}: {e}", path.display()),
            )
        };
        let mut reader = tokio::fs::read_dir(path).await.map_err(dir_read_err)?;
        let mut out = Vec::new();
        while let Some(entry) = reader.next_entry().await.map_err(dir_read_err)? {
            let file_type = entry.file_type().await.map_err(dir_read_err)?;
            out.push(DirEntryInfo {
                name: entry.file_name().to_string_lossy().into_owned(),
                is_dir: file_type.is_dir(),
            });
        }
        Ok(out)
    }

    async fn read_to_string(&self, path: &Path) -> Result<String, StoreError> {
        tokio::fs::read_to_string(path).await.map_err(|e| {
            StoreError::new(
                StoreErrorCode::FileRead,
                format!("failed to read {}: {e}", path.display()),
            )
        })
    }

    async fn modified(&self, path: &Path) -> Result<SystemTime, StoreError> {
        let meta = tokio::fs::metadata(path).await.map_err(|e| {
            StoreError::new(
                StoreErrorCode::FileRead,
                format!("failed to stat {}: {e}", path.display()),
            )
        })?;
        meta.modified().map_err(|e| {
            StoreError::new(
                StoreErrorCode::FileRead,
                format!("modification time unavailable for {}: {e}", path.display()),
            )
        })
    }
}
