use crate::fs::{ContentFs, DirEntryInfo};
use crate::{StoreError, StoreErrorCode};
use async_trait::async_trait;
use std::collections::{BTreeSet, HashMap};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, SystemTime};
use tokio::sync::Mutex;

#[derive(Debug, Clone)]
pub struct FakeFile {
    pub contents: String,
    pub modified: SystemTime,
}

/// In-memory filesystem with call counters, for deterministic cache tests.
pub struct FakeFs {
    pub dirs: Mutex<BTreeSet<PathBuf>>,
    pub files: Mutex<HashMap<PathBuf, FakeFile>>,
    pub dir_probe_calls: AtomicU64,
    pub list_calls: AtomicU64,
    pub read_calls: AtomicU64,
    pub stat_calls: AtomicU64,
    pub slow_read: bool,
    pub slow_read_delay: Duration,
}

impl Default for FakeFs {
    fn default() -> Self {
        Self {
            dirs: Mutex::new(BTreeSet::new()),
            files: Mutex::new(HashMap::new()),
            dir_probe_calls: AtomicU64::new(0),
            list_calls: AtomicU64::new(0),
            read_calls: AtomicU64::new(0),
            stat_calls: AtomicU64::new(0),
            slow_read: false,
            slow_read_delay: Duration::from_millis(0),
        }
    }
}

impl FakeFs {
    pub async fn add_dir(&self, path: impl Into<PathBuf>) {
        self.dirs.lock().await.insert(path.into());
    }

    pub async fn remove_dir(&self, path: &Path) {
        self.dirs.lock().await.remove(path);
    }

    pub async fn add_file(
        &self,
        path: impl Into<PathBuf>,
        contents: &str,
        modified: SystemTime,
    ) {
        self.files.lock().await.insert(
            path.into(),
            FakeFile {
                contents: contents.to_string(),
                modified,
            },
        );
    }

    pub async fn remove_file(&self, path: &Path) {
        self.files.lock().await.remove(path);
    }

    pub async fn touch(&self, path: &Path, modified: SystemTime) {
        if let Some(file) = self.files.lock().await.get_mut(path) {
            file.modified = modified;
        }
    }

    async fn maybe_slow(&self) {
        if self.slow_read {
            let delay = if self.slow_read_delay.is_zero() {
                Duration::from_millis(200)
            } else {
                self.slow_read_delay
            };
            tokio::time::sleep(delay).await;
        }
    }
}

#[async_trait]
impl ContentFs for FakeFs {
    fn backend_tag(&self) -> &'static str {
        "fake"
    }

    async fn is_dir(&self, path: &Path) -> bool {
        self.dir_probe_calls.fetch_add(1, Ordering::Relaxed);
        self.dirs.lock().await.contains(path)
    }

    async fn list_dir(&self, path: &Path) -> Result<Vec<DirEntryInfo>, StoreError> {
        self.list_calls.fetch_add(1, Ordering::Relaxed);
        self.maybe_slow().await;
        if !self.dirs.lock().await.contains(path) {
            return Err(StoreError::new(
                StoreErrorCode::DirRead,
                format!("no such directory {}", path.display()),
            ));
        }
        let mut out = Vec::new();
        for dir in self.dirs.lock().await.iter() {
            if dir.parent() == Some(path) {
                out.push(DirEntryInfo {
                    name: dir
                        .file_name()
                        .map(|n| n.to_string_lossy().into_owned())
                        .unwrap_or_default(),
                    is_dir: true,
                });
            }
        }
        for file_path in self.files.lock().await.keys() {
            if file_path.parent() == Some(path) {
                out.push(DirEntryInfo {
                    name: file_path
                        .file_name()
                        .map(|n| n.to_string_lossy().into_owned())
                        .unwrap_or_default(),
                    is_dir: false,
                });
            }
        }
        Ok(out)
    }

    async fn read_to_string(&self, path: &Path) -> Result<String, StoreError> {
        self.read_calls.fetch_add(1, Ordering::Relaxed);
        self.maybe_slow().await;
        self.files
            .lock()
            .await
            .get(path)
            .map(|f| f.contents.clone())
            .ok_or_else(|| {
                StoreError::new(
                    StoreErrorCode::FileRead,
                    format!("no such file {}", path.display()),
                )
            })
    }

    async fn modified(&self, path: &Path) -> Result<SystemTime, StoreError> {
        self.stat_calls.fetch_add(1, Ordering::Relaxed);
        self.files
            .lock()
            .await
            .get(path)
            .map(|f| f.modified)
            .ok_or_else(|| {
                StoreError::new(
                    StoreErrorCode::FileRead,
                    format!("no such file {}", path.display()),
                )
            })
    }
}
