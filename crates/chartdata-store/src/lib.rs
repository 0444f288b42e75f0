#![forbid(unsafe_code)]
//! Local dataset content cache.
//!
//! Resolves a base data directory among candidate locations, keeps a
//! TTL-bounded index of dataset folders, and serves parsed JSON file contents
//! with modification-time freshness and single-flight read coalescing.

mod clock;
mod config;
mod error;
mod fake;
mod fs;
mod resolve;
mod single_flight;

pub use clock::{Clock, ManualClock, SystemClock};
pub use config::{
    default_base_dir_candidates, validate_store_config, StoreConfig, DATA_DIR_ENV,
};
pub use error::{StoreError, StoreErrorCode};
pub use fake::{FakeFile, FakeFs};
pub use fs::{ContentFs, DirEntryInfo, LocalFs};

use chartdata_model::{
    FileDescriptor, FileMetadata, Folder, RelativePath, DATA_FILE_EXTENSION, JSON_MIME_TYPE,
};
use resolve::BaseDirResolver;
use serde_json::Value;
use single_flight::SingleFlight;
use std::collections::HashMap;
use std::future::Future;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Instant, SystemTime};
use tokio::sync::Mutex;
use tokio::time::timeout;
use tracing::{debug, info, warn};

pub const CRATE_NAME: &str = "chartdata-store";

#[derive(Default)]
pub struct StoreMetrics {
    pub index_hits: AtomicU64,
    pub index_misses: AtomicU64,
    pub index_rebuilds: AtomicU64,
    pub index_rebuild_failures: AtomicU64,
    pub file_hits: AtomicU64,
    pub file_misses: AtomicU64,
    pub file_reads: AtomicU64,
    pub file_read_failures: AtomicU64,
}

struct IndexState {
    folders: Arc<Vec<Folder>>,
    loaded_at: Instant,
}

struct FileEntry {
    data: Arc<Value>,
    modified: SystemTime,
    loaded_at: Instant,
}

/// Process-wide cache service over one resolved data directory.
///
/// All coordination is per-key single-flight: any caller that observes an
/// in-flight scan or read for its key attaches to that operation instead of
/// starting duplicate filesystem work.
pub struct ContentStore {
    cfg: StoreConfig,
    fs: Arc<dyn ContentFs>,
    clock: Arc<dyn Clock>,
    resolver: BaseDirResolver,
    folder_index: Mutex<Option<IndexState>>,
    files: Mutex<HashMap<RelativePath, FileEntry>>,
    index_flight: SingleFlight<(), Arc<Vec<Folder>>>,
    file_flight: SingleFlight<RelativePath, Arc<Value>>,
    pub metrics: Arc<StoreMetrics>,
}

impl ContentStore {
    #[must_use]
    pub fn new(cfg: StoreConfig, fs: Arc<dyn ContentFs>) -> Arc<Self> {
        Self::with_clock(cfg, fs, Arc::new(SystemClock))
    }

    #[must_use]
    pub fn with_clock(
        cfg: StoreConfig,
        fs: Arc<dyn ContentFs>,
        clock: Arc<dyn Clock>,
    ) -> Arc<Self> {
        let resolver = BaseDirResolver::new(&cfg, Arc::clone(&fs), Arc::clone(&clock));
        Arc::new(Self {
            resolver,
            folder_index: Mutex::new(None),
            files: Mutex::new(HashMap::new()),
            index_flight: SingleFlight::new(StoreErrorCode::DirRead),
            file_flight: SingleFlight::new(StoreErrorCode::FileRead),
            metrics: Arc::new(StoreMetrics::default()),
            cfg,
            fs,
            clock,
        })
    }

    pub async fn resolved_base_dir(&self) -> Result<PathBuf, StoreError> {
        self.resolver.resolve().await
    }

    /// Point-in-time listing of dataset folders and their data files.
    ///
    /// Served from cache while within the folder-index TTL; otherwise rebuilt,
    /// with concurrent callers coalesced onto one directory scan.
    pub async fn folder_index(&self) -> Result<Arc<Vec<Folder>>, StoreError> {
        if let Some(folders) = self.fresh_index().await {
            self.metrics.index_hits.fetch_add(1, Ordering::Relaxed);
            return Ok(folders);
        }
        self.metrics.index_misses.fetch_add(1, Ordering::Relaxed);
        self.index_flight
            .run((), || self.rebuild_folder_index())
            .await
    }

    /// Parsed content of one data file.
    ///
    /// A cache entry is fresh while its recorded modification time still equals
    /// the file's current one and its age is within the file TTL; a mismatch
    /// invalidates regardless of TTL. At most one physical read per key is in
    /// flight at any time.
    pub async fn file_data(&self, path: &RelativePath) -> Result<Arc<Value>, StoreError> {
        let root = self.resolver.resolve().await?;
        let abs = path.join_onto(&root);
        let modified = match self.with_deadline(self.fs.modified(&abs)).await {
            Ok(m) => m,
            Err(e) => {
                self.purge(path).await;
                self.metrics.file_read_failures.fetch_add(1, Ordering::Relaxed);
                return Err(e);
            }
        };
        if let Some(data) = self.fresh_file(path, modified).await {
            self.metrics.file_hits.fetch_add(1, Ordering::Relaxed);
            return Ok(data);
        }
        self.metrics.file_misses.fetch_add(1, Ordering::Relaxed);
        self.file_flight
            .run(path.clone(), || self.read_and_parse(path, &abs))
            .await
    }

    pub async fn invalidate_folder_index(&self) {
        *self.folder_index.lock().await = None;
    }

    /// Drops one cached entry, or every entry when no path is given.
    pub async fn invalidate_file_cache(&self, path: Option<&RelativePath>) {
        let mut files = self.files.lock().await;
        match path {
            Some(p) => {
                files.remove(p);
            }
            None => files.clear(),
        }
    }

    /// Forces a fresh candidate probe on the next lookup.
    pub async fn invalidate_base_dir(&self) {
        self.resolver.invalidate().await;
    }

    pub async fn cached_files_debug(&self) -> Vec<String> {
        let files = self.files.lock().await;
        let mut out: Vec<String> = files.keys().map(|k| k.as_str().to_string()).collect();
        out.sort();
        out
    }

    async fn fresh_index(&self) -> Option<Arc<Vec<Folder>>> {
        let index = self.folder_index.lock().await;
        index.as_ref().and_then(|state| {
            if self.clock.now().duration_since(state.loaded_at) < self.cfg.folder_index_ttl {
                Some(Arc::clone(&state.folders))
            } else {
                None
            }
        })
    }

    async fn rebuild_folder_index(&self) -> Result<Arc<Vec<Folder>>, StoreError> {
        // A caller that lost the single-flight race may find a fresh index
        // already in place.
        if let Some(folders) = self.fresh_index().await {
            return Ok(folders);
        }
        match self.scan_folders().await {
            Ok(folders) => {
                let shared = Arc::new(folders);
                {
                    let mut index = self.folder_index.lock().await;
                    *index = Some(IndexState {
                        folders: Arc::clone(&shared),
                        loaded_at: self.clock.now(),
                    });
                }
                self.metrics.index_rebuilds.fetch_add(1, Ordering::Relaxed);
                info!(
                    folders = shared.len(),
                    backend = self.fs.backend_tag(),
                    "folder index rebuilt"
                );
                Ok(shared)
            }
            Err(e) => {
                self.metrics
                    .index_rebuild_failures
                    .fetch_add(1, Ordering::Relaxed);
                Err(e)
            }
        }
    }

    async fn scan_folders(&self) -> Result<Vec<Folder>, StoreError> {
        let root = self.resolver.resolve().await?;
        let mut entries = self.with_deadline(self.fs.list_dir(&root)).await?;
        entries.retain(|e| e.is_dir);
        entries.sort_by(|a, b| a.name.cmp(&b.name));
        let mut folders = Vec::new();
        for dir in entries {
            let sub = root.join(&dir.name);
            let mut files = self.with_deadline(self.fs.list_dir(&sub)).await?;
            files.retain(|e| !e.is_dir && has_data_extension(&e.name));
            // folders without data files are not datasets
            if files.is_empty() {
                continue;
            }
            files.sort_by(|a, b| a.name.cmp(&b.name));
            let mut descriptors = Vec::with_capacity(files.len());
            for file in files {
                let raw = format!("{}/{}", dir.name, file.name);
                match RelativePath::parse(&raw) {
                    Ok(relative_path) => descriptors.push(FileDescriptor {
                        id: relative_path.as_str().to_string(),
                        name: file.name,
                        relative_path,
                        mime_type: JSON_MIME_TYPE.to_string(),
                        // per-file stat calls are skipped on the index path
                        metadata: FileMetadata::Unavailable,
                    }),
                    Err(e) => warn!(entry = %raw, "skipping unaddressable directory entry: {e}"),
                }
            }
            if descriptors.is_empty() {
                continue;
            }
            folders.push(Folder {
                id: dir.name.clone(),
                name: dir.name,
                files: descriptors,
            });
        }
        Ok(folders)
    }

    async fn fresh_file(
        &self,
        path: &RelativePath,
        current_mtime: SystemTime,
    ) -> Option<Arc<Value>> {
        let files = self.files.lock().await;
        files.get(path).and_then(|entry| {
            let within_ttl =
                self.clock.now().duration_since(entry.loaded_at) < self.cfg.file_ttl;
            if entry.modified == current_mtime && within_ttl {
                Some(Arc::clone(&entry.data))
            } else {
                None
            }
        })
    }

    async fn read_and_parse(
        &self,
        path: &RelativePath,
        abs: &Path,
    ) -> Result<Arc<Value>, StoreError> {
        match self.read_and_parse_inner(path, abs).await {
            Ok(data) => Ok(data),
            Err(e) => {
                // no stale or half-populated entry survives a failed read
                self.purge(path).await;
                self.metrics.file_read_failures.fetch_add(1, Ordering::Relaxed);
                warn!(path = %path, "file read failed, cache entry purged: {e}");
                Err(e)
            }
        }
    }

    async fn read_and_parse_inner(
        &self,
        path: &RelativePath,
        abs: &Path,
    ) -> Result<Arc<Value>, StoreError> {
        // the entry records the modification time observed at read time
        let modified = self.with_deadline(self.fs.modified(abs)).await?;
        if let Some(data) = self.fresh_file(path, modified).await {
            // refreshed by an earlier holder of the same flight
            return Ok(data);
        }
        let raw = self.with_deadline(self.fs.read_to_string(abs)).await?;
        self.metrics.file_reads.fetch_add(1, Ordering::Relaxed);
        let value: Value = serde_json::from_str(&raw).map_err(|e| {
            StoreError::new(
                StoreErrorCode::Parse,
                format!("malformed data file {path}: {e}"),
            )
        })?;
        let data = Arc::new(value);
        {
            let mut files = self.files.lock().await;
            files.insert(
                path.clone(),
                FileEntry {
                    data: Arc::clone(&data),
                    modified,
                    loaded_at: self.clock.now(),
                },
            );
        }
        debug!(path = %path, "file content refreshed");
        Ok(data)
    }

    async fn purge(&self, path: &RelativePath) {
        self.files.lock().await.remove(path);
    }

    async fn with_deadline<T>(
        &self,
        op: impl Future<Output = Result<T, StoreError>>,
    ) -> Result<T, StoreError> {
        match timeout(self.cfg.fs_op_timeout, op).await {
            Ok(result) => result,
            Err(_) => Err(StoreError::new(
                StoreErrorCode::Timeout,
                format!(
                    "filesystem operation exceeded {}ms deadline",
                    self.cfg.fs_op_timeout.as_millis()
                ),
            )),
        }
    }
}

fn has_data_extension(name: &str) -> bool {
    Path::new(name)
        .extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case(DATA_FILE_EXTENSION))
}
