use crate::clock::Clock;
use crate::config::{StoreConfig, DATA_DIR_ENV};
use crate::fs::ContentFs;
use crate::{StoreError, StoreErrorCode};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;
use tokio::time::timeout;
use tracing::{info, warn};

enum ResolutionState {
    Unresolved,
    Resolved(PathBuf),
    Failed { error: StoreError, at: Instant },
}

/// Resolves the base data directory once and memoizes the outcome.
///
/// A successful resolution is held for the process lifetime; a failed one is
/// served from memory until the retry cooldown elapses or the resolver is
/// explicitly invalidated.
pub(crate) struct BaseDirResolver {
    candidates: Vec<PathBuf>,
    retry_cooldown: Duration,
    probe_timeout: Duration,
    fs: Arc<dyn ContentFs>,
    clock: Arc<dyn Clock>,
    state: Mutex<ResolutionState>,
}

impl BaseDirResolver {
    pub fn new(cfg: &StoreConfig, fs: Arc<dyn ContentFs>, clock: Arc<dyn Clock>) -> Self {
        Self {
            candidates: cfg.base_dir_candidates.clone(),
            retry_cooldown: cfg.resolve_retry_cooldown,
            probe_timeout: cfg.fs_op_timeout,
            fs,
            clock,
            state: Mutex::new(ResolutionState::Unresolved),
        }
    }

    pub async fn resolve(&self) -> Result<PathBuf, StoreError> {
        // The state lock is held across the probe pass so concurrent callers
        // share one filesystem walk.
        let mut state = self.state.lock().await;
        match &*state {
            ResolutionState::Resolved(path) => return Ok(path.clone()),
            ResolutionState::Failed { error, at } => {
                if self.clock.now().duration_since(*at) < self.retry_cooldown {
                    return Err(error.clone());
                }
            }
            ResolutionState::Unresolved => {}
        }

        let env_override = std::env::var(DATA_DIR_ENV).ok();
        let mut probe: Vec<PathBuf> = Vec::with_capacity(self.candidates.len() + 1);
        if let Some(dir) = env_override.as_deref() {
            probe.push(PathBuf::from(dir));
        }
        probe.extend(self.candidates.iter().cloned());

        let mut attempted = Vec::new();
        for candidate in probe {
            let found = matches!(
                timeout(self.probe_timeout, self.fs.is_dir(&candidate)).await,
                Ok(true)
            );
            if found {
                info!(
                    base_dir = %candidate.display(),
                    backend = self.fs.backend_tag(),
                    "base data directory resolved"
                );
                *state = ResolutionState::Resolved(candidate.clone());
                return Ok(candidate);
            }
            attempted.push(candidate);
        }

        let cwd = std::env::current_dir()
            .map_or_else(|_| "<unavailable>".to_string(), |d| d.display().to_string());
        let attempted_list = attempted
            .iter()
            .map(|p| p.display().to_string())
            .collect::<Vec<_>>()
            .join(", ");
        let env_note = env_override
            .map_or_else(|| format!("{DATA_DIR_ENV} unset"), |v| format!("{DATA_DIR_ENV}={v}"));
        let error = StoreError::new(
            StoreErrorCode::RootUnresolved,
            format!("no base data directory found; attempted: [{attempted_list}]; cwd: {cwd}; {env_note}"),
        );
        warn!("{error}");
        *state = ResolutionState::Failed {
            error: error.clone(),
            at: self.clock.now(),
        };
        Err(error)
    }

    pub async fn invalidate(&self) {
        *self.state.lock().await = ResolutionState::Unresolved;
    }
}
