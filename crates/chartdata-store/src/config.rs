use std::path::PathBuf;
use std::time::Duration;

/// Environment override for the base data directory; always probed first.
pub const DATA_DIR_ENV: &str = "CHARTDATA_DATA_DIR";

#[derive(Debug, Clone)]
pub struct StoreConfig {
    /// Ordered probe list for the base data directory. The `CHARTDATA_DATA_DIR`
    /// override is read at probe time and takes first position.
    pub base_dir_candidates: Vec<PathBuf>,
    pub folder_index_ttl: Duration,
    pub file_ttl: Duration,
    /// Deadline around every filesystem suspension point; a stuck filesystem
    /// surfaces as `StoreErrorCode::Timeout` instead of blocking callers.
    pub fs_op_timeout: Duration,
    /// How long a failed base-directory resolution is served from memory
    /// before the candidates are probed again.
    pub resolve_retry_cooldown: Duration,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            base_dir_candidates: default_base_dir_candidates(),
            folder_index_ttl: Duration::from_secs(30 * 60),
            file_ttl: Duration::from_secs(60 * 60),
            fs_op_timeout: Duration::from_secs(5),
            resolve_retry_cooldown: Duration::from_secs(60),
        }
    }
}

#[must_use]
pub fn default_base_dir_candidates() -> Vec<PathBuf> {
    vec![
        PathBuf::from("data/ds"),
        PathBuf::from("ds"),
        // legacy layout kept for older deployments
        PathBuf::from("public/ds"),
        PathBuf::from("/srv/chartdata/ds"),
        PathBuf::from("/var/lib/chartdata/ds"),
    ]
}

pub fn validate_store_config(cfg: &StoreConfig) -> Result<(), String> {
    if cfg.base_dir_candidates.is_empty() {
        return Err("at least one base directory candidate is required".to_string());
    }
    if cfg.folder_index_ttl.is_zero() || cfg.file_ttl.is_zero() {
        return Err("cache ttls must be > 0".to_string());
    }
    if cfg.fs_op_timeout.is_zero() {
        return Err("fs op timeout must be > 0".to_string());
    }
    if cfg.resolve_retry_cooldown.is_zero() {
        return Err("resolve retry cooldown must be > 0".to_string());
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_passes_startup_contract() {
        validate_store_config(&StoreConfig::default()).expect("default config");
    }

    #[test]
    fn startup_contract_rejects_empty_candidates() {
        let cfg = StoreConfig {
            base_dir_candidates: Vec::new(),
            ..StoreConfig::default()
        };
        let err = validate_store_config(&cfg).expect_err("empty candidates");
        assert!(err.contains("candidate"));
    }

    #[test]
    fn startup_contract_rejects_zero_durations() {
        let cfg = StoreConfig {
            file_ttl: Duration::ZERO,
            ..StoreConfig::default()
        };
        let err = validate_store_config(&cfg).expect_err("zero ttl");
        assert!(err.contains("ttl"));

        let cfg = StoreConfig {
            fs_op_timeout: Duration::ZERO,
            ..StoreConfig::default()
        };
        let err = validate_store_config(&cfg).expect_err("zero timeout");
        assert!(err.contains("timeout"));
    }
}
