use crate::index::fingerprint::{FingerprintParams, DEFAULT_ITERATIONS, DEFAULT_OUTPUT_LEN};
use crate::query::DEFAULT_DISPLAY_LIMIT;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

const APP_NAME: &str = "munidx";
const CONFIG_FILE: &str = "config.json";

/// Default directory holding the partition index files
pub const DEFAULT_INDEX_DIR: &str = "mun_hash_por_uf";

/// Application settings, stored as JSON in the app data directory
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    /// Where partition files are written and read
    #[serde(default = "default_index_dir")]
    pub index_dir: PathBuf,

    /// PBKDF2 iteration count
    #[serde(default = "default_iterations")]
    pub iterations: u32,

    /// Fingerprint length in bytes
    #[serde(default = "default_hash_bytes")]
    pub hash_bytes: usize,

    /// Fingerprint workers per partition
    /// If 0, rayon sizes the pool to the number of CPU cores
    #[serde(default)]
    pub worker_threads: usize,

    /// Maximum rows shown for partition and name searches
    #[serde(default = "default_display_limit")]
    pub display_limit: usize,

    /// Partition codes skipped by the builder
    #[serde(default = "default_excluded_partitions")]
    pub excluded_partitions: Vec<String>,
}

fn default_index_dir() -> PathBuf {
    PathBuf::from(".").join(DEFAULT_INDEX_DIR)
}

fn default_iterations() -> u32 {
    DEFAULT_ITERATIONS
}

fn default_hash_bytes() -> usize {
    DEFAULT_OUTPUT_LEN
}

fn default_display_limit() -> usize {
    DEFAULT_DISPLAY_LIMIT
}

fn default_excluded_partitions() -> Vec<String> {
    // Municipalities abroad
    vec!["EX".to_string()]
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            index_dir: default_index_dir(),
            iterations: default_iterations(),
            hash_bytes: default_hash_bytes(),
            worker_threads: 0,
            display_limit: default_display_limit(),
            excluded_partitions: default_excluded_partitions(),
        }
    }
}

impl Settings {
    /// Load settings from `path`, or from the app data directory when `None`.
    /// A missing file yields the defaults.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let config_path = match path {
            Some(p) => p.to_path_buf(),
            None => get_config_path()?,
        };

        if !config_path.exists() {
            if path.is_some() {
                tracing::warn!(path = %config_path.display(), "config file not found, using defaults");
            }
            return Ok(Self::default());
        }

        let content = fs::read_to_string(&config_path)
            .with_context(|| format!("Failed to read config file {}", config_path.display()))?;
        let settings: Settings = serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse config file {}", config_path.display()))?;
        tracing::debug!(path = %config_path.display(), "settings loaded");
        Ok(settings)
    }

    pub fn fingerprint_params(&self) -> FingerprintParams {
        FingerprintParams {
            iterations: self.iterations,
            output_len: self.hash_bytes,
        }
    }
}

/// Get the path to the config file
pub fn get_config_path() -> Result<PathBuf> {
    let app_dir = get_app_data_dir()?;
    Ok(app_dir.join(CONFIG_FILE))
}

/// Get the application data directory
pub fn get_app_data_dir() -> Result<PathBuf> {
    let base = if cfg!(target_os = "macos") {
        dirs::home_dir()
            .map(|h| h.join("Library").join("Application Support"))
    } else if cfg!(target_os = "windows") {
        dirs::data_local_dir()
    } else {
        // Linux/Unix: use XDG_DATA_HOME or ~/.local/share
        dirs::data_dir()
    };

    let base = base.context("Could not determine app data directory")?;
    let app_dir = base.join(APP_NAME);

    fs::create_dir_all(&app_dir)?;
    Ok(app_dir)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::index::PartitionBuilder;
    use tempfile::tempdir;

    #[test]
    fn test_settings_default() {
        let settings = Settings::default();
        assert_eq!(settings.index_dir, Path::new("./mun_hash_por_uf"));
        assert_eq!(settings.iterations, 50_000);
        assert_eq!(settings.hash_bytes, 32);
        assert_eq!(settings.display_limit, DEFAULT_DISPLAY_LIMIT);
        assert_eq!(settings.excluded_partitions, vec!["EX"]);
    }

    #[test]
    fn test_display_limit_default_matches_engine() {
        let settings: Settings = serde_json::from_str("{}").unwrap();
        assert_eq!(settings.display_limit, crate::query::DEFAULT_DISPLAY_LIMIT);
        assert_eq!(DEFAULT_DISPLAY_LIMIT, 20);
    }

    #[test]
    fn test_worker_threads_default_to_pool_choice() {
        // 0 leaves the pool size to rayon (one worker per CPU)
        let settings = Settings::default();
        assert_eq!(settings.worker_threads, 0);

        let builder =
            PartitionBuilder::new(settings.fingerprint_params(), settings.worker_threads).unwrap();
        assert!(builder.worker_count() >= 1);
    }

    #[test]
    fn test_partial_json() {
        let json = r#"{"iterations": 1000, "display_limit": 5}"#;
        let settings: Settings = serde_json::from_str(json).unwrap();

        assert_eq!(settings.iterations, 1000);
        assert_eq!(settings.display_limit, 5);
        assert_eq!(settings.hash_bytes, 32); // default
        assert_eq!(settings.excluded_partitions, vec!["EX"]);
    }

    #[test]
    fn test_load_explicit_path() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("settings.json");
        fs::write(&path, r#"{"index_dir": "/srv/idx", "worker_threads": 2}"#).unwrap();

        let settings = Settings::load(Some(&path)).unwrap();
        assert_eq!(settings.index_dir, Path::new("/srv/idx"));
        assert_eq!(settings.worker_threads, 2);
    }

    #[test]
    fn test_load_missing_explicit_path_uses_defaults() {
        let dir = tempdir().unwrap();
        let settings = Settings::load(Some(&dir.path().join("absent.json"))).unwrap();
        assert_eq!(settings.iterations, 50_000);
    }

    #[test]
    fn test_load_malformed_is_error() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("bad.json");
        fs::write(&path, "{ not json").unwrap();
        assert!(Settings::load(Some(&path)).is_err());
    }

    #[test]
    fn test_fingerprint_params() {
        let mut settings = Settings::default();
        settings.iterations = 10;
        settings.hash_bytes = 16;
        let params = settings.fingerprint_params();
        assert_eq!(params.iterations, 10);
        assert_eq!(params.output_len, 16);
    }
}
