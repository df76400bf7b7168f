//! Advisory Vault - Configuration
//!
//! JSON file (all fields optional) → defaults → environment overrides.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{VaultError, VaultResult};

/// Overrides `data_dir`
pub const ENV_DATA_DIR: &str = "ADVISORY_VAULT_DATA_DIR";

/// Overrides `log.level`
pub const ENV_LOG: &str = "ADVISORY_VAULT_LOG";

const APP_DIR_NAME: &str = "advisory-vault";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LogConfig {
    /// `EnvFilter` directive, e.g. "info" or "advisory_vault=debug"
    pub level: String,
    /// JSON lines instead of human-readable output
    pub json: bool,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: "info".into(),
            json: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Vault key-value store root
    pub data_dir: PathBuf,
    /// Blob store root; `<data_dir>/blobs` when unset
    pub blob_dir: Option<PathBuf>,
    pub log: LogConfig,
}

impl Default for AppConfig {
    fn default() -> Self {
        let data_dir = dirs::data_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(APP_DIR_NAME);
        Self {
            data_dir,
            blob_dir: None,
            log: LogConfig::default(),
        }
    }
}

impl AppConfig {
    /// Load from `path` if given, then apply environment overrides
    pub fn load(path: Option<&Path>) -> VaultResult<Self> {
        let mut config = match path {
            Some(path) => Self::from_file(path)?,
            None => Self::default(),
        };
        config.apply_overrides(|name| std::env::var(name).ok());
        Ok(config)
    }

    pub fn from_file(path: &Path) -> VaultResult<Self> {
        let raw = std::fs::read_to_string(path).map_err(|e| {
            VaultError::Config(format!("cannot read {}: {}", path.display(), e))
        })?;
        serde_json::from_str(&raw)
            .map_err(|e| VaultError::Config(format!("invalid {}: {}", path.display(), e)))
    }

    /// Apply overrides from any variable source
    pub fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(dir) = lookup(ENV_DATA_DIR).filter(|v| !v.is_empty()) {
            self.data_dir = PathBuf::from(dir);
        }
        if let Some(level) = lookup(ENV_LOG).filter(|v| !v.is_empty()) {
            self.log.level = level;
        }
    }

    pub fn vault_dir(&self) -> PathBuf {
        self.data_dir.join("vault")
    }

    pub fn blob_dir(&self) -> PathBuf {
        self.blob_dir
            .clone()
            .unwrap_or_else(|| self.data_dir.join("blobs"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_defaults() {
        let config = AppConfig::default();
        assert!(config.data_dir.ends_with(APP_DIR_NAME));
        assert_eq!(config.blob_dir(), config.data_dir.join("blobs"));
        assert_eq!(config.log.level, "info");
        assert!(!config.log.json);
    }

    #[test]
    fn test_partial_file() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, r#"{ "data_dir": "/srv/av", "log": { "json": true } }"#).unwrap();

        let config = AppConfig::from_file(&path).unwrap();
        assert_eq!(config.data_dir, PathBuf::from("/srv/av"));
        assert_eq!(config.vault_dir(), PathBuf::from("/srv/av/vault"));
        assert!(config.log.json);
        assert_eq!(config.log.level, "info");
    }

    #[test]
    fn test_bad_file_is_config_error() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, "not json").unwrap();
        assert!(matches!(AppConfig::from_file(&path), Err(VaultError::Config(_))));
        assert!(matches!(
            AppConfig::from_file(&dir.path().join("missing.json")),
            Err(VaultError::Config(_))
        ));
    }

    #[test]
    fn test_overrides() {
        let vars: HashMap<&str, &str> =
            [(ENV_DATA_DIR, "/tmp/av"), (ENV_LOG, "debug")].into_iter().collect();

        let mut config = AppConfig::default();
        config.apply_overrides(|name| vars.get(name).map(|v| v.to_string()));
        assert_eq!(config.data_dir, PathBuf::from("/tmp/av"));
        assert_eq!(config.log.level, "debug");

        let mut untouched = AppConfig::default();
        untouched.apply_overrides(|_| Some(String::new()));
        assert_eq!(untouched, AppConfig::default());
    }
}
