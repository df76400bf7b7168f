//! Advisory Vault - Filesystem Stores
//!
//! One file per logical key or blob. Writes go to a temp file that is
//! synced and then renamed over the target, so a reader never sees half
//! a value.

use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use async_trait::async_trait;

use super::{content_address, BlobStore, KeyValueStore};
use crate::error::{VaultError, VaultResult};

/// Write `data` to `path` via temp file + rename
fn write_atomic(path: &Path, data: &[u8]) -> VaultResult<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }

    let temp_path = path.with_extension("tmp");
    let mut file = OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(true)
        .open(&temp_path)?;
    file.write_all(data)?;
    file.sync_all()?;

    fs::rename(&temp_path, path)?;
    Ok(())
}

/// Names end up as file names; keep them to a safe alphabet
fn check_name(name: &str) -> VaultResult<()> {
    let valid = !name.is_empty()
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');
    if valid {
        Ok(())
    } else {
        Err(VaultError::Store(format!("invalid store key '{}'", name)))
    }
}

/// `<root>/<key>.json`
#[derive(Debug, Clone)]
pub struct FsKvStore {
    root: PathBuf,
}

impl FsKvStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn path_for(&self, key: &str) -> VaultResult<PathBuf> {
        check_name(key)?;
        Ok(self.root.join(format!("{}.json", key)))
    }
}

impl KeyValueStore for FsKvStore {
    fn get(&self, key: &str) -> VaultResult<Option<String>> {
        let path = self.path_for(key)?;
        match fs::read_to_string(&path) {
            Ok(value) => Ok(Some(value)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn set(&self, key: &str, value: &str) -> VaultResult<()> {
        let path = self.path_for(key)?;
        write_atomic(&path, value.as_bytes())?;
        tracing::debug!(key, "stored value");
        Ok(())
    }

    fn remove(&self, key: &str) -> VaultResult<()> {
        let path = self.path_for(key)?;
        match fs::remove_file(&path) {
            Err(e) if e.kind() != std::io::ErrorKind::NotFound => Err(e.into()),
            _ => Ok(()),
        }
    }
}

/// `<root>/<sha256-hex>`
#[derive(Debug, Clone)]
pub struct FsBlobStore {
    root: PathBuf,
}

impl FsBlobStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn path_for(&self, locator: &str) -> VaultResult<PathBuf> {
        let valid = locator.len() == 64 && locator.chars().all(|c| c.is_ascii_hexdigit());
        if !valid {
            return Err(VaultError::NotFound(format!("blob {}", locator)));
        }
        Ok(self.root.join(locator.to_ascii_lowercase()))
    }
}

#[async_trait]
impl BlobStore for FsBlobStore {
    async fn put(&self, data: &[u8]) -> VaultResult<String> {
        let locator = content_address(data);
        let path = self.root.join(&locator);
        let data = data.to_vec();

        tokio::task::spawn_blocking(move || write_atomic(&path, &data))
            .await
            .map_err(|e| VaultError::Store(format!("blob write task failed: {}", e)))??;

        tracing::debug!(%locator, "stored blob");
        Ok(locator)
    }

    async fn get(&self, locator: &str) -> VaultResult<Vec<u8>> {
        let path = self.path_for(locator)?;
        match tokio::fs::read(&path).await {
            Ok(data) => Ok(data),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                Err(VaultError::NotFound(format!("blob {}", locator)))
            }
            Err(e) => Err(e.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_kv_persists_across_instances() {
        let dir = TempDir::new().unwrap();
        let store = FsKvStore::new(dir.path());
        store.set("accounts-blob", "AAAA").unwrap();

        let reopened = FsKvStore::new(dir.path());
        assert_eq!(reopened.get("accounts-blob").unwrap().as_deref(), Some("AAAA"));
        assert!(!dir.path().join("accounts-blob.tmp").exists());
    }

    #[test]
    fn test_kv_missing_and_remove() {
        let dir = TempDir::new().unwrap();
        let store = FsKvStore::new(dir.path().join("nested"));
        assert!(store.get("vault-metadata").unwrap().is_none());
        store.remove("vault-metadata").unwrap();

        store.set("vault-metadata", "{}").unwrap();
        store.remove("vault-metadata").unwrap();
        assert!(store.get("vault-metadata").unwrap().is_none());
    }

    #[test]
    fn test_kv_rejects_path_like_keys() {
        let dir = TempDir::new().unwrap();
        let store = FsKvStore::new(dir.path());
        assert!(matches!(store.set("../escape", "x"), Err(VaultError::Store(_))));
        assert!(matches!(store.get(""), Err(VaultError::Store(_))));
    }

    #[tokio::test]
    async fn test_blob_roundtrip() {
        let dir = TempDir::new().unwrap();
        let store = FsBlobStore::new(dir.path());

        let locator = store.put(b"sealed bytes").await.unwrap();
        assert_eq!(locator.len(), 64);
        assert_eq!(store.get(&locator).await.unwrap(), b"sealed bytes");

        // same content, same address
        assert_eq!(store.put(b"sealed bytes").await.unwrap(), locator);
    }

    #[tokio::test]
    async fn test_blob_unknown_locator() {
        let dir = TempDir::new().unwrap();
        let store = FsBlobStore::new(dir.path());
        let missing = content_address(b"never stored");
        assert!(matches!(store.get(&missing).await, Err(VaultError::NotFound(_))));
        assert!(matches!(store.get("../etc/passwd").await, Err(VaultError::NotFound(_))));
    }
}
