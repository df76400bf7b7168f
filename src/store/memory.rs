//! In-memory collaborators for tests and ephemeral sessions

use std::collections::HashMap;

use async_trait::async_trait;
use parking_lot::RwLock;

use super::{
    content_address, BlobStore, EnvelopeSink, KeyValueStore, PublicKeyDirectory, WhitelistGrant,
};
use crate::error::{VaultError, VaultResult};
use crate::hybrid::PublicationRecord;

#[derive(Debug, Default)]
pub struct MemoryKvStore {
    entries: RwLock<HashMap<String, String>>,
}

impl MemoryKvStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }
}

impl KeyValueStore for MemoryKvStore {
    fn get(&self, key: &str) -> VaultResult<Option<String>> {
        Ok(self.entries.read().get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> VaultResult<()> {
        self.entries.write().insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> VaultResult<()> {
        self.entries.write().remove(key);
        Ok(())
    }
}

#[derive(Debug, Default)]
pub struct MemoryBlobStore {
    blobs: RwLock<HashMap<String, Vec<u8>>>,
}

impl MemoryBlobStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Overwrite a stored blob in place. Lets tests simulate a hostile store.
    pub fn replace(&self, locator: &str, data: Vec<u8>) -> VaultResult<()> {
        match self.blobs.write().get_mut(locator) {
            Some(slot) => {
                *slot = data;
                Ok(())
            }
            None => Err(VaultError::NotFound(format!("blob {}", locator))),
        }
    }
}

#[async_trait]
impl BlobStore for MemoryBlobStore {
    async fn put(&self, data: &[u8]) -> VaultResult<String> {
        let locator = content_address(data);
        self.blobs.write().insert(locator.clone(), data.to_vec());
        Ok(locator)
    }

    async fn get(&self, locator: &str) -> VaultResult<Vec<u8>> {
        self.blobs
            .read()
            .get(locator)
            .cloned()
            .ok_or_else(|| VaultError::NotFound(format!("blob {}", locator)))
    }
}

/// Recipient id → SPKI DER
#[derive(Debug, Default)]
pub struct MemoryKeyDirectory {
    keys: RwLock<HashMap<String, Vec<u8>>>,
}

impl MemoryKeyDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&self, recipient_id: impl Into<String>, public_key_der: Vec<u8>) {
        self.keys.write().insert(recipient_id.into(), public_key_der);
    }
}

#[async_trait]
impl PublicKeyDirectory for MemoryKeyDirectory {
    async fn fetch_public_key(&self, recipient_id: &str) -> VaultResult<Vec<u8>> {
        self.keys
            .read()
            .get(recipient_id)
            .cloned()
            .ok_or_else(|| VaultError::NotFound(format!("public key for {}", recipient_id)))
    }
}

/// Sink that keeps everything it is handed
#[derive(Debug, Default)]
pub struct RecordingSink {
    records: RwLock<Vec<PublicationRecord>>,
    grants: RwLock<Vec<WhitelistGrant>>,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn records(&self) -> Vec<PublicationRecord> {
        self.records.read().clone()
    }

    pub fn grants(&self) -> Vec<WhitelistGrant> {
        self.grants.read().clone()
    }
}

#[async_trait]
impl EnvelopeSink for RecordingSink {
    async fn publish(&self, record: PublicationRecord) -> VaultResult<()> {
        tracing::debug!(location = %record.location, "recorded publication");
        self.records.write().push(record);
        Ok(())
    }

    async fn whitelist(&self, grant: WhitelistGrant) -> VaultResult<()> {
        self.grants.write().push(grant);
        Ok(())
    }
}
