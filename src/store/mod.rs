//! Advisory Vault - Persistence Collaborators
//!
//! The core never does I/O itself. These traits are the seams it talks
//! through; callers plug in the memory or filesystem backends below, or
//! their own (IPFS, ledger RPC, browser storage).

mod fs;
mod memory;

pub use fs::{FsBlobStore, FsKvStore};
pub use memory::{MemoryBlobStore, MemoryKeyDirectory, MemoryKvStore, RecordingSink};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::VaultResult;
use crate::hybrid::PublicationRecord;

/// Local string store addressed by logical key (`vault-metadata`, ...).
/// Each `set` replaces the whole value.
pub trait KeyValueStore: Send + Sync {
    fn get(&self, key: &str) -> VaultResult<Option<String>>;

    fn set(&self, key: &str, value: &str) -> VaultResult<()>;

    /// Ok even if the key is absent
    fn remove(&self, key: &str) -> VaultResult<()>;
}

/// Content-addressed blob storage. Backends only ever see ciphertext or
/// public documents.
#[async_trait]
pub trait BlobStore: Send + Sync {
    /// Store bytes and return an opaque locator
    async fn put(&self, data: &[u8]) -> VaultResult<String>;

    /// Fetch by locator. Unknown locator → `NotFound`.
    async fn get(&self, locator: &str) -> VaultResult<Vec<u8>>;
}

/// Lookup of a recipient's exported (SPKI DER) public key
#[async_trait]
pub trait PublicKeyDirectory: Send + Sync {
    async fn fetch_public_key(&self, recipient_id: &str) -> VaultResult<Vec<u8>>;
}

/// Access grant for a vendor on a confidential contract
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WhitelistGrant {
    pub vendor_address: String,
}

/// Ledger publication endpoint
#[async_trait]
pub trait EnvelopeSink: Send + Sync {
    async fn publish(&self, record: PublicationRecord) -> VaultResult<()>;

    async fn whitelist(&self, grant: WhitelistGrant) -> VaultResult<()>;
}

/// Locator used by the bundled blob stores: lowercase SHA-256 hex
pub fn content_address(data: &[u8]) -> String {
    hex::encode(crate::crypto::sha256(data))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_content_address_is_sha256_hex() {
        assert_eq!(
            content_address(b"abc"),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }

    #[test]
    fn test_grant_wire_shape() {
        let grant = WhitelistGrant {
            vendor_address: "0xabc".into(),
        };
        let json = serde_json::to_string(&grant).unwrap();
        assert_eq!(json, r#"{"vendorAddress":"0xabc"}"#);
    }
}
