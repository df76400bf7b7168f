//! Advisory Vault - Delivery Flows
//!
//! Glue between the cipher and the outside world:
//!
//! ```text
//! publish:  directory.fetch_public_key ─► import ─► seal ─► blobs.put ─► sink.publish
//! read:     blobs.get ─► open (tag + hash) ─► AdvisoryDocument::parse
//! ```
//!
//! Sealing finishes before any collaborator sees a byte, so a cancelled
//! publish leaves nothing behind.

use std::sync::Arc;

use rsa::RsaPrivateKey;
use serde::{Deserialize, Serialize};
use zeroize::Zeroizing;

use crate::advisory::AdvisoryDocument;
use crate::crypto::{digest_eq, sha256, DIGEST_LEN};
use crate::error::{VaultError, VaultResult};
use crate::hybrid::{HybridCipher, SealedEnvelope};
use crate::keypair::KeyPairManager;
use crate::store::{BlobStore, EnvelopeSink, PublicKeyDirectory, WhitelistGrant};

/// A publicly stored advisory and the hash it was published under
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PublicAdvisory {
    pub location: String,
    #[serde(with = "hex::serde")]
    pub file_hash: [u8; DIGEST_LEN],
}

/// Vendor side
pub struct ConfidentialPublisher {
    blobs: Arc<dyn BlobStore>,
    directory: Arc<dyn PublicKeyDirectory>,
    sink: Arc<dyn EnvelopeSink>,
}

impl ConfidentialPublisher {
    pub fn new(
        blobs: Arc<dyn BlobStore>,
        directory: Arc<dyn PublicKeyDirectory>,
        sink: Arc<dyn EnvelopeSink>,
    ) -> Self {
        Self {
            blobs,
            directory,
            sink,
        }
    }

    /// Seal `document` for `recipient_id` and publish the envelope
    pub async fn publish_confidential(
        &self,
        recipient_id: &str,
        document: Vec<u8>,
    ) -> VaultResult<SealedEnvelope> {
        let der = self.directory.fetch_public_key(recipient_id).await?;
        let recipient = KeyPairManager::import_public_key(&der)?;

        let sealed = HybridCipher::seal_async(document, recipient).await?;

        let location = self.blobs.put(&sealed.ciphertext).await?;
        let envelope = SealedEnvelope::new(location, &sealed);
        self.sink.publish(envelope.to_record()).await?;

        tracing::info!(
            recipient = recipient_id,
            location = %envelope.location,
            "published confidential advisory"
        );
        Ok(envelope)
    }

    /// Store a plaintext advisory as-is
    pub async fn publish_public(&self, document: &[u8]) -> VaultResult<PublicAdvisory> {
        let file_hash = sha256(document);
        let location = self.blobs.put(document).await?;
        tracing::info!(location = %location, "published public advisory");
        Ok(PublicAdvisory {
            location,
            file_hash,
        })
    }

    /// Allow a vendor address to post to a confidential contract
    pub async fn grant_access(&self, vendor_address: &str) -> VaultResult<()> {
        self.sink
            .whitelist(WhitelistGrant {
                vendor_address: vendor_address.to_string(),
            })
            .await
    }
}

/// Asset owner side
pub struct AdvisoryReader {
    blobs: Arc<dyn BlobStore>,
}

impl AdvisoryReader {
    pub fn new(blobs: Arc<dyn BlobStore>) -> Self {
        Self { blobs }
    }

    /// Fetch and open, returning the verified bytes
    pub async fn fetch_confidential(
        &self,
        envelope: &SealedEnvelope,
        private_key: &RsaPrivateKey,
    ) -> VaultResult<Zeroizing<Vec<u8>>> {
        let ciphertext = self.blobs.get(&envelope.location).await?;
        HybridCipher::open_async(envelope.clone(), ciphertext, private_key.clone()).await
    }

    pub async fn read_confidential(
        &self,
        envelope: &SealedEnvelope,
        private_key: &RsaPrivateKey,
    ) -> VaultResult<AdvisoryDocument> {
        let plaintext = self.fetch_confidential(envelope, private_key).await?;
        AdvisoryDocument::parse(&plaintext)
    }

    /// Fetch, check against the published hash, parse
    pub async fn read_public(&self, advisory: &PublicAdvisory) -> VaultResult<AdvisoryDocument> {
        let document = self.blobs.get(&advisory.location).await?;
        if !digest_eq(&sha256(&document), &advisory.file_hash) {
            tracing::warn!(location = %advisory.location, "public advisory hash mismatch");
            return Err(VaultError::Integrity(
                "stored advisory does not match published hash".into(),
            ));
        }
        AdvisoryDocument::parse(&document)
    }
}
