//! Advisory Vault - Confidential Delivery Cipher
//!
//! Seal:
//! ```text
//! content_key = random 128-bit         iv = random 96-bit
//! ciphertext  = AES-128-GCM(content_key, iv, plaintext)
//! file_hash   = SHA-256(plaintext)
//! wrapped_key = RSA-OAEP-SHA256(recipient_pub, content_key)
//! ```
//! Open reverses the wrap, decrypts, and rechecks `file_hash`. Plaintext is
//! released only when both the GCM tag and the hash agree.

use rsa::{Oaep, RsaPrivateKey, RsaPublicKey};
use serde::{Deserialize, Serialize};
use sha2::Sha256;
use zeroize::Zeroizing;

use crate::crypto::{
    decrypt_with_content_key, digest_eq, encrypt_with_content_key, offload, sha256, ContentKey,
    DIGEST_LEN,
};
use crate::error::{VaultError, VaultResult};

/// Output of [`HybridCipher::seal`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SealedDocument {
    pub ciphertext: Vec<u8>,
    pub iv: Vec<u8>,
    pub wrapped_key: Vec<u8>,
    pub file_hash: [u8; DIGEST_LEN],
}

/// What a reader needs besides the ciphertext itself
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SealedEnvelope {
    /// Opaque content locator from the blob store
    pub location: String,
    /// SHA-256 of the original plaintext
    pub file_hash: [u8; DIGEST_LEN],
    /// Content key under the recipient public key
    pub wrapped_key: Vec<u8>,
    /// Content cipher nonce
    pub iv: Vec<u8>,
}

/// Hex tuple handed to the ledger publisher
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PublicationRecord {
    pub location: String,
    pub file_hash_hex: String,
    pub wrapped_key_hex: String,
    pub iv_hex: String,
}

impl SealedEnvelope {
    pub fn new(location: impl Into<String>, sealed: &SealedDocument) -> Self {
        Self {
            location: location.into(),
            file_hash: sealed.file_hash,
            wrapped_key: sealed.wrapped_key.clone(),
            iv: sealed.iv.clone(),
        }
    }

    pub fn to_record(&self) -> PublicationRecord {
        PublicationRecord {
            location: self.location.clone(),
            file_hash_hex: hex::encode(self.file_hash),
            wrapped_key_hex: hex::encode(&self.wrapped_key),
            iv_hex: hex::encode(&self.iv),
        }
    }

    /// Parse a record read back from the ledger
    pub fn from_record(record: &PublicationRecord) -> VaultResult<Self> {
        let decode = |field: &str, value: &str| {
            hex::decode(value.trim_start_matches("0x"))
                .map_err(|e| VaultError::Integrity(format!("{} is not valid hex: {}", field, e)))
        };

        let file_hash: [u8; DIGEST_LEN] = decode("fileHash", &record.file_hash_hex)?
            .as_slice()
            .try_into()
            .map_err(|_| VaultError::Integrity("fileHash must be 32 bytes".into()))?;

        Ok(Self {
            location: record.location.clone(),
            file_hash,
            wrapped_key: decode("wrappedKey", &record.wrapped_key_hex)?,
            iv: decode("iv", &record.iv_hex)?,
        })
    }
}

/// Stateless seal/open operations
pub struct HybridCipher;

impl HybridCipher {
    /// Encrypt `plaintext` for the holder of `recipient`'s private key
    pub fn seal(plaintext: &[u8], recipient: &RsaPublicKey) -> VaultResult<SealedDocument> {
        let content_key = ContentKey::generate()?;
        let blob = encrypt_with_content_key(&content_key, plaintext)?;
        let file_hash = sha256(plaintext);

        let mut rng = rand::rngs::OsRng;
        let wrapped_key = recipient
            .encrypt(&mut rng, Oaep::new::<Sha256>(), content_key.expose())
            .map_err(|e| VaultError::CryptoBackend(format!("key wrap failed: {}", e)))?;

        tracing::debug!(bytes = plaintext.len(), "sealed confidential document");

        Ok(SealedDocument {
            ciphertext: blob.ciphertext,
            iv: blob.iv,
            wrapped_key,
            file_hash,
        })
    }

    /// Unwrap, decrypt, and verify against `file_hash`
    pub fn open(
        ciphertext: &[u8],
        iv: &[u8],
        wrapped_key: &[u8],
        file_hash: &[u8],
        recipient: &RsaPrivateKey,
    ) -> VaultResult<Zeroizing<Vec<u8>>> {
        let unwrapped = recipient
            .decrypt(Oaep::new::<Sha256>(), wrapped_key)
            .map_err(|e| match e {
                rsa::Error::Decryption => {
                    tracing::warn!("content key unwrap failed");
                    VaultError::Integrity(
                        "content key unwrap failed (wrong key or tampered envelope)".into(),
                    )
                }
                other => VaultError::CryptoBackend(format!("key unwrap failed: {}", other)),
            })?;
        let raw_key = Zeroizing::new(unwrapped);
        let content_key = ContentKey::from_slice(&raw_key)?;

        let plaintext = decrypt_with_content_key(&content_key, iv, ciphertext).map_err(|e| {
            tracing::warn!("confidential document failed authentication");
            e
        })?;

        if !digest_eq(&sha256(&plaintext), file_hash) {
            tracing::warn!("confidential document hash mismatch");
            return Err(VaultError::Integrity(
                "decrypted document does not match published hash".into(),
            ));
        }

        Ok(plaintext)
    }

    /// [`open`](Self::open) taking an envelope and the fetched ciphertext
    pub fn open_envelope(
        envelope: &SealedEnvelope,
        ciphertext: &[u8],
        recipient: &RsaPrivateKey,
    ) -> VaultResult<Zeroizing<Vec<u8>>> {
        Self::open(
            ciphertext,
            &envelope.iv,
            &envelope.wrapped_key,
            &envelope.file_hash,
            recipient,
        )
    }

    pub async fn seal_async(
        plaintext: Vec<u8>,
        recipient: RsaPublicKey,
    ) -> VaultResult<SealedDocument> {
        offload(move || Self::seal(&plaintext, &recipient)).await
    }

    pub async fn open_async(
        envelope: SealedEnvelope,
        ciphertext: Vec<u8>,
        recipient: RsaPrivateKey,
    ) -> VaultResult<Zeroizing<Vec<u8>>> {
        offload(move || Self::open_envelope(&envelope, &ciphertext, &recipient)).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::keypair::test_key_pair;

    const DOC: &[u8] = br#"{"document":{"title":"Widget advisory"}}"#;

    fn open_sealed(sealed: &SealedDocument) -> VaultResult<Zeroizing<Vec<u8>>> {
        HybridCipher::open(
            &sealed.ciphertext,
            &sealed.iv,
            &sealed.wrapped_key,
            &sealed.file_hash,
            &test_key_pair().private_key,
        )
    }

    #[test]
    fn test_seal_open_roundtrip() {
        let sealed = HybridCipher::seal(DOC, &test_key_pair().public_key).unwrap();
        assert_eq!(sealed.iv.len(), 12);
        assert_eq!(sealed.wrapped_key.len(), 384);
        assert_eq!(sealed.file_hash, sha256(DOC));

        let opened = open_sealed(&sealed).unwrap();
        assert_eq!(opened.as_slice(), DOC);
    }

    #[test]
    fn test_empty_document_roundtrip() {
        let sealed = HybridCipher::seal(b"", &test_key_pair().public_key).unwrap();
        assert!(open_sealed(&sealed).unwrap().is_empty());
    }

    #[test]
    fn test_each_seal_uses_fresh_key_and_iv() {
        let a = HybridCipher::seal(DOC, &test_key_pair().public_key).unwrap();
        let b = HybridCipher::seal(DOC, &test_key_pair().public_key).unwrap();
        assert_ne!(a.iv, b.iv);
        assert_ne!(a.ciphertext, b.ciphertext);
        assert_ne!(a.wrapped_key, b.wrapped_key);
        assert_eq!(a.file_hash, b.file_hash);
    }

    #[test]
    fn test_tampered_ciphertext_rejected() {
        let sealed = HybridCipher::seal(DOC, &test_key_pair().public_key).unwrap();
        for i in [0, sealed.ciphertext.len() / 2, sealed.ciphertext.len() - 1] {
            let mut bad = sealed.clone();
            bad.ciphertext[i] ^= 0x01;
            assert!(matches!(open_sealed(&bad), Err(VaultError::Integrity(_))));
        }
    }

    #[test]
    fn test_tampered_wrapped_key_rejected() {
        let sealed = HybridCipher::seal(DOC, &test_key_pair().public_key).unwrap();
        for i in [0, 100, sealed.wrapped_key.len() - 1] {
            let mut bad = sealed.clone();
            bad.wrapped_key[i] ^= 0x01;
            assert!(matches!(open_sealed(&bad), Err(VaultError::Integrity(_))));
        }
    }

    #[test]
    fn test_tampered_hash_rejected() {
        let sealed = HybridCipher::seal(DOC, &test_key_pair().public_key).unwrap();
        for i in [0, DIGEST_LEN - 1] {
            let mut bad = sealed.clone();
            bad.file_hash[i] ^= 0x01;
            assert!(matches!(open_sealed(&bad), Err(VaultError::Integrity(_))));
        }
    }

    #[test]
    fn test_substituted_payload_rejected() {
        // A validly sealed but different document presented under the original hash
        let original = HybridCipher::seal(DOC, &test_key_pair().public_key).unwrap();
        let substitute = HybridCipher::seal(b"forged", &test_key_pair().public_key).unwrap();

        let result = HybridCipher::open(
            &substitute.ciphertext,
            &substitute.iv,
            &substitute.wrapped_key,
            &original.file_hash,
            &test_key_pair().private_key,
        );
        assert!(matches!(result, Err(VaultError::Integrity(_))));
    }

    #[test]
    fn test_record_roundtrip() {
        let sealed = HybridCipher::seal(DOC, &test_key_pair().public_key).unwrap();
        let envelope = SealedEnvelope::new("blob-1", &sealed);

        let record = envelope.to_record();
        assert_eq!(record.file_hash_hex.len(), 64);
        let json = serde_json::to_value(&record).unwrap();
        assert!(json.get("wrappedKeyHex").is_some());

        assert_eq!(SealedEnvelope::from_record(&record).unwrap(), envelope);

        let mut bad = record.clone();
        bad.file_hash_hex = "abcd".into();
        assert!(matches!(
            SealedEnvelope::from_record(&bad),
            Err(VaultError::Integrity(_))
        ));
    }

    #[tokio::test]
    async fn test_async_seal_open() {
        let pair = test_key_pair().clone();
        let sealed = HybridCipher::seal_async(DOC.to_vec(), pair.public_key.clone())
            .await
            .unwrap();
        let envelope = SealedEnvelope::new("blob-async", &sealed);

        let opened = HybridCipher::open_async(envelope, sealed.ciphertext, pair.private_key)
            .await
            .unwrap();
        assert_eq!(opened.as_slice(), DOC);
    }
}
