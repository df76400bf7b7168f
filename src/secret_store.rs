//! Advisory Vault - Encrypted Collections
//!
//! Serializes a collection to JSON and seals it under the vault key. Every
//! `save` draws a fresh iv that travels with its ciphertext.

use base64::{engine::general_purpose::STANDARD as B64, Engine};
use serde::{de::DeserializeOwned, Serialize};
use zeroize::Zeroizing;

use crate::crypto::{decrypt_with_vault_key, encrypt_with_vault_key, EncryptedBlob, VaultKey};
use crate::error::{VaultError, VaultResult};

/// Stateless encrypt/decrypt of serializable collections
pub struct SecretStore;

impl SecretStore {
    /// Encrypt a collection. The blob is fully computed before it is returned.
    pub fn save<T: Serialize + ?Sized>(key: &VaultKey, collection: &T) -> VaultResult<EncryptedBlob> {
        let plaintext = Zeroizing::new(serde_json::to_vec(collection)?);
        encrypt_with_vault_key(key, &plaintext)
    }

    /// Decrypt and deserialize. Tag mismatch yields `Integrity` and no data.
    pub fn load<T: DeserializeOwned>(key: &VaultKey, blob: &EncryptedBlob) -> VaultResult<T> {
        let plaintext = decrypt_with_vault_key(key, blob).map_err(|e| {
            tracing::warn!("secret blob failed authentication");
            e
        })?;
        serde_json::from_slice(&plaintext).map_err(|e| {
            VaultError::Serialization(format!("decrypted collection is not valid: {}", e))
        })
    }

    /// `iv || ciphertext` as base64, the persisted value of a `*-blob` key
    pub fn encode_blob(blob: &EncryptedBlob) -> String {
        B64.encode(blob.to_bytes())
    }

    pub fn decode_blob(value: &str) -> VaultResult<EncryptedBlob> {
        let bytes = B64.decode(value.trim())?;
        EncryptedBlob::from_bytes(&bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    struct Credential {
        name: String,
        secret: String,
    }

    fn sample() -> Vec<Credential> {
        vec![
            Credential {
                name: "ledger".into(),
                secret: "0xdeadbeef".into(),
            },
            Credential {
                name: "backup".into(),
                secret: "0xfeedface".into(),
            },
        ]
    }

    #[test]
    fn test_save_load_roundtrip() {
        let key = VaultKey::generate().unwrap();
        let blob = SecretStore::save(&key, &sample()).unwrap();
        let loaded: Vec<Credential> = SecretStore::load(&key, &blob).unwrap();
        assert_eq!(loaded, sample());
    }

    #[test]
    fn test_each_save_uses_new_iv() {
        let key = VaultKey::generate().unwrap();
        let a = SecretStore::save(&key, &sample()).unwrap();
        let b = SecretStore::save(&key, &sample()).unwrap();
        assert_ne!(a.iv, b.iv);
    }

    #[test]
    fn test_tampered_blob_is_integrity_error() {
        let key = VaultKey::generate().unwrap();
        let mut blob = SecretStore::save(&key, &sample()).unwrap();
        let last = blob.ciphertext.len() - 1;
        blob.ciphertext[last] ^= 0x80;

        let result: VaultResult<Vec<Credential>> = SecretStore::load(&key, &blob);
        assert!(matches!(result, Err(VaultError::Integrity(_))));
    }

    #[test]
    fn test_wrong_key_is_integrity_error() {
        let key = VaultKey::generate().unwrap();
        let other = VaultKey::generate().unwrap();
        let blob = SecretStore::save(&key, &sample()).unwrap();

        let result: VaultResult<Vec<Credential>> = SecretStore::load(&other, &blob);
        assert!(matches!(result, Err(VaultError::Integrity(_))));
    }

    #[test]
    fn test_base64_encoding_roundtrip() {
        let key = VaultKey::generate().unwrap();
        let blob = SecretStore::save(&key, &Vec::<Credential>::new()).unwrap();

        let encoded = SecretStore::encode_blob(&blob);
        let decoded = SecretStore::decode_blob(&encoded).unwrap();
        let loaded: Vec<Credential> = SecretStore::load(&key, &decoded).unwrap();
        assert!(loaded.is_empty());

        assert!(SecretStore::decode_blob("!!not base64!!").is_err());
    }
}
