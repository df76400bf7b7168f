//! Advisory Vault - AEAD Encryption
//!
//! AES-256-GCM under the vault key, AES-128-GCM under content keys.

use aes_gcm::{
    aead::{Aead, KeyInit},
    Aes128Gcm, Aes256Gcm, Nonce,
};
use serde::{Deserialize, Serialize};
use zeroize::Zeroizing;

use super::keys::{generate_nonce, ContentKey, VaultKey, NONCE_LEN, TAG_LEN};
use crate::error::{VaultError, VaultResult};

/// Ciphertext together with the iv it was produced under
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EncryptedBlob {
    /// Ciphertext with authentication tag
    pub ciphertext: Vec<u8>,
    /// 96-bit iv, unique per encryption
    pub iv: Vec<u8>,
}

impl EncryptedBlob {
    /// Serialize to bytes (iv || ciphertext)
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut result = Vec::with_capacity(self.iv.len() + self.ciphertext.len());
        result.extend_from_slice(&self.iv);
        result.extend_from_slice(&self.ciphertext);
        result
    }

    /// Deserialize from bytes (iv || ciphertext)
    pub fn from_bytes(data: &[u8]) -> VaultResult<Self> {
        if data.len() < NONCE_LEN + TAG_LEN {
            return Err(VaultError::Integrity("Data too short".into()));
        }

        Ok(Self {
            iv: data[..NONCE_LEN].to_vec(),
            ciphertext: data[NONCE_LEN..].to_vec(),
        })
    }
}

fn checked_nonce(iv: &[u8]) -> VaultResult<&Nonce<aes_gcm::aead::consts::U12>> {
    if iv.len() != NONCE_LEN {
        return Err(VaultError::Integrity(format!(
            "Invalid nonce length: {}",
            iv.len()
        )));
    }
    Ok(Nonce::from_slice(iv))
}

// ═══════════════════════════════════════════════════════════════════════════
// AES-256-GCM (vault key)
// ═══════════════════════════════════════════════════════════════════════════

/// Encrypt under the vault key with a freshly generated iv
pub fn encrypt_with_vault_key(key: &VaultKey, plaintext: &[u8]) -> VaultResult<EncryptedBlob> {
    let iv = generate_nonce()?;
    encrypt_with_vault_key_iv(key, &iv, plaintext)
}

/// Encrypt under the vault key with a caller-supplied iv.
///
/// The caller owns iv uniqueness; only tests and key-equivalence checks use this.
pub fn encrypt_with_vault_key_iv(
    key: &VaultKey,
    iv: &[u8],
    plaintext: &[u8],
) -> VaultResult<EncryptedBlob> {
    let cipher = Aes256Gcm::new_from_slice(key.expose())
        .map_err(|e| VaultError::CryptoBackend(e.to_string()))?;
    let nonce = checked_nonce(iv)?;

    let ciphertext = cipher
        .encrypt(nonce, plaintext)
        .map_err(|e| VaultError::CryptoBackend(format!("AES-GCM encryption failed: {}", e)))?;

    Ok(EncryptedBlob {
        ciphertext,
        iv: iv.to_vec(),
    })
}

/// Decrypt a blob produced under the vault key
pub fn decrypt_with_vault_key(
    key: &VaultKey,
    blob: &EncryptedBlob,
) -> VaultResult<Zeroizing<Vec<u8>>> {
    let cipher = Aes256Gcm::new_from_slice(key.expose())
        .map_err(|e| VaultError::CryptoBackend(e.to_string()))?;
    let nonce = checked_nonce(&blob.iv)?;

    cipher
        .decrypt(nonce, blob.ciphertext.as_slice())
        .map(Zeroizing::new)
        .map_err(|_| VaultError::Integrity("Authentication failed".into()))
}

// ═══════════════════════════════════════════════════════════════════════════
// AES-128-GCM (ephemeral content keys)
// ═══════════════════════════════════════════════════════════════════════════

/// Encrypt a document under a content key with a freshly generated iv
pub fn encrypt_with_content_key(
    key: &ContentKey,
    plaintext: &[u8],
) -> VaultResult<EncryptedBlob> {
    let cipher = Aes128Gcm::new_from_slice(key.expose())
        .map_err(|e| VaultError::CryptoBackend(e.to_string()))?;

    let iv = generate_nonce()?;
    let nonce = Nonce::from_slice(&iv);

    let ciphertext = cipher
        .encrypt(nonce, plaintext)
        .map_err(|e| VaultError::CryptoBackend(format!("AES-GCM encryption failed: {}", e)))?;

    Ok(EncryptedBlob {
        ciphertext,
        iv: iv.to_vec(),
    })
}

/// Decrypt a document under a content key
pub fn decrypt_with_content_key(
    key: &ContentKey,
    iv: &[u8],
    ciphertext: &[u8],
) -> VaultResult<Zeroizing<Vec<u8>>> {
    let cipher = Aes128Gcm::new_from_slice(key.expose())
        .map_err(|e| VaultError::CryptoBackend(e.to_string()))?;
    let nonce = checked_nonce(iv)?;

    cipher
        .decrypt(nonce, ciphertext)
        .map(Zeroizing::new)
        .map_err(|_| VaultError::Integrity("Authentication failed".into()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_vault_key_roundtrip() {
        let key = VaultKey::generate().unwrap();
        let plaintext = b"accounts: [alice, bob]";

        let blob = encrypt_with_vault_key(&key, plaintext).unwrap();
        let decrypted = decrypt_with_vault_key(&key, &blob).unwrap();

        assert_eq!(plaintext.as_slice(), decrypted.as_slice());
    }

    #[test]
    fn test_fresh_iv_per_encryption() {
        let key = VaultKey::generate().unwrap();
        let a = encrypt_with_vault_key(&key, b"same").unwrap();
        let b = encrypt_with_vault_key(&key, b"same").unwrap();

        assert_ne!(a.iv, b.iv);
        assert_ne!(a.ciphertext, b.ciphertext);
    }

    #[test]
    fn test_wrong_key_fails() {
        let key1 = VaultKey::generate().unwrap();
        let key2 = VaultKey::generate().unwrap();

        let blob = encrypt_with_vault_key(&key1, b"Secret data").unwrap();
        let result = decrypt_with_vault_key(&key2, &blob);

        assert!(matches!(result, Err(VaultError::Integrity(_))));
    }

    #[test]
    fn test_content_key_tamper_detected() {
        let key = ContentKey::generate().unwrap();
        let mut blob = encrypt_with_content_key(&key, b"advisory body").unwrap();
        blob.ciphertext[0] ^= 0x01;

        let result = decrypt_with_content_key(&key, &blob.iv, &blob.ciphertext);
        assert!(matches!(result, Err(VaultError::Integrity(_))));
    }

    #[test]
    fn test_blob_bytes_layout() {
        let key = VaultKey::generate().unwrap();
        let blob = encrypt_with_vault_key(&key, b"layout").unwrap();

        let bytes = blob.to_bytes();
        assert_eq!(&bytes[..NONCE_LEN], blob.iv.as_slice());
        assert_eq!(EncryptedBlob::from_bytes(&bytes).unwrap(), blob);
        assert!(EncryptedBlob::from_bytes(&bytes[..NONCE_LEN]).is_err());
    }

    #[test]
    fn test_bad_nonce_length_rejected() {
        let key = VaultKey::generate().unwrap();
        let result = encrypt_with_vault_key_iv(&key, &[0u8; 8], b"x");
        assert!(result.is_err());
    }
}
