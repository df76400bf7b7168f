//! Advisory Vault - Symmetric Key Material
//!
//! In-memory key wrappers, nonces and digests shared by the vault and the
//! confidential delivery pipeline.

use rand::rngs::OsRng;
use rand::RngCore;
use secrecy::{ExposeSecret, SecretBox};
use sha2::{Digest, Sha256};
use subtle::ConstantTimeEq;

use crate::error::{VaultError, VaultResult};

/// Key length for the vault key (AES-256)
pub const VAULT_KEY_LEN: usize = 32;

/// Key length for ephemeral content keys (AES-128)
pub const CONTENT_KEY_LEN: usize = 16;

/// Nonce length for AES-GCM (96 bits)
pub const NONCE_LEN: usize = 12;

/// GCM authentication tag length
pub const TAG_LEN: usize = 16;

/// Salt length for password derivation
pub const SALT_LEN: usize = 16;

/// SHA-256 digest length
pub const DIGEST_LEN: usize = 32;

/// Password-derived vault key
///
/// Lives only for the session that derived it and is zeroized on drop.
/// Deliberately not `Clone`.
pub struct VaultKey {
    inner: SecretBox<[u8; VAULT_KEY_LEN]>,
}

impl VaultKey {
    pub(crate) fn new(bytes: [u8; VAULT_KEY_LEN]) -> Self {
        Self {
            inner: SecretBox::new(Box::new(bytes)),
        }
    }

    /// Expose the key bytes (use with caution)
    pub fn expose(&self) -> &[u8; VAULT_KEY_LEN] {
        self.inner.expose_secret()
    }

    /// Random key, not password bound
    #[cfg(test)]
    pub(crate) fn generate() -> VaultResult<Self> {
        let mut bytes = [0u8; VAULT_KEY_LEN];
        fill_random(&mut bytes)?;
        Ok(Self::new(bytes))
    }
}

impl std::fmt::Debug for VaultKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("VaultKey([REDACTED])")
    }
}

/// Ephemeral per-document content key
pub struct ContentKey {
    inner: SecretBox<[u8; CONTENT_KEY_LEN]>,
}

impl ContentKey {
    /// Generate a fresh random content key
    pub fn generate() -> VaultResult<Self> {
        let mut bytes = [0u8; CONTENT_KEY_LEN];
        fill_random(&mut bytes)?;
        Ok(Self {
            inner: SecretBox::new(Box::new(bytes)),
        })
    }

    /// Rebuild a content key from unwrapped bytes
    pub fn from_slice(bytes: &[u8]) -> VaultResult<Self> {
        let arr: [u8; CONTENT_KEY_LEN] = bytes.try_into().map_err(|_| {
            VaultError::Integrity(format!(
                "content key must be {} bytes, got {}",
                CONTENT_KEY_LEN,
                bytes.len()
            ))
        })?;
        Ok(Self {
            inner: SecretBox::new(Box::new(arr)),
        })
    }

    pub fn expose(&self) -> &[u8; CONTENT_KEY_LEN] {
        self.inner.expose_secret()
    }
}

impl std::fmt::Debug for ContentKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("ContentKey([REDACTED])")
    }
}

/// Fill a buffer from the OS RNG
pub fn fill_random(buf: &mut [u8]) -> VaultResult<()> {
    OsRng
        .try_fill_bytes(buf)
        .map_err(|e| VaultError::CryptoBackend(format!("RNG failed: {}", e)))
}

/// Generate a random nonce for AES-GCM
pub fn generate_nonce() -> VaultResult<[u8; NONCE_LEN]> {
    let mut nonce = [0u8; NONCE_LEN];
    fill_random(&mut nonce)?;
    Ok(nonce)
}

/// Generate a random salt for password derivation
pub fn generate_salt() -> VaultResult<[u8; SALT_LEN]> {
    let mut salt = [0u8; SALT_LEN];
    fill_random(&mut salt)?;
    Ok(salt)
}

/// SHA-256 of arbitrary bytes
pub fn sha256(data: &[u8]) -> [u8; DIGEST_LEN] {
    Sha256::digest(data).into()
}

/// Constant-time comparison of two byte strings
pub fn digest_eq(a: &[u8], b: &[u8]) -> bool {
    a.ct_eq(b).into()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_nonces_are_fresh() {
        let n1 = generate_nonce().unwrap();
        let n2 = generate_nonce().unwrap();
        assert_ne!(n1, n2);
    }

    #[test]
    fn test_content_key_length_enforced() {
        assert!(ContentKey::from_slice(&[0u8; CONTENT_KEY_LEN]).is_ok());
        let err = ContentKey::from_slice(&[0u8; 32]).unwrap_err();
        assert!(matches!(err, VaultError::Integrity(_)));
    }

    #[test]
    fn test_sha256_known_vector() {
        assert_eq!(
            hex::encode(sha256(b"abc")),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }

    #[test]
    fn test_digest_eq() {
        assert!(digest_eq(b"same", b"same"));
        assert!(!digest_eq(b"same", b"diff"));
        assert!(!digest_eq(b"short", b"longer"));
    }

    #[test]
    fn test_debug_is_redacted() {
        let key = VaultKey::generate().unwrap();
        assert_eq!(format!("{:?}", key), "VaultKey([REDACTED])");

        let content = ContentKey::from_slice(&[0x42; CONTENT_KEY_LEN]).unwrap();
        let shown = format!("{:?}", content);
        assert_eq!(shown, "ContentKey([REDACTED])");
        assert!(!shown.contains("42"));
    }
}
