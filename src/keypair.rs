//! Advisory Vault - Recipient Key Pairs
//!
//! RSA-OAEP (SHA-256) key pairs used to wrap per-document content keys.
//! Public keys travel as SubjectPublicKeyInfo DER, private keys as PKCS#8 DER;
//! PEM armouring of both is offered for files on disk.

use rsa::pkcs8::{DecodePrivateKey, DecodePublicKey, EncodePrivateKey, EncodePublicKey, LineEnding};
use rsa::traits::PublicKeyParts;
use rsa::{BigUint, RsaPrivateKey, RsaPublicKey};
use zeroize::Zeroizing;

use crate::crypto::offload;
use crate::error::{VaultError, VaultResult};

/// Modulus size in bits
pub const RSA_MODULUS_BITS: usize = 3072;

/// Fixed public exponent
pub const RSA_PUBLIC_EXPONENT: u32 = 65537;

/// Asymmetric key pair for one recipient identity
#[derive(Clone)]
pub struct KeyPair {
    pub public_key: RsaPublicKey,
    pub private_key: RsaPrivateKey,
}

impl std::fmt::Debug for KeyPair {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KeyPair")
            .field("modulus_bits", &self.public_key.n().bits())
            .field("private_key", &"[REDACTED]")
            .finish()
    }
}

/// Stateless key pair operations
pub struct KeyPairManager;

impl KeyPairManager {
    /// Generate a 3072-bit RSA key pair with e = 65537
    pub fn generate_key_pair() -> VaultResult<KeyPair> {
        let mut rng = rand::rngs::OsRng;
        let exponent = BigUint::from(RSA_PUBLIC_EXPONENT);

        let private_key = RsaPrivateKey::new_with_exp(&mut rng, RSA_MODULUS_BITS, &exponent)
            .map_err(|e| VaultError::CryptoBackend(format!("RSA key generation failed: {}", e)))?;
        let public_key = RsaPublicKey::from(&private_key);

        tracing::debug!(bits = RSA_MODULUS_BITS, "generated recipient key pair");

        Ok(KeyPair {
            public_key,
            private_key,
        })
    }

    /// Generate on the blocking pool
    pub async fn generate_key_pair_async() -> VaultResult<KeyPair> {
        offload(Self::generate_key_pair).await
    }

    /// SubjectPublicKeyInfo DER
    pub fn export_public_key(key: &RsaPublicKey) -> VaultResult<Vec<u8>> {
        key.to_public_key_der()
            .map(|doc| doc.as_bytes().to_vec())
            .map_err(|e| VaultError::CryptoBackend(format!("public key export failed: {}", e)))
    }

    /// PKCS#8 PrivateKeyInfo DER
    pub fn export_private_key(key: &RsaPrivateKey) -> VaultResult<Zeroizing<Vec<u8>>> {
        key.to_pkcs8_der()
            .map(|doc| Zeroizing::new(doc.as_bytes().to_vec()))
            .map_err(|e| VaultError::CryptoBackend(format!("private key export failed: {}", e)))
    }

    pub fn export_public_key_pem(key: &RsaPublicKey) -> VaultResult<String> {
        key.to_public_key_pem(LineEnding::LF)
            .map_err(|e| VaultError::CryptoBackend(format!("public key export failed: {}", e)))
    }

    pub fn export_private_key_pem(key: &RsaPrivateKey) -> VaultResult<Zeroizing<String>> {
        key.to_pkcs8_pem(LineEnding::LF)
            .map(|pem| Zeroizing::new(pem.to_string()))
            .map_err(|e| VaultError::CryptoBackend(format!("private key export failed: {}", e)))
    }

    /// Inverse of [`export_public_key`](Self::export_public_key)
    pub fn import_public_key(der: &[u8]) -> VaultResult<RsaPublicKey> {
        let key = RsaPublicKey::from_public_key_der(der)
            .map_err(|e| VaultError::MalformedKey(format!("not an RSA SPKI key: {}", e)))?;
        check_parameters(&key)?;
        Ok(key)
    }

    /// Inverse of [`export_private_key`](Self::export_private_key)
    pub fn import_private_key(der: &[u8]) -> VaultResult<RsaPrivateKey> {
        let key = RsaPrivateKey::from_pkcs8_der(der)
            .map_err(|e| VaultError::MalformedKey(format!("not an RSA PKCS#8 key: {}", e)))?;
        check_parameters(&RsaPublicKey::from(&key))?;
        Ok(key)
    }

    pub fn import_public_key_pem(pem: &str) -> VaultResult<RsaPublicKey> {
        let key = RsaPublicKey::from_public_key_pem(pem)
            .map_err(|e| VaultError::MalformedKey(format!("not an RSA SPKI key: {}", e)))?;
        check_parameters(&key)?;
        Ok(key)
    }

    pub fn import_private_key_pem(pem: &str) -> VaultResult<RsaPrivateKey> {
        let key = RsaPrivateKey::from_pkcs8_pem(pem)
            .map_err(|e| VaultError::MalformedKey(format!("not an RSA PKCS#8 key: {}", e)))?;
        check_parameters(&RsaPublicKey::from(&key))?;
        Ok(key)
    }
}

fn check_parameters(key: &RsaPublicKey) -> VaultResult<()> {
    let bits = key.n().bits();
    if bits != RSA_MODULUS_BITS {
        return Err(VaultError::MalformedKey(format!(
            "expected {}-bit modulus, got {}",
            RSA_MODULUS_BITS, bits
        )));
    }
    if *key.e() != BigUint::from(RSA_PUBLIC_EXPONENT) {
        return Err(VaultError::MalformedKey(
            "unexpected public exponent".into(),
        ));
    }
    Ok(())
}

/// Shared RSA-3072 fixture; generation is too slow to repeat per test.
#[cfg(test)]
pub(crate) fn test_key_pair() -> &'static KeyPair {
    static PAIR: std::sync::OnceLock<KeyPair> = std::sync::OnceLock::new();
    PAIR.get_or_init(|| KeyPairManager::generate_key_pair().unwrap())
}
