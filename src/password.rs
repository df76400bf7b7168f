//! Advisory Vault - Password-Derived Vault Key
//!
//! `create_new` runs once per vault and yields the material to persist;
//! `verify` runs on every later session. The key itself is never persisted:
//! only its salt and a SHA-256 of the raw key bytes are.

use base64::{engine::general_purpose::STANDARD as B64, Engine};
use secrecy::SecretString;
use serde::{Deserialize, Serialize};

use crate::crypto::{
    derive_vault_key, digest_eq, generate_nonce, generate_salt, offload, sha256, Pbkdf2Params,
    VaultKey, DIGEST_LEN, NONCE_LEN, SALT_LEN,
};
use crate::error::{VaultError, VaultResult};

/// Persisted vault material. Never contains the key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VaultKeyMaterial {
    /// 16 random bytes, fixed for the lifetime of one vault
    pub salt: [u8; SALT_LEN],
    /// SHA-256 of the raw derived key
    pub verification_hash: [u8; DIGEST_LEN],
    /// Random iv reserved at creation; secrets carry their own ivs
    pub iv: [u8; NONCE_LEN],
}

/// `vault-metadata` wire shape
#[derive(Debug, Clone, Serialize, Deserialize)]
struct MaterialRecord {
    hash: String,
    salt: String,
    iv: String,
}

impl VaultKeyMaterial {
    /// Encode as the `vault-metadata` JSON value
    pub fn to_json(&self) -> VaultResult<String> {
        let record = MaterialRecord {
            hash: B64.encode(self.verification_hash),
            salt: B64.encode(self.salt),
            iv: B64.encode(self.iv),
        };
        Ok(serde_json::to_string(&record)?)
    }

    /// Decode the `vault-metadata` JSON value
    pub fn from_json(json: &str) -> VaultResult<Self> {
        let record: MaterialRecord = serde_json::from_str(json)?;
        Ok(Self {
            verification_hash: decode_fixed(&record.hash, "hash")?,
            salt: decode_fixed(&record.salt, "salt")?,
            iv: decode_fixed(&record.iv, "iv")?,
        })
    }
}

fn decode_fixed<const N: usize>(value: &str, field: &str) -> VaultResult<[u8; N]> {
    let bytes = B64.decode(value)?;
    bytes.as_slice().try_into().map_err(|_| {
        VaultError::Serialization(format!(
            "vault-metadata {} must be {} bytes, got {}",
            field,
            N,
            bytes.len()
        ))
    })
}

/// Derives and verifies password-bound vault keys
#[derive(Debug, Clone, Default)]
pub struct PasswordVaultKey {
    params: Pbkdf2Params,
}

impl PasswordVaultKey {
    pub fn new() -> Self {
        Self::default()
    }

    /// First password: fresh salt, derived key, verification hash, reserved iv
    pub fn create_new(&self, password: &SecretString) -> VaultResult<(VaultKey, VaultKeyMaterial)> {
        let salt = generate_salt()?;
        let key = derive_vault_key(password, &salt, &self.params)?;
        let verification_hash = sha256(key.expose());
        let iv = generate_nonce()?;

        tracing::debug!("created new vault key material");

        Ok((
            key,
            VaultKeyMaterial {
                salt,
                verification_hash,
                iv,
            },
        ))
    }

    /// Re-derive with the stored salt and compare against the stored hash
    pub fn verify(
        &self,
        password: &SecretString,
        material: &VaultKeyMaterial,
    ) -> VaultResult<VaultKey> {
        let key = derive_vault_key(password, &material.salt, &self.params)?;
        let candidate = sha256(key.expose());

        if digest_eq(&candidate, &material.verification_hash) {
            tracing::debug!("vault password verified");
            Ok(key)
        } else {
            tracing::warn!("vault password rejected");
            Err(VaultError::WrongPassword)
        }
    }

    pub async fn create_new_async(
        &self,
        password: SecretString,
    ) -> VaultResult<(VaultKey, VaultKeyMaterial)> {
        let this = self.clone();
        offload(move || this.create_new(&password)).await
    }

    pub async fn verify_async(
        &self,
        password: SecretString,
        material: VaultKeyMaterial,
    ) -> VaultResult<VaultKey> {
        let this = self.clone();
        offload(move || this.verify(&password, &material)).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::{decrypt_with_vault_key, encrypt_with_vault_key_iv};

    fn password(s: &str) -> SecretString {
        SecretString::from(s.to_string())
    }

    #[test]
    fn test_create_then_verify() {
        let pvk = PasswordVaultKey::new();
        let (key, material) = pvk.create_new(&password("correct-horse")).unwrap();

        let verified = pvk.verify(&password("correct-horse"), &material).unwrap();
        assert_eq!(key.expose(), verified.expose());
    }

    #[test]
    fn test_wrong_password_rejected() {
        let pvk = PasswordVaultKey::new();
        let (_, material) = pvk.create_new(&password("correct-horse")).unwrap();

        let result = pvk.verify(&password("battery-staple"), &material);
        assert!(matches!(result, Err(VaultError::WrongPassword)));
    }

    #[test]
    fn test_reencryption_matches_with_verified_key() {
        let pvk = PasswordVaultKey::new();
        let (created, material) = pvk.create_new(&password("correct-horse")).unwrap();
        let verified = pvk.verify(&password("correct-horse"), &material).unwrap();

        let iv = [7u8; NONCE_LEN];
        let a = encrypt_with_vault_key_iv(&created, &iv, b"same plaintext").unwrap();
        let b = encrypt_with_vault_key_iv(&verified, &iv, b"same plaintext").unwrap();
        assert_eq!(a.ciphertext, b.ciphertext);

        let plain = decrypt_with_vault_key(&verified, &a).unwrap();
        assert_eq!(plain.as_slice(), b"same plaintext");
    }

    #[test]
    fn test_salt_is_fresh_per_vault() {
        let pvk = PasswordVaultKey::new();
        let (k1, m1) = pvk.create_new(&password("pw")).unwrap();
        let (k2, m2) = pvk.create_new(&password("pw")).unwrap();

        assert_ne!(m1.salt, m2.salt);
        assert_ne!(k1.expose(), k2.expose());
    }

    #[test]
    fn test_material_json_roundtrip() {
        let pvk = PasswordVaultKey::new();
        let (_, material) = pvk.create_new(&password("pw")).unwrap();

        let json = material.to_json().unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert!(value.get("hash").is_some());
        assert!(value.get("salt").is_some());
        assert!(value.get("iv").is_some());

        assert_eq!(VaultKeyMaterial::from_json(&json).unwrap(), material);
    }

    #[test]
    fn test_material_with_short_salt_rejected() {
        let json = r#"{"hash":"AAAA","salt":"AAAA","iv":"AAAA"}"#;
        assert!(VaultKeyMaterial::from_json(json).is_err());
    }

    #[tokio::test]
    async fn test_async_variants() {
        let pvk = PasswordVaultKey::new();
        let (key, material) = pvk.create_new_async(password("async-pw")).await.unwrap();
        let verified = pvk
            .verify_async(password("async-pw"), material.clone())
            .await
            .unwrap();
        assert_eq!(key.expose(), verified.expose());

        let rejected = pvk.verify_async(password("nope"), material).await;
        assert!(matches!(rejected, Err(VaultError::WrongPassword)));
    }
}
