//! PBKDF2-SHA256 derivation of the vault key from a password

use secrecy::{ExposeSecret, SecretString};
use sha2::Sha256;

use super::keys::{VaultKey, SALT_LEN, VAULT_KEY_LEN};
use crate::error::{VaultError, VaultResult};

/// Iteration count used for every vault
pub const PBKDF2_ITERATIONS: u32 = 100_000;

/// PBKDF2 parameters
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Pbkdf2Params {
    /// Iterations (work factor)
    pub iterations: u32,
    /// Output length in bytes
    pub output_len: usize,
}

impl Default for Pbkdf2Params {
    fn default() -> Self {
        Self {
            iterations: PBKDF2_ITERATIONS,
            output_len: VAULT_KEY_LEN,
        }
    }
}

impl Pbkdf2Params {
    pub fn validate(&self) -> VaultResult<()> {
        if self.iterations == 0 {
            return Err(VaultError::KeyDerivation(
                "iteration count must be > 0".into(),
            ));
        }
        if self.output_len != VAULT_KEY_LEN {
            return Err(VaultError::KeyDerivation(format!(
                "output length must be {} bytes",
                VAULT_KEY_LEN
            )));
        }
        Ok(())
    }
}

/// Derive the vault key from a password and salt
pub fn derive_vault_key(
    password: &SecretString,
    salt: &[u8],
    params: &Pbkdf2Params,
) -> VaultResult<VaultKey> {
    params.validate()?;
    if salt.len() != SALT_LEN {
        return Err(VaultError::KeyDerivation(format!(
            "salt must be {} bytes, got {}",
            SALT_LEN,
            salt.len()
        )));
    }

    let mut output = [0u8; VAULT_KEY_LEN];
    pbkdf2::pbkdf2_hmac::<Sha256>(
        password.expose_secret().as_bytes(),
        salt,
        params.iterations,
        &mut output,
    );

    let key = VaultKey::new(output);
    zeroize::Zeroize::zeroize(&mut output);
    Ok(key)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn password(s: &str) -> SecretString {
        SecretString::from(s.to_string())
    }

    #[test]
    fn test_derive_deterministic() {
        let salt = [1u8; SALT_LEN];
        let params = Pbkdf2Params::default();

        let k1 = derive_vault_key(&password("test_password"), &salt, &params).unwrap();
        let k2 = derive_vault_key(&password("test_password"), &salt, &params).unwrap();

        assert_eq!(k1.expose(), k2.expose());
    }

    #[test]
    fn test_salt_changes_key() {
        let params = Pbkdf2Params::default();
        let k1 = derive_vault_key(&password("pw"), &[1u8; SALT_LEN], &params).unwrap();
        let k2 = derive_vault_key(&password("pw"), &[2u8; SALT_LEN], &params).unwrap();

        assert_ne!(k1.expose(), k2.expose());
    }

    fn hmac_sha256(key: &[u8], message: &[u8]) -> [u8; 32] {
        use sha2::Digest;

        let mut block = [0u8; 64];
        block[..key.len()].copy_from_slice(key);
        let mut inner = Sha256::new();
        inner.update(block.map(|b| b ^ 0x36));
        inner.update(message);
        let mut outer = Sha256::new();
        outer.update(block.map(|b| b ^ 0x5c));
        outer.update(inner.finalize());
        outer.finalize().into()
    }

    #[test]
    fn test_derive_matches_pbkdf2_definition() {
        // one output block: T1 = U1 ^ U2, U1 = HMAC(P, S || 1), U2 = HMAC(P, U1)
        let salt = *b"0123456789abcdef";
        let params = Pbkdf2Params {
            iterations: 2,
            output_len: VAULT_KEY_LEN,
        };
        let key = derive_vault_key(&password("passwd"), &salt, &params).unwrap();

        let mut first = salt.to_vec();
        first.extend_from_slice(&1u32.to_be_bytes());
        let u1 = hmac_sha256(b"passwd", &first);
        let u2 = hmac_sha256(b"passwd", &u1);
        let mut expected = [0u8; VAULT_KEY_LEN];
        for (i, byte) in expected.iter_mut().enumerate() {
            *byte = u1[i] ^ u2[i];
        }
        assert_eq!(key.expose(), &expected);

        let once = derive_vault_key(
            &password("passwd"),
            &salt,
            &Pbkdf2Params {
                iterations: 1,
                ..Default::default()
            },
        )
        .unwrap();
        assert_eq!(once.expose(), &u1);
    }

    #[test]
    fn test_bad_params_rejected() {
        let params = Pbkdf2Params {
            iterations: 0,
            ..Default::default()
        };
        let err = derive_vault_key(&password("pw"), &[0u8; SALT_LEN], &params).unwrap_err();
        assert!(matches!(err, VaultError::KeyDerivation(_)));

        let err = derive_vault_key(&password("pw"), &[0u8; 4], &Pbkdf2Params::default())
            .unwrap_err();
        assert!(matches!(err, VaultError::KeyDerivation(_)));
    }
}
