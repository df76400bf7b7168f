//! Advisory Vault - Cryptographic Core
//!
//! PBKDF2 vault keys, AES-GCM, and the blocking-pool bridge used by the
//! async variants of every heavy primitive.

pub mod aead;
pub mod kdf;
pub mod keys;

pub use aead::*;
pub use kdf::{derive_vault_key, Pbkdf2Params, PBKDF2_ITERATIONS};
pub use keys::*;

use crate::error::{VaultError, VaultResult};

/// Run a pure crypto primitive on the blocking pool.
///
/// The primitive receives all inputs by value and returns its output; if the
/// awaiting task is dropped the result is discarded and nothing is persisted.
pub async fn offload<T, F>(op: F) -> VaultResult<T>
where
    T: Send + 'static,
    F: FnOnce() -> VaultResult<T> + Send + 'static,
{
    tokio::task::spawn_blocking(op)
        .await
        .map_err(|e| VaultError::CryptoBackend(format!("crypto task failed: {}", e)))?
}
