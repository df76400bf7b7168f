//! Advisory Vault - Error Types

use thiserror::Error;

/// Result type for vault operations
pub type VaultResult<T> = Result<T, VaultError>;

/// Vault error types
#[derive(Error, Debug)]
pub enum VaultError {
    // ═══════════════════════════════════════════════════════════════
    // CRYPTO ERRORS
    // ═══════════════════════════════════════════════════════════════

    #[error("Key derivation failed: {0}")]
    KeyDerivation(String),

    #[error("Wrong password")]
    WrongPassword,

    #[error("Integrity check failed: {0}")]
    Integrity(String),

    #[error("Malformed key: {0}")]
    MalformedKey(String),

    #[error("Crypto backend error: {0}")]
    CryptoBackend(String),

    // ═══════════════════════════════════════════════════════════════
    // DOCUMENT ERRORS
    // ═══════════════════════════════════════════════════════════════

    #[error("Malformed document at {context}: {reason}")]
    MalformedDocument { context: String, reason: String },

    // ═══════════════════════════════════════════════════════════════
    // VAULT ERRORS
    // ═══════════════════════════════════════════════════════════════

    #[error("Vault is not initialized - set a password first")]
    VaultNotInitialized,

    #[error("Vault is already initialized")]
    VaultAlreadyInitialized,

    #[error("Not found: {0}")]
    NotFound(String),

    // ═══════════════════════════════════════════════════════════════
    // STORAGE / IO ERRORS
    // ═══════════════════════════════════════════════════════════════

    #[error("Store error: {0}")]
    Store(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid base64: {0}")]
    Base64(#[from] base64::DecodeError),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Configuration error: {0}")]
    Config(String),
}

impl VaultError {
    /// Shorthand for a document error at a given node
    pub fn malformed(context: impl Into<String>, reason: impl Into<String>) -> Self {
        VaultError::MalformedDocument {
            context: context.into(),
            reason: reason.into(),
        }
    }

    /// Check if this is a security-critical error
    pub fn is_security_critical(&self) -> bool {
        matches!(
            self,
            VaultError::Integrity(_) | VaultError::WrongPassword | VaultError::MalformedKey(_)
        )
    }

    /// Check if the caller may retry (re-prompt, re-fetch, re-key)
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            VaultError::WrongPassword
                | VaultError::Integrity(_)
                | VaultError::Store(_)
                | VaultError::NotFound(_)
        )
    }
}

impl From<serde_json::Error> for VaultError {
    fn from(e: serde_json::Error) -> Self {
        VaultError::Serialization(e.to_string())
    }
}
