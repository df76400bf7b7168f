//! # Advisory Vault
//!
//! Confidential delivery of security advisories, plus a password-protected
//! local credential vault.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                        ADVISORY VAULT                        │
//! │  ┌───────────────┐   ┌───────────────┐   ┌────────────────┐  │
//! │  │ PASSWORD KEY  │   │ HYBRID CIPHER │   │ ADVISORY DOC   │  │
//! │  │ PBKDF2-SHA256 │   │ AES-128-GCM + │   │ CSAF parser +  │  │
//! │  │ 100k rounds   │   │ RSA-OAEP-3072 │   │ status queries │  │
//! │  └───────┬───────┘   └───────┬───────┘   └───────▲────────┘  │
//! │          │                   │                   │           │
//! │  ┌───────┴───────┐   ┌───────┴───────────────────┴────────┐  │
//! │  │ SECRET STORE  │   │             DELIVERY               │  │
//! │  │ AES-256-GCM   │   │  seal → put → publish / get → open │  │
//! │  └───────┬───────┘   └───────┬────────────────────────────┘  │
//! │          │                   │                               │
//! │  ┌───────┴───────────────────┴────────────────────────────┐  │
//! │  │ STORE: key-value · blobs · key directory · ledger sink │  │
//! │  └────────────────────────────────────────────────────────┘  │
//! └──────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Security Model
//!
//! - Vault key derived from the password, never persisted
//! - Fresh random iv for every encryption
//! - One content key per confidential document, wrapped for one recipient
//! - Plaintext released only when the GCM tag and the published SHA-256 agree
//! - Key material zeroized on drop

pub mod advisory;
pub mod config;
pub mod crypto;
pub mod delivery;
pub mod error;
pub mod hybrid;
pub mod keypair;
pub mod logging;
pub mod password;
pub mod secret_store;
pub mod store;
pub mod vault;

pub use advisory::{AdvisoryDocument, ProductInformation, StatusKind};
pub use config::{AppConfig, LogConfig};
pub use crypto::{EncryptedBlob, VaultKey};
pub use delivery::{AdvisoryReader, ConfidentialPublisher, PublicAdvisory};
pub use error::{VaultError, VaultResult};
pub use hybrid::{HybridCipher, PublicationRecord, SealedDocument, SealedEnvelope};
pub use keypair::{KeyPair, KeyPairManager};
pub use password::{PasswordVaultKey, VaultKeyMaterial};
pub use secret_store::SecretStore;
pub use vault::{Account, ContractEntry, Vault, VaultSession, VaultState, Visibility};

/// Advisory Vault version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
