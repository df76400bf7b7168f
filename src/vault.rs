//! Advisory Vault - Credential Vault Lifecycle
//!
//! ```text
//! Vault::state()
//!   ├─ no vault-metadata ─► AwaitingFirstPassword ─ initialize() ─┐
//!   └─ vault-metadata ────► AwaitingVerification ── unlock() ─────┴─► VaultSession
//!                                                   └─ WrongPassword
//! ```
//!
//! A `VaultSession` is the Ready state. It owns the vault key; dropping the
//! session drops (and zeroizes) the key.

use std::sync::Arc;

use base64::{engine::general_purpose::STANDARD as B64, Engine};
use chrono::{DateTime, Utc};
use secrecy::SecretString;
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use zeroize::{Zeroize, ZeroizeOnDrop};

use crate::crypto::VaultKey;
use crate::error::{VaultError, VaultResult};
use crate::keypair::{KeyPair, KeyPairManager};
use crate::password::{PasswordVaultKey, VaultKeyMaterial};
use crate::secret_store::SecretStore;
use crate::store::KeyValueStore;

pub const VAULT_METADATA_KEY: &str = "vault-metadata";
pub const ACCOUNTS_KEY: &str = "accounts-blob";
pub const CONTRACTS_KEY: &str = "contracts-blob";

/// Locked vault states
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VaultState {
    AwaitingFirstPassword,
    AwaitingVerification,
}

// ═══════════════════════════════════════════════════════════════════════════
// STORED COLLECTIONS
// ═══════════════════════════════════════════════════════════════════════════

/// Ledger account credential
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize, Zeroize, ZeroizeOnDrop)]
#[serde(rename_all = "camelCase")]
pub struct Account {
    pub label: String,
    pub address: String,
    pub private_key: String,
}

impl std::fmt::Debug for Account {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Account")
            .field("label", &self.label)
            .field("address", &self.address)
            .field("private_key", &"[REDACTED]")
            .finish()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Visibility {
    Public,
    Confidential,
}

/// Key pair as persisted inside the contracts blob: base64 SPKI / PKCS#8 DER
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoredKeyPair {
    pub public_key: String,
    pub private_key: String,
}

impl StoredKeyPair {
    pub fn from_key_pair(pair: &KeyPair) -> VaultResult<Self> {
        let public_der = KeyPairManager::export_public_key(&pair.public_key)?;
        let private_der = KeyPairManager::export_private_key(&pair.private_key)?;
        Ok(Self {
            public_key: B64.encode(public_der),
            private_key: B64.encode(private_der.as_slice()),
        })
    }

    pub fn to_key_pair(&self) -> VaultResult<KeyPair> {
        let public_der = B64.decode(&self.public_key)?;
        let private_der = zeroize::Zeroizing::new(B64.decode(&self.private_key)?);
        Ok(KeyPair {
            public_key: KeyPairManager::import_public_key(&public_der)?,
            private_key: KeyPairManager::import_private_key(&private_der)?,
        })
    }
}

impl std::fmt::Debug for StoredKeyPair {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StoredKeyPair")
            .field("public_key", &self.public_key)
            .field("private_key", &"[REDACTED]")
            .finish()
    }
}

impl Drop for StoredKeyPair {
    fn drop(&mut self) {
        self.private_key.zeroize();
    }
}

/// Advisory contract the user follows or owns
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContractEntry {
    pub address: String,
    pub name: String,
    pub visibility: Visibility,
    /// Present for confidential contracts
    pub key_pair: Option<StoredKeyPair>,
    pub added_at: DateTime<Utc>,
}

impl ContractEntry {
    pub fn public(address: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            address: address.into(),
            name: name.into(),
            visibility: Visibility::Public,
            key_pair: None,
            added_at: Utc::now(),
        }
    }

    pub fn confidential(
        address: impl Into<String>,
        name: impl Into<String>,
        pair: &KeyPair,
    ) -> VaultResult<Self> {
        Ok(Self {
            address: address.into(),
            name: name.into(),
            visibility: Visibility::Confidential,
            key_pair: Some(StoredKeyPair::from_key_pair(pair)?),
            added_at: Utc::now(),
        })
    }

    pub fn is_confidential(&self) -> bool {
        self.visibility == Visibility::Confidential
    }
}

/// Address identity: trimmed, ASCII case-insensitive
pub fn same_address(a: &str, b: &str) -> bool {
    a.trim().eq_ignore_ascii_case(b.trim())
}

/// Insert or replace by address. Returns true if an entry was replaced.
fn upsert_by_address<T>(items: &mut Vec<T>, item: T, address: impl Fn(&T) -> &str) -> bool {
    match items
        .iter()
        .position(|existing| same_address(address(existing), address(&item)))
    {
        Some(i) => {
            items[i] = item;
            true
        }
        None => {
            items.push(item);
            false
        }
    }
}

// ═══════════════════════════════════════════════════════════════════════════
// VAULT (LOCKED)
// ═══════════════════════════════════════════════════════════════════════════

/// Entry point over a key-value store
pub struct Vault<S: KeyValueStore> {
    store: Arc<S>,
    password_key: PasswordVaultKey,
}

impl<S: KeyValueStore> Vault<S> {
    pub fn new(store: S) -> Self {
        Self::from_shared(Arc::new(store))
    }

    pub fn from_shared(store: Arc<S>) -> Self {
        Self {
            store,
            password_key: PasswordVaultKey::new(),
        }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn state(&self) -> VaultResult<VaultState> {
        Ok(match self.load_material()? {
            Some(_) => VaultState::AwaitingVerification,
            None => VaultState::AwaitingFirstPassword,
        })
    }

    fn load_material(&self) -> VaultResult<Option<VaultKeyMaterial>> {
        self.store
            .get(VAULT_METADATA_KEY)?
            .map(|json| VaultKeyMaterial::from_json(&json))
            .transpose()
    }

    fn require_uninitialized(&self) -> VaultResult<()> {
        match self.load_material()? {
            Some(_) => Err(VaultError::VaultAlreadyInitialized),
            None => Ok(()),
        }
    }

    fn require_material(&self) -> VaultResult<VaultKeyMaterial> {
        self.load_material()?.ok_or(VaultError::VaultNotInitialized)
    }

    fn open_session(&self, key: VaultKey) -> VaultSession<S> {
        VaultSession {
            store: Arc::clone(&self.store),
            key,
            password_key: self.password_key.clone(),
        }
    }

    /// Set the first password and persist the vault material
    pub fn initialize(&self, password: &SecretString) -> VaultResult<VaultSession<S>> {
        self.require_uninitialized()?;
        let (key, material) = self.password_key.create_new(password)?;
        self.store.set(VAULT_METADATA_KEY, &material.to_json()?)?;
        tracing::info!("vault initialized");
        Ok(self.open_session(key))
    }

    /// Verify the password against the stored material
    pub fn unlock(&self, password: &SecretString) -> VaultResult<VaultSession<S>> {
        let material = self.require_material()?;
        let key = self.password_key.verify(password, &material)?;
        tracing::info!("vault unlocked");
        Ok(self.open_session(key))
    }

    pub async fn initialize_async(&self, password: SecretString) -> VaultResult<VaultSession<S>> {
        self.require_uninitialized()?;
        let (key, material) = self.password_key.create_new_async(password).await?;
        self.store.set(VAULT_METADATA_KEY, &material.to_json()?)?;
        tracing::info!("vault initialized");
        Ok(self.open_session(key))
    }

    pub async fn unlock_async(&self, password: SecretString) -> VaultResult<VaultSession<S>> {
        let material = self.require_material()?;
        let key = self.password_key.verify_async(password, material).await?;
        tracing::info!("vault unlocked");
        Ok(self.open_session(key))
    }
}

// ═══════════════════════════════════════════════════════════════════════════
// SESSION (READY)
// ═══════════════════════════════════════════════════════════════════════════

/// Unlocked vault
pub struct VaultSession<S: KeyValueStore> {
    store: Arc<S>,
    key: VaultKey,
    password_key: PasswordVaultKey,
}

impl<S: KeyValueStore> std::fmt::Debug for VaultSession<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VaultSession").field("key", &self.key).finish()
    }
}

impl<S: KeyValueStore> VaultSession<S> {
    fn load_collection<T: DeserializeOwned>(&self, name: &str) -> VaultResult<Vec<T>> {
        match self.store.get(name)? {
            Some(value) => SecretStore::load(&self.key, &SecretStore::decode_blob(&value)?),
            None => Ok(Vec::new()),
        }
    }

    fn store_collection<T: Serialize>(&self, name: &str, items: &[T]) -> VaultResult<()> {
        let blob = SecretStore::save(&self.key, items)?;
        self.store.set(name, &SecretStore::encode_blob(&blob))
    }

    // Accounts

    pub fn accounts(&self) -> VaultResult<Vec<Account>> {
        self.load_collection(ACCOUNTS_KEY)
    }

    pub fn save_accounts(&self, accounts: &[Account]) -> VaultResult<()> {
        self.store_collection(ACCOUNTS_KEY, accounts)
    }

    /// Add, or replace the account with the same address
    pub fn add_account(&self, account: Account) -> VaultResult<()> {
        let mut accounts = self.accounts()?;
        if upsert_by_address(&mut accounts, account, |a| a.address.as_str()) {
            tracing::debug!("replaced existing account");
        }
        self.save_accounts(&accounts)
    }

    // Contracts

    pub fn contracts(&self) -> VaultResult<Vec<ContractEntry>> {
        self.load_collection(CONTRACTS_KEY)
    }

    pub fn save_contracts(&self, contracts: &[ContractEntry]) -> VaultResult<()> {
        self.store_collection(CONTRACTS_KEY, contracts)
    }

    /// Add, or replace the contract with the same address
    pub fn add_contract(&self, contract: ContractEntry) -> VaultResult<()> {
        let mut contracts = self.contracts()?;
        if upsert_by_address(&mut contracts, contract, |c| c.address.as_str()) {
            tracing::debug!("replaced existing contract");
        }
        self.save_contracts(&contracts)
    }

    pub fn find_contract(&self, address: &str) -> VaultResult<Option<ContractEntry>> {
        Ok(self
            .contracts()?
            .into_iter()
            .find(|c| same_address(&c.address, address)))
    }

    /// Returns false if no contract had that address
    pub fn remove_contract(&self, address: &str) -> VaultResult<bool> {
        let mut contracts = self.contracts()?;
        let before = contracts.len();
        contracts.retain(|c| !same_address(&c.address, address));
        if contracts.len() == before {
            return Ok(false);
        }
        self.save_contracts(&contracts)?;
        Ok(true)
    }

    /// New salt, new key, every blob re-encrypted under fresh ivs.
    /// Nothing is written until all blobs are sealed under the new key, and
    /// a failed write restores the old entries so the old password still works.
    pub fn change_password(&mut self, new_password: &SecretString) -> VaultResult<()> {
        let accounts = self.accounts()?;
        let contracts = self.contracts()?;

        let (new_key, material) = self.password_key.create_new(new_password)?;
        let accounts_blob = SecretStore::save(&new_key, &accounts)?;
        let contracts_blob = SecretStore::save(&new_key, &contracts)?;
        let metadata = material.to_json()?;

        self.write_all_or_restore(&[
            (ACCOUNTS_KEY, SecretStore::encode_blob(&accounts_blob)),
            (CONTRACTS_KEY, SecretStore::encode_blob(&contracts_blob)),
            (VAULT_METADATA_KEY, metadata),
        ])?;

        self.key = new_key;
        tracing::info!("vault password changed");
        Ok(())
    }

    /// Write every entry, or put the previous values back on the first failure
    fn write_all_or_restore(&self, writes: &[(&str, String)]) -> VaultResult<()> {
        let mut previous = Vec::with_capacity(writes.len());
        for (name, _) in writes {
            previous.push((*name, self.store.get(name)?));
        }

        for (done, (name, value)) in writes.iter().enumerate() {
            if let Err(e) = self.store.set(name, value) {
                tracing::warn!(key = *name, error = %e, "write failed, restoring entries");
                for (name, old) in previous.iter().take(done + 1) {
                    let restored = match old {
                        Some(old) => self.store.set(name, old),
                        None => self.store.remove(name),
                    };
                    if let Err(re) = restored {
                        tracing::error!(key = *name, error = %re, "restore failed");
                    }
                }
                return Err(e);
            }
        }
        Ok(())
    }

    /// End the session
    pub fn lock(self) {
        tracing::debug!("vault locked");
    }
}
