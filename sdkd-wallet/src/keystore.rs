//! Secure credential store seam
//!
//! The platform keychain is an external collaborator. [`MemoryKeyStore`] keeps
//! entries in process memory and is meant for tests and short-lived tools.

use crate::WalletResult;
use async_trait::async_trait;
use secrecy::SecretString;
use std::collections::HashMap;
use tokio::sync::RwLock;

/// Store slot holding the private key for an e-mail address
pub fn keystore_key(email: &str) -> String {
    format!("sdkd_private_key_for_{email}")
}

/// One stored entry
#[derive(Debug, Clone)]
pub struct StoredCredentials {
    /// Wallet address the secret belongs to
    pub username: String,
    /// Hex encoded private key
    pub secret: SecretString,
}

/// Persistent secret storage
#[async_trait]
pub trait KeyStore: Send + Sync + std::fmt::Debug {
    /// Create or overwrite an entry
    async fn set(&self, key: &str, username: &str, secret: &SecretString) -> WalletResult<()>;

    /// Read an entry
    async fn get(&self, key: &str) -> WalletResult<Option<StoredCredentials>>;

    /// Remove an entry; removing a missing entry is not an error
    async fn clear(&self, key: &str) -> WalletResult<()>;
}

/// In-memory key store
#[derive(Debug, Default)]
pub struct MemoryKeyStore {
    entries: RwLock<HashMap<String, StoredCredentials>>,
}

impl MemoryKeyStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored entries
    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }
}

#[async_trait]
impl KeyStore for MemoryKeyStore {
    async fn set(&self, key: &str, username: &str, secret: &SecretString) -> WalletResult<()> {
        let mut entries = self.entries.write().await;
        entries.insert(
            key.to_string(),
            StoredCredentials {
                username: username.to_string(),
                secret: secret.clone(),
            },
        );
        Ok(())
    }

    async fn get(&self, key: &str) -> WalletResult<Option<StoredCredentials>> {
        Ok(self.entries.read().await.get(key).cloned())
    }

    async fn clear(&self, key: &str) -> WalletResult<()> {
        self.entries.write().await.remove(key);
        Ok(())
    }
}
