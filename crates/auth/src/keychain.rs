//! Refresh-credential persistence in the platform keychain.
//!
//! Backed by the OS credential store (macOS Keychain, Windows Credential
//! Manager, Linux Secret Service). Exactly one entry exists: the current
//! refresh token. Access tokens are deliberately never written here.

use async_trait::async_trait;
use keyring::Entry;
use tracing::debug;

use crate::error::CredentialError;
use crate::traits::CredentialStore;

const SERVICE_NAME: &str = "maildeck";
const ACCOUNT_NAME: &str = "refresh_token";

/// [`CredentialStore`] over the platform keychain.
#[derive(Debug, Clone)]
pub struct KeychainCredentialStore {
    service: String,
    account: String,
}

impl Default for KeychainCredentialStore {
    fn default() -> Self {
        Self::new()
    }
}

impl KeychainCredentialStore {
    /// Store under the default Maildeck service name.
    #[must_use]
    pub fn new() -> Self {
        Self { service: SERVICE_NAME.to_string(), account: ACCOUNT_NAME.to_string() }
    }

    /// Store under a custom service/account pair (used by tests to avoid
    /// clobbering real credentials).
    #[must_use]
    pub fn with_names(service: impl Into<String>, account: impl Into<String>) -> Self {
        Self { service: service.into(), account: account.into() }
    }

    fn entry(&self) -> Result<Entry, CredentialError> {
        Entry::new(&self.service, &self.account)
            .map_err(|e| CredentialError::Storage(e.to_string()))
    }
}

#[async_trait]
impl CredentialStore for KeychainCredentialStore {
    async fn load(&self) -> Result<Option<String>, CredentialError> {
        match self.entry()?.get_password() {
            Ok(token) => Ok(Some(token)),
            Err(keyring::Error::NoEntry) => Ok(None),
            Err(e) => Err(CredentialError::Storage(e.to_string())),
        }
    }

    async fn store(&self, refresh_token: &str) -> Result<(), CredentialError> {
        self.entry()?
            .set_password(refresh_token)
            .map_err(|e| CredentialError::Storage(e.to_string()))?;
        debug!("stored refresh credential in keychain");
        Ok(())
    }

    async fn clear(&self) -> Result<(), CredentialError> {
        match self.entry()?.delete_credential() {
            Ok(()) | Err(keyring::Error::NoEntry) => {
                debug!("cleared refresh credential from keychain");
                Ok(())
            }
            Err(e) => Err(CredentialError::Storage(e.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    //! Keychain tests touch the real platform store, so they are ignored
    //! by default. Run with `--ignored` on a machine with a keychain.
    use super::*;

    fn test_store() -> KeychainCredentialStore {
        KeychainCredentialStore::with_names("maildeck-test", "refresh_token_test")
    }

    #[tokio::test]
    #[ignore = "interacts with real keychain"]
    async fn roundtrip_store_load_clear() {
        let store = test_store();

        store.store("test-refresh-token").await.unwrap();
        assert_eq!(store.load().await.unwrap().as_deref(), Some("test-refresh-token"));

        // Storing again replaces the previous value.
        store.store("rotated-token").await.unwrap();
        assert_eq!(store.load().await.unwrap().as_deref(), Some("rotated-token"));

        store.clear().await.unwrap();
        assert!(store.load().await.unwrap().is_none());
    }

    #[tokio::test]
    #[ignore = "interacts with real keychain"]
    async fn clear_is_idempotent() {
        let store = test_store();
        store.clear().await.unwrap();
        store.clear().await.unwrap();
    }
}
