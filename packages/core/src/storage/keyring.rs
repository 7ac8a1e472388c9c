//! [`ProtectedStore`] backed by the OS credential store (Keychain, Secret
//! Service, Credential Manager). Enabled with the `keyring` feature.
//!
//! The OS store decides accessibility itself; the requested [`AccessTier`]
//! is only logged. Secrets never leave the device through this backend.

use crate::storage::protected::{AccessTier, ProtectedStore};
use crate::utils::error::{MessengerError, Result};
use zeroize::Zeroizing;

pub const DEFAULT_SERVICE: &str = "com.construct.pqmsg";

pub struct KeyringProtectedStore {
    service: String,
}

impl KeyringProtectedStore {
    pub fn new(service: impl Into<String>) -> Self {
        Self {
            service: service.into(),
        }
    }

    fn entry(&self, account: &str) -> Result<::keyring::Entry> {
        ::keyring::Entry::new(&self.service, account).map_err(keyring_error)
    }
}

impl Default for KeyringProtectedStore {
    fn default() -> Self {
        Self::new(DEFAULT_SERVICE)
    }
}

fn keyring_error(err: ::keyring::Error) -> MessengerError {
    MessengerError::StorageError(format!("Keychain error: {}", err))
}

impl ProtectedStore for KeyringProtectedStore {
    fn save(&self, account: &str, data: &[u8], tier: AccessTier) -> Result<()> {
        tracing::debug!(account, ?tier, "saving to OS keychain");
        self.entry(account)?.set_secret(data).map_err(keyring_error)
    }

    fn load(&self, account: &str) -> Result<Option<Zeroizing<Vec<u8>>>> {
        match self.entry(account)?.get_secret() {
            Ok(secret) => Ok(Some(Zeroizing::new(secret))),
            Err(::keyring::Error::NoEntry) => Ok(None),
            Err(e) => Err(keyring_error(e)),
        }
    }

    fn delete(&self, account: &str) -> Result<()> {
        match self.entry(account)?.delete_credential() {
            Ok(()) | Err(::keyring::Error::NoEntry) => Ok(()),
            Err(e) => Err(keyring_error(e)),
        }
    }
}
