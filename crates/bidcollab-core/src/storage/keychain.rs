use keyring::Entry;
use tracing::debug;

use crate::config::APP_NAME;

use super::{DurableStorage, Result};

/// Key read once at startup to check that the keychain is reachable
const REACHABILITY_KEY: &str = "token";

/// Stores each key as a separate password entry in the OS keychain,
/// under the service name `bidcollab`.
pub struct KeyringStorage {
    service: String,
}

impl KeyringStorage {
    /// Open the default service, failing if the platform keychain cannot be
    /// reached.
    pub fn new() -> Result<Self> {
        let storage = Self::with_service(APP_NAME);
        storage.check_reachable()?;
        Ok(storage)
    }

    pub fn with_service(service: impl Into<String>) -> Self {
        Self {
            service: service.into(),
        }
    }

    fn entry(&self, key: &str) -> Result<Entry> {
        Ok(Entry::new(&self.service, key)?)
    }

    fn check_reachable(&self) -> Result<()> {
        self.get(REACHABILITY_KEY).map(|_| ())
    }
}

impl DurableStorage for KeyringStorage {
    fn get(&self, key: &str) -> Result<Option<String>> {
        match self.entry(key)?.get_password() {
            Ok(value) => Ok(Some(value)),
            Err(keyring::Error::NoEntry) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn set(&mut self, key: &str, value: &str) -> Result<()> {
        self.entry(key)?.set_password(value)?;
        debug!(key, service = %self.service, "Stored key in keychain");
        Ok(())
    }

    fn remove(&mut self, key: &str) -> Result<()> {
        match self.entry(key)?.delete_credential() {
            Ok(()) | Err(keyring::Error::NoEntry) => {
                debug!(key, service = %self.service, "Removed key from keychain");
                Ok(())
            }
            Err(e) => Err(e.into()),
        }
    }

    /// The Linux keyutils store is dropped on logout and reboot.
    fn is_persistent(&self) -> bool {
        !cfg!(target_os = "linux")
    }
}
