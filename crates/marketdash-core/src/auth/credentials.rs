use std::collections::BTreeMap;

use keyring::Entry;
use tracing::debug;

use super::storage::{SessionStorage, StorageError};

const SERVICE_NAME: &str = "marketdash";

/// Keychain account holding the serialized session entries
const DEFAULT_ACCOUNT: &str = "session";

/// Session storage in the OS keychain.
///
/// All entries live in a single keychain secret as a JSON object, so an
/// update of several keys is one `set_password` call.
pub struct KeyringStorage {
    account: String,
}

impl KeyringStorage {
    pub fn new() -> Self {
        Self::for_account(DEFAULT_ACCOUNT)
    }

    pub fn for_account(account: &str) -> Self {
        Self {
            account: account.to_string(),
        }
    }

    fn entry(&self) -> Result<Entry, StorageError> {
        Ok(Entry::new(SERVICE_NAME, &self.account)?)
    }

    fn load(&self) -> Result<BTreeMap<String, String>, StorageError> {
        match self.entry()?.get_password() {
            Ok(secret) => Ok(serde_json::from_str(&secret)?),
            Err(keyring::Error::NoEntry) => Ok(BTreeMap::new()),
            Err(e) => Err(e.into()),
        }
    }

    fn store(&self, entries: &BTreeMap<String, String>) -> Result<(), StorageError> {
        let entry = self.entry()?;
        if entries.is_empty() {
            return match entry.delete_credential() {
                Ok(()) | Err(keyring::Error::NoEntry) => Ok(()),
                Err(e) => Err(e.into()),
            };
        }
        entry.set_password(&serde_json::to_string(entries)?)?;
        debug!(account = %self.account, keys = entries.len(), "Keychain entry updated");
        Ok(())
    }
}

impl Default for KeyringStorage {
    fn default() -> Self {
        Self::new()
    }
}

impl SessionStorage for KeyringStorage {
    fn read(&self, key: &str) -> Result<Option<String>, StorageError> {
        Ok(self.load()?.remove(key))
    }

    fn write(&self, entries: &[(&str, &str)]) -> Result<(), StorageError> {
        let mut current = self.load().unwrap_or_default();
        for (key, value) in entries {
            current.insert((*key).to_string(), (*value).to_string());
        }
        self.store(&current)
    }

    fn remove(&self, keys: &[&str]) -> Result<(), StorageError> {
        let mut current = self.load()?;
        current.retain(|k, _| !keys.contains(&k.as_str()));
        self.store(&current)
    }
}
