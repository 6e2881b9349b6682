//! Encrypted profile and settings store
//!
//! All profiles, the active-profile pointer, and the scalar settings live
//! in one sealed document keyed by the installation's [`DerivedKey`].
//! Mutations are serialized behind a single writer lock; reads take a
//! snapshot under the same lock.

pub mod backend;
mod crypto;

pub use backend::{FileBackend, KvBackend, MemoryBackend};

use crate::error::StoreError;
use crate::keys::DerivedKey;
use crate::profile::ParsedProfile;
use crate::types::Credentials;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};
use tracing::{debug, warn};

/// Backend key under which the sealed document lives
const STORE_KEY: &str = "store";

/// A profile at rest: the parsed form plus any attached credentials
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredConfig {
    pub profile: ParsedProfile,
    #[serde(default)]
    pub credentials: Option<Credentials>,
}

impl StoredConfig {
    pub fn new(profile: ParsedProfile) -> Self {
        Self {
            profile,
            credentials: None,
        }
    }

    /// Storage key for this config
    pub fn name(&self) -> &str {
        &self.profile.name
    }
}

/// Scalar client preferences persisted alongside the profiles
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub auto_connect: bool,
    pub use_biometric: bool,
    pub kill_switch: bool,
    pub auto_start: bool,
}

/// The full persisted document
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
struct StoreDocument {
    configs: HashMap<String, StoredConfig>,
    active: Option<String>,
    settings: Settings,
}

/// Encrypted config store
pub struct SecureConfigStore {
    backend: Box<dyn KvBackend>,
    key: DerivedKey,
    inner: Mutex<StoreDocument>,
}

impl SecureConfigStore {
    /// Open the store, loading whatever the backend currently holds
    ///
    /// A record that fails to decrypt (wrong key after a volatile-key
    /// restart, corruption) degrades to an empty document. The condition
    /// is logged, not propagated; the user re-imports instead of staring
    /// at a decode error.
    pub fn open(backend: Box<dyn KvBackend>, key: DerivedKey) -> Result<Self, StoreError> {
        let document = match backend.get(STORE_KEY)? {
            Some(bytes) => match crypto::open(&key, &bytes)
                .and_then(|plain| serde_json::from_slice::<StoreDocument>(&plain).ok())
            {
                Some(document) => document,
                None => {
                    warn!("stored document did not decrypt under the current key; starting empty");
                    StoreDocument::default()
                }
            },
            None => StoreDocument::default(),
        };

        if key.is_volatile() {
            warn!("store key is volatile; saved profiles will not survive a restart");
        }
        debug!(profiles = document.configs.len(), "config store opened");

        Ok(Self {
            backend,
            key,
            inner: Mutex::new(document),
        })
    }

    fn lock(&self) -> MutexGuard<'_, StoreDocument> {
        self.inner.lock().unwrap()
    }

    fn persist(&self, document: &StoreDocument) -> Result<(), StoreError> {
        let plain = serde_json::to_vec(document)?;
        let sealed = crypto::seal(&self.key, &plain)?;
        self.backend.set(STORE_KEY, &sealed)
    }

    /// Upsert a freshly imported profile and make it the active one
    pub fn save(&self, profile: ParsedProfile) -> Result<(), StoreError> {
        let mut document = self.lock();
        let config = StoredConfig::new(profile);
        document.active = Some(config.name().to_string());
        document.configs.insert(config.name().to_string(), config);
        self.persist(&document)
    }

    pub fn get_active(&self) -> Option<StoredConfig> {
        let document = self.lock();
        document
            .active
            .as_ref()
            .and_then(|name| document.configs.get(name).cloned())
    }

    pub fn has_active(&self) -> bool {
        self.get_active().is_some()
    }

    /// Remove the active entry and clear the pointer; no-op when none
    pub fn delete_active(&self) -> Result<(), StoreError> {
        let mut document = self.lock();
        if let Some(name) = document.active.take() {
            document.configs.remove(&name);
            self.persist(&document)?;
        }
        Ok(())
    }

    /// All stored configs, in no particular order
    pub fn list_all(&self) -> Vec<StoredConfig> {
        self.lock().configs.values().cloned().collect()
    }

    /// Repoint the active marker
    ///
    /// Returns false, with no side effects, when `name` is not stored.
    pub fn set_active(&self, name: &str) -> Result<bool, StoreError> {
        let mut document = self.lock();
        if !document.configs.contains_key(name) {
            return Ok(false);
        }
        document.active = Some(name.to_string());
        self.persist(&document)?;
        Ok(true)
    }

    /// Replace the active profile and its map entry in one step
    ///
    /// Used to attach or change credentials. The write covers both the
    /// active pointer and the map entry under the config's name; callers
    /// get a full replace, never a partial merge.
    pub fn update_active(&self, config: StoredConfig) -> Result<(), StoreError> {
        let mut document = self.lock();
        document.active = Some(config.name().to_string());
        document
            .configs
            .insert(config.name().to_string(), config);
        self.persist(&document)
    }

    /// Current settings snapshot
    pub fn settings(&self) -> Settings {
        self.lock().settings
    }

    /// Mutate settings under the writer lock and persist the result
    pub fn update_settings(
        &self,
        apply: impl FnOnce(&mut Settings),
    ) -> Result<Settings, StoreError> {
        let mut document = self.lock();
        apply(&mut document.settings);
        self.persist(&document)?;
        Ok(document.settings)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::profile;
    use std::path::PathBuf;

    fn test_store() -> SecureConfigStore {
        let key = DerivedKey::derive(Some("test-machine"), &PathBuf::from("/tmp/ovpnctl-test"));
        SecureConfigStore::open(Box::new(MemoryBackend::new()), key).unwrap()
    }

    fn test_profile(name: &str) -> ParsedProfile {
        profile::parse(name, "remote vpn.example.com 1194 udp\n").unwrap()
    }

    #[test]
    fn test_save_sets_active() {
        let store = test_store();
        assert!(!store.has_active());
        store.save(test_profile("work.ovpn")).unwrap();
        assert_eq!(store.get_active().unwrap().name(), "work.ovpn");
    }

    #[test]
    fn test_settings_default_to_off() {
        let store = test_store();
        let settings = store.settings();
        assert!(!settings.auto_connect);
        assert!(!settings.use_biometric);
        assert!(!settings.kill_switch);
        assert!(!settings.auto_start);
    }
}
