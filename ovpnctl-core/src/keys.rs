//! Installation-bound encryption key derivation
//!
//! The store key is recomputed on every start from two stable inputs; it
//! is never written anywhere.

use rand::RngCore;
use sha2::{Digest, Sha256};
use std::path::Path;
use zeroize::{Zeroize, ZeroizeOnDrop};

/// Domain-separation tag mixed into every derivation. Bumping it
/// invalidates all previously sealed records.
const VERSION_TAG: &str = "ovpnctl-store-key-v1";

/// 256-bit key binding the sealed store to one installation
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct DerivedKey {
    bytes: [u8; 32],
    volatile: bool,
}

impl DerivedKey {
    /// Derive the store key for this installation
    ///
    /// With a machine identifier the result is stable for a given
    /// (machine, install path) pair. Without one, a random in-memory key
    /// is produced instead; anything sealed under it becomes unreadable
    /// after a restart, which callers must surface to the user.
    pub fn derive(machine_id: Option<&str>, install_path: &Path) -> Self {
        let mut hasher = Sha256::new();

        match machine_id {
            Some(id) => {
                hasher.update(id.as_bytes());
                hasher.update(install_path.to_string_lossy().as_bytes());
                hasher.update(VERSION_TAG.as_bytes());
            }
            None => {
                tracing::warn!("no stable machine identifier; deriving a volatile store key");
                let mut entropy = [0u8; 32];
                rand::rngs::OsRng.fill_bytes(&mut entropy);
                hasher.update(install_path.to_string_lossy().as_bytes());
                hasher.update(
                    chrono::Utc::now()
                        .timestamp_nanos_opt()
                        .unwrap_or_default()
                        .to_le_bytes(),
                );
                hasher.update(entropy);
            }
        }

        let digest = hasher.finalize();
        let mut bytes = [0u8; 32];
        bytes.copy_from_slice(&digest);

        Self {
            bytes,
            volatile: machine_id.is_none(),
        }
    }

    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.bytes
    }

    /// True when this key cannot be re-derived after a restart
    pub fn is_volatile(&self) -> bool {
        self.volatile
    }
}

impl std::fmt::Debug for DerivedKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DerivedKey")
            .field("volatile", &self.volatile)
            .finish_non_exhaustive()
    }
}

/// Best-effort stable machine identifier for the current host
///
/// Reads the systemd machine id where present, falling back to the
/// hostname. `None` means the caller gets a volatile key.
pub fn default_machine_id() -> Option<String> {
    for path in ["/etc/machine-id", "/var/lib/dbus/machine-id"] {
        if let Ok(id) = std::fs::read_to_string(path) {
            let id = id.trim();
            if !id.is_empty() {
                return Some(id.to_string());
            }
        }
    }

    hostname::get()
        .ok()
        .and_then(|name| name.into_string().ok())
        .filter(|name| !name.is_empty())
}
