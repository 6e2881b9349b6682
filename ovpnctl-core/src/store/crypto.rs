//! Sealed-record encryption for persisted documents
//!
//! Record layout: magic || 12-byte nonce || AES-256-GCM ciphertext.
//! The magic versions the format.

use crate::error::StoreError;
use crate::keys::DerivedKey;
use aes_gcm::aead::{Aead, KeyInit};
use aes_gcm::{Aes256Gcm, Nonce};
use rand::RngCore;

const MAGIC: &[u8; 5] = b"OVPN1";
const NONCE_LEN: usize = 12;

/// Seal a plaintext document under the installation key
pub fn seal(key: &DerivedKey, plaintext: &[u8]) -> Result<Vec<u8>, StoreError> {
    let cipher = Aes256Gcm::new_from_slice(key.as_bytes()).map_err(|_| StoreError::Seal)?;
    let mut nonce_bytes = [0u8; NONCE_LEN];
    rand::rngs::OsRng.fill_bytes(&mut nonce_bytes);
    let nonce = Nonce::from_slice(&nonce_bytes);
    let ciphertext = cipher
        .encrypt(nonce, plaintext)
        .map_err(|_| StoreError::Seal)?;

    let mut out = Vec::with_capacity(MAGIC.len() + NONCE_LEN + ciphertext.len());
    out.extend_from_slice(MAGIC);
    out.extend_from_slice(&nonce_bytes);
    out.extend_from_slice(&ciphertext);
    Ok(out)
}

/// Open a sealed record
///
/// `None` covers every way the record can be unreadable: wrong magic,
/// truncation, or a ciphertext that does not authenticate under this key
/// (e.g. after a volatile-key restart). Callers degrade, they don't fail.
pub fn open(key: &DerivedKey, data: &[u8]) -> Option<Vec<u8>> {
    if data.len() < MAGIC.len() + NONCE_LEN || &data[..MAGIC.len()] != MAGIC {
        return None;
    }
    let nonce = Nonce::from_slice(&data[MAGIC.len()..MAGIC.len() + NONCE_LEN]);
    let cipher = Aes256Gcm::new_from_slice(key.as_bytes()).ok()?;
    cipher.decrypt(nonce, &data[MAGIC.len() + NONCE_LEN..]).ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn test_key(id: &str) -> DerivedKey {
        DerivedKey::derive(Some(id), &PathBuf::from("/tmp/ovpnctl-test"))
    }

    #[test]
    fn test_seal_open_roundtrip() {
        let key = test_key("machine");
        let sealed = seal(&key, b"document").unwrap();
        assert_eq!(open(&key, &sealed).unwrap(), b"document");
    }

    #[test]
    fn test_wrong_key_does_not_open() {
        let sealed = seal(&test_key("machine-a"), b"document").unwrap();
        assert!(open(&test_key("machine-b"), &sealed).is_none());
    }

    #[test]
    fn test_tampered_record_does_not_open() {
        let key = test_key("machine");
        let mut sealed = seal(&key, b"document").unwrap();
        let last = sealed.len() - 1;
        sealed[last] ^= 0x01;
        assert!(open(&key, &sealed).is_none());
    }

    #[test]
    fn test_garbage_does_not_open() {
        let key = test_key("machine");
        assert!(open(&key, b"not a sealed record").is_none());
        assert!(open(&key, b"OVPN1").is_none());
    }
}
