//! Iterated SHA-256 stretch turning a family shared secret into a 256-bit key.
//!
//! The key depends on the secret alone. Every device of a family derives it
//! independently, so nothing device-specific may enter the hash.

use secrecy::{ExposeSecret, SecretBox};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use zeroize::Zeroizing;

use crate::error::{LocationVaultError, Result};

/// Derived key length in bytes
pub const KEY_LEN: usize = 32;

/// Domain separation string appended to every shared secret
pub const DEFAULT_DOMAIN: &str = "FAMILY_LOCATION_VAULT:kdf:v1";

/// Number of SHA-256 rounds
pub const DEFAULT_ITERATIONS: u32 = 10_000;

/// KDF parameters. Both devices of a family must use identical values.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct KdfConfig {
    /// Total SHA-256 invocations
    pub iterations: u32,
    /// Domain separation constant
    pub domain: String,
}

impl Default for KdfConfig {
    fn default() -> Self {
        Self {
            iterations: DEFAULT_ITERATIONS,
            domain: DEFAULT_DOMAIN.to_string(),
        }
    }
}

impl KdfConfig {
    /// Cheap parameters for unit tests. Not interoperable with the default.
    pub fn fast_for_tests() -> Self {
        Self {
            iterations: 16,
            ..Default::default()
        }
    }
}

/// 256-bit key, zeroized on drop
pub struct DerivedKey {
    inner: SecretBox<[u8; KEY_LEN]>,
}

impl DerivedKey {
    pub(crate) fn new(bytes: [u8; KEY_LEN]) -> Self {
        Self {
            inner: SecretBox::new(Box::new(bytes)),
        }
    }

    /// Expose the key bytes (use with caution)
    pub fn expose(&self) -> &[u8; KEY_LEN] {
        self.inner.expose_secret()
    }
}

impl std::fmt::Debug for DerivedKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("DerivedKey([REDACTED])")
    }
}

/// Derives the family key from a shared secret.
///
/// `state = SHA-256(secret || domain)`, then `state = SHA-256(state)` until
/// `iterations` digests have been computed.
pub fn derive_key(secret: &str, config: &KdfConfig) -> Result<DerivedKey> {
    if secret.trim().is_empty() {
        return Err(LocationVaultError::InvalidSecret);
    }
    if config.iterations == 0 {
        return Err(LocationVaultError::KeyDerivationFailed(
            "iteration count must be at least 1".into(),
        ));
    }

    let mut hasher = Sha256::new();
    hasher.update(secret.as_bytes());
    hasher.update(config.domain.as_bytes());

    let mut state = Zeroizing::new([0u8; KEY_LEN]);
    state.copy_from_slice(&hasher.finalize());

    for _ in 1..config.iterations {
        let next = Sha256::digest(state.as_slice());
        state.copy_from_slice(&next);
    }

    Ok(DerivedKey::new(*state))
}
